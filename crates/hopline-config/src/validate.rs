//! Configuration validation logic.

use hopline_select::SelectionPolicy;
use url::Url;

use crate::Config;
use crate::loader::ConfigError;

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.endpoints.is_empty() {
        return Err(ConfigError::Validation("endpoints is empty".into()));
    }
    for (i, endpoint) in config.endpoints.iter().enumerate() {
        let address = endpoint.address.trim();
        if address.is_empty() {
            return Err(ConfigError::Validation(format!(
                "endpoints[{i}].address is empty"
            )));
        }
        let has_port = address
            .rsplit_once(':')
            .is_some_and(|(_, port)| port.parse::<u16>().is_ok());
        if !has_port {
            return Err(ConfigError::Validation(format!(
                "endpoints[{i}].address must be host:port, got {address:?}"
            )));
        }
        if endpoint.login.is_some() != endpoint.password.is_some() {
            return Err(ConfigError::Validation(format!(
                "endpoints[{i}]: login and password must be set together"
            )));
        }
        if let Some(ip) = &endpoint.fixed_ip
            && ip.parse::<std::net::IpAddr>().is_err()
        {
            return Err(ConfigError::Validation(format!(
                "endpoints[{i}].fixed_ip is not an IP address: {ip:?}"
            )));
        }
        if endpoint.tls_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "endpoints[{i}].tls_name is empty"
            )));
        }
        if endpoint.ca_file.as_deref().is_some_and(|f| f.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "endpoints[{i}].ca_file is empty"
            )));
        }
    }

    if config.dialer.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "dialer.connect_timeout_secs must be > 0".into(),
        ));
    }
    if config.dialer.handshake_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "dialer.handshake_timeout_secs must be > 0".into(),
        ));
    }
    if let Some(proxy) = &config.dialer.base_proxy {
        check_http_url("dialer.base_proxy", proxy)?;
    }

    if config.dns.timeout_secs == 0 {
        return Err(ConfigError::Validation("dns.timeout_secs must be > 0".into()));
    }
    for (i, server) in config.dns.servers.iter().enumerate() {
        hopline_dns::check_server_url(server)
            .map_err(|e| ConfigError::Validation(format!("dns.servers[{i}]: {e}")))?;
    }

    if config.selection.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "selection.timeout_secs must be > 0".into(),
        ));
    }
    if config.selection.policy == SelectionPolicy::Fastest {
        check_http_url("selection.benchmark_url", &config.selection.benchmark_url)?;
    }

    let valid_formats = ["json", "pretty", "compact"];
    if let Some(format) = config.logging.format.as_deref()
        && !valid_formats.contains(&format)
    {
        return Err(ConfigError::Validation(format!(
            "logging.format must be one of: {valid_formats:?}"
        )));
    }
    let valid_outputs = ["stdout", "stderr"];
    if let Some(output) = config.logging.output.as_deref()
        && !valid_outputs.contains(&output)
    {
        return Err(ConfigError::Validation(format!(
            "logging.output must be one of: {valid_outputs:?}"
        )));
    }
    Ok(())
}

fn check_http_url(field: &str, raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::Validation(format!("{field}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "{field} must be an http:// or https:// url"
        )));
    }
    if url.host_str().is_none() {
        return Err(ConfigError::Validation(format!("{field} has no host")));
    }
    Ok(())
}
