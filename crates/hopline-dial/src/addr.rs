//! `host:port` helpers.

use crate::error::DialError;

/// Split `"host:port"` into (host, port).
///
/// Handles IPv6 bracket notation: `"[::1]:443"` → `("::1", 443)`.
pub fn split_host_port(addr: &str) -> Result<(&str, u16), DialError> {
    let invalid = || DialError::InvalidAddress(addr.to_string());

    // IPv6 bracket notation: [::1]:443
    if let Some(rest) = addr.strip_prefix('[') {
        let (host, port_str) = rest.split_once("]:").ok_or_else(invalid)?;
        let port = port_str.parse::<u16>().map_err(|_| invalid())?;
        return Ok((host, port));
    }

    let (host, port_str) = addr.rsplit_once(':').ok_or_else(invalid)?;
    if host.contains(':') {
        // Unbracketed IPv6 literal
        return Err(invalid());
    }
    let port = port_str.parse::<u16>().map_err(|_| invalid())?;
    Ok((host, port))
}

/// Join host and port, bracketing IPv6 literals.
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}
