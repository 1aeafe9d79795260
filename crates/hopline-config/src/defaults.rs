//! Default value functions for serde deserialization.
//!
//! These functions forward to constants defined in `hopline_core::defaults`.

use hopline_core::defaults;
use hopline_select::SelectionPolicy;

/// Generate default value functions that forward to hopline_core::defaults constants.
macro_rules! default_fns {
    ($($fn_name:ident => $const_name:ident : $ty:ty),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> $ty {
                defaults::$const_name
            }
        )*
    };
}

/// Generate default value functions that return String from &str constants.
macro_rules! default_string_fns {
    ($($fn_name:ident => $const_name:ident),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> String {
                defaults::$const_name.to_string()
            }
        )*
    };
}

default_fns! {
    default_connect_timeout_secs   => DEFAULT_CONNECT_TIMEOUT_SECS: u64,
    default_handshake_timeout_secs => DEFAULT_TLS_HANDSHAKE_TIMEOUT_SECS: u64,
    default_keepalive_secs         => DEFAULT_TCP_KEEPALIVE_SECS: u64,
    default_no_delay               => DEFAULT_TCP_NO_DELAY: bool,
    default_selection_timeout_secs => DEFAULT_NETWORK_TIMEOUT_SECS: u64,
    default_download_limit         => DEFAULT_BENCHMARK_DOWNLOAD_LIMIT: u64,
}

default_string_fns! {
    default_benchmark_url => DEFAULT_BENCHMARK_URL,
}

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_policy() -> SelectionPolicy {
    defaults::DEFAULT_SELECTION_POLICY
        .parse()
        .unwrap_or_default()
}
