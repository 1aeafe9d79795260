//! # hopline
//!
//! Dialing and tunneling core of a forward-proxy client.
//!
//! ## Crates
//!
//! - [`hopline_core`] - Default constants, error labels and the tunnel relay
//! - [`hopline_dns`] - Resolver backends and the racing resolver
//! - [`hopline_dial`] - The dialer capability and its basic wrappers
//! - [`hopline_tunnel`] - TLS + HTTP CONNECT tunnels through proxy hops
//! - [`hopline_select`] - Picking one endpoint out of many
//! - [`hopline_config`] - Configuration loading and validation

pub mod chain;

pub use hopline_config as config;
pub use hopline_core as core;
pub use hopline_dial as dial;
pub use hopline_dns as dns;
pub use hopline_select as select;
pub use hopline_tunnel as tunnel;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::chain::{ChainError, DialerChain};
    pub use hopline_config::{Config, load_config, validate_config};
    pub use hopline_core::io::{relay_framed, relay_spliced};
    pub use hopline_dial::{Connection, DialError, Dialer, Network};
    pub use hopline_select::{SelectionPolicy, ServerSelector};
    pub use tokio_util::sync::CancellationToken;
}
