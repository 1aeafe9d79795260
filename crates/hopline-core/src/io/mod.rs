//! I/O utilities for relaying client traffic through an established tunnel.

mod relay;

pub use relay::{RelayStats, ack_line, relay_framed, relay_spliced};
