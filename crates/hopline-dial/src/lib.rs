//! Connection establishment for hopline.
//!
//! Everything that opens an outbound connection implements [`Dialer`].
//! Dialers compose by decoration: each wrapper owns the next dialer in the
//! chain and implements the same capability, e.g.
//!
//! ```text
//! TcpDialer -> ResolvingDialer -> FixedAddressDialer -> TunnelDialer
//! ```
//!
//! # Dialers
//!
//! - [`TcpDialer`]: plain TCP with connect timeout and socket options.
//! - [`FixedAddressDialer`]: replaces the destination host, keeps the port.
//! - [`ResolvingDialer`]: resolves the host and tries each address in order.

pub mod addr;
pub mod dialer;
pub mod error;
pub mod fixed;
pub mod network;
pub mod resolving;
pub mod tcp;

pub use addr::{join_host_port, split_host_port};
pub use dialer::{Connection, Dialer, Stream};
pub use error::{DialError, TunnelError};
pub use fixed::FixedAddressDialer;
pub use network::Network;
pub use resolving::ResolvingDialer;
pub use tcp::TcpDialer;
