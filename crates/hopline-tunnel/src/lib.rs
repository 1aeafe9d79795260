//! Tunnels through HTTP CONNECT proxy hops for hopline.
//!
//! [`TunnelDialer`] reaches a proxy hop through any
//! [`Dialer`](hopline_dial::Dialer), optionally upgrades the connection to
//! TLS, and opens a CONNECT tunnel to the requested destination.
//!
//! # TLS
//!
//! The ClientHello never carries the hop's real identity: SNI is either
//! omitted or replaced with a configured decoy. After the handshake the peer
//! chain is checked against the expected name by [`ChainVerifier`]. When the
//! chain workaround is on, chains missing the USERTrust ECC cross-sign are
//! completed with the bundled [`FallbackIntermediate`].
//!
//! # Modules
//!
//! - [`dialer`]: the tunnel dialer and its builder.
//! - [`verify`]: chain verification against the expected identity.
//! - [`credentials`]: `Proxy-Authorization` suppliers.
//! - [`endpoint`]: discovered proxy hops.

pub mod credentials;
pub mod cross_sign;
pub mod dialer;
pub mod endpoint;
pub mod error;
mod handshake;
pub mod roots;
pub mod verify;

pub use credentials::{CredentialSupplier, SharedCredentials, StaticCredentials, basic_auth_header};
pub use cross_sign::FallbackIntermediate;
pub use dialer::{TunnelDialer, TunnelDialerBuilder};
pub use endpoint::Endpoint;
pub use error::TunnelSetupError;
pub use roots::TrustRoots;
pub use verify::{ChainVerifier, crypto_provider};
