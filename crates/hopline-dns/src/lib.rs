//! Async DNS resolution for hopline.
//!
//! Provides the [`LookupIp`] capability, caching backends built from server
//! URLs and backed by
//! [`hickory-resolver`](https://crates.io/crates/hickory-resolver)
//! (plain UDP/TCP, DNS-over-TLS, DNS-over-HTTPS) or by a small hyper client
//! for DoH over cleartext HTTP, and a [`RacingResolver`]
//! that queries several backends at once and keeps the first answer.
//!
//! # Usage
//!
//! ```rust,no_run
//! use hopline_dns::{DnsConfig, Family, LookupIp, RacingResolver};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), hopline_dns::DnsError> {
//! let config = DnsConfig {
//!     servers: vec!["https://1.1.1.1/dns-query".into(), "tls://9.9.9.9".into()],
//!     ..Default::default()
//! };
//! let resolver = RacingResolver::from_config(&config)?;
//!
//! let cancel = CancellationToken::new();
//! let addrs = resolver.lookup_ip(Family::Ip4, "example.com", &cancel).await?;
//! println!("resolved: {addrs:?}");
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
mod doh;
pub mod error;
pub mod family;
pub mod lookup;
pub mod racing;

pub use backend::{DnsResolver, check_server_url};
pub use config::DnsConfig;
pub use error::DnsError;
pub use family::Family;
pub use lookup::LookupIp;
pub use racing::RacingResolver;
