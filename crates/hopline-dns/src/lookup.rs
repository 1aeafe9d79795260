//! The resolver capability shared by every backend.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::DnsError;
use crate::family::Family;

/// Resolves a host name to an ordered list of addresses.
///
/// An empty list is a successful answer with nothing usable in it, distinct
/// from an error. Implementations must return [`DnsError::Cancelled`]
/// promptly once `cancel` fires.
#[async_trait]
pub trait LookupIp: Send + Sync {
    async fn lookup_ip(
        &self,
        family: Family,
        host: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<IpAddr>, DnsError>;
}

#[async_trait]
impl<T: LookupIp + ?Sized> LookupIp for Arc<T> {
    async fn lookup_ip(
        &self,
        family: Family,
        host: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<IpAddr>, DnsError> {
        (**self).lookup_ip(family, host, cancel).await
    }
}

#[async_trait]
impl<T: LookupIp + ?Sized> LookupIp for Box<T> {
    async fn lookup_ip(
        &self,
        family: Family,
        host: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<IpAddr>, DnsError> {
        (**self).lookup_ip(family, host, cancel).await
    }
}
