//! The dialer capability.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::error::DialError;
use crate::network::Network;

/// Marker trait for byte streams a dialer can hand out.
pub trait Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + 'static> Stream for T {}

/// An established outbound connection.
pub type Connection = Box<dyn Stream>;

/// Opens connections to `host:port` addresses.
///
/// Implementations must be thread-safe (`Send + Sync`): one dialer chain is
/// shared by every concurrent client connection.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Connect to `address` over `network`.
    ///
    /// Returns [`DialError::Cancelled`] once `cancel` fires; any partially
    /// established connection is dropped.
    async fn dial(
        &self,
        network: Network,
        address: &str,
        cancel: &CancellationToken,
    ) -> Result<Connection, DialError>;
}

/// Blanket implementation for `Arc<D>` where `D: Dialer`.
#[async_trait]
impl<D: Dialer + ?Sized> Dialer for Arc<D> {
    #[inline]
    async fn dial(
        &self,
        network: Network,
        address: &str,
        cancel: &CancellationToken,
    ) -> Result<Connection, DialError> {
        (**self).dial(network, address, cancel).await
    }
}

/// Blanket implementation for `Box<D>` where `D: Dialer`.
#[async_trait]
impl<D: Dialer + ?Sized> Dialer for Box<D> {
    #[inline]
    async fn dial(
        &self,
        network: Network,
        address: &str,
        cancel: &CancellationToken,
    ) -> Result<Connection, DialError> {
        (**self).dial(network, address, cancel).await
    }
}
