//! Plain TCP dialer.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use hopline_core::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_TCP_KEEPALIVE_SECS, DEFAULT_TCP_NO_DELAY};
use hopline_dns::DnsError;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::addr::split_host_port;
use crate::dialer::{Connection, Dialer};
use crate::error::DialError;
use crate::network::Network;

/// Base dialer opening TCP connections.
///
/// Host names are resolved with the system resolver; wrap in a
/// [`ResolvingDialer`](crate::ResolvingDialer) to use a custom one.
#[derive(Debug, Clone)]
pub struct TcpDialer {
    connect_timeout: Duration,
    no_delay: bool,
    keepalive: Option<Duration>,
}

impl Default for TcpDialer {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            no_delay: DEFAULT_TCP_NO_DELAY,
            keepalive: Some(Duration::from_secs(DEFAULT_TCP_KEEPALIVE_SECS)),
        }
    }
}

impl TcpDialer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_no_delay(mut self, no_delay: bool) -> Self {
        self.no_delay = no_delay;
        self
    }

    /// Keep-alive idle time; `None` or zero disables keep-alive probes.
    pub fn with_keepalive(mut self, keepalive: Option<Duration>) -> Self {
        self.keepalive = keepalive.filter(|d| !d.is_zero());
        self
    }

    async fn connect_one(&self, addr: SocketAddr) -> Result<TcpStream, DialError> {
        let tcp = tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| DialError::Timeout("tcp connect"))??;
        apply_tcp_options(&tcp, self.no_delay, self.keepalive)?;
        Ok(tcp)
    }

    async fn connect(&self, network: Network, address: &str) -> Result<TcpStream, DialError> {
        let family = network
            .family()
            .ok_or_else(|| DialError::UnsupportedNetwork(network.to_string()))?;

        let (host, port) = split_host_port(address)?;
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
            .await
            .map_err(|source| DnsError::SystemLookup {
                host: host.to_string(),
                source,
            })?
            .filter(|sa| family.matches(sa.ip()))
            .collect();

        let mut last_err = None;
        for addr in addrs {
            match self.connect_one(addr).await {
                Ok(tcp) => {
                    debug!(address = %address, remote = %addr, "tcp connected");
                    return Ok(tcp);
                }
                Err(e) => {
                    debug!(remote = %addr, error = %e, "tcp connect failed");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| DialError::NoAddresses(address.to_string())))
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    async fn dial(
        &self,
        network: Network,
        address: &str,
        cancel: &CancellationToken,
    ) -> Result<Connection, DialError> {
        if !network.is_tcp() {
            return Err(DialError::UnsupportedNetwork(network.to_string()));
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DialError::Cancelled),
            res = self.connect(network, address) => Ok(Box::new(res?) as Connection),
        }
    }
}

/// Apply TCP socket options.
fn apply_tcp_options(
    stream: &TcpStream,
    no_delay: bool,
    keepalive: Option<Duration>,
) -> Result<(), DialError> {
    stream.set_nodelay(no_delay)?;

    if let Some(idle) = keepalive {
        let sock = socket2::SockRef::from(stream);
        let keepalive = socket2::TcpKeepalive::new().with_time(idle);
        sock.set_tcp_keepalive(&keepalive)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn dials_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            sock.write_all(b"hello").await.unwrap();
        });

        let mut conn = TcpDialer::new()
            .dial(Network::Tcp, &addr.to_string(), &CancellationToken::new())
            .await
            .unwrap();

        let mut buf = [0u8; 5];
        conn.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn family_mismatch_has_no_addresses() {
        let err = TcpDialer::new()
            .dial(Network::Tcp6, "127.0.0.1:80", &CancellationToken::new())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DialError::NoAddresses(_)));
    }

    #[tokio::test]
    async fn unresolvable_host_is_resolve_error() {
        let err = TcpDialer::new()
            .dial(Network::Tcp, "hop.invalid:443", &CancellationToken::new())
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            DialError::Resolve(DnsError::SystemLookup { ref host, .. }) if host == "hop.invalid"
        ));
        assert_eq!(err.kind(), "resolve");
    }

    #[tokio::test]
    async fn missing_port_is_invalid_address() {
        let err = TcpDialer::new()
            .dial(Network::Tcp, "hop.example", &CancellationToken::new())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DialError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn udp_is_unsupported() {
        let err = TcpDialer::new()
            .dial(Network::Udp, "127.0.0.1:53", &CancellationToken::new())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DialError::UnsupportedNetwork(n) if n == "udp"));
    }

    #[tokio::test]
    async fn refused_connection_is_io_error() {
        // Bind then drop to get a port with nothing listening.
        let addr = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();

        let err = TcpDialer::new()
            .dial(Network::Tcp4, &addr.to_string(), &CancellationToken::new())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DialError::Io(_)));
    }

    #[tokio::test]
    async fn cancelled_before_connect() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = TcpDialer::new()
            .dial(Network::Tcp, "127.0.0.1:9", &cancel)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DialError::Cancelled));
    }
}
