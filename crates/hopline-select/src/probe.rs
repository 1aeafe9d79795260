//! Benchmark probes routed through a candidate's dial path.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use hopline_dial::{Connection, Dialer, Network, join_host_port};
use hopline_tunnel::{TrustRoots, crypto_provider};
use http::header::{CONNECTION, HOST, USER_AGENT};
use http_body_util::{BodyExt, Empty};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use tokio_rustls::TlsConnector;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::{Host, Position, Url};

use crate::error::ProbeError;

/// A pass/fail reachability check run through one candidate dialer.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(
        &self,
        dialer: &dyn Dialer,
        cancel: &CancellationToken,
    ) -> Result<(), ProbeError>;
}

#[async_trait]
impl<P: Probe + ?Sized> Probe for Arc<P> {
    async fn probe(
        &self,
        dialer: &dyn Dialer,
        cancel: &CancellationToken,
    ) -> Result<(), ProbeError> {
        (**self).probe(dialer, cancel).await
    }
}

/// Fetches a benchmark URL with a plain HTTP/1.1 GET.
///
/// The TCP connection comes from the candidate dialer, so the whole exchange
/// (including TLS for `https` URLs) travels the candidate's tunnel. The
/// probe succeeds once the response is `200 OK` and its body has been read to
/// the end, or up to `download_limit` bytes when a limit is set.
pub struct HttpProbe {
    url: Url,
    address: String,
    server_name: ServerName<'static>,
    tls: Option<TlsConnector>,
    download_limit: u64,
}

impl std::fmt::Debug for HttpProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProbe")
            .field("url", &self.url.as_str())
            .field("tls", &self.tls.is_some())
            .field("download_limit", &self.download_limit)
            .finish()
    }
}

impl HttpProbe {
    /// Probe `url`, verifying `https` servers against the bundled web roots.
    pub fn new(url: &str) -> Result<Self, ProbeError> {
        Self::with_roots(url, &TrustRoots::system())
    }

    pub fn with_roots(raw: &str, roots: &TrustRoots) -> Result<Self, ProbeError> {
        let url = Url::parse(raw).map_err(|e| ProbeError::InvalidUrl(format!("{raw}: {e}")))?;
        let tls = match url.scheme() {
            "http" => None,
            "https" => Some(connector(roots)?),
            other => {
                return Err(ProbeError::InvalidUrl(format!(
                    "{raw}: unsupported scheme {other:?}"
                )));
            }
        };

        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => return Err(ProbeError::InvalidUrl(format!("{raw}: missing host"))),
        };
        let port = url
            .port_or_known_default()
            .ok_or_else(|| ProbeError::InvalidUrl(format!("{raw}: missing port")))?;
        let server_name = ServerName::try_from(host.as_str())
            .map_err(|e| ProbeError::InvalidUrl(format!("{raw}: {e}")))?
            .to_owned();

        Ok(Self {
            address: join_host_port(&host, port),
            url,
            server_name,
            tls,
            download_limit: 0,
        })
    }

    /// Stop reading the body after `limit` bytes. Zero reads it all.
    pub fn with_download_limit(mut self, limit: u64) -> Self {
        self.download_limit = limit;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn run(&self, dialer: &dyn Dialer, cancel: &CancellationToken) -> Result<(), ProbeError> {
        let conn = dialer.dial(Network::Tcp, &self.address, cancel).await?;
        let io: Connection = match &self.tls {
            Some(connector) => Box::new(
                connector
                    .connect(self.server_name.clone(), conn)
                    .await
                    .map_err(ProbeError::Tls)?,
            ),
            None => conn,
        };

        let (mut sender, connection) = http1::Builder::new()
            .handshake::<_, Empty<Bytes>>(TokioIo::new(io))
            .await?;
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!(error = %e, "probe connection ended");
            }
        });

        let result = self.fetch(&mut sender).await;
        driver.abort();
        result
    }

    async fn fetch(
        &self,
        sender: &mut http1::SendRequest<Empty<Bytes>>,
    ) -> Result<(), ProbeError> {
        let request = http::Request::get(&self.url[Position::BeforePath..Position::AfterQuery])
            .header(HOST, &self.url[Position::BeforeHost..Position::AfterPort])
            .header(USER_AGENT, concat!("hopline/", env!("CARGO_PKG_VERSION")))
            .header(CONNECTION, "close")
            .body(Empty::new())?;

        let response = sender.send_request(request).await?;
        if response.status() != http::StatusCode::OK {
            return Err(ProbeError::Status(response.status()));
        }

        let mut body = response.into_body();
        let mut received: u64 = 0;
        while let Some(frame) = body.frame().await {
            if let Ok(data) = frame?.into_data() {
                received += data.len() as u64;
                if self.download_limit > 0 && received >= self.download_limit {
                    break;
                }
            }
        }

        debug!(url = %self.url, bytes = received, "probe complete");
        Ok(())
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(
        &self,
        dialer: &dyn Dialer,
        cancel: &CancellationToken,
    ) -> Result<(), ProbeError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProbeError::Cancelled),
            result = self.run(dialer, cancel) => result,
        }
    }
}

fn connector(roots: &TrustRoots) -> Result<TlsConnector, ProbeError> {
    let mut config = rustls::ClientConfig::builder_with_provider(crypto_provider())
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots.store())
        .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(TlsConnector::from(Arc::new(config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::time::Duration;

    use hopline_dial::TcpDialer;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves `head` then `body` to every connection; `hold` keeps the
    /// socket open afterwards instead of closing it.
    async fn http_server(head: &'static str, body: Vec<u8>, hold: bool) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut sock, _)) = listener.accept().await {
                let body = body.clone();
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match sock.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    let _ = sock.write_all(head.as_bytes()).await;
                    let _ = sock.write_all(&body).await;
                    if hold {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    }
                });
            }
        });
        addr
    }

    #[tokio::test]
    async fn ok_response_passes() {
        let addr = http_server(
            "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\n",
            b"hello".to_vec(),
            false,
        )
        .await;
        let probe = HttpProbe::new(&format!("http://{addr}/bench.js")).unwrap();
        probe
            .probe(&TcpDialer::new(), &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn error_status_fails() {
        let addr = http_server(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            Vec::new(),
            false,
        )
        .await;
        let probe = HttpProbe::new(&format!("http://{addr}/missing")).unwrap();
        let err = probe
            .probe(&TcpDialer::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Status(s) if s == http::StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn other_success_codes_fail() {
        let addr = http_server(
            "HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n",
            Vec::new(),
            false,
        )
        .await;
        let probe = HttpProbe::new(&format!("http://{addr}/generate_204")).unwrap();
        let err = probe
            .probe(&TcpDialer::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Status(s) if s == http::StatusCode::NO_CONTENT));
    }

    #[tokio::test]
    async fn download_limit_stops_early() {
        // Announces far more than it sends, then stalls.
        let addr = http_server(
            "HTTP/1.1 200 OK\r\nContent-Length: 10000000\r\n\r\n",
            vec![b'x'; 64 * 1024],
            true,
        )
        .await;
        let probe = HttpProbe::new(&format!("http://{addr}/"))
            .unwrap()
            .with_download_limit(4096);

        tokio::time::timeout(
            Duration::from_secs(5),
            probe.probe(&TcpDialer::new(), &CancellationToken::new()),
        )
        .await
        .expect("limited probe kept reading")
        .unwrap();
    }

    #[tokio::test]
    async fn cancellation() {
        let addr = http_server("HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n", Vec::new(), true)
            .await;
        let probe = HttpProbe::new(&format!("http://{addr}/")).unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = probe.probe(&TcpDialer::new(), &cancel).await.unwrap_err();
        assert!(matches!(err, ProbeError::Cancelled));
    }

    #[test]
    fn url_forms() {
        let probe = HttpProbe::new("https://cdn.example.com/lib.js").unwrap();
        assert_eq!(probe.address, "cdn.example.com:443");
        assert!(probe.tls.is_some());

        let probe = HttpProbe::new("http://[::1]:8080/x?y=1").unwrap();
        assert_eq!(probe.address, "[::1]:8080");
        assert!(probe.tls.is_none());

        assert!(matches!(
            HttpProbe::new("ftp://example.com/file"),
            Err(ProbeError::InvalidUrl(_))
        ));
        assert!(matches!(HttpProbe::new("not a url"), Err(ProbeError::InvalidUrl(_))));
    }
}
