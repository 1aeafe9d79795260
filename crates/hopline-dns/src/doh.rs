//! DNS-over-HTTP without TLS (RFC 8484 wire format over `http://`).

use std::net::IpAddr;
use std::time::Duration;

use bytes::Bytes;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{Name, RData, RecordType};
use http::header::{ACCEPT, CONTENT_TYPE, HOST};
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tracing::debug;

use crate::backend::{ServerUrl, lookup_server};
use crate::error::DnsError;
use crate::family::Family;

const DNS_MESSAGE: &str = "application/dns-message";

/// Sends each query as a `POST` on a fresh HTTP/1.1 connection.
pub(crate) struct PlainDoh {
    server: ServerUrl,
    authority: String,
    timeout: Duration,
}

impl PlainDoh {
    pub(crate) fn new(server: ServerUrl, timeout: Duration) -> Self {
        let authority = if server.host.contains(':') {
            format!("[{}]:{}", server.host, server.port)
        } else {
            format!("{}:{}", server.host, server.port)
        };
        Self {
            server,
            authority,
            timeout,
        }
    }

    pub(crate) async fn lookup(&self, family: Family, host: &str) -> Result<Vec<IpAddr>, DnsError> {
        let query = async {
            match family {
                Family::Ip4 => self.exchange(host, RecordType::A).await,
                Family::Ip6 => self.exchange(host, RecordType::AAAA).await,
                Family::Ip => {
                    let (v4, v6) = tokio::join!(
                        self.exchange(host, RecordType::A),
                        self.exchange(host, RecordType::AAAA)
                    );
                    match (v4, v6) {
                        (Ok(mut v4), Ok(v6)) => {
                            v4.extend(v6);
                            Ok(v4)
                        }
                        (Ok(addrs), Err(e)) | (Err(e), Ok(addrs)) if !addrs.is_empty() => {
                            debug!(host, error = %e, "doh lookup partially failed");
                            Ok(addrs)
                        }
                        (Err(e), _) | (_, Err(e)) => Err(e),
                    }
                }
            }
        };

        let addrs = tokio::time::timeout(self.timeout, query)
            .await
            .map_err(|_| DnsError::Timeout)??;
        if addrs.is_empty() {
            return Err(DnsError::NoResults(host.to_string()));
        }
        Ok(addrs)
    }

    async fn exchange(&self, host: &str, record_type: RecordType) -> Result<Vec<IpAddr>, DnsError> {
        let mut name = Name::from_ascii(host)?;
        name.set_fqdn(true);

        let mut message = Message::new();
        message
            .set_id(0)
            .set_message_type(MessageType::Query)
            .set_op_code(OpCode::Query)
            .set_recursion_desired(true)
            .add_query(Query::query(name, record_type));
        let payload = message.to_vec()?;

        let addr = lookup_server(&self.server.host, self.server.port).await?;
        let stream = TcpStream::connect(addr).await.map_err(|e| {
            DnsError::Http(format!("connect {addr}: {e}"))
        })?;
        let (mut sender, connection) = http1::handshake::<_, Full<Bytes>>(TokioIo::new(stream))
            .await
            .map_err(|e| DnsError::Http(e.to_string()))?;
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!(error = %e, "doh connection ended");
            }
        });

        let result = self.post(&mut sender, payload).await;
        driver.abort();
        let body = result?;

        let response = Message::from_vec(&body)?;
        match response.response_code() {
            ResponseCode::NoError => {}
            ResponseCode::NXDomain => return Err(DnsError::NoResults(host.to_string())),
            code => return Err(DnsError::Response(code.to_string())),
        }

        Ok(response
            .answers()
            .iter()
            .filter_map(|record| match record.data() {
                RData::A(a) => Some(IpAddr::V4(a.0)),
                RData::AAAA(aaaa) => Some(IpAddr::V6(aaaa.0)),
                _ => None,
            })
            .collect())
    }

    async fn post(
        &self,
        sender: &mut http1::SendRequest<Full<Bytes>>,
        payload: Vec<u8>,
    ) -> Result<Bytes, DnsError> {
        let path = self.server.path.as_deref().unwrap_or("/dns-query");
        let request = http::Request::post(path)
            .header(HOST, &self.authority)
            .header(CONTENT_TYPE, DNS_MESSAGE)
            .header(ACCEPT, DNS_MESSAGE)
            .body(Full::new(Bytes::from(payload)))
            .map_err(|e| DnsError::Http(e.to_string()))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| DnsError::Http(e.to_string()))?;
        if response.status() != http::StatusCode::OK {
            return Err(DnsError::Http(format!(
                "{} answered {}",
                self.authority,
                response.status()
            )));
        }

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| DnsError::Http(e.to_string()))?;
        Ok(body.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, SocketAddr};

    use hickory_proto::rr::Record;
    use hickory_proto::rr::rdata::A;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;

    use crate::{DnsConfig, DnsResolver, LookupIp};

    use super::*;

    /// Answers every A query with 10.0.0.1 and every other query with no records.
    async fn doh_server(status: &'static str) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let query = read_request(&mut stream).await;
                    let mut response = Message::new();
                    response
                        .set_id(query.id())
                        .set_message_type(MessageType::Response)
                        .set_op_code(OpCode::Query)
                        .set_recursion_desired(true)
                        .set_recursion_available(true);
                    for q in query.queries() {
                        response.add_query(q.clone());
                        if q.query_type() == RecordType::A {
                            response.add_answer(Record::from_rdata(
                                q.name().clone(),
                                60,
                                RData::A(A(Ipv4Addr::new(10, 0, 0, 1))),
                            ));
                        }
                    }
                    let body = response.to_vec().unwrap();
                    let head = format!(
                        "HTTP/1.1 {status}\r\ncontent-type: {DNS_MESSAGE}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                        body.len()
                    );
                    stream.write_all(head.as_bytes()).await.unwrap();
                    stream.write_all(&body).await.unwrap();
                    stream.shutdown().await.unwrap();
                });
            }
        });
        addr
    }

    async fn read_request(stream: &mut tokio::net::TcpStream) -> Message {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let head_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "request ended early");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
        assert!(head.starts_with("post /dns-query "));
        assert!(head.contains("content-type: application/dns-message"));
        let len: usize = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        while buf.len() < head_end + len {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "body ended early");
            buf.extend_from_slice(&chunk[..n]);
        }
        Message::from_vec(&buf[head_end..head_end + len]).unwrap()
    }

    #[tokio::test]
    async fn resolves_over_plain_http() {
        let addr = doh_server("200 OK").await;
        let resolver =
            DnsResolver::from_url(&format!("http://{addr}/dns-query"), &DnsConfig::default())
                .unwrap();
        let cancel = CancellationToken::new();

        let addrs = resolver
            .lookup_ip(Family::Ip4, "hop.example", &cancel)
            .await
            .unwrap();
        assert_eq!(addrs, vec![IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))]);

        // AAAA comes back empty, the A answer still counts.
        let addrs = resolver
            .lookup_ip(Family::Ip, "hop.example", &cancel)
            .await
            .unwrap();
        assert_eq!(addrs, vec![IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))]);

        let err = resolver
            .lookup_ip(Family::Ip6, "hop.example", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, DnsError::NoResults(_)));
    }

    #[tokio::test]
    async fn error_status_fails_lookup() {
        let addr = doh_server("500 Internal Server Error").await;
        let resolver =
            DnsResolver::from_url(&format!("http://{addr}"), &DnsConfig::default()).unwrap();

        let err = resolver
            .lookup_ip(Family::Ip4, "hop.example", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DnsError::Http(ref msg) if msg.contains("500")), "{err}");
    }
}
