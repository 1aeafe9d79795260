//! HTTP CONNECT exchange over an established connection.

use hopline_core::{
    DEFAULT_MAX_HEADER_BYTES, DEFAULT_MAX_HEADERS, UPSTREAM_ERROR_HEADER, UPSTREAM_FORBIDDEN_HOST,
};
use hopline_dial::{DialError, TunnelError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

const END_OF_HEAD: &[u8] = b"\r\n\r\n";

/// Ask the proxy on `stream` to open a tunnel to `target`.
///
/// On success the stream is positioned at the first tunneled byte.
pub(crate) async fn connect<S>(
    stream: &mut S,
    target: &str,
    proxy_authorization: Option<&str>,
) -> Result<(), DialError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = connect_request(target, proxy_authorization);
    stream.write_all(request.as_bytes()).await?;
    stream.flush().await?;

    let head = read_response_head(stream, DEFAULT_MAX_HEADER_BYTES).await?;
    check_response(&head)?;
    debug!(target = %target, "CONNECT established");
    Ok(())
}

fn connect_request(target: &str, proxy_authorization: Option<&str>) -> String {
    let mut request = format!("CONNECT {target} HTTP/1.1\r\nHost: {target}\r\n");
    if let Some(auth) = proxy_authorization {
        request.push_str("Proxy-Authorization: ");
        request.push_str(auth);
        request.push_str("\r\n");
    }
    request.push_str("\r\n");
    request
}

/// Read up to and including the first CRLFCRLF, one byte at a time.
///
/// Nothing past the response head is consumed, so tunneled bytes sent right
/// behind it stay in the stream.
async fn read_response_head<S>(stream: &mut S, limit: usize) -> Result<Vec<u8>, DialError>
where
    S: AsyncRead + Unpin,
{
    let mut head = Vec::with_capacity(256);
    let mut byte = [0u8; 1];

    while !head.ends_with(END_OF_HEAD) {
        if head.len() >= limit {
            return Err(TunnelError::ResponseTooLarge(limit).into());
        }
        if stream.read(&mut byte).await? == 0 {
            return Err(TunnelError::UnexpectedEof.into());
        }
        head.push(byte[0]);
    }

    Ok(head)
}

fn check_response(head: &[u8]) -> Result<(), TunnelError> {
    let mut headers = [httparse::EMPTY_HEADER; DEFAULT_MAX_HEADERS];
    let mut response = httparse::Response::new(&mut headers);

    match response.parse(head) {
        Ok(httparse::Status::Complete(_)) => {}
        Ok(httparse::Status::Partial) => {
            return Err(TunnelError::MalformedResponse("incomplete response head".into()));
        }
        Err(e) => return Err(TunnelError::MalformedResponse(e.to_string())),
    }

    let code = response
        .code
        .ok_or_else(|| TunnelError::MalformedResponse("missing status code".into()))?;
    if code == 200 {
        return Ok(());
    }

    let blocked = code == 403
        && response.headers.iter().any(|h| {
            h.name.eq_ignore_ascii_case(UPSTREAM_ERROR_HEADER)
                && h.value == UPSTREAM_FORBIDDEN_HOST.as_bytes()
        });
    if blocked {
        return Err(TunnelError::UpstreamBlocked);
    }

    Err(TunnelError::Status {
        code,
        reason: response.reason.unwrap_or_default().to_string(),
    })
}
