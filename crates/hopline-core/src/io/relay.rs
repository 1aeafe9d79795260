//! Bidirectional relay between an inbound client connection and a tunnel.
//!
//! Two shapes are supported, picked by the protocol generation of the
//! client-facing connection:
//!
//! - [`relay_spliced`] (HTTP/1.x): the inbound connection has been taken
//!   over as a raw duplex stream. An acknowledgement status line is written
//!   back, then raw bytes are pumped in both directions.
//! - [`relay_framed`] (HTTP/2): there is no socket takeover, so request body
//!   bytes feed the tunnel and tunnel bytes feed the response body, flushed
//!   after every chunk.
//!
//! Each direction runs on its own task. The first direction to reach EOF or
//! an error shuts its destination down and stops the other one, so either
//! endpoint closing tears down the whole pair. A watcher in the calling task
//! does the same when the caller's token fires. Stopped tasks drop their
//! halves, which closes both connections. The relay returns only after both
//! tasks have finished. Failures are logged, never returned.

use std::io;

use http::Version;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::defaults::DEFAULT_RELAY_BUFFER_SIZE;

/// Byte counters reported once a relay has finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Bytes copied from the client into the tunnel.
    pub inbound: u64,
    /// Bytes copied from the tunnel back to the client.
    pub outbound: u64,
}

/// Status line telling an HTTP/1.x client that its tunnel is ready.
///
/// Echoes the client's protocol version.
pub fn ack_line(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9 200 OK\r\n\r\n",
        Version::HTTP_10 => "HTTP/1.0 200 OK\r\n\r\n",
        _ => "HTTP/1.1 200 OK\r\n\r\n",
    }
}

/// Relay a taken-over HTTP/1.x client connection through `tunnel`.
///
/// Writes the acknowledgement line for `version` to `inbound`, then copies
/// raw bytes both ways until either side reaches EOF or `cancel` fires.
pub async fn relay_spliced<C, T>(
    mut inbound: C,
    version: Version,
    tunnel: T,
    cancel: &CancellationToken,
) -> RelayStats
where
    C: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let ack = async {
        inbound.write_all(ack_line(version).as_bytes()).await?;
        inbound.flush().await
    };
    let acked = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(io::Error::new(io::ErrorKind::Interrupted, "relay cancelled")),
        res = ack => res,
    };
    if let Err(e) = acked {
        debug!(error = %e, "failed to acknowledge tunnel to client");
        return RelayStats::default();
    }

    let (in_r, in_w) = tokio::io::split(inbound);
    let (tunnel_r, tunnel_w) = tokio::io::split(tunnel);

    let stop = CancellationToken::new();
    let up = tokio::spawn(copy_half(in_r, tunnel_w, stop.clone(), false));
    let down = tokio::spawn(copy_half(tunnel_r, in_w, stop.clone(), false));

    join_halves(up, down, cancel, &stop).await
}

/// Relay an HTTP/2 request/response body pair through `tunnel`.
///
/// `request_body` is copied into the tunnel; tunnel bytes are copied into
/// `response_body`, which is flushed after every chunk. The end of the
/// request body closes the tunnel.
pub async fn relay_framed<R, W, T>(
    request_body: R,
    response_body: W,
    tunnel: T,
    cancel: &CancellationToken,
) -> RelayStats
where
    R: AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Send + Unpin + 'static,
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (tunnel_r, tunnel_w) = tokio::io::split(tunnel);

    let stop = CancellationToken::new();
    let up = tokio::spawn(copy_half(request_body, tunnel_w, stop.clone(), false));
    let down = tokio::spawn(copy_half(tunnel_r, response_body, stop.clone(), true));

    join_halves(up, down, cancel, &stop).await
}

/// Wait for both copy tasks, stopping them early if `cancel` fires.
async fn join_halves(
    up: JoinHandle<u64>,
    down: JoinHandle<u64>,
    cancel: &CancellationToken,
    stop: &CancellationToken,
) -> RelayStats {
    let both = async { tokio::join!(up, down) };
    tokio::pin!(both);

    let watcher = async {
        cancel.cancelled().await;
        debug!("relay cancelled, closing both connections");
        stop.cancel();
    };

    let (up, down) = tokio::select! {
        res = &mut both => res,
        _ = watcher => both.await,
    };

    let stats = RelayStats {
        inbound: up.unwrap_or_default(),
        outbound: down.unwrap_or_default(),
    };
    debug!(inbound = stats.inbound, outbound = stats.outbound, "relay finished");
    stats
}

/// Copy `reader` into `writer` until EOF, error or `stop`.
///
/// EOF shuts the writer down, then stops the opposite direction. An I/O
/// error stops the opposite direction right away. On `stop` the halves are
/// dropped without a graceful shutdown.
async fn copy_half<R, W>(mut reader: R, mut writer: W, stop: CancellationToken, flush_each: bool) -> u64
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; DEFAULT_RELAY_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let n = tokio::select! {
            biased;
            _ = stop.cancelled() => return total,
            res = reader.read(&mut buf) => match res {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    debug!(error = %e, "relay read failed");
                    stop.cancel();
                    return total;
                }
            },
        };

        let write = async {
            writer.write_all(&buf[..n]).await?;
            if flush_each {
                writer.flush().await?;
            }
            Ok::<_, io::Error>(())
        };
        let written = tokio::select! {
            biased;
            _ = stop.cancelled() => return total,
            res = write => res,
        };
        if let Err(e) = written {
            debug!(error = %e, "relay write failed");
            stop.cancel();
            return total;
        }
        total += n as u64;
    }

    if let Err(e) = writer.shutdown().await {
        debug!(error = %e, "relay shutdown failed");
    }
    stop.cancel();
    total
}
