//! Server - TCP front end of the broker.
//!
//! One request per connection: accept, drain the request, run it through the
//! broker, write exactly one reply, close.
//!
//! # Concurrency
//! Every accepted connection runs in its own task on a `JoinSet`. The broker
//! sits behind one async mutex, so requests are applied one at a time while
//! connection I/O overlaps. On shutdown the accept loop stops and in-flight
//! connections are awaited.
//!
//! # Reading a request
//! - EOF or a newline ends the request.
//! - So does a read that stays idle for `read_idle_timeout`.
//! - A failed read ends it with the bytes received so far.
//! - More than `max_request_bytes` is answered with `ERR` once the peer has
//!   finished sending.
//!
//! # Listener
//! Bound through `TcpSocket` with `SO_REUSEADDR` and the configured backlog.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinSet;

use super::{Broker, BrokerConfig};
use crate::domain::ProtocolError;
use crate::protocol::Reply;

const READ_CHUNK: usize = 1024;

/// When to stop reading a request.
#[derive(Debug, Clone, Copy)]
struct ReadLimits {
    idle_timeout: Duration,
    max_bytes: usize,
}

pub struct Server {
    listener: TcpListener,
    broker: Arc<Mutex<Broker>>,
    limits: ReadLimits,
}

impl Server {
    /// Bind the listener with the configured backlog.
    pub async fn bind(config: &BrokerConfig, broker: Broker) -> io::Result<Self> {
        let listen_addr = config.listen_addr();
        let addr = tokio::net::lookup_host(&listen_addr)
            .await?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("cannot resolve {listen_addr}"),
                )
            })?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        let listener = socket.listen(config.backlog)?;

        tracing::info!(
            addr = %listener.local_addr()?,
            backlog = config.backlog,
            task_timeout_secs = broker.task_timeout().as_secs(),
            "listening"
        );

        Ok(Self {
            listener,
            broker: Arc::new(Mutex::new(broker)),
            limits: ReadLimits {
                idle_timeout: config.read_idle_timeout,
                max_bytes: config.max_request_bytes,
            },
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` turns true (or its sender is
    /// dropped), then wait for in-flight requests.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut connections = JoinSet::new();

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let broker = Arc::clone(&self.broker);
                        let limits = self.limits;
                        connections.spawn(handle_connection(stream, peer, broker, limits));
                    }
                    Err(err) => tracing::warn!(error = %err, "accept failed"),
                },
            }

            while connections.try_join_next().is_some() {}
        }

        tracing::info!(in_flight = connections.len(), "shutting down");
        while connections.join_next().await.is_some() {}
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    broker: Arc<Mutex<Broker>>,
    limits: ReadLimits,
) {
    let reply = match read_request(&mut stream, limits).await {
        Ok(request) => {
            tracing::debug!(%peer, bytes = request.len(), "request received");
            let mut broker = broker.lock().await;
            broker.handle_request(&request).await
        }
        Err(err) => {
            tracing::warn!(%peer, error = %err, "request rejected");
            Reply::Error(err.to_string()).encode()
        }
    };

    tracing::debug!(%peer, reply = %String::from_utf8_lossy(&reply), "sending reply");
    if let Err(err) = stream.write_all(&reply).await {
        tracing::warn!(%peer, error = %err, "failed to write reply");
        return;
    }
    if let Err(err) = stream.shutdown().await {
        tracing::debug!(%peer, error = %err, "failed to close connection");
    }
}

/// Drain one request.
///
/// Stops at EOF, at a newline, when no data arrives within the idle timeout,
/// or on a read error. In every case the bytes received so far are the
/// request. Past `max_bytes` the rest of the input is read and dropped, so the
/// `ERR` reply is not lost to a reset from unread data.
async fn read_request<R>(reader: &mut R, limits: ReadLimits) -> Result<Vec<u8>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut request = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let Ok(read) = tokio::time::timeout(limits.idle_timeout, reader.read(&mut chunk)).await
        else {
            break; // nothing more to read right now
        };

        match read {
            Ok(0) => break,
            Ok(n) => {
                request.extend_from_slice(&chunk[..n]);
                if request.len() > limits.max_bytes {
                    discard_rest(reader, limits.idle_timeout, &mut chunk).await;
                    return Err(ProtocolError::TooLarge {
                        limit: limits.max_bytes,
                    });
                }
                if chunk[..n].contains(&b'\n') {
                    break;
                }
            }
            Err(err) => {
                tracing::debug!(error = %err, "read failed, using what was received");
                break;
            }
        }
    }

    Ok(request)
}

/// Read until EOF, an idle timeout or a read error.
async fn discard_rest<R>(reader: &mut R, idle_timeout: Duration, chunk: &mut [u8])
where
    R: AsyncRead + Unpin,
{
    let mut dropped = 0usize;
    while let Ok(Ok(n)) = tokio::time::timeout(idle_timeout, reader.read(chunk)).await {
        if n == 0 {
            break;
        }
        dropped = dropped.saturating_add(n);
    }
    tracing::debug!(dropped, "discarded oversized request");
}
