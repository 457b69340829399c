//! Managed TCP connection carrying length-prefixed frames.
//!
//! The socket is wrapped in a [`Framed`] codec and split into a writer
//! task and a reader task. All outbound frames funnel through one mpsc
//! channel into the writer task, so concurrent senders can never
//! interleave bytes on the wire — the channel *is* the per-connection
//! write lock. The reader task forwards complete frames (or the first
//! terminal error) inward.
//!
//! Dropping the connection closes it gracefully: the writer drains
//! whatever is still queued, flushes, and sends FIN. [`shutdown`]
//! instead aborts: both tasks select on a [`CancellationToken`], so an
//! in-flight read or write is dropped rather than waited for and the
//! socket is released even against an unresponsive peer.
//!
//! [`shutdown`]: Connection::shutdown

use std::net::SocketAddr;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

use crate::error::CastError;
use crate::wire::WireCodec;

/// Default port for both sender target and receiver listener.
pub const DEFAULT_PORT: u16 = 5000;

/// Cloneable handle for queueing outbound frames on a connection.
pub type FrameSender = mpsc::Sender<Bytes>;

// ── ConnectionInfo ───────────────────────────────────────────────

/// Host/port pair identifying a peer to connect to.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    host: String,
    port: u16,
}

impl ConnectionInfo {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl std::fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ── Connection ───────────────────────────────────────────────────

/// One TCP frame-stream session.
#[derive(Debug)]
pub struct Connection {
    tx: FrameSender,
    rx: mpsc::Receiver<Result<Bytes, CastError>>,
    cancel: CancellationToken,
    peer: SocketAddr,
}

impl Connection {
    /// Wrap an established stream (e.g. from an acceptor).
    pub fn new(stream: TcpStream) -> Result<Self, CastError> {
        let peer = stream.peer_addr()?;
        let (mut frame_sink, mut frame_stream) = Framed::new(stream, WireCodec).split();
        let cancel = CancellationToken::new();

        // User -> network. A bounded queue applies backpressure when the
        // peer stops draining.
        let (user_tx, mut outbound_rx) = mpsc::channel::<Bytes>(64);

        // Network -> user.
        let (inbound_tx, user_rx) = mpsc::channel::<Result<Bytes, CastError>>(64);

        // Writer task: serializes all frame writes for this connection.
        let write_cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                let payload = tokio::select! {
                    _ = write_cancel.cancelled() => break,
                    next = outbound_rx.recv() => match next {
                        Some(p) => p,
                        None => {
                            // All senders dropped — flush and send FIN so
                            // the peer observes a graceful close.
                            let _ = frame_sink.close().await;
                            break;
                        }
                    },
                };
                let sent = tokio::select! {
                    _ = write_cancel.cancelled() => break,
                    res = frame_sink.send(payload) => res,
                };
                if let Err(e) = sent {
                    tracing::debug!("frame write failed: {e}");
                    write_cancel.cancel();
                    break;
                }
            }
        });

        // Reader task: forwards frames until EOF, error, or cancellation.
        let read_cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                let item = tokio::select! {
                    _ = read_cancel.cancelled() => break,
                    item = frame_stream.next() => item,
                };
                match item {
                    Some(Ok(frame)) => {
                        if inbound_tx.send(Ok(frame)).await.is_err() {
                            break; // receiver side gone
                        }
                    }
                    Some(Err(e)) => {
                        let _ = inbound_tx.send(Err(e)).await;
                        read_cancel.cancel();
                        break;
                    }
                    None => break, // clean EOF
                }
            }
        });

        Ok(Self {
            tx: user_tx,
            rx: user_rx,
            cancel,
            peer,
        })
    }

    /// Open a connection to `info`. Failure to establish the TCP
    /// session is a [`CastError::Connect`].
    pub async fn connect(info: &ConnectionInfo) -> Result<Self, CastError> {
        let stream = TcpStream::connect((info.host.as_str(), info.port))
            .await
            .map_err(CastError::Connect)?;
        Self::new(stream)
    }

    /// Queue one frame payload for transmission.
    pub async fn send(&self, payload: Bytes) -> Result<(), CastError> {
        self.tx.send(payload).await?;
        Ok(())
    }

    /// Cloneable sender handle. All clones share the write ordering of
    /// this connection.
    pub fn sender(&self) -> FrameSender {
        self.tx.clone()
    }

    /// Receive the next inbound frame.
    ///
    /// `None` means the peer closed the stream at a frame boundary
    /// (graceful disconnect). A `Some(Err(_))` is terminal: no further
    /// frames follow it.
    pub async fn recv(&mut self) -> Option<Result<Bytes, CastError>> {
        self.rx.recv().await
    }

    /// Abort the connection, unblocking any in-flight read or write.
    /// Idempotent.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Address of the remote peer.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

// ── Tests ────────────────────────────────────────────────────────
