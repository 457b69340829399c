//! Inbound connection acceptor.
//!
//! Binds the listen port and spawns one independent [`ViewSession`] per
//! accepted connection, so multiple peers can stream concurrently with
//! separate framing state. The accept loop only ends when the server is
//! cancelled; a failed accept or a failed session never takes it down.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::connection::Connection;
use crate::error::CastError;
use crate::receiver::ViewSession;
use crate::recorder::RecordingController;
use crate::sink::{Renderer, StatusSink};

// ── ViewerServer ─────────────────────────────────────────────────

/// Accepts frame streams and supervises their receive sessions.
///
/// All sessions share one [`RecordingController`], one [`Renderer`]
/// and one [`StatusSink`] — the recorder's lifecycle is independent of
/// any single connection.
pub struct ViewerServer {
    listener: TcpListener,
    recorder: Arc<RecordingController>,
    renderer: Arc<dyn Renderer>,
    status: Arc<dyn StatusSink>,
    cancel: CancellationToken,
}

impl ViewerServer {
    /// Bind `addr` and prepare to accept streams.
    pub async fn bind(
        addr: SocketAddr,
        recorder: Arc<RecordingController>,
        renderer: Arc<dyn Renderer>,
        status: Arc<dyn StatusSink>,
    ) -> Result<Self, CastError> {
        let listener = TcpListener::bind(addr).await.map_err(CastError::Connect)?;
        Ok(Self {
            listener,
            recorder,
            renderer,
            status,
            cancel: CancellationToken::new(),
        })
    }

    /// The actual bound address (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, CastError> {
        Ok(self.listener.local_addr()?)
    }

    /// Token that shuts the server down when cancelled.
    pub fn stop_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Shared recording controller.
    pub fn recorder(&self) -> Arc<RecordingController> {
        Arc::clone(&self.recorder)
    }

    /// Accept connections until cancelled, then wind down every live
    /// session before returning.
    pub async fn run(self) -> Result<(), CastError> {
        let mut sessions: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        self.status.report(&format!("{peer} connected"));
                        match Connection::new(stream) {
                            Ok(conn) => {
                                let session = ViewSession::new(
                                    conn,
                                    Arc::clone(&self.recorder),
                                    Arc::clone(&self.renderer),
                                    Arc::clone(&self.status),
                                    self.cancel.child_token(),
                                );
                                sessions.spawn(async move {
                                    if let Err(e) = session.run().await {
                                        tracing::debug!("session for {peer} ended: {e}");
                                    }
                                });
                            }
                            Err(e) => tracing::warn!("failed to wrap {peer}: {e}"),
                        }
                    }
                    Err(e) => {
                        tracing::warn!("accept error: {e}");
                        continue;
                    }
                },
                Some(_) = sessions.join_next(), if !sessions.is_empty() => {
                    // Reap finished sessions as they end.
                }
            }
        }

        // Child tokens are cancelled with ours; sessions exit on their
        // own and are joined for a deterministic shutdown.
        while sessions.join_next().await.is_some() {}
        self.status.report("viewer server stopped");
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecordingConfig;
    use crate::sink::NullRenderer;
    use std::sync::Mutex;

    struct TestStatus(Mutex<Vec<String>>);

    impl StatusSink for TestStatus {
        fn report(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    async fn test_server() -> (ViewerServer, Arc<TestStatus>) {
        let status = Arc::new(TestStatus(Mutex::new(Vec::new())));
        let recorder = Arc::new(RecordingController::new(
            RecordingConfig::default(),
            status.clone(),
        ));
        let server = ViewerServer::bind(
            "127.0.0.1:0".parse().unwrap(),
            recorder,
            Arc::new(NullRenderer),
            status.clone(),
        )
        .await
        .unwrap();
        (server, status)
    }

    #[tokio::test]
    async fn bind_reports_local_addr() {
        let (server, _) = test_server().await;
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn accepts_multiple_peers_and_stops_cleanly() {
        let (server, status) = test_server().await;
        let addr = server.local_addr().unwrap();
        let stop = server.stop_handle();
        let handle = tokio::spawn(server.run());

        let a = tokio::net::TcpStream::connect(addr).await.unwrap();
        let b = tokio::net::TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        assert_eq!(
            status
                .0
                .lock()
                .unwrap()
                .iter()
                .filter(|m| m.contains("connected"))
                .count(),
            2
        );

        stop.cancel();
        handle.await.unwrap().unwrap();
        drop((a, b));
    }

    #[tokio::test]
    async fn bind_failure_is_connect_error() {
        let (server, _) = test_server().await;
        let addr = server.local_addr().unwrap();
        let status = Arc::new(TestStatus(Mutex::new(Vec::new())));
        let recorder = Arc::new(RecordingController::new(
            RecordingConfig::default(),
            status.clone(),
        ));

        // Second bind on the same port must fail as ConnectError.
        let result = ViewerServer::bind(
            addr,
            recorder,
            Arc::new(NullRenderer),
            status,
        )
        .await;
        assert!(matches!(result, Err(CastError::Connect(_))));
        drop(server);
    }
}
