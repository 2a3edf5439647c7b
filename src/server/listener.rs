//! Stream server listener
//!
//! Handles TCP accept loop and spawns connection handlers.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{Extension, Router};
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::service::TowerToHyperService;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::broadcast::FrameBroadcaster;
use crate::error::Result;
use crate::server::config::ServerConfig;
use crate::server::io::TimedStream;
use crate::server::routes::{self, AppState, Viewer};

/// Largest request head accepted; larger ones get `431`
pub const MAX_REQUEST_HEAD: usize = 8 * 1024;

/// Pause after a failed accept (e.g. out of file descriptors)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// MJPEG stream server
pub struct StreamingServer {
    config: ServerConfig,
    router: Router,
    next_session_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl StreamingServer {
    /// Create a new server serving frames from `broadcaster`
    pub fn new(config: ServerConfig, broadcaster: Arc<FrameBroadcaster>) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        let router = routes::router(AppState {
            broadcaster,
            index_page: Arc::clone(&config.index_page),
        });

        Self {
            config,
            router,
            next_session_id: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// Bind `addr` for [`serve`](Self::serve)
    pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "Stream server listening");
        Ok(listener)
    }

    /// Serve on an already bound listener
    ///
    /// This method blocks until the server is shut down.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        self.accept_loop(&listener).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve_until<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener) => result,
        }
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        // Generate session ID
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            session_id = session_id,
            peer = %peer_addr,
            "New connection"
        );

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(peer = %peer_addr, error = %e, "Failed to configure socket");
            return;
        }

        let viewer = Viewer {
            session_id,
            peer_addr,
        };
        let service = TowerToHyperService::new(self.router.clone().layer(Extension(viewer)));
        let io = TokioIo::new(TimedStream::new(socket, self.config.write_timeout));
        let builder = self.http1_builder();

        tokio::spawn(async move {
            let _permit = permit;

            if let Err(e) = builder.serve_connection(io, service).await {
                tracing::debug!(
                    session_id = session_id,
                    peer = %peer_addr,
                    error = %e,
                    "Connection error"
                );
            }

            tracing::debug!(session_id = session_id, peer = %peer_addr, "Connection closed");
        });
    }

    /// One request per connection; the viewer may half-close after sending it
    fn http1_builder(&self) -> http1::Builder {
        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .header_read_timeout(self.config.request_timeout)
            .max_buf_size(MAX_REQUEST_HEAD)
            .keep_alive(false)
            .half_close(true);
        builder
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }
}
