//! Application wiring
//!
//! Starts the capture thread and the stream server over a shared
//! broadcaster, then tears both down when either side finishes.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::broadcast::FrameBroadcaster;
use crate::capture::{CaptureConfig, CaptureLoop, FrameSource};
use crate::error::{Error, Result};
use crate::recognition::{Gallery, Recognizer};
use crate::server::{ServerConfig, StreamingServer};
use crate::stats::CaptureStats;

/// Combined configuration for a running instance
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub capture: CaptureConfig,
}

/// Bind the configured address and run until `shutdown` or capture loss
///
/// Returns the capture statistics on a clean stop and the capture error if
/// the camera was lost.
pub async fn run<S, R, F>(
    config: AppConfig,
    source: S,
    recognizer: Arc<R>,
    gallery: Gallery,
    shutdown: F,
) -> Result<CaptureStats>
where
    S: FrameSource + 'static,
    R: Recognizer + ?Sized + 'static,
    F: Future<Output = ()>,
{
    let listener = StreamingServer::bind(config.server.bind_addr).await?;

    serve(listener, config, source, recognizer, gallery, shutdown).await
}

/// Like [`run`], on an already bound listener
pub async fn serve<S, R, F>(
    listener: TcpListener,
    config: AppConfig,
    source: S,
    recognizer: Arc<R>,
    gallery: Gallery,
    shutdown: F,
) -> Result<CaptureStats>
where
    S: FrameSource + 'static,
    R: Recognizer + ?Sized + 'static,
    F: Future<Output = ()>,
{
    let broadcaster = Arc::new(FrameBroadcaster::new());

    let capture = CaptureLoop::new(
        config.capture,
        source,
        recognizer,
        gallery,
        Arc::clone(&broadcaster),
    )
    .spawn()?;

    let server = StreamingServer::new(config.server, Arc::clone(&broadcaster));

    let stop = async {
        tokio::select! {
            _ = shutdown => {}
            _ = broadcaster.closed() => {
                tracing::warn!("Frame source stopped, shutting down server");
            }
        }
    };

    let served = server.serve_until(listener, stop).await;

    capture.stop();
    broadcaster.close();

    let joined = tokio::task::spawn_blocking(move || capture.join())
        .await
        .map_err(|_| Error::CaptureThreadPanicked)?;

    served?;

    let stats = joined.inspect_err(|e| tracing::error!(error = %e, "Capture failed"))?;

    tracing::info!(
        captured = stats.frames_captured,
        published = stats.frames_published,
        failures = stats.capture_failures,
        fps = stats.published_fps(),
        "Stopped"
    );

    Ok(stats)
}
