//! facewatch - serve a face-annotated camera feed as MJPEG over HTTP
//!
//! Without a camera backend the binary streams a synthetic test pattern, or
//! replays still images with `--images DIR`.
//!
//! Usage:
//!   facewatch                          # test pattern on 0.0.0.0:8000
//!   facewatch --bind 127.0.0.1:8080    # custom address
//!   facewatch --images ./frames --fps 5
//!
//! View at http://localhost:8000/ in a browser.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use facewatch::app::{self, AppConfig};
use facewatch::capture::{CaptureConfig, FrameSource, ImageDirSource, TestPatternSource};
use facewatch::recognition::{Gallery, NullRecognizer};
use facewatch::server::ServerConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Live face-annotated MJPEG streaming server")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "FACEWATCH_BIND", default_value = "0.0.0.0:8000")]
    bind: SocketAddr,

    /// Frame rate cap for the capture loop
    #[arg(long, env = "FACEWATCH_FPS", default_value_t = 30.0)]
    fps: f64,

    /// Shrink factor applied before face detection
    #[arg(long, env = "FACEWATCH_DOWNSCALE", default_value_t = 4)]
    downscale: u32,

    /// JPEG quality of streamed frames (1-100)
    #[arg(long, env = "FACEWATCH_JPEG_QUALITY", default_value_t = 85)]
    jpeg_quality: u8,

    /// Replay images from this directory instead of the test pattern
    #[arg(long, env = "FACEWATCH_IMAGES")]
    images: Option<PathBuf>,

    /// Test pattern width
    #[arg(long, env = "FACEWATCH_WIDTH", default_value_t = 640)]
    width: u32,

    /// Test pattern height
    #[arg(long, env = "FACEWATCH_HEIGHT", default_value_t = 480)]
    height: u32,

    /// Maximum concurrent viewers (0 = unlimited)
    #[arg(long, env = "FACEWATCH_MAX_CONNECTIONS", default_value_t = 0)]
    max_connections: usize,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("facewatch=info")),
        )
        .init();

    let source: Box<dyn FrameSource> = match &args.images {
        Some(dir) => match ImageDirSource::open(dir) {
            Ok(source) => Box::new(source),
            Err(e) => {
                tracing::error!(dir = %dir.display(), error = %e, "Cannot open image directory");
                return ExitCode::FAILURE;
            }
        },
        None => Box::new(TestPatternSource::new(args.width, args.height)),
    };

    let config = AppConfig {
        server: ServerConfig::with_addr(args.bind).max_connections(args.max_connections),
        capture: CaptureConfig::default()
            .target_fps(args.fps)
            .downscale(args.downscale)
            .jpeg_quality(args.jpeg_quality),
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    match app::run(
        config,
        source,
        Arc::new(NullRecognizer),
        Gallery::empty(),
        shutdown,
    )
    .await
    {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "facewatch exited with error");
            ExitCode::FAILURE
        }
    }
}
