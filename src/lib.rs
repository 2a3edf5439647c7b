//! facewatch: live face-annotated MJPEG streaming
//!
//! A capture thread pulls frames from a [`capture::FrameSource`], finds and
//! labels faces with a [`recognition::Recognizer`], draws the annotations, and
//! publishes JPEG frames into a latest-wins [`broadcast::FrameBroadcaster`].
//! The [`server::StreamingServer`] streams those frames to any number of
//! browsers as `multipart/x-mixed-replace`.
//!
//! ```no_run
//! use std::sync::Arc;
//! use facewatch::app::{self, AppConfig};
//! use facewatch::capture::TestPatternSource;
//! use facewatch::recognition::{Gallery, NullRecognizer};
//!
//! # async fn example() -> facewatch::Result<()> {
//! let source = TestPatternSource::new(640, 480);
//! let shutdown = async {
//!     let _ = tokio::signal::ctrl_c().await;
//! };
//!
//! app::run(AppConfig::default(), source, Arc::new(NullRecognizer), Gallery::empty(), shutdown)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod annotate;
pub mod app;
pub mod broadcast;
pub mod capture;
pub mod error;
pub mod recognition;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
