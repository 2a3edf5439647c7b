//! HTTP server for the viewer page and the MJPEG stream
//!
//! Three resources are served:
//! - `/` redirects to `/index.html`
//! - `/index.html` is a small page embedding the stream
//! - `/stream.mjpg` is a `multipart/x-mixed-replace` response carrying one
//!   JPEG per published frame
//!
//! The accept loop hands every connection to its own hyper task running the
//! axum router. A slow viewer only ever delays itself; it skips ahead to the
//! latest frame when it catches up.

pub mod config;
pub mod io;
pub mod listener;
pub mod page;
pub mod routes;
pub mod stream;

pub use config::ServerConfig;
pub use listener::{StreamingServer, MAX_REQUEST_HEAD};
pub use page::INDEX_PAGE;
pub use routes::{INDEX_PATH, ROOT_PATH, STREAM_PATH};
pub use stream::BOUNDARY;
