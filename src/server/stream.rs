//! MJPEG response body
//!
//! Each viewer gets its own body stream holding only its session state. The
//! stream waits on the broadcaster for a generation newer than the last one it
//! sent and yields it as one multipart part. When hyper stops polling (the
//! viewer went away or a write failed) the stream is dropped, which detaches
//! the viewer and logs its statistics.

use std::convert::Infallible;
use std::sync::Arc;

use async_stream::stream;
use axum::body::Body;
use bytes::{BufMut, Bytes, BytesMut};

use crate::broadcast::{AnnotatedFrame, AttachGuard, BroadcastError, FrameBroadcaster};
use crate::session::SessionState;

/// Multipart boundary token
pub const BOUNDARY: &str = "FRAME";

/// One multipart part carrying a JPEG frame
pub fn encode_part(frame: &AnnotatedFrame) -> Bytes {
    let header = format!(
        "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        BOUNDARY,
        frame.len()
    );

    let mut out = BytesMut::with_capacity(header.len() + frame.len() + 2);
    out.put_slice(header.as_bytes());
    out.put_slice(&frame.data);
    out.put_slice(b"\r\n");
    out.freeze()
}

/// Attached viewer; logs its statistics when the body is dropped
struct ViewerSession {
    state: SessionState,
    _attached: AttachGuard,
}

impl Drop for ViewerSession {
    fn drop(&mut self) {
        self.state.close();
        let stats = &self.state.stats;

        tracing::debug!(
            session_id = self.state.id,
            peer = %self.state.peer_addr,
            frames = stats.frames_sent,
            bytes = stats.bytes_sent,
            skipped = stats.frames_skipped,
            fps = stats.delivered_fps(),
            duration_ms = self.state.duration().as_millis() as u64,
            "Viewer disconnected"
        );
    }
}

/// Body of endless parts, one per newly published generation
///
/// Ends when the broadcaster closes.
pub fn mjpeg_body(broadcaster: Arc<FrameBroadcaster>, mut state: SessionState) -> Body {
    Body::from_stream(stream! {
        state.attach();
        let mut session = ViewerSession {
            _attached: broadcaster.attach(),
            state,
        };

        tracing::info!(
            session_id = session.state.id,
            peer = %session.state.peer_addr,
            "Viewer attached to stream"
        );

        loop {
            match broadcaster.wait_for_next(session.state.last_generation).await {
                Ok((frame, generation)) => {
                    let part = encode_part(&frame);
                    session.state.on_frame_sent(generation, part.len());
                    yield Ok::<_, Infallible>(part);
                }
                Err(BroadcastError::Closed) => {
                    tracing::debug!(
                        session_id = session.state.id,
                        peer = %session.state.peer_addr,
                        "Broadcaster closed, ending stream"
                    );
                    break;
                }
            }
        }
    })
}
