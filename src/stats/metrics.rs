//! Statistics for streaming sessions and the capture loop

use std::time::{Duration, Instant};

use crate::broadcast::Generation;

/// Session-level statistics
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// Multipart parts written
    pub frames_sent: u64,
    /// Total bytes written, headers included
    pub bytes_sent: u64,
    /// Generations published but never delivered to this session
    pub frames_skipped: u64,
    /// When the session connected
    pub started_at: Instant,
}

impl SessionStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self {
            frames_sent: 0,
            bytes_sent: 0,
            frames_skipped: 0,
            started_at: Instant::now(),
        }
    }

    /// Record a delivered generation
    ///
    /// `previous` is the last generation this session delivered (0 if none).
    /// Gaps after the first delivery count as skipped frames.
    pub fn record_frame(&mut self, previous: Generation, delivered: Generation, bytes: usize) {
        self.frames_sent += 1;
        self.bytes_sent += bytes as u64;
        if previous > 0 {
            self.frames_skipped += delivered.saturating_sub(previous + 1);
        }
    }

    /// Time since the session connected
    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Delivered frames per second over the session lifetime
    pub fn delivered_fps(&self) -> f64 {
        let secs = self.duration().as_secs_f64();
        if secs > 0.0 {
            self.frames_sent as f64 / secs
        } else {
            0.0
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Capture loop statistics
#[derive(Debug, Clone)]
pub struct CaptureStats {
    /// Frames acquired from the source
    pub frames_captured: u64,
    /// Frames handed to the broadcaster
    pub frames_published: u64,
    /// Failed acquisitions (transient or fatal)
    pub capture_failures: u64,
    /// Frames whose recognition failed and went out unannotated
    pub detection_failures: u64,
    /// Frames dropped because encoding failed
    pub encode_failures: u64,
    /// Faces drawn
    pub faces_detected: u64,
    /// Faces that matched a gallery identity
    pub faces_recognized: u64,
    /// When the loop started
    pub started_at: Instant,
}

impl CaptureStats {
    pub fn new() -> Self {
        Self {
            frames_captured: 0,
            frames_published: 0,
            capture_failures: 0,
            detection_failures: 0,
            encode_failures: 0,
            faces_detected: 0,
            faces_recognized: 0,
            started_at: Instant::now(),
        }
    }

    /// Time since the loop started
    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Published frames per second over the loop lifetime
    pub fn published_fps(&self) -> f64 {
        let secs = self.duration().as_secs_f64();
        if secs > 0.0 {
            self.frames_published as f64 / secs
        } else {
            0.0
        }
    }
}

impl Default for CaptureStats {
    fn default() -> Self {
        Self::new()
    }
}
