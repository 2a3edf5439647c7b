//! Session state machine
//!
//! Tracks one viewer connection from accept to disconnect.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::broadcast::Generation;
use crate::stats::SessionStats;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// TCP connected, request not yet read
    Connected,
    /// Request routed to the stream and the multipart head sent
    Streaming,
    /// Session closed
    Closed,
}

/// Complete session state
#[derive(Debug)]
pub struct SessionState {
    /// Unique session ID
    pub id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Current phase
    pub phase: SessionPhase,

    /// Connection start time
    pub connected_at: Instant,

    /// Last generation written to this viewer (0 = none yet)
    pub last_generation: Generation,

    /// Delivery counters
    pub stats: SessionStats,
}

impl SessionState {
    /// Create a new session state
    pub fn new(id: u64, peer_addr: SocketAddr) -> Self {
        Self {
            id,
            peer_addr,
            phase: SessionPhase::Connected,
            connected_at: Instant::now(),
            last_generation: 0,
            stats: SessionStats::new(),
        }
    }

    /// Enter the streaming phase
    pub fn attach(&mut self) {
        if self.phase == SessionPhase::Connected {
            self.phase = SessionPhase::Streaming;
        }
    }

    /// Whether the session is receiving frames
    pub fn is_attached(&self) -> bool {
        self.phase == SessionPhase::Streaming
    }

    /// Record that `generation` was written in a part of `bytes` bytes
    pub fn on_frame_sent(&mut self, generation: Generation, bytes: usize) {
        self.stats
            .record_frame(self.last_generation, generation, bytes);
        self.last_generation = generation;
    }

    /// Get session duration
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Close the session
    pub fn close(&mut self) {
        self.phase = SessionPhase::Closed;
    }
}
