//! Broadcaster error types

use thiserror::Error;

/// Error type for broadcaster operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BroadcastError {
    /// The producer is gone and no newer frame will ever be published
    #[error("frame broadcaster closed")]
    Closed,
}
