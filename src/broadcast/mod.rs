//! Latest-wins frame broadcaster
//!
//! The broadcaster hands the most recently annotated frame from the single
//! producer (the capture loop) to any number of streaming sessions. It holds
//! exactly one frame; publishing replaces it and bumps the generation counter.
//!
//! # Architecture
//!
//! ```text
//!                   Arc<FrameBroadcaster>
//!               ┌──────────────────────────┐
//!               │ watch::Sender<Slot {     │
//!               │   generation,            │
//!               │   frame,                 │
//!               │   closed,                │
//!               │ }>                       │
//!               └────────────┬─────────────┘
//!                            │
//!      ┌─────────────────────┼─────────────────────┐
//!      │                     │                     │
//!      ▼                     ▼                     ▼
//! [CaptureLoop]         [Session]             [Session]
//!  publish()       wait_for_next(g)      wait_for_next(g)
//! ```
//!
//! Slow sessions never hold anything back: a session that falls behind simply
//! receives the newest generation the next time it asks, skipping the frames
//! it missed.
//!
//! # Zero-Copy Design
//!
//! `AnnotatedFrame` wraps its JPEG payload in `bytes::Bytes`, so handing the
//! same frame to every session only bumps a reference count.

pub mod error;
pub mod frame;
pub mod store;

pub use error::BroadcastError;
pub use frame::{AnnotatedFrame, Generation};
pub use store::{AttachGuard, FrameBroadcaster};
