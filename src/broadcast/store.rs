//! Frame broadcaster implementation
//!
//! A single-slot, latest-wins channel built on `tokio::sync::watch`. The
//! producer replaces the slot; consumers wait for a generation newer than the
//! one they last delivered.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use super::error::BroadcastError;
use super::frame::{AnnotatedFrame, Generation};

/// Contents of the shared slot
#[derive(Debug, Default)]
struct Slot {
    generation: Generation,
    frame: Option<AnnotatedFrame>,
    closed: bool,
}

/// Publishes the latest annotated frame to any number of waiting sessions
///
/// `publish` never blocks on consumers. Waiters are woken on every publish and
/// on `close`; each one only returns when it finds a generation newer than the
/// one it asked about, so a consumer never sees a generation twice or out of
/// order.
pub struct FrameBroadcaster {
    tx: watch::Sender<Slot>,
    subscriber_count: Arc<AtomicU32>,
}

impl FrameBroadcaster {
    /// Create an empty broadcaster at generation 0
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Slot::default());

        Self {
            tx,
            subscriber_count: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Replace the current frame and wake every waiter
    ///
    /// Returns the generation assigned to the frame, or `Closed` if the
    /// broadcaster has been closed (the frame is dropped).
    pub fn publish(&self, frame: AnnotatedFrame) -> Result<Generation, BroadcastError> {
        let mut published = None;

        self.tx.send_if_modified(|slot| {
            if slot.closed {
                return false;
            }
            slot.generation += 1;
            slot.frame = Some(frame);
            published = Some(slot.generation);
            true
        });

        published.ok_or(BroadcastError::Closed)
    }

    /// Wait for a frame newer than `last_seen`
    ///
    /// Returns immediately if one is already available. If the broadcaster is
    /// closed and nothing newer exists, returns `Closed`.
    pub async fn wait_for_next(
        &self,
        last_seen: Generation,
    ) -> Result<(AnnotatedFrame, Generation), BroadcastError> {
        let mut rx = self.tx.subscribe();

        let slot = rx
            .wait_for(|slot| slot.closed || slot.generation > last_seen)
            .await
            .map_err(|_| BroadcastError::Closed)?;

        match &slot.frame {
            Some(frame) if slot.generation > last_seen => Ok((frame.clone(), slot.generation)),
            _ => Err(BroadcastError::Closed),
        }
    }

    /// Get the current frame without waiting
    pub fn latest(&self) -> Option<(AnnotatedFrame, Generation)> {
        let slot = self.tx.borrow();
        let generation = slot.generation;
        slot.frame.clone().map(|frame| (frame, generation))
    }

    /// Current generation (0 if nothing has been published)
    pub fn generation(&self) -> Generation {
        self.tx.borrow().generation
    }

    /// Stop accepting frames and wake every waiter
    ///
    /// Waiters that already have a newer frame available still receive it.
    pub fn close(&self) {
        self.tx.send_if_modified(|slot| {
            if slot.closed {
                return false;
            }
            slot.closed = true;
            true
        });
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.tx.borrow().closed
    }

    /// Resolve once the broadcaster is closed
    pub async fn closed(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|slot| slot.closed).await;
    }

    /// Register a streaming session; the count drops when the guard does
    pub fn attach(&self) -> AttachGuard {
        let count = self.subscriber_count.fetch_add(1, Ordering::Relaxed) + 1;

        tracing::info!(subscribers = count, "Subscriber attached");

        AttachGuard {
            count: Arc::clone(&self.subscriber_count),
        }
    }

    /// Number of attached streaming sessions
    pub fn subscriber_count(&self) -> u32 {
        self.subscriber_count.load(Ordering::Relaxed)
    }
}

impl Default for FrameBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps a session counted as attached while alive
#[derive(Debug)]
pub struct AttachGuard {
    count: Arc<AtomicU32>,
}

impl Drop for AttachGuard {
    fn drop(&mut self) {
        let prev = self.count.fetch_sub(1, Ordering::Relaxed);

        tracing::debug!(subscribers = prev.saturating_sub(1), "Subscriber detached");
    }
}
