//! Single-slot latest-wins channel

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tracing::trace;

use crate::SendError;

/// Counters for a channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Frames handed to the sender
    pub sent: usize,
    /// Frames overwritten before the consumer took them
    pub dropped: usize,
    /// Frames delivered to the consumer
    pub received: usize,
}

struct Shared<T> {
    /// Pending frame, at most one
    slot: Mutex<Option<T>>,
    notify: Notify,
    sender_alive: AtomicBool,
    receiver_alive: AtomicBool,
    sent: AtomicUsize,
    dropped: AtomicUsize,
    received: AtomicUsize,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        // Slot contents stay valid even if a holder panicked
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take(&self) -> Option<T> {
        let frame = self.lock().take();
        if frame.is_some() {
            self.received.fetch_add(1, Ordering::Relaxed);
        }
        frame
    }

    fn stats(&self) -> ChannelStats {
        ChannelStats {
            sent: self.sent.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
        }
    }
}

/// Producer half
pub struct FrameSender<T> {
    shared: Arc<Shared<T>>,
}

/// Consumer half
pub struct FrameReceiver<T> {
    shared: Arc<Shared<T>>,
}

/// Create a connected sender/receiver pair
pub fn channel<T>() -> (FrameSender<T>, FrameReceiver<T>) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(None),
        notify: Notify::new(),
        sender_alive: AtomicBool::new(true),
        receiver_alive: AtomicBool::new(true),
        sent: AtomicUsize::new(0),
        dropped: AtomicUsize::new(0),
        received: AtomicUsize::new(0),
    });

    (
        FrameSender {
            shared: Arc::clone(&shared),
        },
        FrameReceiver { shared },
    )
}

impl<T> FrameSender<T> {
    /// Publish a frame, replacing any frame the consumer has not taken yet
    pub fn send(&self, frame: T) -> Result<(), SendError<T>> {
        if !self.shared.receiver_alive.load(Ordering::Acquire) {
            return Err(SendError(frame));
        }

        let replaced = self.shared.lock().replace(frame);
        self.shared.sent.fetch_add(1, Ordering::Relaxed);
        if replaced.is_some() {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            trace!("Dropped stale frame in favour of newest");
        }

        self.shared.notify.notify_one();
        Ok(())
    }

    /// True once the receiver has been dropped
    pub fn is_closed(&self) -> bool {
        !self.shared.receiver_alive.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> ChannelStats {
        self.shared.stats()
    }
}

impl<T> Drop for FrameSender<T> {
    fn drop(&mut self) {
        self.shared.sender_alive.store(false, Ordering::Release);
        self.shared.notify.notify_one();
    }
}

impl<T> FrameReceiver<T> {
    /// Wait for the newest frame. `None` once the sender is gone and the
    /// slot is empty.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            if let Some(frame) = self.shared.take() {
                return Some(frame);
            }
            if !self.shared.sender_alive.load(Ordering::Acquire) {
                // A frame may have landed between the take and the flag check
                return self.shared.take();
            }
            self.shared.notify.notified().await;
        }
    }

    /// Take the pending frame without waiting
    pub fn try_recv(&mut self) -> Option<T> {
        self.shared.take()
    }

    pub fn stats(&self) -> ChannelStats {
        self.shared.stats()
    }
}

impl<T> Drop for FrameReceiver<T> {
    fn drop(&mut self) {
        self.shared.receiver_alive.store(false, Ordering::Release);
    }
}
