//! Latest-Frame Channel
//!
//! Single-slot hand-off from a producer to one consumer. Sending never
//! blocks: a frame still waiting in the slot is dropped and replaced by the
//! newest one, so stale frames never accumulate behind a slow consumer.

mod slot;

pub use slot::{channel, ChannelStats, FrameReceiver, FrameSender};

use thiserror::Error;

/// Returned by [`FrameSender::send`] when the receiver is gone
#[derive(Error, Debug, PartialEq, Eq)]
#[error("frame receiver dropped")]
pub struct SendError<T>(pub T);
