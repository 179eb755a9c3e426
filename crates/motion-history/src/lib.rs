//! Motion History Store
//!
//! Keeps the most recent sample for every tracked identity so the next frame
//! can difference against it. Identities missing from a frame are evicted
//! immediately; there is no grace period and no interpolation across gaps.

mod store;

pub use store::{MotionHistory, MotionPrior, ObjectState, PreviousSample};
