//! Per-identity state store

use risk_engine::{BoundingBox, Position3D, Sample, TrackId, Velocity};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// State kept for one tracked identity
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectState {
    /// Last bounding box
    pub bbox: BoundingBox,

    /// Last estimated position
    pub position: Position3D,

    /// Timestamp of the last sample (ms)
    pub timestamp_ms: u64,

    /// Last velocity computed from two samples
    pub velocity: Option<Velocity>,
}

/// Previous-frame observation of an identity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviousSample {
    pub position: Position3D,
    pub bbox: BoundingBox,
    pub timestamp_ms: u64,
}

impl PreviousSample {
    /// Position/timestamp pair for velocity estimation
    pub fn sample(&self) -> Sample {
        Sample::new(self.position, self.timestamp_ms)
    }
}

/// What the store knows about an identity before the current frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionPrior {
    /// Never seen, or evicted
    NoHistory,

    /// Seen before with a computed velocity
    WithVelocity {
        previous: PreviousSample,
        velocity: Velocity,
    },

    /// Seen exactly once so far (or only with unusable timestamps)
    WithoutVelocity { previous: PreviousSample },
}

impl MotionPrior {
    pub fn previous(&self) -> Option<PreviousSample> {
        match self {
            MotionPrior::NoHistory => None,
            MotionPrior::WithVelocity { previous, .. } => Some(*previous),
            MotionPrior::WithoutVelocity { previous } => Some(*previous),
        }
    }

    /// Last known velocity, used when no fresh estimate is possible
    pub fn velocity(&self) -> Option<Velocity> {
        match self {
            MotionPrior::WithVelocity { velocity, .. } => Some(*velocity),
            _ => None,
        }
    }
}

/// Motion history keyed by track identity.
///
/// Mutations for one frame must be serialized by the owner; the store itself
/// holds no lock.
#[derive(Debug, Default)]
pub struct MotionHistory {
    states: HashMap<TrackId, ObjectState>,
}

impl MotionHistory {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Previous position, box and timestamp for an identity
    pub fn get_previous(&self, id: TrackId) -> Option<PreviousSample> {
        self.states.get(&id).map(|state| PreviousSample {
            position: state.position,
            bbox: state.bbox,
            timestamp_ms: state.timestamp_ms,
        })
    }

    /// Tri-state view of the identity's history
    pub fn prior(&self, id: TrackId) -> MotionPrior {
        let Some(previous) = self.get_previous(id) else {
            return MotionPrior::NoHistory;
        };

        match self.states.get(&id).and_then(|s| s.velocity) {
            Some(velocity) => MotionPrior::WithVelocity { previous, velocity },
            None => MotionPrior::WithoutVelocity { previous },
        }
    }

    /// Full state for an identity
    pub fn get(&self, id: TrackId) -> Option<&ObjectState> {
        self.states.get(&id)
    }

    /// Record the current sample, replacing any previous one.
    ///
    /// The last computed velocity is carried over; replace it with
    /// [`MotionHistory::set_velocity`].
    pub fn update(&mut self, id: TrackId, bbox: BoundingBox, position: Position3D, timestamp_ms: u64) {
        let velocity = self.states.get(&id).and_then(|s| s.velocity);
        self.states.insert(
            id,
            ObjectState {
                bbox,
                position,
                timestamp_ms,
                velocity,
            },
        );
    }

    /// Store a freshly computed velocity. Returns false for unknown identities.
    pub fn set_velocity(&mut self, id: TrackId, velocity: Velocity) -> bool {
        match self.states.get_mut(&id) {
            Some(state) => {
                state.velocity = Some(velocity);
                true
            }
            None => false,
        }
    }

    /// Evict every identity not seen this frame. Returns the eviction count.
    pub fn retain(&mut self, current: &HashSet<TrackId>) -> usize {
        let before = self.states.len();
        self.states.retain(|id, _| {
            let keep = current.contains(id);
            if !keep {
                debug!("Evicting track {}", id);
            }
            keep
        });
        before - self.states.len()
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.states.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Identities currently held
    pub fn ids(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.states.keys().copied()
    }

    /// Drop all history (e.g. on stream restart)
    pub fn clear(&mut self) {
        self.states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bbox() -> BoundingBox {
        BoundingBox::new(100.0, 100.0, 280.0, 200.0)
    }

    fn ids(raw: &[u64]) -> HashSet<TrackId> {
        raw.iter().copied().map(TrackId).collect()
    }

    #[test]
    fn test_unknown_identity_has_no_history() {
        let history = MotionHistory::new();
        assert_eq!(history.get_previous(TrackId(1)), None);
        assert_eq!(history.prior(TrackId(1)), MotionPrior::NoHistory);
    }

    #[test]
    fn test_update_and_get_previous() {
        let mut history = MotionHistory::new();
        let pos = Position3D::new(1.0, 0.5, 10.0);
        history.update(TrackId(3), bbox(), pos, 1000);

        let prev = history.get_previous(TrackId(3)).unwrap();
        assert_eq!(prev.position, pos);
        assert_eq!(prev.bbox, bbox());
        assert_eq!(prev.timestamp_ms, 1000);
        assert_eq!(prev.sample(), Sample::new(pos, 1000));
        assert!(matches!(history.prior(TrackId(3)), MotionPrior::WithoutVelocity { .. }));
    }

    #[test]
    fn test_update_overwrites_sample_and_keeps_velocity() {
        let mut history = MotionHistory::new();
        let id = TrackId(9);
        let v = Velocity::new(0.0, 0.0, -4.0);

        history.update(id, bbox(), Position3D::new(0.0, 0.0, 20.0), 0);
        assert!(history.set_velocity(id, v));
        history.update(id, bbox(), Position3D::new(0.0, 0.0, 19.0), 250);

        let state = history.get(id).unwrap();
        assert_eq!(state.position.z, 19.0);
        assert_eq!(state.timestamp_ms, 250);
        assert_eq!(history.prior(id).velocity(), Some(v));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_set_velocity_requires_entry() {
        let mut history = MotionHistory::new();
        assert!(!history.set_velocity(TrackId(1), Velocity::ZERO));
        assert!(history.is_empty());
    }

    #[test]
    fn test_retain_evicts_missing() {
        let mut history = MotionHistory::new();
        for id in 1..=4 {
            history.update(TrackId(id), bbox(), Position3D::new(0.0, 0.0, 10.0), 0);
        }

        let evicted = history.retain(&ids(&[2, 4, 7]));
        assert_eq!(evicted, 2);
        assert!(history.contains(TrackId(2)));
        assert!(history.contains(TrackId(4)));
        assert!(!history.contains(TrackId(1)));
        assert!(!history.contains(TrackId(7)));
    }

    #[test]
    fn test_retain_empty_clears_everything() {
        let mut history = MotionHistory::new();
        history.update(TrackId(5), bbox(), Position3D::new(0.0, 0.0, 10.0), 0);
        history.set_velocity(TrackId(5), Velocity::new(1.0, 0.0, 0.0));

        history.retain(&HashSet::new());
        assert_eq!(history.get_previous(TrackId(5)), None);
        assert_eq!(history.prior(TrackId(5)), MotionPrior::NoHistory);
        assert!(history.is_empty());
    }

    proptest! {
        #[test]
        fn prop_retain_keeps_only_current(
            stored in proptest::collection::hash_set(0u64..50, 0..20),
            current in proptest::collection::hash_set(0u64..50, 0..20),
        ) {
            let mut history = MotionHistory::new();
            for id in &stored {
                history.update(TrackId(*id), bbox(), Position3D::new(0.0, 0.0, 5.0), 0);
            }

            let current: HashSet<TrackId> = current.into_iter().map(TrackId).collect();
            history.retain(&current);

            for id in history.ids() {
                prop_assert!(current.contains(&id));
            }
            let expected = stored.iter().filter(|id| current.contains(&TrackId(**id))).count();
            prop_assert_eq!(history.len(), expected);
        }
    }
}
