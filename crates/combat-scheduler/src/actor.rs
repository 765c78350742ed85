//! Actor identity and the read-only status channel consumed from the host.
//!
//! The scheduler never owns actors. It only needs:
//! - [`ActorId`]: a stable identity for logging and registry keys
//! - [`ActorStatus`]: a read channel to the actor's current condition and
//!   casting skill, implemented by the host's actor type
//!
//! # Example
//!
//! ```
//! use combat_scheduler::actor::{ActorCondition, ActorId, ActorStatus};
//!
//! let id = ActorId::new(7);
//! assert_eq!(id.as_u64(), 7);
//!
//! // `ActorCondition` is itself a minimal status source (skill 0).
//! assert_eq!(ActorCondition::Paralyzed.condition(), ActorCondition::Paralyzed);
//! assert_eq!(ActorCondition::Free.casting_skill(), 0);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an actor.
///
/// Actor IDs are assigned by the host and must be unique within one
/// [`ActorRegistry`](crate::registry::ActorRegistry). Ordering follows the numeric
/// value, which the registry relies on for deterministic iteration.
///
/// # Example
///
/// ```
/// use combat_scheduler::actor::ActorId;
///
/// let a = ActorId::new(1);
/// let b = ActorId::from(2);
///
/// assert!(a < b);
/// assert_eq!(b.to_string(), "2");
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(u64);

impl ActorId {
    /// Creates a new `ActorId` from a raw `u64` value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` value of this identifier.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorId({})", self.0)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ActorId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<ActorId> for u64 {
    fn from(id: ActorId) -> Self {
        id.0
    }
}

/// Actor state reported by external collaborators that can veto all actions.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorCondition {
    /// Nothing prevents the actor from acting.
    #[default]
    Free,
    /// Frozen in place (e.g. by a staff command or a trap).
    Frozen,
    /// Paralyzed by a spell or effect.
    Paralyzed,
}

impl fmt::Display for ActorCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => write!(f, "Free"),
            Self::Frozen => write!(f, "Frozen"),
            Self::Paralyzed => write!(f, "Paralyzed"),
        }
    }
}

/// Read-only view of an actor's current stats, supplied by the host.
///
/// Implementations must be cheap: the scheduler queries them on every
/// action attempt and never caches the answers.
pub trait ActorStatus {
    /// Current condition of the actor.
    fn condition(&self) -> ActorCondition;

    /// Casting skill on a 0-100 scale. Values above 100 are clamped.
    fn casting_skill(&self) -> u32 {
        0
    }
}

impl ActorStatus for ActorCondition {
    fn condition(&self) -> ActorCondition {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_id_ordering_follows_value() {
        let mut ids = vec![ActorId::new(3), ActorId::new(1), ActorId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![ActorId::new(1), ActorId::new(2), ActorId::new(3)]);
    }

    #[test]
    fn actor_id_round_trips_through_u64() {
        let id = ActorId::from(99);
        assert_eq!(u64::from(id), 99);
        assert_eq!(format!("{id:?}"), "ActorId(99)");
    }

    #[test]
    fn condition_is_a_status_source() {
        let status = ActorCondition::Frozen;
        assert_eq!(status.condition(), ActorCondition::Frozen);
        assert_eq!(status.casting_skill(), 0);
    }
}
