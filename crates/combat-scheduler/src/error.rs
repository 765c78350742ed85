//! Error types.
//!
//! Denials (timer not elapsed, actor frozen) are ordinary return values and
//! never appear here. [`SchedulerError`] is reserved for caller bugs such as
//! reporting a completion twice, and [`ConfigError`] for bad configuration
//! documents.

use crate::actor::ActorId;
use crate::pending::ActionHandle;
use crate::policy::VictimClass;
use crate::spell::SpellId;
use crate::timers::ActionKind;

/// How an error should be handled by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    /// The call was malformed for the current state. The actor's timeline has
    /// been reset when strict invariants are off.
    Validation,
    /// The host's bookkeeping (registry or spell catalog) disagrees with the
    /// request. Nothing was changed.
    Internal,
}

impl ErrorSeverity {
    /// Returns a short label for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }
}

/// Invariant violations reported by the scheduler.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// `complete` was called for a kind with nothing in flight.
    #[error("actor {actor}: no pending {kind:?} action to complete")]
    NoPendingAction {
        /// Offending actor.
        actor: ActorId,
        /// Kind reported complete.
        kind: ActionKind,
    },

    /// `complete` was called for a cast.
    #[error("actor {actor}: completions of casts are reported through tick, not complete")]
    UseTickForCast {
        /// Offending actor.
        actor: ActorId,
    },

    /// `tick` was called with no cast in flight.
    #[error("actor {actor}: no cast in flight")]
    NoActiveCast {
        /// Offending actor.
        actor: ActorId,
    },

    /// `confirm_target` was called with no cast in the targeting phase.
    #[error("actor {actor}: no cast is waiting for a target")]
    NotTargeting {
        /// Offending actor.
        actor: ActorId,
    },

    /// `confirm_target` arrived before a pre-target delay elapsed.
    #[error("actor {actor}: target cursor for {handle} has not opened yet")]
    CursorNotOpen {
        /// Offending actor.
        actor: ActorId,
        /// The cast still in its pre-target delay.
        handle: ActionHandle,
    },

    /// The spell catalog has no definition for the requested spell.
    #[error("actor {actor}: unknown spell {spell}")]
    UnknownSpell {
        /// Actor that asked for the spell.
        actor: ActorId,
        /// The missing spell.
        spell: SpellId,
    },

    /// The registry has no timeline for the actor.
    #[error("actor {actor} is not registered")]
    UnknownActor {
        /// The unknown actor.
        actor: ActorId,
    },
}

impl SchedulerError {
    /// Classifies the error.
    #[must_use]
    pub const fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnknownActor { .. } | Self::UnknownSpell { .. } => ErrorSeverity::Internal,
            _ => ErrorSeverity::Validation,
        }
    }

    /// Actor the error refers to.
    #[must_use]
    pub const fn actor(&self) -> ActorId {
        match self {
            Self::NoPendingAction { actor, .. }
            | Self::UseTickForCast { actor }
            | Self::NoActiveCast { actor }
            | Self::NotTargeting { actor }
            | Self::CursorNotOpen { actor, .. }
            | Self::UnknownSpell { actor, .. }
            | Self::UnknownActor { actor } => *actor,
        }
    }
}

/// Errors loading or validating a [`SchedulerConfig`](crate::config::SchedulerConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The document is not valid JSON for the config schema.
    #[error("failed to parse scheduler config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Reduction percentage above 100.
    #[error("max_cast_reduction_pct must be at most 100 (got {0})")]
    ReductionOutOfRange(u32),

    /// Two overrides target the same table cell.
    #[error("duplicate cancellation override for {initiator:?} -> {victim:?}")]
    DuplicateOverride {
        /// Row of the duplicated cell.
        initiator: ActionKind,
        /// Column of the duplicated cell.
        victim: VictimClass,
    },
}
