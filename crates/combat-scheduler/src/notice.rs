//! Side-effect notifications returned to the host.
//!
//! The core never plays animations, spends mana or applies damage. Every
//! operation instead returns an ordered list of [`Notice`]s that the caller
//! carries out against its own systems. Ordering within one call is
//! significant: cancellations of older actions come before anything the new
//! action starts.

use serde::{Deserialize, Serialize};

use crate::clock::Tick;
use crate::pending::{ActionHandle, CastPhase};
use crate::spell::{ResourceCost, SpellId, SpellSource};
use crate::timers::ActionKind;

/// Opaque reference to whatever the caller's target cursor selected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetRef(pub u64);

/// Why a cast ended without effect and without a fizzle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastFailure {
    /// The caller reported insufficient mana, reagents or charges at commit.
    InsufficientResources,
}

/// One side effect for the host to carry out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    /// An action stopped before committing anything. Stop its animation and
    /// close any cursor; no failure feedback.
    Cancelled {
        /// The stopped action.
        handle: ActionHandle,
        /// Its kind.
        kind: ActionKind,
        /// Cast phase at cancellation, for casts.
        phase: Option<CastPhase>,
    },
    /// An action stopped after committing resources. Play failure feedback;
    /// the resources stay spent.
    Fizzled {
        /// The stopped action.
        handle: ActionHandle,
        /// Its kind.
        kind: ActionKind,
        /// What was lost.
        forfeited: ResourceCost,
    },
    /// Deduct these resources now.
    DeductResources {
        /// Action paying the cost.
        handle: ActionHandle,
        /// Amount to deduct.
        cost: ResourceCost,
    },
    /// Show the target cursor for a cast.
    TargetCursorOpened {
        /// The cast.
        handle: ActionHandle,
        /// Spell being cast.
        spell: SpellId,
    },
    /// Start the cast animation and mantra.
    CastAnimationStarted {
        /// The cast.
        handle: ActionHandle,
        /// Spell being cast.
        spell: SpellId,
        /// Where it is cast from.
        source: SpellSource,
    },
    /// A cast ended without effect and without fizzle feedback.
    CastFailed {
        /// The cast.
        handle: ActionHandle,
        /// Spell being cast.
        spell: SpellId,
        /// Why it failed.
        reason: CastFailure,
    },
    /// The action will be resolvable at `at`.
    CompletionScheduled {
        /// The action.
        handle: ActionHandle,
        /// Its kind.
        kind: ActionKind,
        /// Earliest resolution time.
        at: Tick,
    },
    /// Apply the spell's effect. Emitted exactly once per completed cast.
    ApplyEffect {
        /// The cast.
        handle: ActionHandle,
        /// Spell to apply.
        spell: SpellId,
        /// Confirmed target.
        target: TargetRef,
        /// Where it was cast from.
        source: SpellSource,
    },
}

impl Notice {
    /// Handle of the action this notice concerns.
    #[must_use]
    pub const fn handle(&self) -> ActionHandle {
        match self {
            Self::Cancelled { handle, .. }
            | Self::Fizzled { handle, .. }
            | Self::DeductResources { handle, .. }
            | Self::TargetCursorOpened { handle, .. }
            | Self::CastAnimationStarted { handle, .. }
            | Self::CastFailed { handle, .. }
            | Self::CompletionScheduled { handle, .. }
            | Self::ApplyEffect { handle, .. } => *handle,
        }
    }

    /// Returns true for [`Notice::Fizzled`].
    #[must_use]
    pub const fn is_fizzle(&self) -> bool {
        matches!(self, Self::Fizzled { .. })
    }

    /// Returns true for [`Notice::Cancelled`].
    #[must_use]
    pub const fn is_silent_cancel(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
