//! In-flight action records.
//!
//! A [`PendingAction`] exists from the moment an action is admitted until it
//! completes, is cancelled, or fizzles. It is transient and never persisted.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::policy::VictimClass;
use crate::spell::ResourceCost;
use crate::timers::ActionKind;

/// Per-actor handle identifying one admitted action.
///
/// Handles are allocated from a monotonic counter on the actor's timeline and
/// are never reused, so a stale handle can be compared safely.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActionHandle(u64);

impl ActionHandle {
    /// Creates a handle from a raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "action#{}", self.0)
    }
}

/// Phase of an in-flight cast.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastPhase {
    /// Cursor shown, nothing spent. Cancelling is free.
    Targeting,
    /// Target confirmed, resources spent. Cancelling forfeits them.
    Committed,
}

/// One in-flight action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    handle: ActionHandle,
    kind: ActionKind,
    committed: ResourceCost,
    phase: Option<CastPhase>,
    replaced: Option<ActionHandle>,
    fizzled: bool,
}

impl PendingAction {
    /// Creates a pending action. Casts start in [`CastPhase::Targeting`].
    #[must_use]
    pub fn new(handle: ActionHandle, kind: ActionKind, committed: ResourceCost) -> Self {
        Self {
            handle,
            kind,
            committed,
            phase: (kind == ActionKind::Cast).then_some(CastPhase::Targeting),
            replaced: None,
            fizzled: false,
        }
    }

    /// Records the committed cast this targeting cast will displace once its
    /// own target is confirmed (builder pattern).
    #[must_use]
    pub fn replacing(mut self, replaced: Option<ActionHandle>) -> Self {
        self.replaced = replaced;
        self
    }

    /// Handle of this action.
    #[must_use]
    pub const fn handle(&self) -> ActionHandle {
        self.handle
    }

    /// Kind of this action.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        self.kind
    }

    /// Resources already spent on this action.
    #[must_use]
    pub const fn committed(&self) -> ResourceCost {
        self.committed
    }

    /// Cast phase, for casts.
    #[must_use]
    pub const fn phase(&self) -> Option<CastPhase> {
        self.phase
    }

    /// Committed cast that this one will fizzle when it commits.
    #[must_use]
    pub const fn replaced(&self) -> Option<ActionHandle> {
        self.replaced
    }

    /// Returns true once this action has fizzled.
    #[must_use]
    pub const fn has_fizzled(&self) -> bool {
        self.fizzled
    }

    /// Column of the cancellation table this action occupies.
    #[must_use]
    pub const fn victim_class(&self) -> VictimClass {
        match (self.kind, self.phase) {
            (ActionKind::Swing, _) => VictimClass::Swing,
            (ActionKind::Cast, Some(CastPhase::Committed)) => VictimClass::CastCommitted,
            (ActionKind::Cast, _) => VictimClass::CastTargeting,
            (ActionKind::Bandage, _) => VictimClass::Bandage,
            (ActionKind::WandUse, _) => VictimClass::WandUse,
        }
    }

    /// Moves a cast into its committed phase with the resources it spent.
    pub(crate) fn commit(&mut self, cost: ResourceCost) {
        self.phase = Some(CastPhase::Committed);
        self.committed = cost;
        self.replaced = None;
    }

    /// Marks this action fizzled. Returns false if it already was, so the
    /// forfeit is reported exactly once.
    pub(crate) fn fizzle(&mut self) -> bool {
        !std::mem::replace(&mut self.fizzled, true)
    }
}
