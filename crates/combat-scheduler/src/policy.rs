//! Cancellation rule table.
//!
//! [`CancellationPolicy`] maps (action being started, action in flight) to a
//! [`CancelOutcome`]. The table is total: every cell of
//! [`ActionKind`] x [`VictimClass`] holds an explicit outcome, and cells with
//! no interaction hold [`CancelOutcome::NoEffect`].
//!
//! Casts split into two columns. A cast still showing its cursor has spent
//! nothing and is cancelled for free; a cast whose target is confirmed has
//! spent its resources, and cancelling it forfeits them.
//!
//! | initiator \ victim | Swing  | Cast (targeting) | Cast (committed) | Bandage | WandUse |
//! |--------------------|--------|------------------|------------------|---------|---------|
//! | Cast               | Silent | none             | none             | none    | none    |
//! | Swing              | none   | Silent           | Fizzle           | none    | none    |
//! | Bandage            | Silent | Silent           | Fizzle           | none    | none    |
//! | WandUse            | Silent | Silent           | Fizzle           | none    | none    |
//!
//! Cast-on-cast interaction is handled by the cast sequence itself (a new cast
//! displaces a targeting one and fizzles a committed one only when its own
//! target is confirmed), so those cells are `NoEffect` here.
//!
//! # Example
//!
//! ```
//! use combat_scheduler::policy::{CancelOutcome, CancellationPolicy, VictimClass};
//! use combat_scheduler::timers::ActionKind;
//!
//! let policy = CancellationPolicy::standard();
//! assert_eq!(
//!     policy.resolve(ActionKind::Bandage, VictimClass::CastCommitted),
//!     CancelOutcome::CancelWithFizzle
//! );
//! assert_eq!(
//!     policy.resolve(ActionKind::Cast, VictimClass::Bandage),
//!     CancelOutcome::NoEffect
//! );
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::SchedulerConfig;
use crate::pending::PendingAction;
use crate::timers::ActionKind;

/// What happens to an in-flight action when another begins.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CancelOutcome {
    /// Stop it with no feedback and no forfeit.
    CancelSilently,
    /// Stop it, forfeit its committed resources and play failure feedback.
    CancelWithFizzle,
    /// Leave it running.
    NoEffect,
}

impl CancelOutcome {
    /// Returns true if the victim stops.
    #[must_use]
    pub const fn cancels(self) -> bool {
        !matches!(self, Self::NoEffect)
    }
}

impl fmt::Display for CancelOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CancelSilently => write!(f, "CancelSilently"),
            Self::CancelWithFizzle => write!(f, "CancelWithFizzle"),
            Self::NoEffect => write!(f, "NoEffect"),
        }
    }
}

/// Column of the cancellation table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VictimClass {
    /// An admitted swing.
    Swing,
    /// A cast showing its target cursor.
    CastTargeting,
    /// A cast past target confirmation.
    CastCommitted,
    /// A bandage being applied.
    Bandage,
    /// A wand being used.
    WandUse,
}

impl VictimClass {
    /// Every column, in table order.
    pub const ALL: [Self; 5] = [
        Self::Swing,
        Self::CastTargeting,
        Self::CastCommitted,
        Self::Bandage,
        Self::WandUse,
    ];

    const fn index(self) -> usize {
        match self {
            Self::Swing => 0,
            Self::CastTargeting => 1,
            Self::CastCommitted => 2,
            Self::Bandage => 3,
            Self::WandUse => 4,
        }
    }
}

use CancelOutcome::{CancelSilently as S, CancelWithFizzle as F, NoEffect as N};

/// Rows follow [`ActionKind::index`], columns follow [`VictimClass::ALL`].
const STANDARD: [[CancelOutcome; 5]; 4] = [
    // Swing begins
    [N, S, F, N, N],
    // Cast begins
    [S, N, N, N, N],
    // Bandage begins
    [S, S, F, N, N],
    // WandUse begins
    [S, S, F, N, N],
];

/// Stateless lookup from (initiator, victim) to outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationPolicy {
    table: [[CancelOutcome; 5]; 4],
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

impl CancellationPolicy {
    /// The canonical rule table.
    #[must_use]
    pub const fn standard() -> Self {
        Self { table: STANDARD }
    }

    /// The canonical table with the configuration's overrides applied.
    #[must_use]
    pub fn from_config(config: &SchedulerConfig) -> Self {
        let mut policy = Self::standard();
        for rule in &config.cancellation_overrides {
            policy.table[rule.initiator.index()][rule.victim.index()] = rule.outcome;
        }
        policy
    }

    /// Outcome when `initiator` begins while `victim` is in flight.
    #[must_use]
    pub const fn resolve(&self, initiator: ActionKind, victim: VictimClass) -> CancelOutcome {
        self.table[initiator.index()][victim.index()]
    }

    /// Outcome when `initiator` begins while `pending` is in flight.
    #[must_use]
    pub const fn resolve_against(
        &self,
        initiator: ActionKind,
        pending: &PendingAction,
    ) -> CancelOutcome {
        self.resolve(initiator, pending.victim_class())
    }
}
