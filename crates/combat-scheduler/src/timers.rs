//! Per-actor action deadlines and in-flight flags.
//!
//! [`ActionTimerSet`] is pure data: four absolute deadlines (one per
//! [`ActionKind`]) plus the [`ActionFlags`] describing what is in flight.
//! It never fails and never calls out. Only the scheduler and the cast
//! sequence hold it mutably; hosts read it through
//! [`ActorTimeline::timers`](crate::scheduler::ActorTimeline::timers).
//!
//! # Readiness
//!
//! A timer at or before `now` means the action is permitted, subject to the
//! flag rules in [`ReadinessRules`]. Timers never re-arm on their own: once
//! ready, a kind stays ready until something sets its deadline again.
//!
//! # Example
//!
//! ```
//! use combat_scheduler::clock::Tick;
//! use combat_scheduler::timers::{ActionKind, ActionTimerSet, ReadinessRules};
//!
//! let mut timers = ActionTimerSet::new();
//! let rules = ReadinessRules::default();
//!
//! assert!(timers.is_ready(ActionKind::Swing, Tick::new(0), rules));
//!
//! timers.set_next(ActionKind::Swing, Tick::new(1_000), 2_500);
//! assert!(!timers.is_ready(ActionKind::Swing, Tick::new(3_499), rules));
//! assert!(timers.is_ready(ActionKind::Swing, Tick::new(3_500), rules));
//! ```

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::clock::Tick;
use crate::pending::{ActionHandle, CastPhase};

/// The four kinds of timed combat action.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Melee or ranged weapon swing.
    Swing,
    /// Spell cast.
    Cast,
    /// Bandage application.
    Bandage,
    /// Wand use.
    WandUse,
}

impl ActionKind {
    /// Every kind, in table order.
    pub const ALL: [Self; 4] = [Self::Swing, Self::Cast, Self::Bandage, Self::WandUse];

    /// Dense index used for per-kind arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Swing => 0,
            Self::Cast => 1,
            Self::Bandage => 2,
            Self::WandUse => 3,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Swing => write!(f, "Swing"),
            Self::Cast => write!(f, "Cast"),
            Self::Bandage => write!(f, "Bandage"),
            Self::WandUse => write!(f, "WandUse"),
        }
    }
}

bitflags! {
    /// In-flight state of an actor.
    ///
    /// `CASTING` (targeting phase) and `POST_TARGET_DELAY` (committed phase)
    /// are never set together.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ActionFlags: u8 {
        /// A spell is waiting for its target.
        const CASTING           = 1 << 0;
        /// A spell has its target and is in its committed delay.
        const POST_TARGET_DELAY = 1 << 1;
        /// A swing has been admitted and not yet landed.
        const PENDING_SWING     = 1 << 2;
        /// A bandage is being applied.
        const BANDAGING         = 1 << 3;
    }
}

/// Flag-based readiness constraints, derived from the configuration.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ReadinessRules {
    /// Swings are not ready while any cast phase is active.
    pub swing_blocked_during_cast: bool,
}

/// Persistable view of an [`ActionTimerSet`].
///
/// Hosts that save actor state must keep at least these eight values.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    /// Next permitted swing.
    pub next_swing: Tick,
    /// Next permitted cast.
    pub next_spell: Tick,
    /// Next permitted bandage.
    pub next_bandage: Tick,
    /// Next permitted wand use.
    pub next_wand: Tick,
    /// In-flight flags at snapshot time.
    pub flags: ActionFlags,
}

/// Per-actor deadlines and in-flight flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionTimerSet {
    next: [Tick; 4],
    flags: ActionFlags,
    active_spell: Option<ActionHandle>,
}

impl ActionTimerSet {
    /// Creates a set with every timer elapsed and no flags.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `kind` may begin at `now`.
    #[must_use]
    pub fn is_ready(&self, kind: ActionKind, now: Tick, rules: ReadinessRules) -> bool {
        if self.next[kind.index()] > now {
            return false;
        }
        let gated = kind == ActionKind::Swing && rules.swing_blocked_during_cast;
        !(gated && self.cast_phase().is_some())
    }

    /// Deadline for `kind`.
    #[must_use]
    pub fn next_time(&self, kind: ActionKind) -> Tick {
        self.next[kind.index()]
    }

    /// Sets the deadline for `kind` to `now + delay_ms`.
    ///
    /// The delay is not validated; zero or negative means ready immediately.
    pub fn set_next(&mut self, kind: ActionKind, now: Tick, delay_ms: i64) {
        self.next[kind.index()] = now.offset(delay_ms);
    }

    /// Pushes the deadline for `kind` out to `at` if it is earlier.
    pub(crate) fn raise_to(&mut self, kind: ActionKind, at: Tick) {
        let slot = &mut self.next[kind.index()];
        if *slot < at {
            *slot = at;
        }
    }

    /// Clears every timer and flag. Used on death, logout and forced recovery.
    pub fn reset_all(&mut self) {
        *self = Self::default();
    }

    /// Current flags.
    #[must_use]
    pub const fn flags(&self) -> ActionFlags {
        self.flags
    }

    /// A spell is in its targeting phase.
    #[must_use]
    pub const fn is_casting(&self) -> bool {
        self.flags.contains(ActionFlags::CASTING)
    }

    /// A spell is in its committed (post-target) phase.
    #[must_use]
    pub const fn is_in_post_target_delay(&self) -> bool {
        self.flags.contains(ActionFlags::POST_TARGET_DELAY)
    }

    /// A swing is in flight.
    #[must_use]
    pub const fn has_pending_swing(&self) -> bool {
        self.flags.contains(ActionFlags::PENDING_SWING)
    }

    /// A bandage is in flight.
    #[must_use]
    pub const fn is_bandaging(&self) -> bool {
        self.flags.contains(ActionFlags::BANDAGING)
    }

    /// Phase of the foreground spell, if any.
    #[must_use]
    pub const fn cast_phase(&self) -> Option<CastPhase> {
        if self.is_casting() {
            Some(CastPhase::Targeting)
        } else if self.is_in_post_target_delay() {
            Some(CastPhase::Committed)
        } else {
            None
        }
    }

    /// Handle of the foreground spell. For queries only; the cast sequence
    /// owns the spell's lifecycle.
    #[must_use]
    pub const fn active_spell(&self) -> Option<ActionHandle> {
        self.active_spell
    }

    /// Sets the foreground cast phase. Clearing one phase flag and setting the
    /// other happen together, so both can never read true.
    pub(crate) fn set_cast_phase(&mut self, phase: Option<(CastPhase, ActionHandle)>) {
        self.flags
            .remove(ActionFlags::CASTING | ActionFlags::POST_TARGET_DELAY);
        self.active_spell = None;
        if let Some((phase, handle)) = phase {
            self.flags.insert(match phase {
                CastPhase::Targeting => ActionFlags::CASTING,
                CastPhase::Committed => ActionFlags::POST_TARGET_DELAY,
            });
            self.active_spell = Some(handle);
        }
    }

    /// Sets or clears the in-flight flag owned by a non-cast kind.
    pub(crate) fn set_in_flight(&mut self, kind: ActionKind, value: bool) {
        let flag = match kind {
            ActionKind::Swing => ActionFlags::PENDING_SWING,
            ActionKind::Bandage => ActionFlags::BANDAGING,
            ActionKind::Cast | ActionKind::WandUse => return,
        };
        self.flags.set(flag, value);
    }

    /// Captures timers and flags for persistence.
    #[must_use]
    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            next_swing: self.next_time(ActionKind::Swing),
            next_spell: self.next_time(ActionKind::Cast),
            next_bandage: self.next_time(ActionKind::Bandage),
            next_wand: self.next_time(ActionKind::WandUse),
            flags: self.flags,
        }
    }

    /// Rebuilds a set from a snapshot, deadlines only.
    ///
    /// In-flight actions are transient and are not restored, so the flags in
    /// the snapshot are dropped rather than left without a backing action.
    #[must_use]
    pub fn from_snapshot(snapshot: &TimerSnapshot) -> Self {
        Self {
            next: [
                snapshot.next_swing,
                snapshot.next_spell,
                snapshot.next_bandage,
                snapshot.next_wand,
            ],
            flags: ActionFlags::empty(),
            active_spell: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPEN: ReadinessRules = ReadinessRules {
        swing_blocked_during_cast: false,
    };
    const GATED: ReadinessRules = ReadinessRules {
        swing_blocked_during_cast: true,
    };

    mod readiness_tests {
        use super::*;

        #[test]
        fn fresh_set_is_ready_for_everything() {
            let timers = ActionTimerSet::new();
            for kind in ActionKind::ALL {
                assert!(timers.is_ready(kind, Tick::ZERO, OPEN), "{kind} not ready");
            }
        }

        #[test]
        fn deadline_equal_to_now_is_ready() {
            let mut timers = ActionTimerSet::new();
            timers.set_next(ActionKind::Bandage, Tick::new(100), 50);
            assert!(!timers.is_ready(ActionKind::Bandage, Tick::new(149), OPEN));
            assert!(timers.is_ready(ActionKind::Bandage, Tick::new(150), OPEN));
        }

        #[test]
        fn negative_delay_is_ready_immediately() {
            let mut timers = ActionTimerSet::new();
            timers.set_next(ActionKind::WandUse, Tick::new(100), -20);
            assert!(timers.is_ready(ActionKind::WandUse, Tick::new(100), OPEN));
        }

        #[test]
        fn timers_are_independent() {
            let mut timers = ActionTimerSet::new();
            timers.set_next(ActionKind::Swing, Tick::ZERO, 1_000);
            assert!(!timers.is_ready(ActionKind::Swing, Tick::new(10), OPEN));
            assert!(timers.is_ready(ActionKind::Cast, Tick::new(10), OPEN));
            assert!(timers.is_ready(ActionKind::Bandage, Tick::new(10), OPEN));
        }

        #[test]
        fn swing_gate_applies_only_when_configured() {
            let mut timers = ActionTimerSet::new();
            timers.set_cast_phase(Some((CastPhase::Targeting, ActionHandle::new(1))));

            assert!(timers.is_ready(ActionKind::Swing, Tick::ZERO, OPEN));
            assert!(!timers.is_ready(ActionKind::Swing, Tick::ZERO, GATED));
            assert!(timers.is_ready(ActionKind::Bandage, Tick::ZERO, GATED));
        }
    }

    mod flag_tests {
        use super::*;

        #[test]
        fn cast_phase_flags_are_exclusive() {
            let mut timers = ActionTimerSet::new();
            timers.set_cast_phase(Some((CastPhase::Targeting, ActionHandle::new(1))));
            assert!(timers.is_casting());
            assert!(!timers.is_in_post_target_delay());

            timers.set_cast_phase(Some((CastPhase::Committed, ActionHandle::new(1))));
            assert!(!timers.is_casting());
            assert!(timers.is_in_post_target_delay());
            assert_eq!(timers.active_spell(), Some(ActionHandle::new(1)));

            timers.set_cast_phase(None);
            assert_eq!(timers.cast_phase(), None);
            assert_eq!(timers.active_spell(), None);
        }

        #[test]
        fn in_flight_flags_track_swing_and_bandage() {
            let mut timers = ActionTimerSet::new();
            timers.set_in_flight(ActionKind::Swing, true);
            timers.set_in_flight(ActionKind::Bandage, true);
            assert!(timers.has_pending_swing());
            assert!(timers.is_bandaging());

            timers.set_in_flight(ActionKind::Swing, false);
            assert!(!timers.has_pending_swing());
            assert!(timers.is_bandaging());
        }

        #[test]
        fn reset_clears_everything() {
            let mut timers = ActionTimerSet::new();
            timers.set_next(ActionKind::Cast, Tick::new(500), 500);
            timers.set_in_flight(ActionKind::Swing, true);
            timers.set_cast_phase(Some((CastPhase::Committed, ActionHandle::new(3))));

            timers.reset_all();

            assert_eq!(timers, ActionTimerSet::new());
        }

        #[test]
        fn raise_to_never_lowers() {
            let mut timers = ActionTimerSet::new();
            timers.set_next(ActionKind::Cast, Tick::ZERO, 1_000);
            timers.raise_to(ActionKind::Cast, Tick::new(400));
            assert_eq!(timers.next_time(ActionKind::Cast), Tick::new(1_000));
            timers.raise_to(ActionKind::Cast, Tick::new(1_400));
            assert_eq!(timers.next_time(ActionKind::Cast), Tick::new(1_400));
        }
    }

    mod snapshot_tests {
        use super::*;

        #[test]
        fn snapshot_captures_four_timers_and_flags() {
            let mut timers = ActionTimerSet::new();
            timers.set_next(ActionKind::Swing, Tick::ZERO, 1);
            timers.set_next(ActionKind::Cast, Tick::ZERO, 2);
            timers.set_next(ActionKind::Bandage, Tick::ZERO, 3);
            timers.set_next(ActionKind::WandUse, Tick::ZERO, 4);
            timers.set_in_flight(ActionKind::Bandage, true);

            let snap = timers.snapshot();
            assert_eq!(snap.next_swing, Tick::new(1));
            assert_eq!(snap.next_spell, Tick::new(2));
            assert_eq!(snap.next_bandage, Tick::new(3));
            assert_eq!(snap.next_wand, Tick::new(4));
            assert_eq!(snap.flags, ActionFlags::BANDAGING);
        }

        #[test]
        fn restore_keeps_deadlines_and_drops_flags() {
            let mut timers = ActionTimerSet::new();
            timers.set_next(ActionKind::Cast, Tick::new(10), 90);
            timers.set_in_flight(ActionKind::Swing, true);

            let json = serde_json::to_string(&timers.snapshot()).unwrap();
            let snap: TimerSnapshot = serde_json::from_str(&json).unwrap();
            let restored = ActionTimerSet::from_snapshot(&snap);

            assert_eq!(restored.next_time(ActionKind::Cast), Tick::new(100));
            assert!(restored.flags().is_empty());
        }
    }
}
