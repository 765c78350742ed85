//! Action admission, completion and interruption.
//!
//! [`ActionScheduler`] is the single entry point for combat actions. It owns no
//! actor state: every call takes the actor's [`ActorTimeline`] by mutable
//! reference, so one scheduler can serve any number of actors and calls for
//! different actors never contend.
//!
//! # Admission
//!
//! [`ActionScheduler::try_begin`] checks, in order:
//!
//! 1. the actor's condition (frozen and paralyzed actors are denied),
//! 2. the timer for the requested kind, plus "already in flight" for kinds
//!    that cannot overlap themselves,
//!
//! then applies the [`CancellationPolicy`] to everything in flight and starts
//! the new action. Denials are ordinary return values and change nothing.
//!
//! # Invariant violations
//!
//! Calls that contradict the timeline (completing an action that is not in
//! flight, confirming a target with no cast targeting) are host bugs. With
//! [`SchedulerConfig::strict_invariants`] they panic. Otherwise they are logged,
//! the actor's timeline is reset to a known-good state and the error is
//! returned.
//!
//! # Example
//!
//! ```
//! use combat_scheduler::actor::{ActorCondition, ActorId};
//! use combat_scheduler::clock::Tick;
//! use combat_scheduler::scheduler::{ActionRequest, ActionScheduler, ActorTimeline};
//! use combat_scheduler::timers::ActionKind;
//!
//! let scheduler = ActionScheduler::default();
//! let mut timeline = ActorTimeline::new(ActorId::new(1));
//!
//! let status = ActorCondition::Free;
//! let result = scheduler.try_begin(&mut timeline, &status, ActionRequest::Swing, Tick::ZERO);
//! assert!(result.is_admitted());
//!
//! scheduler.complete(&mut timeline, ActionKind::Swing, Tick::new(100), 2_000).unwrap();
//! assert_eq!(timeline.timers().next_time(ActionKind::Swing), Tick::new(2_100));
//! ```

use std::sync::Arc;

use tracing::{debug, warn};

use crate::actor::{ActorCondition, ActorId, ActorStatus};
use crate::cast::{CastContext, CastSequence, ResourceCheck};
use crate::clock::Tick;
use crate::config::{InterruptReason, SchedulerConfig, TimingMode};
use crate::error::SchedulerError;
use crate::notice::{Notice, TargetRef};
use crate::pending::{ActionHandle, PendingAction};
use crate::policy::{CancelOutcome, CancellationPolicy};
use crate::spell::{ResourceCost, SpellCatalog, SpellId, SpellMeta, SpellSource};
use crate::timers::{ActionKind, ActionTimerSet, TimerSnapshot};

// ============================================================================
// Requests and results
// ============================================================================

/// An action an actor is attempting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionRequest<'a> {
    /// A melee or ranged swing.
    Swing,
    /// Announce a spell.
    Cast {
        /// Spell being cast.
        spell: &'a SpellMeta,
        /// Spellbook, scroll or wand.
        source: SpellSource,
    },
    /// Apply a bandage.
    Bandage,
    /// Use a wand's charge effect directly.
    WandUse,
}

impl ActionRequest<'_> {
    /// Timer this request is gated by.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Swing => ActionKind::Swing,
            Self::Cast { .. } => ActionKind::Cast,
            Self::Bandage => ActionKind::Bandage,
            Self::WandUse => ActionKind::WandUse,
        }
    }
}

/// Why an attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenyReason {
    /// The timer for this kind has not elapsed, or one is already in flight.
    NotReady,
    /// The actor is frozen.
    Frozen,
    /// The actor is paralyzed.
    Paralyzed,
    /// For hosts that check resources before calling. The scheduler never
    /// produces this itself.
    InsufficientResource,
}

/// A successful admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    action: PendingAction,
    notices: Vec<Notice>,
}

impl Admission {
    pub(crate) fn new(action: PendingAction, notices: Vec<Notice>) -> Self {
        Self { action, notices }
    }

    /// The admitted action.
    #[must_use]
    pub fn action(&self) -> &PendingAction {
        &self.action
    }

    /// Side effects, cancellations of older actions first.
    #[must_use]
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Handles of the in-flight actions this admission stopped.
    pub fn cancelled(&self) -> impl Iterator<Item = ActionHandle> + '_ {
        self.notices
            .iter()
            .filter(|n| n.is_silent_cancel() || n.is_fizzle())
            .map(Notice::handle)
    }

    /// Consumes the admission, returning its notices.
    #[must_use]
    pub fn into_notices(self) -> Vec<Notice> {
        self.notices
    }
}

/// Result of [`ActionScheduler::try_begin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmitResult {
    /// The action started.
    Admitted(Admission),
    /// The action was refused; nothing changed.
    Denied(DenyReason),
}

impl AdmitResult {
    /// Returns true if the action started.
    #[must_use]
    pub const fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted(_))
    }

    /// The admission, if any.
    #[must_use]
    pub const fn admission(&self) -> Option<&Admission> {
        match self {
            Self::Admitted(admission) => Some(admission),
            Self::Denied(_) => None,
        }
    }

    /// The denial reason, if any.
    #[must_use]
    pub const fn denial(&self) -> Option<DenyReason> {
        match self {
            Self::Admitted(_) => None,
            Self::Denied(reason) => Some(*reason),
        }
    }
}

/// Result of an interrupt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterruptOutcome {
    /// True if something fizzled as a result of this call.
    pub did_fizzle: bool,
    /// Side effects of the interrupt.
    pub notices: Vec<Notice>,
}

impl InterruptOutcome {
    fn merge(&mut self, other: Self) {
        self.did_fizzle |= other.did_fizzle;
        self.notices.extend(other.notices);
    }
}

// ============================================================================
// Per-actor state
// ============================================================================

/// Everything the scheduler tracks for one actor.
///
/// Created on the actor's first combat action. Only the scheduler mutates it;
/// callers get read-only views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorTimeline {
    actor: ActorId,
    timers: ActionTimerSet,
    swing: Option<PendingAction>,
    bandage: Option<PendingAction>,
    wand: Option<PendingAction>,
    cast: CastSequence,
    next_handle: u64,
}

impl ActorTimeline {
    /// Creates an idle timeline with every timer elapsed.
    #[must_use]
    pub fn new(actor: ActorId) -> Self {
        Self {
            actor,
            timers: ActionTimerSet::new(),
            swing: None,
            bandage: None,
            wand: None,
            cast: CastSequence::new(),
            next_handle: 1,
        }
    }

    /// Restores deadlines from a snapshot. Nothing is in flight afterwards.
    #[must_use]
    pub fn restore(actor: ActorId, snapshot: &TimerSnapshot) -> Self {
        Self {
            timers: ActionTimerSet::from_snapshot(snapshot),
            ..Self::new(actor)
        }
    }

    /// The actor this timeline belongs to.
    #[must_use]
    pub const fn actor(&self) -> ActorId {
        self.actor
    }

    /// Read-only view of the timers and flags.
    #[must_use]
    pub const fn timers(&self) -> &ActionTimerSet {
        &self.timers
    }

    /// Read-only view of the cast sequence.
    #[must_use]
    pub const fn cast(&self) -> &CastSequence {
        &self.cast
    }

    /// In-flight action of `kind`. For casts, the foreground spell.
    #[must_use]
    pub fn pending(&self, kind: ActionKind) -> Option<&PendingAction> {
        match kind {
            ActionKind::Swing => self.swing.as_ref(),
            ActionKind::Cast => self.cast.foreground(),
            ActionKind::Bandage => self.bandage.as_ref(),
            ActionKind::WandUse => self.wand.as_ref(),
        }
    }

    /// Every in-flight action, including a committed cast running behind a
    /// targeting one.
    pub fn in_flight(&self) -> impl Iterator<Item = &PendingAction> {
        self.swing
            .iter()
            .chain(self.cast.targeting())
            .chain(self.cast.committed())
            .chain(self.bandage.iter())
            .chain(self.wand.iter())
    }

    /// Returns true if nothing is in flight.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.in_flight().next().is_none()
    }

    /// Captures the deadlines for persistence.
    #[must_use]
    pub fn snapshot(&self) -> TimerSnapshot {
        self.timers.snapshot()
    }

    /// Drops every in-flight action and clears every timer.
    ///
    /// Used on death, logout and recovery from a violated invariant. Handles
    /// keep counting up, so nothing issued before the reset is reused.
    pub fn reset_all(&mut self) {
        self.timers.reset_all();
        self.swing = None;
        self.bandage = None;
        self.wand = None;
        self.cast.reset();
    }

    fn next_handle(&mut self) -> ActionHandle {
        let handle = ActionHandle::new(self.next_handle);
        self.next_handle += 1;
        handle
    }

    /// Slot for kinds that cannot overlap themselves. Casts have none.
    fn slot_mut(&mut self, kind: ActionKind) -> Option<&mut Option<PendingAction>> {
        match kind {
            ActionKind::Swing => Some(&mut self.swing),
            ActionKind::Bandage => Some(&mut self.bandage),
            ActionKind::WandUse => Some(&mut self.wand),
            ActionKind::Cast => None,
        }
    }

    fn context<'a>(&self, config: &'a SchedulerConfig, now: Tick) -> CastContext<'a> {
        CastContext {
            actor: self.actor,
            config,
            now,
        }
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Admits, completes and interrupts actions against per-actor timelines.
#[derive(Debug, Clone)]
pub struct ActionScheduler {
    config: Arc<SchedulerConfig>,
    policy: CancellationPolicy,
}

impl Default for ActionScheduler {
    fn default() -> Self {
        Self::new(Arc::new(SchedulerConfig::default()))
    }
}

impl ActionScheduler {
    /// Creates a scheduler reading `config` on every call.
    #[must_use]
    pub fn new(config: Arc<SchedulerConfig>) -> Self {
        let policy = CancellationPolicy::from_config(&config);
        Self { config, policy }
    }

    /// Current configuration snapshot.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Cancellation table in effect.
    #[must_use]
    pub const fn policy(&self) -> &CancellationPolicy {
        &self.policy
    }

    /// Returns true if `kind` may begin at `now`.
    #[must_use]
    pub fn is_ready(&self, timeline: &ActorTimeline, kind: ActionKind, now: Tick) -> bool {
        timeline.timers.is_ready(kind, now, self.config.readiness())
    }

    /// Returns false while a committed cast roots the caster.
    #[must_use]
    pub fn can_move(&self, timeline: &ActorTimeline) -> bool {
        !timeline.cast.blocks_movement(&self.config)
    }

    /// Attempts to start an action.
    ///
    /// On admission, in-flight actions are cancelled according to the
    /// cancellation table and the returned notices list those cancellations
    /// before anything the new action starts. The caster's skill for cast
    /// delay reduction comes from [`ActorStatus::casting_skill`].
    pub fn try_begin(
        &self,
        timeline: &mut ActorTimeline,
        status: &impl ActorStatus,
        request: ActionRequest<'_>,
        now: Tick,
    ) -> AdmitResult {
        let kind = request.kind();

        let denial = match status.condition() {
            ActorCondition::Frozen => Some(DenyReason::Frozen),
            ActorCondition::Paralyzed => Some(DenyReason::Paralyzed),
            ActorCondition::Free => {
                let busy = timeline.slot_mut(kind).is_some_and(|slot| slot.is_some());
                (busy || !self.is_ready(timeline, kind, now)).then_some(DenyReason::NotReady)
            }
        };
        if let Some(reason) = denial {
            debug!(actor = %timeline.actor, %kind, ?reason, "action denied");
            return AdmitResult::Denied(reason);
        }

        let mut notices = self.cancel_victims(timeline, kind);
        let handle = timeline.next_handle();

        let admission = if let ActionRequest::Cast { spell, source } = request {
            let ctx = timeline.context(&self.config, now);
            match timeline.cast.begin(
                &mut timeline.timers,
                &ctx,
                handle,
                spell,
                source,
                status.casting_skill(),
            ) {
                AdmitResult::Admitted(admission) => admission,
                // Readiness was checked above with the same rules.
                denied @ AdmitResult::Denied(_) => return denied,
            }
        } else {
            let cost = match kind {
                ActionKind::Bandage => ResourceCost::ONE_BANDAGE,
                ActionKind::WandUse => ResourceCost::ONE_CHARGE,
                ActionKind::Swing | ActionKind::Cast => ResourceCost::NONE,
            };
            let action = PendingAction::new(handle, kind, cost);
            let mut started = Vec::new();
            if !cost.is_free() {
                started.push(Notice::DeductResources { handle, cost });
            }
            timeline.timers.set_in_flight(kind, true);
            if let Some(slot) = timeline.slot_mut(kind) {
                *slot = Some(action.clone());
            }
            Admission::new(action, started)
        };

        debug!(
            actor = %timeline.actor,
            %kind,
            %handle,
            cancelled = notices.len(),
            "action admitted"
        );

        let Admission { action, notices: started } = admission;
        notices.extend(started);
        AdmitResult::Admitted(Admission::new(action, notices))
    }

    /// Resolves `spell` through `catalog` and attempts to begin casting it.
    ///
    /// The definition is looked up once, here, and used for the whole cast.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::UnknownSpell`] if the catalog has no such spell. The
    /// timeline is left untouched.
    pub fn try_begin_cast(
        &self,
        timeline: &mut ActorTimeline,
        status: &impl ActorStatus,
        catalog: &impl SpellCatalog,
        spell: SpellId,
        source: SpellSource,
        now: Tick,
    ) -> Result<AdmitResult, SchedulerError> {
        let Some(meta) = catalog.spell(spell) else {
            debug!(actor = %timeline.actor, %spell, "unknown spell requested");
            return Err(SchedulerError::UnknownSpell {
                actor: timeline.actor,
                spell,
            });
        };
        let request = ActionRequest::Cast {
            spell: meta,
            source,
        };
        Ok(self.try_begin(timeline, status, request, now))
    }

    /// Reports that a non-cast action resolved and sets its next deadline to
    /// `now + next_delay_ms`. A zero or negative delay means ready at once.
    ///
    /// Under [`TimingMode::LegacyGlobalRecovery`] the other gated timers are
    /// also pushed out to at least `now + global_recovery_ms`.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::UseTickForCast`] for [`ActionKind::Cast`]
    /// - [`SchedulerError::NoPendingAction`] if nothing of `kind` is in flight
    ///
    /// # Panics
    ///
    /// On either error when strict invariants are enabled.
    pub fn complete(
        &self,
        timeline: &mut ActorTimeline,
        kind: ActionKind,
        now: Tick,
        next_delay_ms: i64,
    ) -> Result<(), SchedulerError> {
        let actor = timeline.actor;
        if kind == ActionKind::Cast {
            return Err(self.violation(timeline, SchedulerError::UseTickForCast { actor }));
        }
        let Some(action) = timeline.slot_mut(kind).and_then(Option::take) else {
            return Err(self.violation(timeline, SchedulerError::NoPendingAction { actor, kind }));
        };

        timeline.timers.set_in_flight(kind, false);
        timeline.timers.set_next(kind, now, next_delay_ms);
        apply_global_recovery(&mut timeline.timers, &self.config, kind, now);

        debug!(
            actor = %actor,
            %kind,
            handle = %action.handle(),
            next = %timeline.timers.next_time(kind),
            "action completed"
        );
        Ok(())
    }

    /// Confirms the target of the actor's targeting cast.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::NotTargeting`] if no cast is targeting
    /// - [`SchedulerError::CursorNotOpen`] if a pre-target delay is running
    ///
    /// # Panics
    ///
    /// On either error when strict invariants are enabled.
    pub fn confirm_target(
        &self,
        timeline: &mut ActorTimeline,
        now: Tick,
        target: TargetRef,
        check: ResourceCheck,
    ) -> Result<Vec<Notice>, SchedulerError> {
        let ctx = timeline.context(&self.config, now);
        timeline
            .cast
            .confirm_target(&mut timeline.timers, &ctx, target, check)
            .map_err(|err| self.violation(timeline, err))
    }

    /// Advances the actor's cast to `now`.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::NoActiveCast`] if no cast is in flight.
    ///
    /// # Panics
    ///
    /// On that error when strict invariants are enabled.
    pub fn tick(
        &self,
        timeline: &mut ActorTimeline,
        now: Tick,
    ) -> Result<Vec<Notice>, SchedulerError> {
        let ctx = timeline.context(&self.config, now);
        timeline
            .cast
            .tick(&mut timeline.timers, &ctx)
            .map_err(|err| self.violation(timeline, err))
    }

    /// Interrupts the in-flight action of `kind` for an external reason.
    ///
    /// Nothing in flight is a no-op. A targeting cast is always cancelled
    /// silently. Anything that has committed resources stops only if `reason`
    /// may fizzle under the configuration, and then fizzles exactly once.
    pub fn interrupt(
        &self,
        timeline: &mut ActorTimeline,
        kind: ActionKind,
        reason: InterruptReason,
    ) -> InterruptOutcome {
        let actor = timeline.actor;
        if kind == ActionKind::Cast {
            return timeline
                .cast
                .interrupt(&mut timeline.timers, actor, &self.config, reason);
        }

        let mut outcome = InterruptOutcome::default();
        if !self.config.fizzles(reason) {
            return outcome;
        }
        let Some(mut action) = timeline.slot_mut(kind).and_then(Option::take) else {
            return outcome;
        };
        timeline.timers.set_in_flight(kind, false);

        if action.committed().is_free() {
            outcome.notices.push(Notice::Cancelled {
                handle: action.handle(),
                kind,
                phase: None,
            });
        } else if action.fizzle() {
            outcome.did_fizzle = true;
            outcome.notices.push(Notice::Fizzled {
                handle: action.handle(),
                kind,
                forfeited: action.committed(),
            });
        }
        debug!(actor = %actor, %kind, ?reason, fizzled = outcome.did_fizzle, "action interrupted");
        outcome
    }

    /// Interrupts every kind in turn.
    pub fn interrupt_all(
        &self,
        timeline: &mut ActorTimeline,
        reason: InterruptReason,
    ) -> InterruptOutcome {
        let mut outcome = InterruptOutcome::default();
        for kind in ActionKind::ALL {
            outcome.merge(self.interrupt(timeline, kind, reason));
        }
        outcome
    }

    /// Applies the cancellation table for `initiator` to everything in flight.
    fn cancel_victims(&self, timeline: &mut ActorTimeline, initiator: ActionKind) -> Vec<Notice> {
        let mut notices = Vec::new();

        for kind in [ActionKind::Swing, ActionKind::Bandage, ActionKind::WandUse] {
            let Some(slot) = timeline.slot_mut(kind) else {
                continue;
            };
            let outcome = match slot.as_ref() {
                Some(victim) => self.policy.resolve_against(initiator, victim),
                None => continue,
            };
            if !outcome.cancels() {
                continue;
            }
            let Some(mut victim) = slot.take() else {
                continue;
            };
            let notice = if outcome == CancelOutcome::CancelWithFizzle && victim.fizzle() {
                Notice::Fizzled {
                    handle: victim.handle(),
                    kind,
                    forfeited: victim.committed(),
                }
            } else {
                Notice::Cancelled {
                    handle: victim.handle(),
                    kind,
                    phase: None,
                }
            };
            notices.push(notice);
            timeline.timers.set_in_flight(kind, false);
        }

        notices.extend(
            timeline
                .cast
                .apply_policy(&mut timeline.timers, &self.policy, initiator),
        );
        notices
    }

    /// Handles a violated invariant: panic in strict mode, otherwise log and
    /// reset the actor to a known-good state.
    fn violation(&self, timeline: &mut ActorTimeline, err: SchedulerError) -> SchedulerError {
        if self.config.strict_invariants {
            panic!("combat scheduler invariant violated: {err}");
        }
        warn!(
            actor = %timeline.actor,
            severity = err.severity().as_str(),
            error = %err,
            "invariant violated, resetting actor timeline"
        );
        timeline.reset_all();
        err
    }
}

// ============================================================================
// Shared timing helpers
// ============================================================================

/// Converts a configured millisecond count to a signed delay.
pub(crate) fn millis_to_delay(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX)
}

/// Under the legacy mode, pushes every gated timer other than `finished` and
/// the swing timer out to at least `now + global_recovery_ms`.
pub(crate) fn apply_global_recovery(
    timers: &mut ActionTimerSet,
    config: &SchedulerConfig,
    finished: ActionKind,
    now: Tick,
) {
    if config.timing_mode != TimingMode::LegacyGlobalRecovery {
        return;
    }
    let floor = now.offset(millis_to_delay(config.global_recovery_ms));
    for kind in ActionKind::ALL {
        if kind != ActionKind::Swing && kind != finished {
            timers.raise_to(kind, floor);
        }
    }
}
