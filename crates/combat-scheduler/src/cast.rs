//! Two-phase spellcasting state machine.
//!
//! A cast moves `Idle -> Targeting -> Committed -> (effect applied) -> Idle`.
//! The only other exits are `Targeting -> Idle` (silent cancel, nothing spent)
//! and `Committed -> Idle` (fizzle, resources forfeited).
//!
//! # Timing modes
//!
//! Both timing philosophies run through the same states:
//!
//! - **Immediate targeting** ([`IndependentPerActionTimers`]): the cursor
//!   opens at `begin`. Animation, mantra and the cast delay start at
//!   `confirm_target`.
//! - **Pre-cast delay** ([`LegacyGlobalRecovery`]): animation and
//!   mantra start at `begin` and the cursor opens once the delay has elapsed
//!   (reported by `tick`). The committed phase then has no residual delay.
//!
//! Resources are deducted at `confirm_target` in both modes.
//!
//! # Displacement
//!
//! At most one cast targets and at most one is committed. A new `begin` while
//! another cast is targeting silently displaces it. A new `begin` while a cast
//! is committed leaves that cast running and records it as *replaced*; it is
//! fizzled only when the new cast's own target is confirmed.
//!
//! [`IndependentPerActionTimers`]: crate::config::TimingMode::IndependentPerActionTimers
//! [`LegacyGlobalRecovery`]: crate::config::TimingMode::LegacyGlobalRecovery

use tracing::debug;

use crate::actor::ActorId;
use crate::clock::Tick;
use crate::config::{InterruptReason, SchedulerConfig};
use crate::error::SchedulerError;
use crate::notice::{CastFailure, Notice, TargetRef};
use crate::pending::{ActionHandle, CastPhase, PendingAction};
use crate::policy::{CancelOutcome, CancellationPolicy, VictimClass};
use crate::scheduler::{
    apply_global_recovery, millis_to_delay, Admission, AdmitResult, DenyReason, InterruptOutcome,
};
use crate::spell::{ResourceCost, SpellId, SpellMeta, SpellSource};
use crate::timers::{ActionKind, ActionTimerSet};

/// Observable state of an actor's cast sequence.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CastState {
    /// No spell in flight.
    Idle,
    /// The foreground spell waits for its target.
    Targeting,
    /// The foreground spell is committed and counting down.
    Committed,
}

/// Caller's answer to "can the actor pay for this cast right now".
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ResourceCheck {
    /// Mana, reagents, scroll or charge are available.
    Sufficient,
    /// Something is missing; the cast fails without fizzle.
    Insufficient,
}

/// Per-call context shared by every cast operation.
#[derive(Debug, Clone, Copy)]
pub struct CastContext<'a> {
    /// Actor whose sequence this is.
    pub actor: ActorId,
    /// Configuration snapshot for this call.
    pub config: &'a SchedulerConfig,
    /// Current time.
    pub now: Tick,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CastInstance {
    action: PendingAction,
    spell: SpellId,
    source: SpellSource,
    cost: ResourceCost,
    delay_ms: u64,
    cursor_at: Tick,
    cursor_open: bool,
    target: Option<TargetRef>,
    deadline: Tick,
}

impl CastInstance {
    fn handle(&self) -> ActionHandle {
        self.action.handle()
    }

    fn cancelled(&self) -> Notice {
        Notice::Cancelled {
            handle: self.handle(),
            kind: ActionKind::Cast,
            phase: self.action.phase(),
        }
    }

    /// Fizzles the cast. Returns `None` if it already fizzled.
    fn fizzle(&mut self) -> Option<Notice> {
        self.action.fizzle().then(|| Notice::Fizzled {
            handle: self.handle(),
            kind: ActionKind::Cast,
            forfeited: self.action.committed(),
        })
    }
}

/// Per-actor spellcasting state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CastSequence {
    targeting: Option<CastInstance>,
    committed: Option<CastInstance>,
}

impl CastSequence {
    /// Creates an idle sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State of the foreground spell.
    #[must_use]
    pub fn state(&self) -> CastState {
        if self.targeting.is_some() {
            CastState::Targeting
        } else if self.committed.is_some() {
            CastState::Committed
        } else {
            CastState::Idle
        }
    }

    /// Returns true if no spell is in flight.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state() == CastState::Idle
    }

    /// The spell currently waiting for a target.
    #[must_use]
    pub fn targeting(&self) -> Option<&PendingAction> {
        self.targeting.as_ref().map(|c| &c.action)
    }

    /// The spell currently committed.
    #[must_use]
    pub fn committed(&self) -> Option<&PendingAction> {
        self.committed.as_ref().map(|c| &c.action)
    }

    /// The foreground spell: the targeting one if any, else the committed one.
    #[must_use]
    pub fn foreground(&self) -> Option<&PendingAction> {
        self.targeting().or_else(|| self.committed())
    }

    /// Returns true if `tick` has something to advance: a committed delay or a
    /// pre-target delay whose cursor has not opened.
    #[must_use]
    pub fn awaits_tick(&self) -> bool {
        self.committed.is_some() || self.targeting.as_ref().is_some_and(|c| !c.cursor_open)
    }

    /// Returns true if the sequence currently roots the caster.
    #[must_use]
    pub fn blocks_movement(&self, config: &SchedulerConfig) -> bool {
        self.committed.is_some() && config.block_movement_while_committed
    }

    /// Announces a spell and enters `Targeting`.
    ///
    /// Denied with [`DenyReason::NotReady`] if the spell timer has not
    /// elapsed. A spell already targeting is silently displaced. A committed
    /// spell keeps running and is recorded as replaced by the new one.
    pub fn begin(
        &mut self,
        timers: &mut ActionTimerSet,
        ctx: &CastContext<'_>,
        handle: ActionHandle,
        spell: &SpellMeta,
        source: SpellSource,
        skill: u32,
    ) -> AdmitResult {
        if !timers.is_ready(ActionKind::Cast, ctx.now, ctx.config.readiness()) {
            return AdmitResult::Denied(DenyReason::NotReady);
        }

        let mut notices = Vec::new();
        if let Some(displaced) = self.targeting.take() {
            debug!(actor = %ctx.actor, handle = %displaced.handle(), "targeting cast displaced");
            notices.push(displaced.cancelled());
        }

        let action = PendingAction::new(handle, ActionKind::Cast, ResourceCost::NONE)
            .replacing(self.committed.as_ref().map(CastInstance::handle));
        let delay_ms = spell.cast_delay_ms(skill, ctx.config.max_cast_reduction_pct);
        let pre_target = ctx.config.timing_mode.delays_before_target();

        let instance = CastInstance {
            action: action.clone(),
            spell: spell.id,
            source,
            cost: spell.cost_for(source),
            delay_ms,
            cursor_at: if pre_target {
                ctx.now.offset(millis_to_delay(delay_ms))
            } else {
                ctx.now
            },
            cursor_open: !pre_target,
            target: None,
            deadline: ctx.now,
        };

        if pre_target {
            notices.push(Notice::CastAnimationStarted {
                handle,
                spell: spell.id,
                source,
            });
        } else {
            notices.push(Notice::TargetCursorOpened {
                handle,
                spell: spell.id,
            });
        }

        debug!(actor = %ctx.actor, %handle, spell = %spell.id, delay_ms, "cast targeting");
        self.targeting = Some(instance);
        self.sync(timers);

        AdmitResult::Admitted(Admission::new(action, notices))
    }

    /// Confirms the target of the targeting spell and commits it.
    ///
    /// Resources are deducted here and nowhere else. If the caller reports
    /// [`ResourceCheck::Insufficient`] the spell fails back to idle with no
    /// fizzle, and any spell it was replacing keeps running.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::NotTargeting`] if no spell is targeting
    /// - [`SchedulerError::CursorNotOpen`] if a pre-target delay is still running
    pub fn confirm_target(
        &mut self,
        timers: &mut ActionTimerSet,
        ctx: &CastContext<'_>,
        target: TargetRef,
        check: ResourceCheck,
    ) -> Result<Vec<Notice>, SchedulerError> {
        let Some(mut instance) = self.targeting.take() else {
            return Err(SchedulerError::NotTargeting { actor: ctx.actor });
        };

        let mut notices = Vec::new();

        if !instance.cursor_open {
            if ctx.now < instance.cursor_at {
                let handle = instance.handle();
                self.targeting = Some(instance);
                return Err(SchedulerError::CursorNotOpen {
                    actor: ctx.actor,
                    handle,
                });
            }
            // The pulse has not opened the cursor yet; the delay is over.
            instance.cursor_open = true;
            notices.push(Notice::TargetCursorOpened {
                handle: instance.handle(),
                spell: instance.spell,
            });
        }

        if check == ResourceCheck::Insufficient {
            debug!(
                actor = %ctx.actor,
                handle = %instance.handle(),
                "cast failed: insufficient resources"
            );
            notices.push(Notice::CastFailed {
                handle: instance.handle(),
                spell: instance.spell,
                reason: CastFailure::InsufficientResources,
            });
            self.sync(timers);
            return Ok(notices);
        }

        // Any committed spell still running is the one this cast replaces.
        if let Some(mut replaced) = self.committed.take() {
            debug!(actor = %ctx.actor, handle = %replaced.handle(), "replaced cast fizzled");
            notices.extend(replaced.fizzle());
        }

        instance.action.commit(instance.cost);
        instance.target = Some(target);
        notices.push(Notice::DeductResources {
            handle: instance.handle(),
            cost: instance.cost,
        });

        instance.deadline = if ctx.config.timing_mode.delays_before_target() {
            ctx.now
        } else {
            notices.push(Notice::CastAnimationStarted {
                handle: instance.handle(),
                spell: instance.spell,
                source: instance.source,
            });
            ctx.now.offset(millis_to_delay(instance.delay_ms))
        };
        notices.push(Notice::CompletionScheduled {
            handle: instance.handle(),
            kind: ActionKind::Cast,
            at: instance.deadline,
        });

        debug!(
            actor = %ctx.actor,
            handle = %instance.handle(),
            deadline = %instance.deadline,
            "cast committed"
        );
        self.committed = Some(instance);
        self.sync(timers);
        Ok(notices)
    }

    /// Advances the sequence to `ctx.now`.
    ///
    /// Opens a pending pre-target cursor once its delay has elapsed, and
    /// completes a committed spell whose delay has elapsed, emitting its
    /// [`Notice::ApplyEffect`] exactly once and setting the spell timer.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::NoActiveCast`] if no spell is in flight.
    pub fn tick(
        &mut self,
        timers: &mut ActionTimerSet,
        ctx: &CastContext<'_>,
    ) -> Result<Vec<Notice>, SchedulerError> {
        if self.is_idle() {
            return Err(SchedulerError::NoActiveCast { actor: ctx.actor });
        }

        let mut notices = Vec::new();

        if let Some(instance) = self.targeting.as_mut() {
            if !instance.cursor_open && ctx.now >= instance.cursor_at {
                instance.cursor_open = true;
                notices.push(Notice::TargetCursorOpened {
                    handle: instance.handle(),
                    spell: instance.spell,
                });
            }
        }

        if self.committed.as_ref().is_some_and(|c| c.deadline <= ctx.now) {
            if let Some(done) = self.committed.take() {
                if let Some(target) = done.target {
                    notices.push(Notice::ApplyEffect {
                        handle: done.handle(),
                        spell: done.spell,
                        target,
                        source: done.source,
                    });
                }
                timers.set_next(
                    ActionKind::Cast,
                    ctx.now,
                    millis_to_delay(ctx.config.spell_recovery_ms()),
                );
                apply_global_recovery(timers, ctx.config, ActionKind::Cast, ctx.now);
                debug!(actor = %ctx.actor, handle = %done.handle(), "cast completed");
                if let Some(waiting) = self.targeting.as_mut() {
                    waiting.action = waiting.action.clone().replacing(None);
                }
            }
        }

        self.sync(timers);
        Ok(notices)
    }

    /// Interrupts the sequence for an external reason.
    ///
    /// A targeting spell is always cancelled silently, whatever the reason.
    /// A committed spell fizzles only if `reason` may fizzle casts under the
    /// configuration; otherwise it keeps counting down.
    pub fn interrupt(
        &mut self,
        timers: &mut ActionTimerSet,
        actor: ActorId,
        config: &SchedulerConfig,
        reason: InterruptReason,
    ) -> InterruptOutcome {
        let mut outcome = InterruptOutcome::default();

        if let Some(cancelled) = self.targeting.take() {
            debug!(
                actor = %actor,
                handle = %cancelled.handle(),
                ?reason,
                "targeting cast cancelled"
            );
            outcome.notices.push(cancelled.cancelled());
        }

        if config.fizzles(reason) {
            if let Some(mut fizzled) = self.committed.take() {
                debug!(
                    actor = %actor,
                    handle = %fizzled.handle(),
                    ?reason,
                    "committed cast fizzled"
                );
                if let Some(notice) = fizzled.fizzle() {
                    outcome.did_fizzle = true;
                    outcome.notices.push(notice);
                }
            }
        }

        self.sync(timers);
        outcome
    }

    /// Applies the cancellation table for a non-cast action starting.
    pub(crate) fn apply_policy(
        &mut self,
        timers: &mut ActionTimerSet,
        policy: &CancellationPolicy,
        initiator: ActionKind,
    ) -> Vec<Notice> {
        let mut notices = Vec::new();

        match self
            .targeting
            .as_ref()
            .map(|_| policy.resolve(initiator, VictimClass::CastTargeting))
        {
            Some(CancelOutcome::CancelSilently) => {
                notices.extend(self.targeting.take().map(|c| c.cancelled()));
            }
            Some(CancelOutcome::CancelWithFizzle) => {
                notices.extend(self.targeting.take().and_then(|mut c| c.fizzle()));
            }
            Some(CancelOutcome::NoEffect) | None => {}
        }

        match self
            .committed
            .as_ref()
            .map(|_| policy.resolve(initiator, VictimClass::CastCommitted))
        {
            Some(CancelOutcome::CancelSilently) => {
                notices.extend(self.committed.take().map(|c| c.cancelled()));
            }
            Some(CancelOutcome::CancelWithFizzle) => {
                notices.extend(self.committed.take().and_then(|mut c| c.fizzle()));
            }
            Some(CancelOutcome::NoEffect) | None => {}
        }

        self.sync(timers);
        notices
    }

    /// Drops every spell without notices.
    pub fn reset(&mut self) {
        self.targeting = None;
        self.committed = None;
    }

    /// Mirrors the foreground phase into the timer flags.
    fn sync(&self, timers: &mut ActionTimerSet) {
        let phase = match (&self.targeting, &self.committed) {
            (Some(t), _) => Some((CastPhase::Targeting, t.handle())),
            (None, Some(c)) => Some((CastPhase::Committed, c.handle())),
            (None, None) => None,
        };
        timers.set_cast_phase(phase);
    }
}
