//! Test fixtures for driving actor timelines.
//!
//! This module provides actors, spells and scheduler setups that keep the
//! scenario tests short and consistent.

use std::sync::Arc;

use crate::actor::{ActorCondition, ActorId, ActorStatus};
use crate::cast::ResourceCheck;
use crate::clock::Tick;
use crate::config::{SchedulerConfig, TimingMode};
use crate::notice::{Notice, TargetRef};
use crate::scheduler::{ActionRequest, ActionScheduler, ActorTimeline, Admission, AdmitResult};
use crate::spell::{SpellId, SpellMeta, SpellSource};

// =============================================================================
// Actors
// =============================================================================

/// Actor with a fixed condition and casting skill.
#[derive(Debug, Clone, Copy)]
pub struct TestActor {
    pub condition: ActorCondition,
    pub skill: u32,
}

impl ActorStatus for TestActor {
    fn condition(&self) -> ActorCondition {
        self.condition
    }

    fn casting_skill(&self) -> u32 {
        self.skill
    }
}

/// A free actor at full casting skill.
pub const GRANDMASTER: TestActor = TestActor {
    condition: ActorCondition::Free,
    skill: 100,
};

/// A free actor with no casting skill.
pub const NOVICE: TestActor = TestActor {
    condition: ActorCondition::Free,
    skill: 0,
};

// =============================================================================
// Scheduler Setup
// =============================================================================

/// Routes scheduler logs to the test harness. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Config that logs and resets on invariant violations instead of panicking.
pub fn lenient_config(mode: TimingMode) -> SchedulerConfig {
    SchedulerConfig {
        strict_invariants: false,
        ..SchedulerConfig::for_mode(mode)
    }
}

/// Scheduler over [`lenient_config`].
pub fn scheduler(mode: TimingMode) -> ActionScheduler {
    ActionScheduler::new(Arc::new(lenient_config(mode)))
}

/// A fresh timeline for actor 1.
pub fn timeline() -> ActorTimeline {
    ActorTimeline::new(ActorId::new(1))
}

// =============================================================================
// Spells
// =============================================================================

/// First-circle attack spell: 500ms base, 4 mana, 2 reagents.
pub fn magic_arrow() -> SpellMeta {
    SpellMeta::new(SpellId::new(5), 1, 500).with_mana(4).with_reagents(2)
}

/// Fourth-circle heal: 1250ms base, 11 mana, 2 reagents.
pub fn greater_heal() -> SpellMeta {
    SpellMeta::new(SpellId::new(29), 4, 1_250).with_mana(11).with_reagents(2)
}

// =============================================================================
// Driving
// =============================================================================

/// Begins a cast and returns the admission, panicking on denial.
pub fn begin_cast(
    scheduler: &ActionScheduler,
    timeline: &mut ActorTimeline,
    status: &TestActor,
    spell: &SpellMeta,
    source: SpellSource,
    now: u64,
) -> Admission {
    let request = ActionRequest::Cast { spell, source };
    match scheduler.try_begin(timeline, status, request, Tick::new(now)) {
        AdmitResult::Admitted(admission) => admission,
        AdmitResult::Denied(reason) => panic!("cast denied at {now}ms: {reason:?}"),
    }
}

/// Confirms a target with sufficient resources, panicking on error.
pub fn confirm(scheduler: &ActionScheduler, timeline: &mut ActorTimeline, now: u64) -> Vec<Notice> {
    scheduler
        .confirm_target(timeline, Tick::new(now), TargetRef(99), ResourceCheck::Sufficient)
        .unwrap()
}

/// Number of fizzle notices.
pub fn fizzles(notices: &[Notice]) -> usize {
    notices.iter().filter(|n| n.is_fizzle()).count()
}

/// Number of effect applications.
pub fn effects(notices: &[Notice]) -> usize {
    notices
        .iter()
        .filter(|n| matches!(n, Notice::ApplyEffect { .. }))
        .count()
}

/// Number of resource deductions.
pub fn deductions(notices: &[Notice]) -> usize {
    notices
        .iter()
        .filter(|n| matches!(n, Notice::DeductResources { .. }))
        .count()
}
