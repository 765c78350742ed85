//! Determinism verification tests.
//!
//! These tests verify that the scheduler produces identical notices when:
//! - Driven by the same seeded stream of attempts, confirmations and interrupts
//! - Pulsed in parallel or ticked actor by actor
//!
//! This is critical for:
//! - Replaying recorded combat sessions
//! - Comparing behaviour across timing modes during migration
//! - Debug reproducibility

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::actor::ActorId;
use crate::cast::ResourceCheck;
use crate::clock::Tick;
use crate::config::{InterruptReason, TimingMode};
use crate::error::SchedulerError;
use crate::notice::{Notice, TargetRef};
use crate::registry::ActorRegistry;
use crate::scheduler::{ActionRequest, AdmitResult, InterruptOutcome};
use crate::spell::{SpellBook, SpellId, SpellSource};
use crate::timers::ActionKind;

use super::helpers::{greater_heal, init_tracing, lenient_config, magic_arrow, GRANDMASTER, NOVICE};

const ACTORS: u64 = 8;
const STEPS: usize = 600;

/// Known spells plus one the catalog lacks.
const SPELL_IDS: [SpellId; 3] = [SpellId::new(5), SpellId::new(29), SpellId::new(404)];

const REASONS: [InterruptReason; 7] = [
    InterruptReason::NewAction,
    InterruptReason::Death,
    InterruptReason::Paralysis,
    InterruptReason::Damage,
    InterruptReason::Movement,
    InterruptReason::EquipmentChange,
    InterruptReason::Disconnect,
];

/// Everything observable from one step.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Admit(ActorId, AdmitResult),
    Notices(ActorId, Vec<Notice>),
    Interrupt(ActorId, InterruptOutcome),
    Error(SchedulerError),
}

fn random_source(rng: &mut ChaCha8Rng) -> SpellSource {
    match rng.gen_range(0..3) {
        0 => SpellSource::Book,
        1 => SpellSource::Scroll,
        _ => SpellSource::Wand,
    }
}

fn random_kind(rng: &mut ChaCha8Rng) -> ActionKind {
    ActionKind::ALL[rng.gen_range(0..ActionKind::ALL.len())]
}

/// Applies one random step to the registry, without pulsing.
fn step(
    rng: &mut ChaCha8Rng,
    registry: &mut ActorRegistry,
    spells: &SpellBook,
    now: Tick,
    log: &mut Vec<Event>,
) {
    let actor = ActorId::new(rng.gen_range(0..ACTORS));
    let status = if actor.as_u64() % 2 == 0 { GRANDMASTER } else { NOVICE };

    match rng.gen_range(0..7) {
        0 => {
            let result = registry.try_begin(actor, &status, ActionRequest::Swing, now);
            log.push(Event::Admit(actor, result));
        }
        1 => {
            let spell = SPELL_IDS[rng.gen_range(0..SPELL_IDS.len())];
            let source = random_source(rng);
            match registry.try_begin_cast(actor, &status, spells, spell, source, now) {
                Ok(result) => log.push(Event::Admit(actor, result)),
                Err(err) => log.push(Event::Error(err)),
            }
        }
        2 => {
            let result = registry.try_begin(actor, &status, ActionRequest::Bandage, now);
            log.push(Event::Admit(actor, result));
        }
        3 => {
            let targeting = registry
                .get(actor)
                .is_some_and(|t| t.cast().targeting().is_some());
            if targeting {
                let check = if rng.gen_bool(0.9) {
                    ResourceCheck::Sufficient
                } else {
                    ResourceCheck::Insufficient
                };
                let target = TargetRef(rng.gen_range(0..ACTORS));
                match registry.confirm_target(actor, now, target, check) {
                    Ok(notices) => log.push(Event::Notices(actor, notices)),
                    Err(err) => log.push(Event::Error(err)),
                }
            }
        }
        4 => {
            let kind = random_kind(rng);
            let in_flight = kind != ActionKind::Cast
                && registry.get(actor).is_some_and(|t| t.pending(kind).is_some());
            if in_flight {
                let delay = rng.gen_range(0..3_000);
                if let Err(err) = registry.complete(actor, kind, now, delay) {
                    log.push(Event::Error(err));
                }
            }
        }
        5 => {
            let kind = random_kind(rng);
            let reason = REASONS[rng.gen_range(0..REASONS.len())];
            let outcome = registry.interrupt(actor, kind, reason);
            log.push(Event::Interrupt(actor, outcome));
        }
        _ => {
            let result = registry.try_begin(actor, &status, ActionRequest::WandUse, now);
            log.push(Event::Admit(actor, result));
        }
    }
}

/// Runs a seeded session and returns everything it produced.
fn run_session(seed: u64, mode: TimingMode) -> Vec<Event> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut registry = ActorRegistry::new(Arc::new(lenient_config(mode)));
    let spells: SpellBook = [magic_arrow(), greater_heal()].into_iter().collect();
    let mut log = Vec::new();
    let mut now = 0;

    for _ in 0..STEPS {
        now += rng.gen_range(0..=60);
        step(&mut rng, &mut registry, &spells, Tick::new(now), &mut log);
        for (actor, notices) in registry.pulse(Tick::new(now)) {
            log.push(Event::Notices(actor, notices));
        }
    }
    log
}

// =============================================================================
// Replay Tests
// =============================================================================

#[test]
fn same_seed_same_notices_independent() {
    init_tracing();
    let a = run_session(42, TimingMode::IndependentPerActionTimers);
    let b = run_session(42, TimingMode::IndependentPerActionTimers);
    assert_eq!(a, b);
    assert!(a.len() >= STEPS / 2);
}

#[test]
fn same_seed_same_notices_legacy() {
    init_tracing();
    let a = run_session(7, TimingMode::LegacyGlobalRecovery);
    let b = run_session(7, TimingMode::LegacyGlobalRecovery);
    assert_eq!(a, b);
}

#[test]
fn sessions_produce_effects_and_fizzles() {
    let log = run_session(1234, TimingMode::IndependentPerActionTimers);
    let notices = log.iter().flat_map(|event| match event {
        Event::Notices(_, notices) => notices.as_slice(),
        Event::Admit(_, AdmitResult::Admitted(admission)) => admission.notices(),
        Event::Interrupt(_, outcome) => outcome.notices.as_slice(),
        _ => &[][..],
    });
    let (mut effects, mut fizzles) = (0, 0);
    for notice in notices {
        match notice {
            Notice::ApplyEffect { .. } => effects += 1,
            Notice::Fizzled { .. } => fizzles += 1,
            _ => {}
        }
    }
    assert!(effects > 0, "no cast ever completed");
    assert!(fizzles > 0, "no action ever fizzled");
}

// =============================================================================
// Parallel Pulse
// =============================================================================

#[test]
fn parallel_pulse_matches_sequential_ticks() {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let config = Arc::new(lenient_config(TimingMode::IndependentPerActionTimers));
    let mut parallel = ActorRegistry::new(config);
    let spells = [magic_arrow(), greater_heal()];
    let mut scratch = Vec::new();

    for i in 0..ACTORS * 4 {
        let actor = ActorId::new(i);
        let spell = &spells[rng.gen_range(0..spells.len())];
        parallel.try_begin(
            actor,
            &GRANDMASTER,
            ActionRequest::Cast {
                spell,
                source: SpellSource::Book,
            },
            Tick::ZERO,
        );
        if rng.gen_bool(0.75) {
            let check = ResourceCheck::Sufficient;
            scratch.push(parallel.confirm_target(actor, Tick::new(i), TargetRef(i), check));
        }
    }
    assert!(scratch.iter().all(Result::is_ok));
    let mut sequential = parallel.clone();

    for now in [400, 900, 1_400] {
        let now = Tick::new(now);
        let mut expected = Vec::new();
        for actor in sequential.actor_ids().collect::<Vec<_>>() {
            if !sequential.get(actor).is_some_and(|t| t.cast().awaits_tick()) {
                continue;
            }
            let notices = sequential.tick(actor, now).unwrap();
            if !notices.is_empty() {
                expected.push((actor, notices));
            }
        }

        assert_eq!(parallel.pulse(now), expected);
    }
}
