//! Actor timeline storage for a server process.
//!
//! This module provides [`ActorRegistry`], which owns:
//! - One [`ActorTimeline`] per actor, with deterministic iteration order
//!   (`BTreeMap`)
//! - The [`ActionScheduler`] and its current configuration snapshot
//!
//! # Determinism
//!
//! [`ActorRegistry::pulse`] advances every casting actor in parallel with
//! rayon. Each actor's state is independent, and the collected notices are
//! sorted by actor ID before they are returned, so the result is identical to
//! a sequential pass no matter how the work was scheduled.
//!
//! # Configuration changes
//!
//! [`ActorRegistry::reconfigure`] swaps the snapshot in place. A change of
//! [`TimingMode`](crate::config::TimingMode) resets every timeline, since
//! deadlines computed under one mode mean nothing under the other.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use combat_scheduler::actor::{ActorCondition, ActorId};
//! use combat_scheduler::cast::ResourceCheck;
//! use combat_scheduler::clock::Tick;
//! use combat_scheduler::config::SchedulerConfig;
//! use combat_scheduler::notice::{Notice, TargetRef};
//! use combat_scheduler::registry::ActorRegistry;
//! use combat_scheduler::scheduler::ActionRequest;
//! use combat_scheduler::spell::{SpellId, SpellMeta, SpellSource};
//!
//! let mut registry = ActorRegistry::new(Arc::new(SchedulerConfig::default()));
//! let heal = SpellMeta::new(SpellId::new(4), 1, 500).with_mana(4);
//! let mage = ActorId::new(7);
//!
//! let request = ActionRequest::Cast { spell: &heal, source: SpellSource::Book };
//! assert!(registry.try_begin(mage, &ActorCondition::Free, request, Tick::ZERO).is_admitted());
//! registry.confirm_target(mage, Tick::new(100), TargetRef(7), ResourceCheck::Sufficient).unwrap();
//!
//! let done = registry.pulse(Tick::new(600));
//! assert_eq!(done.len(), 1);
//! assert!(matches!(done[0].1[..], [Notice::ApplyEffect { .. }]));
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::actor::{ActorId, ActorStatus};
use crate::cast::ResourceCheck;
use crate::clock::Tick;
use crate::config::{InterruptReason, SchedulerConfig};
use crate::error::SchedulerError;
use crate::notice::{Notice, TargetRef};
use crate::scheduler::{
    ActionRequest, ActionScheduler, ActorTimeline, AdmitResult, InterruptOutcome,
};
use crate::spell::{SpellCatalog, SpellId, SpellSource};
use crate::timers::{ActionKind, TimerSnapshot};

/// Persisted deadlines for every registered actor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Deadlines keyed by actor.
    pub timelines: BTreeMap<ActorId, TimerSnapshot>,
}

/// Every actor's timeline plus the scheduler that drives them.
#[derive(Debug, Clone)]
pub struct ActorRegistry {
    scheduler: ActionScheduler,
    /// Timeline storage with deterministic iteration order.
    timelines: BTreeMap<ActorId, ActorTimeline>,
}

impl Default for ActorRegistry {
    fn default() -> Self {
        Self::new(Arc::new(SchedulerConfig::default()))
    }
}

impl ActorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(config: Arc<SchedulerConfig>) -> Self {
        Self {
            scheduler: ActionScheduler::new(config),
            timelines: BTreeMap::new(),
        }
    }

    /// Rebuilds a registry from persisted deadlines. Nothing is in flight.
    #[must_use]
    pub fn restore(config: Arc<SchedulerConfig>, snapshot: &RegistrySnapshot) -> Self {
        let mut registry = Self::new(config);
        for (&actor, timers) in &snapshot.timelines {
            registry
                .timelines
                .insert(actor, ActorTimeline::restore(actor, timers));
        }
        registry
    }

    /// Captures every actor's deadlines.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            timelines: self
                .timelines
                .iter()
                .map(|(&actor, timeline)| (actor, timeline.snapshot()))
                .collect(),
        }
    }

    /// The scheduler in use.
    #[must_use]
    pub const fn scheduler(&self) -> &ActionScheduler {
        &self.scheduler
    }

    /// Current configuration snapshot.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        self.scheduler.config()
    }

    /// Swaps in a new configuration snapshot.
    ///
    /// # Returns
    ///
    /// True if the timing mode changed, in which case every timeline was reset.
    pub fn reconfigure(&mut self, config: Arc<SchedulerConfig>) -> bool {
        let previous = self.scheduler.config().timing_mode;
        let mode_changed = config.timing_mode != previous;
        self.scheduler = ActionScheduler::new(config);

        if mode_changed {
            info!(
                from = %previous,
                to = %self.scheduler.config().timing_mode,
                actors = self.timelines.len(),
                "timing mode changed, resetting all timelines"
            );
            for timeline in self.timelines.values_mut() {
                timeline.reset_all();
            }
        }
        mode_changed
    }

    /// Returns the actor's timeline, creating an idle one if needed.
    pub fn insert(&mut self, actor: ActorId) -> &ActorTimeline {
        self.timelines
            .entry(actor)
            .or_insert_with(|| ActorTimeline::new(actor))
    }

    /// Removes an actor, dropping anything in flight without notices.
    pub fn remove(&mut self, actor: ActorId) -> Option<ActorTimeline> {
        self.timelines.remove(&actor)
    }

    /// The actor's timeline, if registered.
    #[must_use]
    pub fn get(&self, actor: ActorId) -> Option<&ActorTimeline> {
        self.timelines.get(&actor)
    }

    /// Returns true if the actor has a timeline.
    #[must_use]
    pub fn contains(&self, actor: ActorId) -> bool {
        self.timelines.contains_key(&actor)
    }

    /// Number of registered actors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timelines.len()
    }

    /// Returns true if no actor is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timelines.is_empty()
    }

    /// Registered actors in ascending ID order.
    pub fn actor_ids(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.timelines.keys().copied()
    }

    /// Clears an actor's timers and in-flight actions.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::UnknownActor`] if the actor is not registered.
    pub fn reset(&mut self, actor: ActorId) -> Result<(), SchedulerError> {
        self.timeline_mut(actor)?.reset_all();
        Ok(())
    }

    /// Attempts to start an action, registering the actor on first use.
    pub fn try_begin(
        &mut self,
        actor: ActorId,
        status: &impl ActorStatus,
        request: ActionRequest<'_>,
        now: Tick,
    ) -> AdmitResult {
        let timeline = self
            .timelines
            .entry(actor)
            .or_insert_with(|| ActorTimeline::new(actor));
        self.scheduler.try_begin(timeline, status, request, now)
    }

    /// Looks a spell up in `catalog` and attempts to begin casting it,
    /// registering the actor on first use.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::UnknownSpell`] if the catalog has no such spell.
    pub fn try_begin_cast(
        &mut self,
        actor: ActorId,
        status: &impl ActorStatus,
        catalog: &impl SpellCatalog,
        spell: SpellId,
        source: SpellSource,
        now: Tick,
    ) -> Result<AdmitResult, SchedulerError> {
        let timeline = self
            .timelines
            .entry(actor)
            .or_insert_with(|| ActorTimeline::new(actor));
        self.scheduler
            .try_begin_cast(timeline, status, catalog, spell, source, now)
    }

    /// Reports that a non-cast action resolved.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::UnknownActor`], or any error of
    /// [`ActionScheduler::complete`].
    pub fn complete(
        &mut self,
        actor: ActorId,
        kind: ActionKind,
        now: Tick,
        next_delay_ms: i64,
    ) -> Result<(), SchedulerError> {
        let timeline = lookup(&mut self.timelines, actor)?;
        self.scheduler.complete(timeline, kind, now, next_delay_ms)
    }

    /// Confirms the target of the actor's targeting cast.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::UnknownActor`], or any error of
    /// [`ActionScheduler::confirm_target`].
    pub fn confirm_target(
        &mut self,
        actor: ActorId,
        now: Tick,
        target: TargetRef,
        check: ResourceCheck,
    ) -> Result<Vec<Notice>, SchedulerError> {
        let timeline = lookup(&mut self.timelines, actor)?;
        self.scheduler.confirm_target(timeline, now, target, check)
    }

    /// Advances one actor's cast.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::UnknownActor`], or any error of
    /// [`ActionScheduler::tick`].
    pub fn tick(&mut self, actor: ActorId, now: Tick) -> Result<Vec<Notice>, SchedulerError> {
        let timeline = lookup(&mut self.timelines, actor)?;
        self.scheduler.tick(timeline, now)
    }

    /// Interrupts one kind. Unregistered actors have nothing to interrupt.
    pub fn interrupt(
        &mut self,
        actor: ActorId,
        kind: ActionKind,
        reason: InterruptReason,
    ) -> InterruptOutcome {
        match self.timelines.get_mut(&actor) {
            Some(timeline) => self.scheduler.interrupt(timeline, kind, reason),
            None => InterruptOutcome::default(),
        }
    }

    /// Interrupts every kind, as on death or disconnect.
    pub fn interrupt_all(&mut self, actor: ActorId, reason: InterruptReason) -> InterruptOutcome {
        match self.timelines.get_mut(&actor) {
            Some(timeline) => self.scheduler.interrupt_all(timeline, reason),
            None => InterruptOutcome::default(),
        }
    }

    /// Returns false while a committed cast roots the actor.
    #[must_use]
    pub fn can_move(&self, actor: ActorId) -> bool {
        self.timelines
            .get(&actor)
            .is_none_or(|timeline| self.scheduler.can_move(timeline))
    }

    /// Advances every actor with a cast in progress to `now`.
    ///
    /// Actors are processed in parallel. Only actors that produced notices
    /// appear in the result, sorted by actor ID.
    pub fn pulse(&mut self, now: Tick) -> Vec<(ActorId, Vec<Notice>)> {
        let scheduler = &self.scheduler;

        let mut results: Vec<(ActorId, Vec<Notice>)> = self
            .timelines
            .par_iter_mut()
            .filter(|(_, timeline)| timeline.cast().awaits_tick())
            .filter_map(|(&actor, timeline)| {
                scheduler
                    .tick(timeline, now)
                    .ok()
                    .filter(|notices| !notices.is_empty())
                    .map(|notices| (actor, notices))
            })
            .collect();

        // Sort for determinism
        results.sort_unstable_by_key(|(actor, _)| *actor);
        results
    }

    fn timeline_mut(&mut self, actor: ActorId) -> Result<&mut ActorTimeline, SchedulerError> {
        lookup(&mut self.timelines, actor)
    }
}

fn lookup(
    timelines: &mut BTreeMap<ActorId, ActorTimeline>,
    actor: ActorId,
) -> Result<&mut ActorTimeline, SchedulerError> {
    timelines.get_mut(&actor).ok_or_else(|| {
        warn!(actor = %actor, "operation on unregistered actor");
        SchedulerError::UnknownActor { actor }
    })
}
