//! # Combat Scheduler
//!
//! Server-authoritative scheduling of timed combat actions.
//!
//! This crate decides whether an actor may start a swing, a spell, a bandage
//! or a wand use at a given instant, which in-flight actions the new one
//! cancels, and when each action may next be attempted. Spells follow a
//! two-phase state machine: targeting (nothing spent, free to cancel) and
//! committed (resources spent, cancelling forfeits them as a fizzle).
//!
//! ## Architecture
//!
//! - **Timers**: [`timers::ActionTimerSet`] holds one deadline per action kind
//!   plus the in-flight flags.
//! - **Policy**: [`policy::CancellationPolicy`] is the total rule table for
//!   "X begins while Y is in flight".
//! - **Casting**: [`cast::CastSequence`] runs the targeting and committed
//!   phases under either timing mode.
//! - **Scheduler**: [`scheduler::ActionScheduler`] admits, completes and
//!   interrupts actions against an [`scheduler::ActorTimeline`].
//! - **Registry**: [`registry::ActorRegistry`] stores every actor's timeline
//!   and advances casts in parallel.
//!
//! The core never reads a clock and never performs side effects. Every
//! operation takes `now` explicitly and returns [`notice::Notice`]s for the
//! host to carry out.
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use combat_scheduler::actor::{ActorCondition, ActorId};
//! use combat_scheduler::clock::Tick;
//! use combat_scheduler::config::{InterruptReason, SchedulerConfig};
//! use combat_scheduler::registry::ActorRegistry;
//! use combat_scheduler::scheduler::ActionRequest;
//! use combat_scheduler::timers::ActionKind;
//!
//! let mut registry = ActorRegistry::new(Arc::new(SchedulerConfig::default()));
//! let healer = ActorId::new(1);
//!
//! let status = ActorCondition::Free;
//! let result = registry.try_begin(healer, &status, ActionRequest::Bandage, Tick::ZERO);
//! assert!(result.is_admitted());
//!
//! // Damage does not interrupt under the default allow-list.
//! let outcome = registry.interrupt(healer, ActionKind::Bandage, InterruptReason::Damage);
//! assert!(!outcome.did_fizzle);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod actor;
pub mod cast;
pub mod clock;
pub mod config;
pub mod error;
pub mod notice;
pub mod pending;
pub mod policy;
pub mod registry;
pub mod scheduler;
pub mod spell;
pub mod timers;

pub use actor::{ActorCondition, ActorId, ActorStatus};
pub use cast::{CastSequence, CastState, ResourceCheck};
pub use clock::Tick;
pub use config::{InterruptReason, SchedulerConfig, TimingMode};
pub use error::{ConfigError, SchedulerError};
pub use notice::{Notice, TargetRef};
pub use pending::{ActionHandle, CastPhase, PendingAction};
pub use policy::{CancelOutcome, CancellationPolicy, VictimClass};
pub use registry::ActorRegistry;
pub use scheduler::{
    ActionRequest, ActionScheduler, ActorTimeline, AdmitResult, DenyReason, InterruptOutcome,
};
pub use spell::{ResourceCost, SpellBook, SpellCatalog, SpellId, SpellMeta, SpellSource};
pub use timers::{ActionFlags, ActionKind, ActionTimerSet};

#[cfg(test)]
mod tests;
