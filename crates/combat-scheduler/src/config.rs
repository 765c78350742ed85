//! Scheduler configuration snapshot.
//!
//! [`SchedulerConfig`] is an immutable value threaded into the scheduler by the
//! host. It is read on every action attempt, so operators can swap in a new
//! snapshot without restarting actor sessions. Changing [`TimingMode`] is the
//! exception: timestamps computed under one mode are meaningless under the
//! other, so the registry resets every timeline when the mode changes.
//!
//! # Example
//!
//! ```
//! use combat_scheduler::config::{InterruptReason, SchedulerConfig, TimingMode};
//!
//! let config = SchedulerConfig::from_json(r#"{
//!     "timing_mode": "LegacyGlobalRecovery",
//!     "global_recovery_ms": 1000
//! }"#).unwrap();
//!
//! assert_eq!(config.timing_mode, TimingMode::LegacyGlobalRecovery);
//! assert!(config.swing_blocked_during_cast());
//! assert!(config.fizzles(InterruptReason::Death));
//! assert!(!config.fizzles(InterruptReason::Damage));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;
use crate::policy::{CancelOutcome, VictimClass};
use crate::timers::{ActionKind, ReadinessRules};

/// Process-wide timing philosophy.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimingMode {
    /// A shared recovery delay gates most actions; casts use a pre-target delay.
    LegacyGlobalRecovery,
    /// Each action kind has its own cooldown; casts target immediately and
    /// delay after the target is confirmed.
    #[default]
    IndependentPerActionTimers,
}

impl TimingMode {
    /// Returns true if the cast delay runs before the target cursor opens.
    #[must_use]
    pub const fn delays_before_target(self) -> bool {
        matches!(self, Self::LegacyGlobalRecovery)
    }
}

impl fmt::Display for TimingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LegacyGlobalRecovery => write!(f, "LegacyGlobalRecovery"),
            Self::IndependentPerActionTimers => write!(f, "IndependentPerActionTimers"),
        }
    }
}

/// Why an external system is asking to interrupt an in-flight action.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InterruptReason {
    /// The actor started another action.
    NewAction,
    /// The actor died.
    Death,
    /// Paralysis took hold.
    Paralysis,
    /// The actor took damage.
    Damage,
    /// The actor moved.
    Movement,
    /// Equipment was changed.
    EquipmentChange,
    /// The actor's session disconnected.
    Disconnect,
}

/// Replaces one cell of the default cancellation table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOverride {
    /// Action being started.
    pub initiator: ActionKind,
    /// In-flight action it meets.
    pub victim: VictimClass,
    /// Outcome to apply instead of the default.
    pub outcome: CancelOutcome,
}

/// Immutable configuration snapshot consulted by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Timing philosophy. Changing it requires a full timer reset.
    pub timing_mode: TimingMode,
    /// When set, only reasons in `fizzle_triggers` can fizzle a committed cast.
    pub restricted_fizzle_triggers: bool,
    /// Interrupt reasons allowed to fizzle a committed cast.
    pub fizzle_triggers: Vec<InterruptReason>,
    /// Legacy toggle: incoming damage fizzles. Ignored while
    /// `restricted_fizzle_triggers` is set.
    pub damage_fizzle: bool,
    /// Block movement while a cast is committed.
    pub block_movement_while_committed: bool,
    /// Overrides whether swings wait for a cast to resolve. `None` follows the
    /// timing mode.
    pub swing_blocked_during_cast: Option<bool>,
    /// Shared recovery applied after every action in legacy mode.
    pub global_recovery_ms: u64,
    /// Spell recovery applied after a cast in independent mode.
    pub independent_spell_recovery_ms: u64,
    /// Maximum cast-time reduction at full skill, in percent.
    pub max_cast_reduction_pct: u32,
    /// Panic on caller invariant violations instead of warning and resetting.
    pub strict_invariants: bool,
    /// Replacements for cells of the default cancellation table.
    pub cancellation_overrides: Vec<RuleOverride>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timing_mode: TimingMode::default(),
            restricted_fizzle_triggers: true,
            fizzle_triggers: vec![
                InterruptReason::NewAction,
                InterruptReason::Death,
                InterruptReason::Paralysis,
            ],
            damage_fizzle: false,
            block_movement_while_committed: false,
            swing_blocked_during_cast: None,
            global_recovery_ms: Self::DEFAULT_GLOBAL_RECOVERY_MS,
            independent_spell_recovery_ms: 0,
            max_cast_reduction_pct: Self::DEFAULT_MAX_CAST_REDUCTION_PCT,
            strict_invariants: cfg!(debug_assertions),
            cancellation_overrides: Vec::new(),
        }
    }
}

impl SchedulerConfig {
    /// Default legacy recovery delay.
    pub const DEFAULT_GLOBAL_RECOVERY_MS: u64 = 750;
    /// Default maximum cast-time reduction.
    pub const DEFAULT_MAX_CAST_REDUCTION_PCT: u32 = 25;

    /// Default configuration for `mode`.
    #[must_use]
    pub fn for_mode(mode: TimingMode) -> Self {
        Self {
            timing_mode: mode,
            ..Self::default()
        }
    }

    /// Parses and validates a JSON document. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and any error from
    /// [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ReductionOutOfRange`] if `max_cast_reduction_pct > 100`
    /// - [`ConfigError::DuplicateOverride`] if two overrides target the same cell
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_cast_reduction_pct > 100 {
            return Err(ConfigError::ReductionOutOfRange(self.max_cast_reduction_pct));
        }
        for (i, a) in self.cancellation_overrides.iter().enumerate() {
            if self.cancellation_overrides[i + 1..]
                .iter()
                .any(|b| a.initiator == b.initiator && a.victim == b.victim)
            {
                return Err(ConfigError::DuplicateOverride {
                    initiator: a.initiator,
                    victim: a.victim,
                });
            }
        }
        Ok(())
    }

    /// Returns true if `reason` may fizzle a committed cast.
    ///
    /// With restricted triggers on, the allow-list is authoritative and
    /// `damage_fizzle` is ignored. With them off, every reason fizzles except
    /// damage (unless `damage_fizzle`) and movement (unless movement is
    /// blocked while committed).
    #[must_use]
    pub fn fizzles(&self, reason: InterruptReason) -> bool {
        if self.restricted_fizzle_triggers {
            return self.fizzle_triggers.contains(&reason);
        }
        match reason {
            InterruptReason::Damage => self.damage_fizzle,
            InterruptReason::Movement => self.block_movement_while_committed,
            _ => true,
        }
    }

    /// Whether a swing must wait until no cast is in flight.
    #[must_use]
    pub fn swing_blocked_during_cast(&self) -> bool {
        self.swing_blocked_during_cast
            .unwrap_or(self.timing_mode == TimingMode::LegacyGlobalRecovery)
    }

    /// Recovery added to the spell timer when a cast completes.
    #[must_use]
    pub fn spell_recovery_ms(&self) -> u64 {
        match self.timing_mode {
            TimingMode::LegacyGlobalRecovery => self.global_recovery_ms,
            TimingMode::IndependentPerActionTimers => self.independent_spell_recovery_ms,
        }
    }

    /// Readiness rules for [`ActionTimerSet::is_ready`](crate::timers::ActionTimerSet::is_ready).
    #[must_use]
    pub fn readiness(&self) -> ReadinessRules {
        ReadinessRules {
            swing_blocked_during_cast: self.swing_blocked_during_cast(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod default_tests {
        use super::*;

        #[test]
        fn defaults_match_documented_values() {
            let config = SchedulerConfig::default();
            assert_eq!(config.timing_mode, TimingMode::IndependentPerActionTimers);
            assert!(config.restricted_fizzle_triggers);
            assert!(!config.damage_fizzle);
            assert!(!config.block_movement_while_committed);
            assert_eq!(config.max_cast_reduction_pct, 25);
            assert_eq!(config.spell_recovery_ms(), 0);
        }

        #[test]
        fn default_allow_list_excludes_damage_and_movement() {
            let config = SchedulerConfig::default();
            assert!(config.fizzles(InterruptReason::NewAction));
            assert!(config.fizzles(InterruptReason::Death));
            assert!(config.fizzles(InterruptReason::Paralysis));
            assert!(!config.fizzles(InterruptReason::Damage));
            assert!(!config.fizzles(InterruptReason::Movement));
            assert!(!config.fizzles(InterruptReason::EquipmentChange));
        }

        #[test]
        fn legacy_recovery_applies_to_spells() {
            let config = SchedulerConfig::for_mode(TimingMode::LegacyGlobalRecovery);
            assert_eq!(config.spell_recovery_ms(), 750);
        }
    }

    mod precedence_tests {
        use super::*;

        #[test]
        fn restricted_triggers_override_damage_toggle() {
            let config = SchedulerConfig {
                damage_fizzle: true,
                ..SchedulerConfig::default()
            };
            assert!(!config.fizzles(InterruptReason::Damage));
        }

        #[test]
        fn damage_toggle_applies_when_unrestricted() {
            let mut config = SchedulerConfig {
                restricted_fizzle_triggers: false,
                ..SchedulerConfig::default()
            };
            assert!(!config.fizzles(InterruptReason::Damage));
            assert!(config.fizzles(InterruptReason::EquipmentChange));

            config.damage_fizzle = true;
            assert!(config.fizzles(InterruptReason::Damage));
        }

        #[test]
        fn damage_in_allow_list_fizzles() {
            let mut config = SchedulerConfig::default();
            config.fizzle_triggers.push(InterruptReason::Damage);
            assert!(config.fizzles(InterruptReason::Damage));
        }
    }

    mod swing_gate_tests {
        use super::*;

        #[test]
        fn swing_gate_follows_mode() {
            assert!(!SchedulerConfig::default().swing_blocked_during_cast());
            assert!(SchedulerConfig::for_mode(TimingMode::LegacyGlobalRecovery)
                .swing_blocked_during_cast());
        }

        #[test]
        fn explicit_swing_gate_wins() {
            let config = SchedulerConfig {
                swing_blocked_during_cast: Some(true),
                ..SchedulerConfig::default()
            };
            assert!(config.readiness().swing_blocked_during_cast);
        }
    }

    mod json_tests {
        use super::*;
        use crate::policy::CancellationPolicy;

        #[test]
        fn empty_document_is_default() {
            let config = SchedulerConfig::from_json("{}").unwrap();
            assert_eq!(config, SchedulerConfig::default());
        }

        #[test]
        fn overrides_parse() {
            let config = SchedulerConfig::from_json(
                r#"{
                    "cancellation_overrides": [
                        { "initiator": "Cast", "victim": "Bandage", "outcome": "CancelSilently" }
                    ]
                }"#,
            )
            .unwrap();
            let policy = CancellationPolicy::from_config(&config);
            assert_eq!(
                policy.resolve(ActionKind::Cast, VictimClass::Bandage),
                CancelOutcome::CancelSilently
            );
        }

        #[test]
        fn duplicate_overrides_are_rejected() {
            let err = SchedulerConfig::from_json(
                r#"{
                    "cancellation_overrides": [
                        { "initiator": "Swing", "victim": "Bandage", "outcome": "CancelSilently" },
                        { "initiator": "Swing", "victim": "Bandage", "outcome": "NoEffect" }
                    ]
                }"#,
            )
            .unwrap_err();
            assert!(matches!(err, ConfigError::DuplicateOverride { .. }));
        }

        #[test]
        fn reduction_above_100_is_rejected() {
            let err =
                SchedulerConfig::from_json(r#"{ "max_cast_reduction_pct": 150 }"#).unwrap_err();
            assert!(matches!(err, ConfigError::ReductionOutOfRange(150)));
        }

        #[test]
        fn malformed_json_is_a_parse_error() {
            let err = SchedulerConfig::from_json("{ not json").unwrap_err();
            assert!(matches!(err, ConfigError::Parse(_)));
        }
    }
}
