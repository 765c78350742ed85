//! Test module for scenario, determinism and property tests.
//!
//! This module exercises the scheduler end to end:
//! - **Scenario tests**: Cancellation hierarchy, scroll parity, fizzle guards
//! - **Determinism tests**: Same seed and inputs produce identical notices
//! - **Property tests**: Invariants over generated action streams
//!
//! # Test Structure
//!
//! - `integration.rs`: End-to-end scenarios through the scheduler and registry
//! - `determinism.rs`: Seeded random action streams replayed twice
//! - `properties.rs`: proptest invariants
//! - `helpers.rs`: Fixtures and shorthand for driving a timeline

mod determinism;
mod helpers;

// Re-export for convenience
pub use helpers::*;
