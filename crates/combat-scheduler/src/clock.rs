//! Millisecond timestamps.
//!
//! The core never reads a clock. Every public operation takes `now` as an
//! explicit [`Tick`], so identical call sequences always produce identical state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Absolute timestamp on the host's monotonic clock, in milliseconds.
///
/// `Tick::ZERO` is the "always elapsed" value used for freshly reset timers.
///
/// # Example
///
/// ```
/// use combat_scheduler::clock::Tick;
///
/// let now = Tick::new(1_000);
/// assert_eq!(now.offset(250), Tick::new(1_250));
///
/// // Non-positive delays mean "ready immediately".
/// assert_eq!(now.offset(-50), Tick::new(950));
/// assert!(now.offset(-50) <= now);
/// ```
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tick(u64);

impl Tick {
    /// The origin of the clock. Every timer at `ZERO` has elapsed.
    pub const ZERO: Self = Self(0);

    /// Creates a timestamp from raw milliseconds.
    #[must_use]
    pub const fn new(ms: u64) -> Self {
        Self(ms)
    }

    /// Returns the raw millisecond value.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Returns `self + delay_ms`, saturating at both ends of the range.
    ///
    /// Negative delays are accepted and yield a timestamp at or before `self`.
    #[must_use]
    pub const fn offset(self, delay_ms: i64) -> Self {
        if delay_ms >= 0 {
            Self(self.0.saturating_add(delay_ms.unsigned_abs()))
        } else {
            Self(self.0.saturating_sub(delay_ms.unsigned_abs()))
        }
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

impl From<u64> for Tick {
    fn from(ms: u64) -> Self {
        Self::new(ms)
    }
}
