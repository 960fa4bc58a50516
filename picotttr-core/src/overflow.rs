//! Accumulated overflow time.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Running overflow offset of a decode or encode pass.
///
/// Only overflow/wraparound records move it, and only forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OverflowState {
    ofltime: u64,
}

impl OverflowState {
    /// Creates a state at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated overflow in sync ticks.
    #[inline]
    #[must_use]
    pub fn ofltime(&self) -> u64 {
        self.ofltime
    }

    /// Adds `count` periods of `wraparound` ticks.
    #[inline]
    pub fn add_wraparounds(&mut self, wraparound: u64, count: u64) {
        self.ofltime = self.ofltime.saturating_add(wraparound.saturating_mul(count));
    }

    /// Absolute sync time of a record with local counter `nsync`.
    #[inline]
    #[must_use]
    pub fn global_sync(&self, nsync: u64) -> u64 {
        self.ofltime + nsync
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_accumulation() {
        let mut state = OverflowState::new();
        assert_eq!(state.ofltime(), 0);

        state.add_wraparounds(65_536, 1);
        state.add_wraparounds(1_024, 5);
        assert_eq!(state.ofltime(), 65_536 + 5 * 1_024);
        assert_eq!(state.global_sync(10), 65_536 + 5 * 1_024 + 10);
    }
}
