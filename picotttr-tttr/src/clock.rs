//! Sync clock of the encoder.

use picotttr_core::{Error, OverflowState, Result, WRAPAROUND};

/// Local 16-bit sync counter plus the overflow accumulated so far.
///
/// `nsync` stays in `[0, 65536)`; every advance past the period returns the
/// number of wraparound records the caller must emit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncClock {
    nsync: u64,
    overflow: OverflowState,
}

impl SyncClock {
    /// Clock at absolute time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Local counter value written into records.
    #[inline]
    #[must_use]
    pub fn nsync(&self) -> u64 {
        self.nsync
    }

    /// Accumulated overflow ticks.
    #[inline]
    #[must_use]
    pub fn ofltime(&self) -> u64 {
        self.overflow.ofltime()
    }

    /// Absolute sync time.
    #[inline]
    #[must_use]
    pub fn now(&self) -> u64 {
        self.overflow.global_sync(self.nsync)
    }

    /// Moves forward by `ticks`.
    ///
    /// Returns the number of wraparounds crossed.
    pub fn advance(&mut self, ticks: u64) -> u64 {
        self.nsync += ticks;
        let wraps = self.nsync / WRAPAROUND;
        if wraps > 0 {
            self.overflow.add_wraparounds(WRAPAROUND, wraps);
            self.nsync %= WRAPAROUND;
        }
        wraps
    }

    /// Moves forward to absolute time `target`.
    ///
    /// Returns the number of wraparounds crossed.
    ///
    /// # Errors
    /// Returns [`Error::TimeRegression`] if `target` is before [`SyncClock::now`].
    pub fn advance_to(&mut self, target: u64) -> Result<u64> {
        let current = self.now();
        if target < current {
            return Err(Error::TimeRegression { current, target });
        }
        Ok(self.advance(target - current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraparound_split() {
        let k = 3;
        let r = 1_234;
        let mut clock = SyncClock::new();
        let mut wraps = 0;
        // uneven increments summing to k * 65536 + r
        for step in [65_000, 1_000, 60_000, 70_000, 1_842] {
            wraps += clock.advance(step);
        }
        assert_eq!(65_000 + 1_000 + 60_000 + 70_000 + 1_842, k * 65_536 + r);
        assert_eq!(wraps, k);
        assert_eq!(clock.ofltime(), k * 65_536);
        assert_eq!(clock.nsync(), r);
    }

    #[test]
    fn test_large_advance_emits_several_wraps() {
        let mut clock = SyncClock::new();
        assert_eq!(clock.advance(3 * 65_536), 3);
        assert_eq!(clock.nsync(), 0);
    }

    #[test]
    fn test_advance_to() {
        let mut clock = SyncClock::new();
        assert_eq!(clock.advance_to(65_540).unwrap(), 1);
        assert_eq!(clock.nsync(), 4);
        assert_eq!(clock.advance_to(65_540).unwrap(), 0);

        let err = clock.advance_to(65_539).unwrap_err();
        assert!(matches!(
            err,
            Error::TimeRegression {
                current: 65_540,
                target: 65_539
            }
        ));
        assert_eq!(clock.now(), 65_540);
    }
}
