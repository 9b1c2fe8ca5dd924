//! Timeval-style comparison and arithmetic used by the scheduler's timing
//! discipline. Modeled after the `tvcmp`/`tvadd`/`tvsub` trio of the original
//! implementation so the drift-absorbing math in [`crate::scheduler`] stays
//! testable with injected clocks instead of `Instant::now()`.

use std::cmp::Ordering;
use std::ops::{Add, Sub};

/// A wall-clock-independent instant, expressed as seconds and microseconds.
///
/// Kept as a plain `(sec, usec)` pair rather than `std::time::Duration` so
/// that scheduler tests can construct exact, reproducible instants without
/// going through the real clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeVal {
    pub sec: i64,
    pub usec: i64,
}

impl TimeVal {
    pub const ZERO: TimeVal = TimeVal { sec: 0, usec: 0 };

    pub fn new(sec: i64, usec: i64) -> Self {
        let mut tv = TimeVal { sec, usec };
        tv.normalize();
        tv
    }

    pub fn from_millis(ms: i64) -> Self {
        Self::new(ms / 1000, (ms % 1000) * 1000)
    }

    pub fn as_millis(&self) -> i64 {
        self.sec * 1000 + self.usec / 1000
    }

    fn normalize(&mut self) {
        while self.usec >= 1_000_000 {
            self.usec -= 1_000_000;
            self.sec += 1;
        }
        while self.usec < 0 {
            self.usec += 1_000_000;
            self.sec -= 1;
        }
    }

    /// Three-way comparison matching the original `tvcmp()`.
    pub fn cmp(&self, other: &TimeVal) -> Ordering {
        match self.sec.cmp(&other.sec) {
            Ordering::Equal => self.usec.cmp(&other.usec),
            ord => ord,
        }
    }

    /// Saturating subtraction: negative results clamp to zero, matching the
    /// original's "don't schedule past/negative intervals" requirement.
    pub fn saturating_sub(&self, other: TimeVal) -> TimeVal {
        let mut sec = self.sec - other.sec;
        let mut usec = self.usec - other.usec;
        if usec < 0 {
            sec -= 1;
            usec += 1_000_000;
        }
        if sec < 0 {
            sec = 0;
            usec = 0;
        }
        TimeVal { sec, usec }
    }
}

impl Add for TimeVal {
    type Output = TimeVal;
    fn add(self, rhs: TimeVal) -> TimeVal {
        TimeVal::new(self.sec + rhs.sec, self.usec + rhs.usec)
    }
}

impl Sub for TimeVal {
    type Output = TimeVal;
    fn sub(self, rhs: TimeVal) -> TimeVal {
        self.saturating_sub(rhs)
    }
}

impl PartialOrd for TimeVal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeVal {
    fn cmp(&self, other: &Self) -> Ordering {
        TimeVal::cmp(self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_clamps_to_zero() {
        let left = TimeVal::new(1, 0);
        let right = TimeVal::new(2, 0);
        assert_eq!(left.saturating_sub(right), TimeVal::ZERO);
    }

    #[test]
    fn add_carries_usec() {
        let a = TimeVal::new(0, 900_000);
        let b = TimeVal::new(0, 200_000);
        assert_eq!(a + b, TimeVal::new(1, 100_000));
    }

    #[test]
    fn cmp_orders_by_sec_then_usec() {
        assert_eq!(TimeVal::new(1, 0).cmp(&TimeVal::new(1, 1)), Ordering::Less);
        assert_eq!(TimeVal::new(2, 0).cmp(&TimeVal::new(1, 0)), Ordering::Greater);
    }

    #[test]
    fn millis_roundtrip() {
        let tv = TimeVal::from_millis(1500);
        assert_eq!(tv, TimeVal::new(1, 500_000));
        assert_eq!(tv.as_millis(), 1500);
    }
}
