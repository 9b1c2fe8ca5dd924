//! Slot-pacing scheduler: spreads `N` targets evenly across each `T`-second
//! round so exactly one probe goes out per `T/N` slot, instead of bursting
//! all `N` probes at once.
//!
//! Mirrors the original's `check_timers`/`tvadd` timing discipline: each
//! slot's deadline is computed by adding the slot interval to the
//! *previous* deadline, not to the current clock reading, so a late wakeup
//! doesn't permanently shift the schedule. A deadline that's still behind
//! after that single addition is snapped forward to `now` rather than left
//! to queue up a burst of catch-up slots.

use crate::time::TimeVal;

#[derive(Debug, Clone, Copy)]
pub struct SlotTick {
    /// Index of the target whose probe slot this is.
    pub target_index: usize,
    /// Round number in effect for this slot (stamped as the probe's
    /// sequence number).
    pub round: u32,
    /// Set when this was the last target's slot in its round — the caller
    /// should advance the history ring before recording this sample.
    pub wrapped: bool,
    /// Index of the target that was active one slot ago (`None` on the very
    /// first tick) — the one whose slot just closed, and so the one to
    /// check for a timeout before this tick's probe goes out. This is
    /// *not* the same target as `target_index` except in a single-target
    /// registry: under round-robin it's the previous slot's occupant, one
    /// `T/N` tick behind, not one full round behind.
    pub elapsed_index: Option<usize>,
}

#[derive(Debug)]
pub struct Scheduler {
    slot_interval: TimeVal,
    next_deadline: TimeVal,
    target_count: usize,
    cursor: usize,
    round: u32,
    /// The target probed by the most recent `tick()` call, carried over so
    /// the *next* call can report it as `elapsed_index`.
    previous_index: Option<usize>,
}

impl Scheduler {
    /// Builds a scheduler for `target_count` targets probed once every
    /// `interval_secs` seconds in aggregate. Returns `None` for zero
    /// targets, a degenerate configuration the caller should treat as
    /// fatal-startup.
    pub fn new(target_count: usize, interval_secs: u32, now: TimeVal) -> Option<Self> {
        if target_count == 0 {
            return None;
        }
        let slot_millis = (interval_secs as i64 * 1000) / target_count as i64;
        let slot_interval = TimeVal::from_millis(slot_millis.max(0));
        Some(Self {
            slot_interval,
            next_deadline: now + slot_interval,
            target_count,
            cursor: 0,
            round: 1,
            previous_index: None,
        })
    }

    pub fn slot_interval(&self) -> TimeVal {
        self.slot_interval
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// How long until the next slot is due, clamped to zero if it's already
    /// overdue. Feed this directly to the poll/select timeout.
    pub fn poll_timeout(&self, now: TimeVal) -> TimeVal {
        self.next_deadline.saturating_sub(now)
    }

    pub fn is_due(&self, now: TimeVal) -> bool {
        now >= self.next_deadline
    }

    /// Consumes the due slot, advancing the cursor and (on wraparound) the
    /// round counter, and reschedules the next deadline.
    pub fn tick(&mut self, now: TimeVal) -> SlotTick {
        let target_index = self.cursor;
        let round = self.round;
        let elapsed_index = self.previous_index;
        self.previous_index = Some(target_index);

        self.cursor += 1;
        let wrapped = self.cursor == self.target_count;
        if wrapped {
            self.cursor = 0;
            self.round += 1;
        }

        self.next_deadline = self.next_deadline + self.slot_interval;
        if self.next_deadline < now {
            self.next_deadline = now;
        }

        SlotTick {
            target_index,
            round,
            wrapped,
            elapsed_index,
        }
    }

    /// The target currently holding an outstanding probe, i.e. the target
    /// of the most recent `tick()` call. `on_reply` gates a live match on
    /// this, in addition to the sequence number, so a reply can only be
    /// classified against the one target the scheduler currently considers
    /// active.
    pub fn active_target(&self) -> Option<usize> {
        self.previous_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_interval_divides_round_evenly() {
        let sched = Scheduler::new(4, 60, TimeVal::ZERO).unwrap();
        assert_eq!(sched.slot_interval(), TimeVal::from_millis(15_000));
    }

    #[test]
    fn ticks_cycle_through_targets_and_wrap_round() {
        let mut sched = Scheduler::new(3, 30, TimeVal::ZERO).unwrap();
        let mut now = TimeVal::ZERO;
        for expected_index in 0..3 {
            now = sched.poll_timeout(now) + now;
            assert!(sched.is_due(now));
            let tick = sched.tick(now);
            assert_eq!(tick.target_index, expected_index);
            assert_eq!(tick.round, 1);
            assert_eq!(tick.wrapped, expected_index == 2);
        }
        assert_eq!(sched.round(), 2);
    }

    #[test]
    fn elapsed_index_lags_target_index_by_one_slot_not_one_round() {
        let mut sched = Scheduler::new(3, 30, TimeVal::ZERO).unwrap();
        let mut now = TimeVal::ZERO;

        now = sched.poll_timeout(now) + now;
        let t1 = sched.tick(now);
        assert_eq!(t1.target_index, 0);
        assert_eq!(t1.elapsed_index, None, "nothing has been probed yet");
        assert_eq!(sched.active_target(), Some(0));

        now = sched.poll_timeout(now) + now;
        let t2 = sched.tick(now);
        assert_eq!(t2.target_index, 1);
        assert_eq!(t2.elapsed_index, Some(0), "target 0's slot from one tick ago just elapsed");
        assert_eq!(sched.active_target(), Some(1));

        now = sched.poll_timeout(now) + now;
        let t3 = sched.tick(now);
        assert_eq!(t3.target_index, 2);
        assert_eq!(t3.elapsed_index, Some(1));
    }

    #[test]
    fn poll_timeout_clamps_to_zero_when_overdue() {
        let sched = Scheduler::new(2, 10, TimeVal::ZERO).unwrap();
        let far_future = TimeVal::new(1_000, 0);
        assert_eq!(sched.poll_timeout(far_future), TimeVal::ZERO);
    }

    #[test]
    fn late_tick_does_not_accumulate_backlog() {
        let mut sched = Scheduler::new(1, 10, TimeVal::ZERO).unwrap();
        // First slot due at t=10s; wake up very late, at t=100s.
        let very_late = TimeVal::new(100, 0);
        let tick = sched.tick(very_late);
        assert_eq!(tick.target_index, 0);
        // The next deadline should be snapped to "now", not left sitting
        // far in the past (which would make the following tick fire
        // instantly too, and the one after that, etc).
        assert_eq!(sched.poll_timeout(very_late), TimeVal::ZERO);
        assert!(sched.next_deadline >= very_late);
    }

    #[test]
    fn zero_targets_is_rejected() {
        assert!(Scheduler::new(0, 60, TimeVal::ZERO).is_none());
    }
}
