//! Fixed-size ring of per-round, per-target samples, used to compute
//! rolling-window statistics on demand (when a host-info panel is opened).
//!
//! Mirrors the original's `histlog` array of `passdata`, but sized and
//! allocated once up front (no per-round `malloc`) and addressed with a
//! wrapping index instead of a raw pointer.

use crate::target::State;

/// One target's sample within a completed round. `None` means the slot was
/// never written (used to bound the rolling-window walk once the ring has
/// not yet filled up).
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotSample {
    pub rtt: u32,
    pub state: Option<State>,
}

/// One full round: a wall-clock timestamp and one sample per target,
/// indexed by `Target::num`.
#[derive(Debug, Clone)]
pub struct RoundSample {
    pub time: i64,
    pub samples: Vec<SlotSample>,
}

impl RoundSample {
    fn empty(targets: usize) -> Self {
        Self {
            time: 0,
            samples: vec![SlotSample::default(); targets],
        }
    }
}

/// Rolling-window statistics as returned by [`HistoryRing::window_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowStats {
    pub count: u32,
    pub rttmin: u32,
    pub rttavg: u32,
    pub rttmax: u32,
    pub okavg: u32,
    pub delaycount: u32,
    pub losscount: u32,
    pub stddev: f64,
}

/// Fixed-length ring buffer of [`RoundSample`]s, allocated once at startup
/// and never resized. The head advances exactly once per completed round.
#[derive(Debug)]
pub struct HistoryRing {
    rounds: Vec<RoundSample>,
    head: usize,
    capacity: usize,
    target_count: usize,
}

impl HistoryRing {
    /// Allocates a ring of `capacity` rounds for `target_count` targets.
    /// Returns `None` if either dimension is zero, a degenerate
    /// configuration the caller should treat as fatal-startup.
    pub fn new(capacity: usize, target_count: usize) -> Option<Self> {
        if capacity == 0 || target_count == 0 {
            return None;
        }
        Some(Self {
            rounds: (0..capacity).map(|_| RoundSample::empty(target_count)).collect(),
            head: 0,
            capacity,
            target_count,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Advances the ring head, starting a fresh round entry to be filled in
    /// by `record`. Called once per completed round (when the scheduler
    /// wraps back to the first target).
    pub fn advance(&mut self, now: i64) {
        self.head = (self.head + 1) % self.capacity;
        let slot = &mut self.rounds[self.head];
        slot.time = now;
        for s in slot.samples.iter_mut() {
            *s = SlotSample::default();
        }
    }

    /// Records a target's outcome in the current round's slot.
    pub fn record(&mut self, target_num: usize, rtt: u32, state: State) {
        if let Some(slot) = self.rounds[self.head].samples.get_mut(target_num) {
            slot.rtt = rtt;
            slot.state = Some(state);
        }
    }

    pub fn current_round(&self) -> &RoundSample {
        &self.rounds[self.head]
    }

    /// Walks backward from the most recent round, skipping unwritten slots,
    /// and aggregates everything found for `target_num` into a
    /// [`WindowStats`]. Loss samples count toward `count`/`losscount` but not
    /// toward `rttmin`/`rttavg`/`rttmax`/`okavg`.
    pub fn window_stats(&self, target_num: usize) -> WindowStats {
        let mut count = 0u32;
        let mut totsum: u64 = 0;
        let mut sqsum: f64 = 0.0;
        let mut oksum: u64 = 0;
        let mut okcount = 0u32;
        let mut delaycount = 0u32;
        let mut losscount = 0u32;
        let mut rttmin = u32::MAX;
        let mut rttmax = 0u32;

        for offset in 0..self.capacity {
            let idx = (self.head + self.capacity - offset) % self.capacity;
            let sample = match self.rounds[idx].samples.get(target_num) {
                Some(s) => s,
                None => break,
            };
            let state = match sample.state {
                Some(s) => s,
                None => break,
            };
            count += 1;
            if state == State::Loss {
                losscount += 1;
                continue;
            }
            totsum += sample.rtt as u64;
            sqsum += (sample.rtt as f64).powi(2);
            rttmin = rttmin.min(sample.rtt);
            rttmax = rttmax.max(sample.rtt);
            if state == State::Lag {
                delaycount += 1;
            } else if state != State::Jitter {
                oksum += sample.rtt as u64;
                okcount += 1;
            }
        }

        let rttavg = if count > losscount {
            (totsum / (count - losscount) as u64) as u32
        } else {
            0
        };
        let okavg = if okcount > 0 { (oksum / okcount as u64) as u32 } else { 0 };
        let stddev = if count > losscount {
            let n = (count - losscount) as f64;
            let variance = sqsum / n - (rttavg as f64).powi(2);
            variance.max(0.0).sqrt()
        } else {
            0.0
        };

        WindowStats {
            count,
            rttmin: if rttmin == u32::MAX { 0 } else { rttmin },
            rttavg,
            rttmax,
            okavg,
            delaycount,
            losscount,
            stddev,
        }
    }

    pub fn target_count(&self) -> usize {
        self.target_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::State;

    #[test]
    fn empty_ring_returns_zeroed_stats() {
        let ring = HistoryRing::new(4, 2).unwrap();
        assert_eq!(ring.window_stats(0), WindowStats::default());
    }

    #[test]
    fn skips_unwritten_slots() {
        let mut ring = HistoryRing::new(4, 1).unwrap();
        ring.advance(1);
        ring.record(0, 10, State::Ok);
        ring.advance(2);
        // Leave this round's slot unwritten.
        let stats = ring.window_stats(0);
        assert_eq!(stats.count, 0, "unwritten head slot should stop the walk immediately");
    }

    #[test]
    fn aggregates_across_rounds_excluding_loss_from_rtt_stats() {
        let mut ring = HistoryRing::new(4, 1).unwrap();
        ring.advance(1);
        ring.record(0, 10, State::Ok);
        ring.advance(2);
        ring.record(0, 20, State::Ok);
        ring.advance(3);
        ring.record(0, 0, State::Loss);
        let stats = ring.window_stats(0);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.losscount, 1);
        assert_eq!(stats.rttmin, 10);
        assert_eq!(stats.rttmax, 20);
        assert_eq!(stats.rttavg, 15);
    }

    #[test]
    fn stddev_never_nan_or_negative() {
        let mut ring = HistoryRing::new(2, 1).unwrap();
        ring.advance(1);
        ring.record(0, 10, State::Ok);
        let stats = ring.window_stats(0);
        assert!(!stats.stddev.is_nan());
        assert!(stats.stddev >= 0.0);
    }

    #[test]
    fn wraps_around_capacity() {
        let mut ring = HistoryRing::new(2, 1).unwrap();
        for round in 1..=5i64 {
            ring.advance(round);
            ring.record(0, round as u32, State::Ok);
        }
        // Only the last 2 rounds survive a capacity-2 ring.
        let stats = ring.window_stats(0);
        assert_eq!(stats.count, 2);
        assert_eq!(stats.rttmin, 4);
        assert_eq!(stats.rttmax, 5);
    }
}
