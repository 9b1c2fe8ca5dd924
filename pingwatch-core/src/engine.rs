//! Owning aggregate that wires the registry, history ring, scheduler and
//! classifier together into the single `next_probe` / `on_reply` interface
//! the event loop drives.
//!
//! The original interleaves this orchestration directly into `main()` and
//! `check_timers()`; pulling it into one type here keeps `ndown` correct by
//! construction (delegated to [`Registry::ndown`] rather than a counter
//! incremented/decremented by hand at every call site) and gives the binary
//! crate a narrow surface to drive from its poll loop.

use std::net::IpAddr;

use crate::classifier::{self, ReplyClassification};
use crate::config::Config;
use crate::error::CoreError;
use crate::history::{HistoryRing, WindowStats};
use crate::scheduler::Scheduler;
use crate::target::{Registry, Target};
use crate::time::TimeVal;

/// What the event loop should send next: an echo request to `addr`,
/// stamped with sequence number `seq` (the round number truncated to 16
/// bits, matching the original's `icmp_seq = pinground`).
#[derive(Debug, Clone, Copy)]
pub struct ProbeRequest {
    pub target_num: usize,
    pub addr: IpAddr,
    pub seq: u16,
    /// Set when the target whose slot ended one tick ago (not necessarily
    /// `target_num` — under round-robin it almost never is) still had a
    /// probe outstanding and was just settled as a loss. The caller's cue
    /// to sound the bell for *that* target if its `beepmode` is on-loss.
    pub settled_loss: Option<usize>,
}

pub struct Engine {
    registry: Registry,
    history: HistoryRing,
    scheduler: Scheduler,
    config: Config,
}

impl Engine {
    pub fn new(targets: Vec<Target>, config: Config, now: TimeVal) -> Result<Self, CoreError> {
        if targets.is_empty() {
            return Err(CoreError::NoTargets);
        }
        let target_count = targets.len();
        let history = HistoryRing::new(config.history_len, target_count)
            .ok_or(CoreError::HistoryAllocation { slots: config.history_len, targets: target_count })?;
        let scheduler = Scheduler::new(target_count, config.interval_secs, now)
            .ok_or(CoreError::IntervalTooShort { targets: target_count })?;
        Ok(Self {
            registry: Registry::new(targets),
            history,
            scheduler,
            config,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn history(&self) -> &HistoryRing {
        &self.history
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn round(&self) -> u32 {
        self.scheduler.round()
    }

    pub fn ndown(&self) -> usize {
        self.registry.ndown()
    }

    pub fn window_stats(&self, target_num: usize) -> WindowStats {
        self.history.window_stats(target_num)
    }

    /// How long the event loop's poll/select should block before the next
    /// slot comes due.
    pub fn poll_timeout(&self, now: TimeVal) -> TimeVal {
        self.scheduler.poll_timeout(now)
    }

    pub fn is_due(&self, now: TimeVal) -> bool {
        self.scheduler.is_due(now)
    }

    /// Advances to the next slot. The target whose slot just elapsed (one
    /// tick ago, *not* `target_num` — see [`ProbeRequest::settled_loss`])
    /// is checked first and settled as a loss if its probe is still
    /// outstanding; the new slot's target is then probed.
    pub fn next_probe(&mut self, now: TimeVal) -> ProbeRequest {
        let tick = self.scheduler.tick(now);

        if tick.target_index == 0 && tick.round > 1 {
            self.history.advance(now.sec);
        }

        let mut settled_loss = None;
        if let Some(elapsed_idx) = tick.elapsed_index {
            let elapsed_target = self
                .registry
                .get_mut(elapsed_idx)
                .expect("scheduler never yields an out-of-range target index");
            if elapsed_target.waitping.is_some() {
                classifier::apply_timeout(elapsed_target, now.sec);
                self.history.record(elapsed_idx, 0, crate::target::State::Loss);
                settled_loss = Some(elapsed_idx);
            }
        }

        let target = self
            .registry
            .get_mut(tick.target_index)
            .expect("scheduler never yields an out-of-range target index");
        target.waitping = Some(tick.round);
        let addr = target.addr;

        ProbeRequest {
            target_num: tick.target_index,
            addr,
            seq: (tick.round & 0xFFFF) as u16,
            settled_loss,
        }
    }

    /// Correlates an inbound reply by source address and sequence number.
    ///
    /// An address matching no target, or matching a target the scheduler
    /// doesn't currently consider active (`received_target != currtarget`
    /// in the original's terms), is treated as stale. A match against the
    /// currently active target whose sequence doesn't equal its
    /// outstanding `waitping` is likewise out-of-sync. Both update
    /// `rttlast` only, exactly as they would for a live probe, but never
    /// touch the running totals or classification state
    /// ([`ReplyOutcome::OutOfSync`]). Only a currently-active target with a
    /// matching sequence is classified ([`ReplyOutcome::Classified`]). No
    /// target at all is dropped with no side effects ([`ReplyOutcome::Unknown`]).
    pub fn on_reply(&mut self, addr: IpAddr, seq: u16, rtt_ms: u32) -> ReplyOutcome {
        let Some(idx) = self.registry.index_of_addr(&addr) else {
            return ReplyOutcome::Unknown;
        };
        let is_current = self.scheduler.active_target() == Some(idx);
        let target = self.registry.get_mut(idx).expect("index_of_addr only returns valid indices");

        let seq_matches = matches!(target.waitping, Some(w) if (w & 0xFFFF) as u16 == seq);
        if !is_current || !seq_matches {
            target.rttlast = rtt_ms;
            return ReplyOutcome::OutOfSync { rtt: rtt_ms };
        }

        let round = target.waitping.expect("seq_matches implies waitping is set");
        let classification = classifier::apply_reply(target, round, rtt_ms, &self.config);
        self.history.record(idx, rtt_ms, classification.state);
        ReplyOutcome::Classified(classification)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ReplyOutcome {
    Classified(ReplyClassification),
    OutOfSync { rtt: u32 },
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn target(num: usize, id: char, octet: u8) -> Target {
        Target::new(
            num,
            id,
            format!("host{octet}"),
            format!("10.0.0.{octet}"),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, octet)),
            0,
            false,
            None,
        )
    }

    fn engine() -> Engine {
        let targets = vec![target(0, 'A', 1), target(1, 'B', 2)];
        let config = Config { interval_secs: 2, ..Config::default() };
        Engine::new(targets, config, TimeVal::ZERO).unwrap()
    }

    #[test]
    fn rejects_empty_target_list() {
        let err = Engine::new(vec![], Config::default(), TimeVal::ZERO).unwrap_err();
        assert!(matches!(err, CoreError::NoTargets));
    }

    #[test]
    fn probes_round_robin_and_correlate_replies() {
        let mut e = engine();
        let now = e.poll_timeout(TimeVal::ZERO) + TimeVal::ZERO;

        let req0 = e.next_probe(now);
        assert_eq!(req0.target_num, 0);
        assert_eq!(req0.addr, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));

        let outcome = e.on_reply(req0.addr, req0.seq, 12);
        match outcome {
            ReplyOutcome::Classified(c) => assert_eq!(c.state, crate::target::State::Ok),
            other => panic!("expected Classified, got {other:?}"),
        }

        let req1 = e.next_probe(now);
        assert_eq!(req1.target_num, 1);
    }

    #[test]
    fn unknown_address_is_dropped_with_no_side_effects() {
        let mut e = engine();
        let req = e.next_probe(TimeVal::new(10, 0));
        let outcome = e.on_reply(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 99)), req.seq, 5);
        assert!(matches!(outcome, ReplyOutcome::Unknown));
        assert_eq!(e.registry().get(0).unwrap().rttlast, 0);
    }

    #[test]
    fn mismatched_sequence_updates_rttlast_only() {
        let mut e = engine();
        let req = e.next_probe(TimeVal::new(10, 0));
        let stale_seq = req.seq.wrapping_add(1);
        let outcome = e.on_reply(req.addr, stale_seq, 77);
        assert!(matches!(outcome, ReplyOutcome::OutOfSync { rtt: 77 }));
        let target = e.registry().get(0).unwrap();
        assert_eq!(target.rttlast, 77);
        assert_eq!(target.okcount, 0);
        assert_eq!(target.rttsum, 0);
    }

    #[test]
    fn missed_slot_is_recorded_as_loss_one_slot_later_not_one_round_later() {
        let mut e = engine();
        let now = TimeVal::new(10, 0);
        let first = e.next_probe(now);
        assert_eq!(first.target_num, 0);
        assert_eq!(first.settled_loss, None, "nothing outstanding on the very first slot");

        // Target 0's probe never gets a reply. The very next slot (target
        // 1's, one tick later) is where its timeout must be settled, not a
        // full round later.
        let later = TimeVal::new(20, 0);
        let second = e.next_probe(later);
        assert_eq!(second.target_num, 1);
        assert_eq!(second.settled_loss, Some(0));
        assert_eq!(e.registry().get(0).unwrap().losscount, 1);

        // Target 1 in turn times out and is settled on the slot after it.
        let third = e.next_probe(later);
        assert_eq!(third.target_num, 0);
        assert_eq!(third.settled_loss, Some(1));
        assert_eq!(e.registry().get(1).unwrap().losscount, 1);
    }

    #[test]
    fn late_reply_for_a_target_no_longer_current_is_out_of_sync() {
        let mut e = engine();
        let now = TimeVal::new(10, 0);
        let req0 = e.next_probe(now); // target 0 is current, waitping set
        let _req1 = e.next_probe(now); // target 1 becomes current; target 0's slot elapses

        // A reply for target 0 now arrives, matching its old sequence, but
        // target 0 is no longer the scheduler's active target.
        let outcome = e.on_reply(req0.addr, req0.seq, 42);
        assert!(matches!(outcome, ReplyOutcome::OutOfSync { rtt: 42 }));
        assert_eq!(e.registry().get(0).unwrap().rttlast, 42);
        assert_eq!(e.registry().get(0).unwrap().okcount, 0);
    }

    #[test]
    fn ndown_reflects_registry_after_two_consecutive_losses() {
        let targets = vec![target(0, 'A', 1)];
        let config = Config { interval_secs: 1, ..Config::default() };
        let mut e = Engine::new(targets, config, TimeVal::ZERO).unwrap();
        let now = TimeVal::new(10, 0);

        let _ = e.next_probe(now); // round 1: no prior probe, nothing to settle
        assert_eq!(e.ndown(), 0);
        let _ = e.next_probe(now); // round 2: round 1's probe times out, first loss
        assert_eq!(e.ndown(), 0, "a single loss does not yet mark the target down");
        let _ = e.next_probe(now); // round 3: round 2's probe times out, second consecutive loss
        assert_eq!(e.ndown(), 1);
        assert_eq!(e.registry().get(0).unwrap().losscount, 2);
    }
}
