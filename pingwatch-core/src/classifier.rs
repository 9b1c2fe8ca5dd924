//! Per-reply classification (ok/jitter/lag) and per-timeout loss bookkeeping.
//!
//! Faithful to the original's ordering of operations: totals are updated
//! unconditionally first, then the state is assigned by the first matching
//! rule (§4.4), then the map color follows with the original's hysteresis
//! gate — a new classification only promotes `treecolor` when the
//! *previous* round's `lastcolor` was already at least as bad, which is why
//! a recovering `ok` (the least-bad state) always wins immediately while a
//! `jitter`/`lag` needs the previous round to already be that bad or worse.

use crate::config::Config;
use crate::target::{State, Target};

#[derive(Debug, Clone, Copy)]
pub struct ReplyClassification {
    pub state: State,
    pub amp: u32,
    /// Set when this reply cleared an outage (`target.downsince` was set
    /// before this call).
    pub recovered: bool,
    /// Set when `treecolor` changed as a result of this reply.
    pub map_updated: bool,
}

/// Applies a correlated reply (`received_target == currtarget` and
/// `received_seq == currtarget.waitping`, already checked by the caller) to
/// `target`'s running statistics, and returns the resulting classification.
///
/// `round` is the sequence number the reply carried (equivalently, the round
/// in which the matching probe was sent).
pub fn apply_reply(target: &mut Target, round: u32, rtt: u32, config: &Config) -> ReplyClassification {
    target.waitping = None;
    target.rttlast = rtt;
    target.rttsum += rtt as u64;
    let denom = round.saturating_sub(target.losscount).max(1);
    target.rttavg = (target.rttsum / denom as u64) as u32;
    target.sqsum += (rtt as u64) * (rtt as u64);
    target.rttmin = Some(target.rttmin.map_or(rtt, |m| m.min(rtt)));
    target.rttmax = target.rttmax.max(rtt);
    if target.okcount == 0 {
        target.okavg = target.rttavg;
    }

    let amp = target.okavg.saturating_sub(target.rttmin.unwrap_or(0)).max(1);

    let recovered = target.downsince.is_some();
    if recovered {
        target.downsince = None;
    }

    let state = if round <= config.learn_rounds {
        State::Ok
    } else if rtt <= target.okavg + config.jitter_mult * amp {
        State::Ok
    } else if rtt <= target.okavg + config.lag_mult * amp {
        State::Jitter
    } else {
        State::Lag
    };

    if state == State::Ok {
        target.okcount += 1;
        target.oksum += rtt as u64;
        target.okavg = (target.oksum / target.okcount as u64) as u32;
    } else if state == State::Lag {
        target.delaycount += 1;
    } else {
        target.record_jitter();
    }

    let prev_lastcolor = target.lastcolor;
    target.lastcolor = Some(state);

    let map_updated = match prev_lastcolor {
        Some(prev) if prev >= state && target.treecolor != Some(state) => {
            target.treecolor = Some(state);
            true
        }
        None => {
            // First-ever classification: nothing to compare against, but the
            // map still needs a starting color.
            target.treecolor = Some(state);
            true
        }
        _ => false,
    };

    ReplyClassification {
        state,
        amp,
        recovered,
        map_updated,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TimeoutClassification {
    /// Set when this timeout promoted `treecolor` to loss (i.e. this is the
    /// second of two consecutive losses).
    pub promoted_to_loss: bool,
}

/// Applies a slot timeout (no reply arrived before the slot closed) to
/// `target`. `now` is the wall clock (seconds since epoch) used to stamp
/// `downsince` on the first loss of an outage.
pub fn apply_timeout(target: &mut Target, now: i64) -> TimeoutClassification {
    target.losscount += 1;
    if target.downsince.is_none() {
        target.downsince = Some(now);
    }

    let promoted_to_loss = target.lastcolor == Some(State::Loss) && target.treecolor != Some(State::Loss);
    if promoted_to_loss {
        target.treecolor = Some(State::Loss);
    }
    target.lastcolor = Some(State::Loss);
    target.waitping = None;

    TimeoutClassification { promoted_to_loss }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Target;
    use std::net::{IpAddr, Ipv4Addr};

    fn make_target() -> Target {
        Target::new(
            0,
            'A',
            "host".into(),
            "10.0.0.1".into(),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            0,
            false,
            None,
        )
    }

    #[test]
    fn steady_state_all_ok() {
        let cfg = Config::default();
        let mut t = make_target();
        for round in 1..=4u32 {
            let c = apply_reply(&mut t, round, 10, &cfg);
            assert_eq!(c.state, State::Ok);
        }
        assert_eq!(t.okcount, 4);
        assert_eq!(t.losscount, 0);
        assert_eq!(t.rttavg, 10);
        assert_eq!(t.rttmin, Some(10));
        assert_eq!(t.rttmax, 10);
        assert_eq!(t.okavg, 10);
        assert_eq!(t.treecolor, Some(State::Ok));
    }

    #[test]
    fn single_drop_does_not_promote_to_loss_on_map() {
        let cfg = Config::default();
        let mut t = make_target();
        apply_reply(&mut t, 1, 5, &cfg);
        let timeout = apply_timeout(&mut t, 1000);
        assert!(!timeout.promoted_to_loss);
        apply_reply(&mut t, 3, 5, &cfg);
        assert_eq!(t.okcount, 2);
        assert_eq!(t.losscount, 1);
        assert_eq!(t.treecolor, Some(State::Ok));
    }

    #[test]
    fn two_consecutive_losses_promote_map_to_loss_then_recover() {
        let cfg = Config::default();
        let mut t = make_target();
        for round in 1..=3u32 {
            apply_reply(&mut t, round, 5, &cfg);
        }
        let first = apply_timeout(&mut t, 100);
        assert!(!first.promoted_to_loss);
        let second = apply_timeout(&mut t, 101);
        assert!(second.promoted_to_loss);
        assert_eq!(t.treecolor, Some(State::Loss));
        assert!(t.downsince.is_some());

        let recovery = apply_reply(&mut t, 7, 5, &cfg);
        assert!(recovery.recovered);
        assert!(t.downsince.is_none());
        assert_eq!(t.treecolor, Some(State::Ok));
    }

    #[test]
    fn jitter_then_lag_classification() {
        let cfg = Config::default();
        let mut t = make_target();
        for round in 1..=6u32 {
            apply_reply(&mut t, round, 10, &cfg);
        }
        let c = apply_reply(&mut t, 7, 60, &cfg);
        assert_eq!(c.state, State::Lag);
        assert_eq!(t.delaycount, 1);
    }

    #[test]
    fn invariant_counts_sum_to_round() {
        let cfg = Config::default();
        let mut t = make_target();
        apply_reply(&mut t, 1, 10, &cfg);
        apply_timeout(&mut t, 1);
        apply_reply(&mut t, 3, 200, &cfg);
        let total = t.okcount + t.delaycount + t.losscount + t.jitter_count();
        assert_eq!(total, 3);
    }
}
