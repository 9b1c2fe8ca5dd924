//! Target registry: the in-memory set of hosts being monitored.
//!
//! Mirrors the original's intrusive linked list of `target` structs, but
//! replaced with a dense `Vec<Target>` plus an address -> index lookup map,
//! per the redesign note on O(1) reply demultiplexing (a linked-list walk on
//! every incoming packet does not scale past a handful of hosts).

use std::collections::HashMap;
use std::net::IpAddr;

/// Classification outcome for a single probe, ordered so that
/// `Ok < Jitter < Lag < Loss` — used by the map-color hysteresis rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum State {
    Ok,
    Jitter,
    Lag,
    Loss,
}

/// Bell policy for a target, cycled with `!` while its info panel is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeepMode {
    OnLoss,
    OnOk,
    Off,
}

impl BeepMode {
    pub fn cycle(self) -> BeepMode {
        match self {
            BeepMode::OnLoss => BeepMode::OnOk,
            BeepMode::OnOk => BeepMode::Off,
            BeepMode::Off => BeepMode::OnLoss,
        }
    }
}

impl Default for BeepMode {
    fn default() -> Self {
        BeepMode::OnLoss
    }
}

/// A single monitored host (one per resolved address; a name that resolves
/// to several addresses produces several `Target`s sharing `id`).
#[derive(Debug, Clone)]
pub struct Target {
    /// Dense, 0-based index into the registry and the history ring's sample
    /// vectors.
    pub num: usize,
    /// Display id, one character of `A..Z0..9`, shared by every address a
    /// single targets-file entry resolved to.
    pub id: char,
    pub hostname: String,
    pub address: String,
    pub addr: IpAddr,
    pub rank: u32,
    pub detached: bool,
    pub annotation: Option<String>,

    pub rttsum: u64,
    pub oksum: u64,
    pub sqsum: u64,
    pub okcount: u32,
    pub delaycount: u32,
    pub losscount: u32,
    jitter_count: u32,

    pub rttmin: Option<u32>,
    pub rttmax: u32,
    pub rttlast: u32,
    pub rttavg: u32,
    pub okavg: u32,

    pub lastcolor: Option<State>,
    pub treecolor: Option<State>,

    /// Sequence number of the in-flight probe, `None` if no probe is
    /// outstanding for this target.
    pub waitping: Option<u32>,
    /// Wall-clock (seconds since epoch) the current outage began, `None`
    /// while the target is up.
    pub downsince: Option<i64>,
    pub beepmode: BeepMode,
}

impl Target {
    pub fn new(
        num: usize,
        id: char,
        hostname: String,
        address: String,
        addr: IpAddr,
        rank: u32,
        detached: bool,
        annotation: Option<String>,
    ) -> Self {
        Self {
            num,
            id,
            hostname,
            address,
            addr,
            rank,
            detached,
            annotation,
            rttsum: 0,
            oksum: 0,
            sqsum: 0,
            okcount: 0,
            delaycount: 0,
            losscount: 0,
            jitter_count: 0,
            rttmin: None,
            rttmax: 0,
            rttlast: 0,
            rttavg: 0,
            okavg: 0,
            lastcolor: None,
            treecolor: None,
            waitping: None,
            downsince: None,
            beepmode: BeepMode::default(),
        }
    }

    /// Total number of probes this target has been the slot target for.
    pub fn total_rounds(&self) -> u32 {
        self.okcount + self.delaycount + self.losscount + self.jitter_count()
    }

    /// Number of probes classified as jitter (neither `okcount` nor
    /// `delaycount` on the original struct; kept so the invariant
    /// `okcount + delaycount + losscount + jitter == pinground` can be
    /// checked directly).
    pub fn jitter_count(&self) -> u32 {
        self.jitter_count
    }

    pub(crate) fn record_jitter(&mut self) {
        self.jitter_count += 1;
    }
}

/// Owns the full set of monitored targets plus an address -> index lookup
/// built once at startup, so reply demultiplexing is O(1) instead of a
/// linked-list walk.
#[derive(Debug)]
pub struct Registry {
    targets: Vec<Target>,
    by_addr: HashMap<IpAddr, usize>,
}

impl Registry {
    pub fn new(targets: Vec<Target>) -> Self {
        let mut by_addr = HashMap::with_capacity(targets.len());
        for t in &targets {
            by_addr.insert(t.addr, t.num);
        }
        Self { targets, by_addr }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, num: usize) -> Option<&Target> {
        self.targets.get(num)
    }

    pub fn get_mut(&mut self, num: usize) -> Option<&mut Target> {
        self.targets.get_mut(num)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Target> {
        self.targets.iter_mut()
    }

    /// O(1) lookup of the target whose resolved address matches `addr`,
    /// replacing the original's per-packet linked-list walk.
    pub fn index_of_addr(&self, addr: &IpAddr) -> Option<usize> {
        self.by_addr.get(addr).copied()
    }

    pub fn find_by_id(&self, id: char) -> Option<&Target> {
        self.targets.iter().find(|t| t.id == id)
    }

    pub fn ndown(&self) -> usize {
        self.targets
            .iter()
            .filter(|t| t.treecolor == Some(State::Loss))
            .count()
    }
}
