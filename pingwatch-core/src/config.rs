//! Engine tunables. The original hardcodes these as C preprocessor
//! `#define`s (`INTERVAL`, `HISTLOG`, `LEARNROUNDS`, `JITMULT`, `LAGMULT`);
//! here they're a plain struct constructed once at startup and threaded
//! explicitly, so tests can override them without touching global state.

#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Round period in seconds (`T` in the design doc). Default 60, matching
    /// the original's `INTERVAL`.
    pub interval_secs: u32,
    /// Number of history rounds kept in the ring (`H`). Default 100.
    pub history_len: usize,
    /// Rounds during which every result is classified `ok` regardless of
    /// RTT, to let the baseline settle. Default 5.
    pub learn_rounds: u32,
    /// Multiplier applied to `amp` for the ok/jitter boundary. Default 3.
    pub jitter_mult: u32,
    /// Multiplier applied to `amp` for the jitter/lag boundary. Default 10.
    pub lag_mult: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            history_len: 100,
            learn_rounds: 5,
            jitter_mult: 3,
            lag_mult: 10,
        }
    }
}
