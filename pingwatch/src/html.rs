//! Optional HTML report: a per-target table rewritten every round, plus an
//! end-of-run summary written on shutdown. Table styling and column layout
//! follow `cjjeakle-network-monitor`'s `index()` handler, adapted from a
//! live web response to a file rewritten in place.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use pingwatch_core::{Registry, State};

const STYLE: &str = "<style>
table { width:100%; margin:0 auto; border-collapse: collapse; }
table, th, td { border: 1px solid #888; padding: .4em; }
th { background: #eee; }
.state-ok { color: #060; }
.state-jitter { color: #a60; }
.state-lag { color: #c30; }
.state-loss { color: #900; font-weight: bold; }
</style>";

pub struct HtmlReport {
    path: PathBuf,
}

fn state_class(state: Option<State>) -> &'static str {
    match state {
        Some(State::Ok) => "state-ok",
        Some(State::Jitter) => "state-jitter",
        Some(State::Lag) => "state-lag",
        Some(State::Loss) => "state-loss",
        None => "",
    }
}

fn state_label(state: Option<State>) -> &'static str {
    match state {
        Some(State::Ok) => "ok",
        Some(State::Jitter) => "jitter",
        Some(State::Lag) => "lag",
        Some(State::Loss) => "loss",
        None => "-",
    }
}

impl HtmlReport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Rewrites the report with the current per-target snapshot. Called
    /// once per completed round.
    pub fn write_round(&self, round: u32, registry: &Registry) -> io::Result<()> {
        let mut html = String::new();
        html.push_str(STYLE);
        html.push_str(&format!(
            "<p>round {round} &middot; updated {}</p>",
            Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        ));
        html.push_str("<table><thead><tr><th>id</th><th>host</th><th>state</th><th>rtt (ms)</th><th>okavg</th><th>loss</th></tr></thead><tbody>");
        for target in registry.iter() {
            html.push_str(&format!(
                "<tr class=\"{class}\"><td>{id}</td><td>{host}</td><td>{state}</td><td>{rtt}</td><td>{okavg}</td><td>{loss}</td></tr>",
                class = state_class(target.treecolor),
                id = target.id,
                host = target.hostname,
                state = state_label(target.treecolor),
                rtt = target.rttlast,
                okavg = target.okavg,
                loss = target.losscount,
            ));
        }
        html.push_str("</tbody></table>");
        fs::write(&self.path, html)
    }

    /// Writes the final summary on clean shutdown, one row per target with
    /// lifetime totals.
    pub fn write_summary(&self, registry: &Registry) -> io::Result<()> {
        let mut html = String::new();
        html.push_str(STYLE);
        html.push_str(&format!("<p>monitoring stopped {}</p>", Utc::now().to_rfc3339()));
        html.push_str("<table><thead><tr><th>id</th><th>host</th><th>ok</th><th>jitter</th><th>lag</th><th>loss</th><th>final state</th></tr></thead><tbody>");
        for target in registry.iter() {
            html.push_str(&format!(
                "<tr class=\"{class}\"><td>{id}</td><td>{host}</td><td>{ok}</td><td>{jitter}</td><td>{lag}</td><td>{loss}</td><td>{state}</td></tr>",
                class = state_class(target.treecolor),
                id = target.id,
                host = target.hostname,
                ok = target.okcount,
                jitter = target.jitter_count(),
                lag = target.delaycount,
                loss = target.losscount,
                state = state_label(target.treecolor),
            ));
        }
        html.push_str("</tbody></table>");
        fs::write(&self.path, html)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
