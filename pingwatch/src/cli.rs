//! Command-line surface. Deliberately flag-free per the interface contract:
//! the only argument is an optional HTML report path.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "pingwatch", version, about = "Multi-host ICMP reachability and latency monitor")]
pub struct Opts {
    /// Write an HTML report (updated per round, finalized at shutdown) to this path.
    pub html_report: Option<PathBuf>,
}
