mod cli;
mod eventloop;
mod html;
mod signals;
mod targets_file;
mod transport;
mod ui;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use pingwatch_core::{Config, Engine};

use cli::Opts;
use html::HtmlReport;
use signals::Signals;
use transport::Sockets;
use ui::{AppState, Dashboard};

/// Exit codes for distinct startup failures, matching the original's
/// distinct negative-style codes (mapped to small positive values here,
/// since `std::process::exit` only preserves the low byte anyway).
mod exit_code {
    pub const SOCKET_OPEN: u8 = 1;
    pub const TARGETS_FILE: u8 = 2;
    pub const NO_TARGETS: u8 = 3;
    pub const ALLOCATION: u8 = 4;
    pub const TERMINAL: u8 = 5;
}

fn main() -> ExitCode {
    env_logger::init();
    let opts = Opts::parse();

    let targets = match targets_file::load(Path::new("targets")) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("fatal: {e}");
            return ExitCode::from(exit_code::TARGETS_FILE);
        }
    };

    let sockets = match Sockets::open() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("fatal: {e}");
            return ExitCode::from(exit_code::SOCKET_OPEN);
        }
    };
    if let Err(e) = transport::drop_privileges() {
        log::warn!("failed to drop privileges: {e}");
    }

    let signal_flags = match Signals::install() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("fatal: could not install signal handlers: {e}");
            return ExitCode::from(exit_code::SOCKET_OPEN);
        }
    };

    let now = eventloop::wall_clock_now();
    let config = Config::default();
    let target_count = targets.len();
    let mut engine = match Engine::new(targets, config, now) {
        Ok(e) => e,
        Err(pingwatch_core::CoreError::NoTargets) => {
            eprintln!("fatal: no resolvable targets");
            return ExitCode::from(exit_code::NO_TARGETS);
        }
        Err(e @ pingwatch_core::CoreError::HistoryAllocation { .. }) => {
            eprintln!("fatal: {e}");
            return ExitCode::from(exit_code::ALLOCATION);
        }
        Err(e) => {
            eprintln!("fatal: {e} ({target_count} targets)");
            return ExitCode::from(exit_code::ALLOCATION);
        }
    };

    let mut dashboard = match Dashboard::new() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("fatal: could not initialize terminal: {e}");
            return ExitCode::from(exit_code::TERMINAL);
        }
    };
    let mut app = AppState::new();

    let html_report = opts.html_report.map(HtmlReport::new);
    let ident = (std::process::id() & 0xFFFF) as u16;

    log::info!("pingwatch starting with {} targets", engine.registry().len());
    if let Err(e) = eventloop::run(&mut engine, &sockets, &signal_flags, &mut dashboard, &mut app, html_report.as_ref(), ident) {
        log::error!("event loop exited with error: {e}");
    }
    log::info!("pingwatch shutting down cleanly");

    ExitCode::SUCCESS
}
