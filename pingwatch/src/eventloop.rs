//! Single-threaded, cooperative event loop: multiplexes stdin and the two
//! raw sockets with a bounded timeout via `nix::poll`, matching the
//! original's `select()` loop one-for-one over a portable multiplexer,
//! grounded in `zarkdav-trippy`'s `nix` (`poll`, `net` features) stack.

use std::os::unix::io::RawFd;
use std::time::{SystemTime, UNIX_EPOCH};

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

use pingwatch_core::wire::{self, DecodeError};
use pingwatch_core::{Engine, ReplyOutcome, RuntimeError, TimeVal};

use crate::html::HtmlReport;
use crate::signals::Signals;
use crate::transport::Sockets;
use crate::ui::{AppState, Dashboard};

const STDIN_FD: RawFd = 0;

pub fn wall_clock_now() -> TimeVal {
    let d = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    TimeVal::new(d.as_secs() as i64, d.subsec_micros() as i64)
}

fn log_runtime_error(app: &mut AppState, err: RuntimeError) {
    log::warn!("{err}");
    app.log(err.to_string());
}

/// Sounds the terminal bell (BEL, `\x07`) directly on stdout, bypassing
/// the ratatui-managed alternate screen buffer.
fn ring_bell() {
    use std::io::Write;
    let _ = write!(std::io::stdout(), "\x07");
    let _ = std::io::stdout().flush();
}

/// Runs until a termination signal is observed. Returns the reason the
/// loop stopped (currently always a clean shutdown; kept as a `Result` so
/// the binary's `main` has one place to map failures to exit codes).
pub fn run(
    engine: &mut Engine,
    sockets: &Sockets,
    signals: &Signals,
    dashboard: &mut Dashboard,
    app: &mut AppState,
    html: Option<&HtmlReport>,
    ident: u16,
) -> std::io::Result<()> {
    loop {
        if signals.shutdown_requested() || app.should_quit {
            break;
        }
        if signals.take_winch() {
            app.log("terminal resized");
        }

        let now = wall_clock_now();
        let timeout = engine.poll_timeout(now);
        let timeout_ms: u16 = timeout.as_millis().clamp(0, u16::MAX as i64) as u16;

        let mut fds = [
            PollFd::new(STDIN_FD, PollFlags::POLLIN),
            PollFd::new(sockets.v4_fd(), PollFlags::POLLIN),
            PollFd::new(sockets.v6_fd(), PollFlags::POLLIN),
        ];
        let _ = poll(&mut fds, PollTimeout::from(timeout_ms));

        if fds[0].revents().map_or(false, |r| r.contains(PollFlags::POLLIN)) {
            if let Ok(crossterm::event::Event::Key(key)) = crossterm::event::read() {
                if let crossterm::event::KeyCode::Char(ch) = key.code {
                    app.handle_char(ch, engine);
                }
            }
        }

        if fds[1].revents().map_or(false, |r| r.contains(PollFlags::POLLIN)) {
            handle_reply(engine, sockets.recv_v4(), true, ident, app);
        }
        if fds[2].revents().map_or(false, |r| r.contains(PollFlags::POLLIN)) {
            handle_reply(engine, sockets.recv_v6(), false, ident, app);
        }

        let now = wall_clock_now();
        if engine.is_due(now) {
            let round_before = engine.round();
            let probe = engine.next_probe(now);
            if let Some(elapsed_idx) = probe.settled_loss {
                if let Some(target) = engine.registry().get(elapsed_idx) {
                    if crate::ui::app::should_beep(target.beepmode, true) {
                        ring_bell();
                    }
                    app.log(format!("{} slot timeout, counted as loss", target.hostname));
                }
            }
            if let Err(e) = sockets.send_probe(probe.addr, ident, probe.seq, now) {
                log_runtime_error(app, RuntimeError::Send(e.to_string()));
            }
            if engine.round() != round_before {
                if let Some(report) = html {
                    if let Err(e) = report.write_round(round_before, engine.registry()) {
                        log::warn!("failed to write HTML report: {e}");
                    }
                }
            }
        }

        dashboard.draw(engine, app)?;
    }

    if let Some(report) = html {
        let _ = report.write_summary(engine.registry());
    }
    dashboard.teardown()
}

fn handle_reply(
    engine: &mut Engine,
    received: std::io::Result<(Vec<u8>, std::net::IpAddr)>,
    is_v4: bool,
    ident: u16,
    app: &mut AppState,
) {
    let (packet, addr) = match received {
        Ok(p) => p,
        Err(e) => {
            log_runtime_error(app, RuntimeError::Recv(e.to_string()));
            return;
        }
    };

    let parsed = if is_v4 { wire::decode_v4(&packet) } else { wire::decode_v6(&packet) };
    let parsed = match parsed {
        Ok(p) => p,
        Err(DecodeError::Unexpected { icmp_type, code }) => {
            log_runtime_error(app, RuntimeError::UnexpectedIcmp { icmp_type, code });
            return;
        }
        Err(DecodeError::TooShort { len }) => {
            log_runtime_error(app, RuntimeError::ShortPacket { len });
            return;
        }
    };

    if parsed.ident != ident {
        return;
    }

    let now = wall_clock_now();
    let rtt = now.saturating_sub(parsed.send_time).as_millis().max(0) as u32;
    let interval_ms = (engine.config().interval_secs as i64) * 1000;
    if rtt as i64 > interval_ms {
        return;
    }

    match engine.on_reply(addr, parsed.seq, rtt) {
        ReplyOutcome::Classified(classification) => {
            app.log(format!("{addr} rtt={rtt}ms state={:?}", classification.state));
            if let Some(idx) = engine.registry().index_of_addr(&addr) {
                if let Some(target) = engine.registry().get(idx) {
                    if crate::ui::app::should_beep(target.beepmode, false) {
                        ring_bell();
                    }
                }
            }
        }
        ReplyOutcome::OutOfSync { rtt } => {
            app.log(format!("{addr} out-of-sync reply seq={} rtt={rtt}ms", parsed.seq));
        }
        ReplyOutcome::Unknown => {}
    }
}
