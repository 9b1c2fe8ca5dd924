//! Terminal dashboard: raw-mode setup/teardown plus the draw entry point.
//! Grounded in `other_examples/manifests/Ukko-Ylijumala-mping-rs` and
//! `zarkdav-trippy`, both `crossterm` + ratatui-family TUI pingers.

pub mod app;
pub mod render;

use std::io::{self, Stdout};

use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use pingwatch_core::Engine;

pub use app::AppState;

/// Minimum usable terminal size, matching the original's `start_curses()`
/// floor (`cols < 72 || rows < 16` was a fatal-startup condition there).
const MIN_COLS: u16 = 72;
const MIN_ROWS: u16 = 16;

pub struct Dashboard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Dashboard {
    pub fn new() -> io::Result<Self> {
        let (cols, rows) = crossterm::terminal::size()?;
        if cols < MIN_COLS || rows < MIN_ROWS {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("terminal too small ({cols}x{rows}), need at least {MIN_COLS}x{MIN_ROWS}"),
            ));
        }

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }

    pub fn draw(&mut self, engine: &Engine, app: &AppState) -> io::Result<()> {
        self.terminal.draw(|frame| render::draw(frame, engine, app))?;
        Ok(())
    }

    /// Restores the terminal to its pre-raw-mode state. Must be called
    /// before the process exits, including on signal-driven shutdown.
    pub fn teardown(&mut self) -> io::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        let _ = self.teardown();
    }
}
