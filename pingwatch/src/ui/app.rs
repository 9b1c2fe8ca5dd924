//! Operator-visible UI state: which panels are open, the scroller's bounded
//! line buffer, and the keystroke interpreter (§6 of the interface
//! contract). Kept separate from rendering so it can be driven by tests
//! without a real terminal.

use std::collections::VecDeque;

use pingwatch_core::{BeepMode, Engine};

/// Bounded ring of recent scroller lines, replacing the original's
/// unbounded scrolling terminal window (§9 redesign note).
const SCROLLER_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownListMode {
    WhenDown,
    Always,
    Hidden,
}

impl DownListMode {
    fn next(self) -> Self {
        match self {
            DownListMode::WhenDown => DownListMode::Always,
            DownListMode::Always => DownListMode::Hidden,
            DownListMode::Hidden => DownListMode::WhenDown,
        }
    }
}

pub struct AppState {
    pub open_panel: Option<char>,
    pub down_list_mode: DownListMode,
    pub map_visible: bool,
    pub scroller: VecDeque<String>,
    pub should_quit: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            open_panel: None,
            down_list_mode: DownListMode::WhenDown,
            map_visible: true,
            scroller: VecDeque::with_capacity(SCROLLER_CAPACITY),
            should_quit: false,
        }
    }

    pub fn log(&mut self, line: impl Into<String>) {
        if self.scroller.len() == SCROLLER_CAPACITY {
            self.scroller.pop_front();
        }
        self.scroller.push_back(line.into());
    }

    /// Interprets one input character, per the keystroke table. `engine` is
    /// consulted read-only (to find a target by display id) and mutated
    /// only to cycle a bell mode.
    pub fn handle_char(&mut self, ch: char, engine: &mut Engine) {
        match ch {
            c if c.is_ascii_uppercase() || c.is_ascii_digit() => {
                let has_target = engine.registry().find_by_id(c).is_some();
                if !has_target {
                    return;
                }
                self.open_panel = if self.open_panel == Some(c) { None } else { Some(c) };
            }
            '\r' | '\n' => {
                self.down_list_mode = self.down_list_mode.next();
            }
            ' ' => {
                self.map_visible = !self.map_visible;
            }
            '!' => {
                if let Some(id) = self.open_panel {
                    if let Some(idx) = engine.registry().iter().position(|t| t.id == id) {
                        if let Some(target) = engine.registry_mut().get_mut(idx) {
                            target.beepmode = target.beepmode.cycle();
                        }
                    }
                }
            }
            'q' => self.should_quit = true,
            _ => {}
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a target's bell should sound for the outcome just classified.
pub fn should_beep(mode: BeepMode, is_loss: bool) -> bool {
    match mode {
        BeepMode::OnLoss => is_loss,
        BeepMode::OnOk => !is_loss,
        BeepMode::Off => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn down_list_mode_cycles() {
        let mut mode = DownListMode::WhenDown;
        mode = mode.next();
        assert_eq!(mode, DownListMode::Always);
        mode = mode.next();
        assert_eq!(mode, DownListMode::Hidden);
        mode = mode.next();
        assert_eq!(mode, DownListMode::WhenDown);
    }

    #[test]
    fn beep_policy_matches_mode() {
        assert!(should_beep(BeepMode::OnLoss, true));
        assert!(!should_beep(BeepMode::OnLoss, false));
        assert!(should_beep(BeepMode::OnOk, false));
        assert!(!should_beep(BeepMode::Off, true));
    }
}
