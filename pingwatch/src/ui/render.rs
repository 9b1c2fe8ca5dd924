//! Widget construction for each dashboard panel. Pure functions from
//! `&Engine`/`&AppState` to `ratatui` widgets — no I/O, so they're testable
//! without a real terminal.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Row, Table};
use ratatui::Frame;

use pingwatch_core::{Engine, State, Target};

use super::app::{AppState, DownListMode};

fn state_color(state: Option<State>) -> Color {
    match state {
        Some(State::Ok) => Color::Green,
        Some(State::Jitter) => Color::Yellow,
        Some(State::Lag) => Color::Rgb(255, 140, 0),
        Some(State::Loss) => Color::Red,
        None => Color::DarkGray,
    }
}

fn state_glyph(state: Option<State>) -> &'static str {
    match state {
        Some(State::Ok) => ".",
        Some(State::Jitter) => "j",
        Some(State::Lag) => "L",
        Some(State::Loss) => "X",
        None => " ",
    }
}

/// Top-level layout: grid + map stacked above a status bar and scroller.
pub fn draw(frame: &mut Frame, engine: &Engine, app: &AppState) {
    let area = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(if app.map_visible { 8 } else { 0 }),
            Constraint::Length(down_list_height(engine, app)),
            Constraint::Length(3),
        ])
        .split(area);

    draw_grid(frame, chunks[0], engine);
    if app.map_visible {
        draw_map(frame, chunks[1], engine);
    }
    draw_down_list(frame, chunks[2], engine, app);
    draw_status_bar(frame, chunks[3], engine, app);

    if let Some(id) = app.open_panel {
        if let Some(target) = engine.registry().find_by_id(id) {
            draw_host_info(frame, area, engine, target);
        }
    }
}

fn down_list_height(engine: &Engine, app: &AppState) -> u16 {
    match app.down_list_mode {
        DownListMode::Hidden => 0,
        DownListMode::Always => 6,
        DownListMode::WhenDown => {
            if engine.ndown() > 0 {
                6
            } else {
                0
            }
        }
    }
}

/// One row per target, one column per recent round, colored by state —
/// the "time grid" the operator scans for patterns at a glance.
fn draw_grid(frame: &mut Frame, area: Rect, engine: &Engine) {
    let rows: Vec<Row> = engine
        .registry()
        .iter()
        .map(|t| {
            let cells = vec![
                format!("{}", t.id),
                t.hostname.clone(),
                format!("{}", t.rttlast),
                state_glyph(t.lastcolor).to_string(),
            ];
            Row::new(cells).style(Style::default().fg(state_color(t.treecolor)))
        })
        .collect();

    let table = Table::new(
        rows,
        [Constraint::Length(3), Constraint::Percentage(60), Constraint::Length(8), Constraint::Length(3)],
    )
    .header(Row::new(vec!["id", "host", "rtt", "st"]).style(Style::default().add_modifier(Modifier::BOLD)))
    .block(Block::default().borders(Borders::ALL).title("grid"));

    frame.render_widget(table, area);
}

/// Hierarchical network map: indentation follows `rank`, a blank line
/// precedes `detached` targets, colored by `treecolor`.
fn draw_map(frame: &mut Frame, area: Rect, engine: &Engine) {
    let mut lines = Vec::new();
    for t in engine.registry().iter() {
        if t.detached {
            lines.push(Line::from(""));
        }
        let indent = "  ".repeat(t.rank as usize);
        let label = match &t.annotation {
            Some(ann) => format!("{indent}{} {} ({ann})", t.id, t.hostname),
            None => format!("{indent}{} {}", t.id, t.hostname),
        };
        lines.push(Line::from(Span::styled(label, Style::default().fg(state_color(t.treecolor)))));
    }
    let paragraph = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("map"));
    frame.render_widget(paragraph, area);
}

fn draw_down_list(frame: &mut Frame, area: Rect, engine: &Engine, app: &AppState) {
    if down_list_height(engine, app) == 0 {
        return;
    }
    let items: Vec<ListItem> = engine
        .registry()
        .iter()
        .filter(|t| t.treecolor == Some(State::Loss))
        .map(|t| {
            let since = t.downsince.map(|s| format!("since {s}")).unwrap_or_default();
            ListItem::new(format!("{} {} down {since}", t.id, t.hostname))
                .style(Style::default().fg(Color::Red))
        })
        .collect();
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("down"));
    frame.render_widget(list, area);
}

fn draw_status_bar(frame: &mut Frame, area: Rect, engine: &Engine, app: &AppState) {
    let last_line = app.scroller.back().cloned().unwrap_or_default();
    let text = format!(
        "round {} | {} targets | {} down | {last_line}",
        engine.round(),
        engine.registry().len(),
        engine.ndown(),
    );
    let bar = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("status"));
    frame.render_widget(bar, area);
}

/// Per-host detail popup: baseline/amp, extremes, loss/delay rates and the
/// rolling-window standard deviation.
fn draw_host_info(frame: &mut Frame, area: Rect, engine: &Engine, target: &Target) {
    let popup = centered_rect(60, 50, area);
    let stats = engine.window_stats(target.num);
    let amp = target.okavg.saturating_sub(target.rttmin.unwrap_or(0)).max(1);

    let lines = vec![
        Line::from(format!("{} ({})", target.hostname, target.address)),
        Line::from(format!("baseline {} ms ± {} ms", target.okavg, amp)),
        Line::from(format!(
            "min/avg/max: {}/{}/{} ms",
            target.rttmin.unwrap_or(0),
            target.rttavg,
            target.rttmax
        )),
        Line::from(format!("last: {} ms", target.rttlast)),
        Line::from(format!("window stddev: {:.2} ms ({} samples)", stats.stddev, stats.count)),
        Line::from(format!(
            "delayed: {:.1}% lost: {:.1}%",
            100.0 * target.delaycount as f64 / target.total_rounds().max(1) as f64,
            100.0 * target.losscount as f64 / target.total_rounds().max(1) as f64,
        )),
        Line::from(format!("bell: {:?}", target.beepmode)),
    ];

    let popup_widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(format!("host info: {}", target.id)));
    frame.render_widget(popup_widget, popup);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
