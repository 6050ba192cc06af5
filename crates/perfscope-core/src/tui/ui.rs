//! UI rendering for the TUI

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState, Tabs, Wrap},
    Frame,
};

use super::app::App;
use super::components::{job_indicator, session_indicator, severity_color, spinner_frame};
use crate::console::View;
use crate::models::{JobState, SessionStatus};

/// Main colors
const PRIMARY: Color = Color::Cyan;
const SECONDARY: Color = Color::Magenta;
const SUCCESS: Color = Color::Green;
const ERROR: Color = Color::Red;
const MUTED: Color = Color::DarkGray;

const NO_ROWS: &str = "Query returned no rows.";
const NO_RESULT: &str = "Run a query to see results.";

/// Draw the entire UI
pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header + tabs
            Constraint::Min(8),    // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.size());

    draw_header(frame, app, chunks[0]);
    draw_content(frame, app, chunks[1]);
    draw_status_bar(frame, app, chunks[2]);

    if let Some(form) = &app.form {
        form.render(frame, centered_rect(60, 50, frame.size()));
    } else if let Some(id) = &app.pending_delete {
        draw_confirm(frame, id);
    } else if app.show_help {
        draw_help_overlay(frame);
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(16),
            Constraint::Min(36),
            Constraint::Length(20),
        ])
        .split(area);

    let logo = Paragraph::new("◉ Perfscope")
        .style(Style::default().fg(PRIMARY).bold())
        .block(Block::default().borders(Borders::NONE));
    frame.render_widget(logo, chunks[0]);

    let active = app.console.router().active();
    let tab_titles: Vec<Line> = View::ALL
        .iter()
        .map(|view| {
            let style = if *view == active {
                Style::default().fg(PRIMARY).bold()
            } else {
                Style::default().fg(MUTED)
            };
            Line::from(format!(" {} {} ", view.index() + 1, view.title())).style(style)
        })
        .collect();

    let tabs = Tabs::new(tab_titles)
        .select(active.index())
        .highlight_style(Style::default().fg(PRIMARY))
        .divider(symbols::line::VERTICAL);
    frame.render_widget(tabs, chunks[1]);

    let status = Paragraph::new(session_indicator(app.console.session().status()))
        .alignment(Alignment::Right);
    frame.render_widget(status, chunks[2]);
}

fn draw_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.console.router().active() {
        View::Capture => draw_capture(frame, app, area),
        View::Queries => draw_queries(frame, app, area),
        View::Results => draw_results(frame, app, area),
    }
}

fn draw_capture(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let devices = app.console.devices();
    let title = if devices.is_refreshing() {
        format!("Devices {}", spinner_frame(app.ticks))
    } else {
        "Devices".to_string()
    };

    let items: Vec<ListItem> = if devices.devices().is_empty() {
        vec![ListItem::new("No devices found.").style(Style::default().fg(MUTED))]
    } else {
        devices
            .devices()
            .iter()
            .map(|d| ListItem::new(d.as_str().to_string()))
            .collect()
    };

    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(MUTED)),
        )
        .highlight_style(Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD))
        .highlight_symbol("▶ ");

    let mut state = ListState::default();
    state.select(devices.selected_index());
    frame.render_stateful_widget(list, chunks[0], &mut state);

    draw_session(frame, app, chunks[1]);
}

fn draw_session(frame: &mut Frame, app: &App, area: Rect) {
    let session = app.console.session().session();
    let label = |s: &'static str| Span::styled(format!("{s:<10}"), Style::default().fg(SECONDARY));

    let mut status = vec![label("Status"), session_indicator(session.status)];
    if session.status == SessionStatus::Capturing {
        status.push(Span::raw(format!(" {}", spinner_frame(app.ticks))));
    } else if session.status == SessionStatus::Ready {
        let confirmation = if session.confirmed { " (confirmed)" } else { " (assumed)" };
        status.push(Span::styled(confirmation, Style::default().fg(MUTED)));
    }

    let device = session
        .device
        .as_ref()
        .map_or_else(|| "-".to_string(), ToString::to_string);
    let trace = session.id.clone().unwrap_or_else(|| "-".to_string());
    let started = session
        .started_at
        .map_or_else(|| "-".to_string(), |t| t.format("%H:%M:%S").to_string());
    let query = app
        .console
        .catalog()
        .selected()
        .map_or_else(|| "-".to_string(), |q| q.label());

    let lines = vec![
        Line::from(status),
        Line::from(vec![label("Device"), Span::raw(device)]),
        Line::from(vec![label("Trace"), Span::raw(trace)]),
        Line::from(vec![label("Started"), Span::raw(started)]),
        Line::from(""),
        Line::from(vec![label("Query"), Span::raw(query)]),
        Line::from(vec![label("Job"), job_indicator(app.console.jobs().state())]),
        Line::from(""),
        Line::from("←/→ device · ↑/↓ query · s start · r run · d refresh")
            .style(Style::default().fg(MUTED)),
    ];

    let panel = Paragraph::new(lines)
        .block(
            Block::default()
                .title("Session")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(MUTED)),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(panel, area);
}

fn draw_queries(frame: &mut Frame, app: &App, area: Rect) {
    let catalog = app.console.catalog();

    let header = Row::new(vec!["Name", "ID", "Kind", "SQL"])
        .style(Style::default().fg(PRIMARY).bold())
        .bottom_margin(1);

    let rows: Vec<Row> = catalog
        .entries()
        .iter()
        .map(|q| {
            let kind = if q.builtin {
                Cell::from("builtin").style(Style::default().fg(MUTED))
            } else {
                Cell::from("custom").style(Style::default().fg(SUCCESS))
            };
            Row::new(vec![
                Cell::from(q.name.clone()),
                Cell::from(q.id.clone()),
                kind,
                Cell::from(truncate(&single_line(&q.sql), 60)),
            ])
        })
        .collect();

    let title = if catalog.is_refreshing() {
        format!("Queries ({}) {}", catalog.entries().len(), spinner_frame(app.ticks))
    } else {
        format!("Queries ({}) · a add · x delete", catalog.entries().len())
    };

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(25),
            Constraint::Percentage(20),
            Constraint::Length(8),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(MUTED)),
    )
    .highlight_style(Style::default().bg(Color::Rgb(40, 40, 60)))
    .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(catalog.selected_index());
    frame.render_stateful_widget(table, area, &mut state);
}

fn draw_results(frame: &mut Frame, app: &App, area: Rect) {
    let jobs = app.console.jobs();
    let block = Block::default()
        .title("Results")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(MUTED));

    let message = |text: String, color: Color| {
        Paragraph::new(text)
            .style(Style::default().fg(color))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(block.clone())
    };

    match jobs.state() {
        JobState::Idle => frame.render_widget(message(NO_RESULT.to_string(), MUTED), area),
        JobState::Submitted | JobState::Polling => {
            let text = format!("{} Running query…", spinner_frame(app.ticks));
            frame.render_widget(message(text, PRIMARY), area);
        }
        JobState::Failed => {
            let error = jobs
                .job()
                .and_then(|j| j.error.clone())
                .unwrap_or_else(|| "Query failed.".to_string());
            frame.render_widget(message(error, ERROR), area);
        }
        JobState::Complete => match jobs.result() {
            Some(result) if !result.is_empty() => {
                let header = Row::new(result.header_labels())
                    .style(Style::default().fg(PRIMARY).bold())
                    .bottom_margin(1);
                let rows: Vec<Row> = result.display_rows().into_iter().map(Row::new).collect();
                let widths = vec![Constraint::Min(8); result.columns.len().max(1)];

                let selected = app.result_row.min(result.row_count() - 1);
                let table = Table::new(rows, widths)
                    .header(header)
                    .block(block.clone().title(format!(
                        "Results (row {} of {})",
                        selected + 1,
                        result.row_count()
                    )))
                    .highlight_style(Style::default().bg(Color::Rgb(40, 40, 60)))
                    .highlight_symbol("▶ ");

                let mut state = TableState::default();
                state.select(Some(selected));
                frame.render_stateful_widget(table, area, &mut state);
            }
            _ => frame.render_widget(message(NO_ROWS.to_string(), MUTED), area),
        },
    }
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let note = app.console.notifier().current();
    let line = if note.visible {
        Line::from(vec![
            Span::styled(
                format!(" {} ", note.severity.as_str().to_uppercase()),
                Style::default().fg(Color::Black).bg(severity_color(note.severity)),
            ),
            Span::raw(" "),
            Span::styled(note.message, Style::default().fg(severity_color(note.severity))),
            Span::styled("  (Esc to dismiss)", Style::default().fg(MUTED)),
        ])
    } else {
        Line::from(Span::styled(
            " ? help · Tab switch view · q quit",
            Style::default().fg(MUTED),
        ))
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_confirm(frame: &mut Frame, id: &str) {
    let area = centered_rect(50, 20, frame.size());
    frame.render_widget(Clear, area);

    let prompt = Paragraph::new(vec![
        Line::from(format!("Delete query '{id}'?")),
        Line::from(""),
        Line::from("y / Enter confirm · any other key cancels").style(Style::default().fg(MUTED)),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .title("Confirm")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(ERROR)),
    );
    frame.render_widget(prompt, area);
}

fn draw_help_overlay(frame: &mut Frame) {
    let area = centered_rect(60, 70, frame.size());

    // Clear the background
    frame.render_widget(Clear, area);

    let help_text = vec![
        Line::from("Keyboard Shortcuts").style(Style::default().fg(PRIMARY).bold()),
        Line::from(""),
        Line::from("Navigation:").style(Style::default().fg(SECONDARY)),
        Line::from("  Tab / Shift+Tab    Switch between views"),
        Line::from("  1-3                Jump to a view"),
        Line::from("  ←/→                Select device"),
        Line::from("  ↑/↓                Select query"),
        Line::from(""),
        Line::from("Capture:").style(Style::default().fg(SECONDARY)),
        Line::from("  s                  Start trace on the selected device"),
        Line::from("  d                  Refresh devices"),
        Line::from("  r                  Run selected query on the current trace"),
        Line::from(""),
        Line::from("Queries:").style(Style::default().fg(SECONDARY)),
        Line::from("  a                  Add a query"),
        Line::from("  x                  Delete selected query"),
        Line::from(""),
        Line::from("Results:").style(Style::default().fg(SECONDARY)),
        Line::from("  ↑/↓                Scroll one row"),
        Line::from("  PgUp/PgDn          Scroll one page"),
        Line::from("  Home/End           First / last row"),
        Line::from(""),
        Line::from("General:").style(Style::default().fg(SECONDARY)),
        Line::from("  Esc                Dismiss notification"),
        Line::from("  ?                  Toggle this help"),
        Line::from("  q / Ctrl+C         Quit"),
        Line::from(""),
        Line::from("Press any key to close").style(Style::default().fg(MUTED).italic()),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(PRIMARY)),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(help, area);
}

// Helper functions

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
