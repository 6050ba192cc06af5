//! Reusable TUI components
//!
//! Input widgets for the query form plus small span helpers shared by the
//! views.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use tui_textarea::TextArea;

use crate::models::{JobState, SessionStatus, Severity};

const SPINNER: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];

/// Frame of the busy spinner for a given tick
pub fn spinner_frame(tick: u64) -> &'static str {
    SPINNER[(tick % SPINNER.len() as u64) as usize]
}

/// Field focused in the add-query form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    #[default]
    Name,
    Sql,
}

/// Name and SQL editors for a new user query
#[derive(Debug, Clone)]
pub struct QueryForm {
    pub name: TextArea<'static>,
    pub sql: TextArea<'static>,
    pub focus: FormField,
}

impl Default for QueryForm {
    fn default() -> Self {
        let mut name = TextArea::default();
        name.set_placeholder_text("Frame jank");
        name.set_cursor_line_style(Style::default());

        let mut sql = TextArea::default();
        sql.set_placeholder_text("SELECT ts, dur FROM slice");

        let mut form = Self {
            name,
            sql,
            focus: FormField::Name,
        };
        form.restyle();
        form
    }
}

impl QueryForm {
    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            FormField::Name => FormField::Sql,
            FormField::Sql => FormField::Name,
        };
        self.restyle();
    }

    /// Query name as typed, on a single line
    pub fn name_text(&self) -> String {
        self.name.lines().join(" ")
    }

    /// Query text, lines joined with newlines
    pub fn sql_text(&self) -> String {
        self.sql.lines().join("\n")
    }

    /// Feed a key to the focused editor.
    ///
    /// The name stays on one line: Enter there moves on to the SQL editor.
    pub fn input(&mut self, key: KeyEvent) {
        match self.focus {
            FormField::Name if key.code == KeyCode::Enter => self.toggle_focus(),
            FormField::Name => {
                self.name.input(key);
            }
            FormField::Sql => {
                self.sql.input(key);
            }
        }
    }

    fn restyle(&mut self) {
        let focused = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
        let idle = Style::default().fg(Color::DarkGray);
        let (name_style, sql_style) = match self.focus {
            FormField::Name => (focused, idle),
            FormField::Sql => (idle, focused),
        };

        self.name
            .set_block(Block::default().title("Name").borders(Borders::ALL).border_style(name_style));
        self.sql
            .set_block(Block::default().title("SQL").borders(Borders::ALL).border_style(sql_style));

        // Only the focused editor shows a cursor
        let hidden = Style::default();
        self.name.set_cursor_style(if self.focus == FormField::Name {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            hidden
        });
        self.sql.set_cursor_style(if self.focus == FormField::Sql {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            hidden
        });
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        frame.render_widget(Clear, area);

        let outer = Block::default()
            .title("Add query")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = outer.inner(area);
        frame.render_widget(outer, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(inner);

        frame.render_widget(self.name.widget(), chunks[0]);
        frame.render_widget(self.sql.widget(), chunks[1]);
        frame.render_widget(
            Paragraph::new(Line::from("Tab switch field · Ctrl+S save · Esc cancel"))
                .style(Style::default().fg(Color::DarkGray)),
            chunks[2],
        );
    }
}

/// Colored dot with label for the session status
pub fn session_indicator(status: SessionStatus) -> Span<'static> {
    let (symbol, label, color) = match status {
        SessionStatus::Idle => ("○", "Idle", Color::DarkGray),
        SessionStatus::Capturing => ("●", "Capturing", Color::Yellow),
        SessionStatus::Ready => ("●", "Ready", Color::Green),
    };
    Span::styled(format!("{symbol} {label}"), Style::default().fg(color))
}

/// Colored label for a job state
pub fn job_indicator(state: JobState) -> Span<'static> {
    let (label, color) = match state {
        JobState::Idle => ("idle", Color::DarkGray),
        JobState::Submitted => ("submitted", Color::Yellow),
        JobState::Polling => ("running", Color::Yellow),
        JobState::Complete => ("complete", Color::Green),
        JobState::Failed => ("failed", Color::Red),
    };
    Span::styled(label, Style::default().fg(color))
}

/// Foreground color for a notification severity
pub fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::Cyan,
        Severity::Success => Color::Green,
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(form: &mut QueryForm, text: &str) {
        text.chars().for_each(|c| form.input(key(KeyCode::Char(c))));
    }

    #[test]
    fn test_form_edits_focused_field() {
        let mut form = QueryForm::default();
        type_text(&mut form, "cpu");
        form.toggle_focus();
        type_text(&mut form, "SELECT 1");
        form.input(key(KeyCode::Backspace));

        assert_eq!(form.name_text(), "cpu");
        assert_eq!(form.sql_text(), "SELECT ");
        assert_eq!(form.focus, FormField::Sql);
    }

    #[test]
    fn test_enter_in_name_moves_to_sql() {
        let mut form = QueryForm::default();
        type_text(&mut form, "jank");
        form.input(key(KeyCode::Enter));

        assert_eq!(form.focus, FormField::Sql);
        assert_eq!(form.name.lines().len(), 1);
    }

    #[test]
    fn test_sql_spans_lines_and_edits_mid_text() {
        let mut form = QueryForm::default();
        form.toggle_focus();
        type_text(&mut form, "SELECT ts");
        form.input(key(KeyCode::Enter));
        type_text(&mut form, "FROM slice");

        // Move back over "slice" and insert before it
        for _ in 0.."slice".len() {
            form.input(key(KeyCode::Left));
        }
        type_text(&mut form, "sched_");

        assert_eq!(form.sql_text(), "SELECT ts\nFROM sched_slice");
    }

    #[test]
    fn test_spinner_wraps() {
        assert_eq!(spinner_frame(0), spinner_frame(SPINNER.len() as u64));
    }
}
