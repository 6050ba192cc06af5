//! Main TUI application state and logic

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, info, warn};

use super::components::QueryForm;
use super::event::{is_quit, Event, EventHandler};
use crate::console::{Console, ConsoleEvent, View};
use crate::error::{Error, Result};
use crate::models::QueryResult;

/// Rows moved by PageUp and PageDown in the result table
const RESULT_PAGE: isize = 10;

/// What woke the dashboard loop
enum Wake {
    Terminal(Option<Event>),
    Console(ConsoleEvent),
}

/// Dashboard state: the console plus purely presentational flags
pub struct App {
    /// Client state and operations
    pub console: Console,
    /// Whether the app should quit
    pub should_quit: bool,
    /// Show help overlay
    pub show_help: bool,
    /// Open add-query form
    pub form: Option<QueryForm>,
    /// Query awaiting delete confirmation
    pub pending_delete: Option<String>,
    /// Redraw ticks seen, drives the spinner
    pub ticks: u64,
    /// Highlighted row of the result table
    pub result_row: usize,
}

impl App {
    /// Create a dashboard over `console`
    pub fn new(console: Console) -> Self {
        Self {
            console,
            should_quit: false,
            show_help: false,
            form: None,
            pending_delete: None,
            ticks: 0,
            result_row: 0,
        }
    }

    /// Handle a key press
    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.form.is_some() {
            self.handle_form_key(key);
            return;
        }

        if let Some(id) = self.pending_delete.take() {
            if matches!(key.code, KeyCode::Char('y') | KeyCode::Enter) {
                settle("remove query", self.console.remove_query(&id));
            }
            return;
        }

        if self.show_help {
            self.show_help = false;
            if !is_quit(key) {
                return;
            }
        }

        if is_quit(key) {
            self.should_quit = true;
            return;
        }

        let in_results = self.console.router().active() == View::Results;
        match (key.code, key.modifiers) {
            (KeyCode::Esc, _) => self.console.dismiss_notification(),
            (KeyCode::Char('?'), _) => self.show_help = true,
            (KeyCode::Tab, KeyModifiers::NONE) => {
                self.activate(self.console.router().active().next());
            }
            (KeyCode::BackTab, _) => self.activate(self.console.router().active().prev()),
            (KeyCode::Char(c @ '1'..='3'), KeyModifiers::NONE) => {
                let index = c as usize - '1' as usize;
                if let Some(view) = View::from_index(index) {
                    self.activate(view);
                }
            }
            (KeyCode::Left | KeyCode::Char('h'), KeyModifiers::NONE) => {
                self.console.select_prev_device();
            }
            (KeyCode::Right | KeyCode::Char('l'), KeyModifiers::NONE) => {
                self.console.select_next_device();
            }
            (KeyCode::Up | KeyCode::Char('k'), KeyModifiers::NONE) if in_results => {
                self.scroll_results(-1);
            }
            (KeyCode::Down | KeyCode::Char('j'), KeyModifiers::NONE) if in_results => {
                self.scroll_results(1);
            }
            (KeyCode::PageUp, _) if in_results => self.scroll_results(-RESULT_PAGE),
            (KeyCode::PageDown, _) if in_results => self.scroll_results(RESULT_PAGE),
            (KeyCode::Home, _) if in_results => self.result_row = 0,
            (KeyCode::End, _) if in_results => self.scroll_results(isize::MAX),
            (KeyCode::Up | KeyCode::Char('k'), KeyModifiers::NONE) => {
                self.console.select_prev_query();
            }
            (KeyCode::Down | KeyCode::Char('j'), KeyModifiers::NONE) => {
                self.console.select_next_query();
            }
            (KeyCode::Char('s'), KeyModifiers::NONE) => self.start_trace(),
            (KeyCode::Char('r'), KeyModifiers::NONE) => self.run_query(),
            (KeyCode::Char('d'), KeyModifiers::NONE) => self.console.refresh_devices(),
            (KeyCode::Char('a'), KeyModifiers::NONE) => {
                self.console.switch_view(View::Queries);
                self.form = Some(QueryForm::default());
            }
            (KeyCode::Char('x'), KeyModifiers::NONE) => self.confirm_delete(),
            _ => {}
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let Some(form) = self.form.as_mut() else {
            return;
        };

        match (key.code, key.modifiers) {
            (KeyCode::Esc, _) => self.form = None,
            (KeyCode::Tab | KeyCode::BackTab, _) => form.toggle_focus(),
            (KeyCode::Char('s'), KeyModifiers::CONTROL) => {
                let name = form.name_text();
                let sql = form.sql_text();
                if self.console.add_query(&name, &sql).is_ok() {
                    self.form = None;
                }
            }
            _ => form.input(key),
        }
    }

    /// Move the highlighted result row by `delta`, clamped to the table
    fn scroll_results(&mut self, delta: isize) {
        let rows = self
            .console
            .jobs()
            .result()
            .map_or(0, QueryResult::row_count);
        self.result_row = self
            .result_row
            .saturating_add_signed(delta)
            .min(rows.saturating_sub(1));
    }

    fn activate(&mut self, view: View) {
        debug!(view = view.title(), "Activating view");
        self.console.activate_view(view);
    }

    fn start_trace(&mut self) {
        if !self.console.session().is_interactive() {
            self.console.notifier().info("A capture is already running.");
            return;
        }
        settle("start trace", self.console.start_selected_trace());
    }

    fn run_query(&mut self) {
        if !self.console.session().is_interactive() {
            self.console.notifier().warning("Wait for the capture to finish.");
            return;
        }
        if self.console.jobs().state().is_processing() {
            self.console.notifier().info("A query is already running.");
            return;
        }
        if self.console.execute_selected().is_ok() {
            self.result_row = 0;
            self.console.switch_view(View::Results);
        }
    }

    fn confirm_delete(&mut self) {
        let Some(query) = self.console.catalog().selected() else {
            self.console.notifier().warning("Please select a query.");
            return;
        };
        if query.builtin {
            self.console.notifier().warning("Built-in queries cannot be deleted.");
            return;
        }
        self.pending_delete = Some(query.id.clone());
    }

    /// Run the TUI application
    pub async fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        };
        use ratatui::{backend::CrosstermBackend, Terminal};
        use std::io;

        let tui = |e: io::Error| Error::Tui(e.to_string());

        enable_raw_mode().map_err(tui)?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).map_err(tui)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).map_err(tui)?;

        let mut events = EventHandler::new(self.console.config().tui.tick_rate);
        events.start();

        info!("Dashboard started");
        self.activate(View::Capture);

        let outcome = self.event_loop(&mut terminal, &mut events).await;

        self.console.shutdown();
        disable_raw_mode().map_err(tui)?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen).map_err(tui)?;
        terminal.show_cursor().map_err(tui)?;

        outcome
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut ratatui::Terminal<B>,
        events: &mut EventHandler,
    ) -> Result<()> {
        while !self.should_quit {
            terminal
                .draw(|frame| super::ui::draw(frame, self))
                .map_err(|e| Error::Tui(e.to_string()))?;

            let wake = tokio::select! {
                event = events.next() => Wake::Terminal(event),
                event = self.console.next_event() => Wake::Console(event),
            };

            match wake {
                Wake::Terminal(Some(Event::Key(key))) => self.handle_key(key),
                Wake::Terminal(Some(Event::Tick)) => self.ticks = self.ticks.wrapping_add(1),
                Wake::Terminal(Some(Event::Resize(..))) => {}
                Wake::Terminal(Some(Event::Error(e))) => warn!(error = %e, "Terminal read failed"),
                Wake::Terminal(None) => self.should_quit = true,
                Wake::Console(event) => self.console.handle(event),
            }
        }
        Ok(())
    }
}

/// Rejected operations have already notified the operator
fn settle(operation: &str, result: Result<()>) {
    if let Err(e) = result {
        debug!(operation, error = %e, "Operation rejected");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::api::TraceService;
    use crate::config::Config;
    use crate::models::*;

    struct Offline;

    #[async_trait]
    impl TraceService for Offline {
        async fn list_devices(&self) -> Result<Vec<Device>> {
            Err(Error::unavailable("offline"))
        }
        async fn list_queries(&self) -> Result<Vec<QueryDefinition>> {
            Err(Error::unavailable("offline"))
        }
        async fn add_query(&self, _query: &NewQuery) -> Result<()> {
            Err(Error::unavailable("offline"))
        }
        async fn delete_query(&self, _id: &str) -> Result<()> {
            Err(Error::unavailable("offline"))
        }
        async fn start_trace(&self, _device: &Device) -> Result<StartedTrace> {
            Err(Error::unavailable("offline"))
        }
        async fn execute_query(&self, _trace_id: &str, _query_id: &str) -> Result<PollLocation> {
            Err(Error::unavailable("offline"))
        }
        async fn poll_result(&self, _location: &PollLocation) -> Result<PollResponse> {
            Err(Error::unavailable("offline"))
        }
        async fn trace_status(&self, _trace_id: &str) -> Result<TraceReadiness> {
            Err(Error::unavailable("offline"))
        }
    }

    /// Answers every query with a finished single-column table of `.0` rows
    struct Finished(usize);

    #[async_trait]
    impl TraceService for Finished {
        async fn list_devices(&self) -> Result<Vec<Device>> {
            Ok(Vec::new())
        }
        async fn list_queries(&self) -> Result<Vec<QueryDefinition>> {
            Ok(Vec::new())
        }
        async fn add_query(&self, _query: &NewQuery) -> Result<()> {
            Ok(())
        }
        async fn delete_query(&self, _id: &str) -> Result<()> {
            Ok(())
        }
        async fn start_trace(&self, _device: &Device) -> Result<StartedTrace> {
            Err(Error::unavailable("offline"))
        }
        async fn execute_query(&self, _trace_id: &str, _query_id: &str) -> Result<PollLocation> {
            Ok(PollLocation::new("/api/poll/1"))
        }
        async fn poll_result(&self, _location: &PollLocation) -> Result<PollResponse> {
            let rows = (0..self.0).map(|i| vec![serde_json::json!(i)]).collect();
            Ok(PollResponse::complete(QueryResult::new(vec!["ts".into()], rows)))
        }
        async fn trace_status(&self, _trace_id: &str) -> Result<TraceReadiness> {
            Err(Error::unavailable("offline"))
        }
    }

    fn app() -> App {
        App::new(Console::new(Config::default(), Arc::new(Offline)))
    }

    /// Dashboard on the Results view showing a finished table of `rows` rows
    async fn app_with_result(rows: usize) -> App {
        let mut app = App::new(Console::new(Config::default(), Arc::new(Finished(rows))));
        app.console.execute("trace-1", "q_cpu").unwrap();
        app.console
            .run_until(Duration::from_secs(30), |c| c.jobs().result().is_some())
            .await
            .unwrap();
        press(&mut app, KeyCode::Char('3'));
        app
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App, text: &str) {
        text.chars().for_each(|c| press(app, KeyCode::Char(c)));
    }

    #[tokio::test]
    async fn test_number_keys_switch_views() {
        let mut app = app();
        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.console.router().active(), View::Results);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.console.router().active(), View::Capture);
    }

    #[tokio::test]
    async fn test_help_closes_on_any_key() {
        let mut app = app();
        press(&mut app, KeyCode::Char('?'));
        assert!(app.show_help);
        press(&mut app, KeyCode::Char('s'));
        assert!(!app.show_help);
        assert!(!app.should_quit);
    }

    #[tokio::test]
    async fn test_start_without_device_warns() {
        let mut app = app();
        press(&mut app, KeyCode::Char('s'));
        let note = app.console.notifier().current();
        assert_eq!(note.message, "Please select a device.");
        assert_eq!(note.severity, Severity::Warning);
    }

    #[tokio::test]
    async fn test_blank_form_stays_open() {
        let mut app = app();
        press(&mut app, KeyCode::Char('a'));
        assert!(app.form.is_some());
        app.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
        assert!(app.form.is_some());
        press(&mut app, KeyCode::Esc);
        assert!(app.form.is_none());
    }

    #[tokio::test]
    async fn test_form_saves_multiline_sql() {
        let mut app = App::new(Console::new(Config::default(), Arc::new(Finished(0))));
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "Jank");
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "SELECT ts");
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "FROM slice");

        let form = app.form.as_ref().unwrap();
        assert_eq!(form.name_text(), "Jank");
        assert_eq!(form.sql_text(), "SELECT ts\nFROM slice");

        app.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
        assert!(app.form.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_rows_scroll_within_table() {
        let mut app = app_with_result(25).await;
        assert_eq!(app.result_row, 0);

        press(&mut app, KeyCode::Up);
        assert_eq!(app.result_row, 0);

        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.result_row, 2);

        press(&mut app, KeyCode::PageDown);
        assert_eq!(app.result_row, 12);
        press(&mut app, KeyCode::PageDown);
        press(&mut app, KeyCode::PageDown);
        assert_eq!(app.result_row, 24);

        press(&mut app, KeyCode::PageUp);
        assert_eq!(app.result_row, 14);
        press(&mut app, KeyCode::Home);
        assert_eq!(app.result_row, 0);
        press(&mut app, KeyCode::End);
        assert_eq!(app.result_row, 24);
    }

    #[tokio::test(start_paused = true)]
    async fn test_arrows_outside_results_keep_result_row() {
        let mut app = app_with_result(25).await;
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Down);
        assert_eq!(app.result_row, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scrolling_empty_result_stays_at_top() {
        let mut app = app_with_result(0).await;
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::End);
        assert_eq!(app.result_row, 0);
    }
}
