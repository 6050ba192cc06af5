//! Query catalog: read-through cache of the service's query list

use tracing::{debug, info};

use super::Notifier;
use crate::error::{Error, Result};
use crate::models::{NewQuery, QueryDefinition};

const FETCH_FAILED: &str = "Could not fetch predefined queries.";
const ADD_FAILED: &str = "Failed to save query.";
const REMOVE_FAILED: &str = "Failed to delete query.";

/// Cached query list with a single selected entry
#[derive(Debug)]
pub struct QueryCatalog {
    entries: Vec<QueryDefinition>,
    selected: Option<String>,
    refreshing: bool,
    fetch: u64,
    notifier: Notifier,
}

impl QueryCatalog {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            entries: Vec::new(),
            selected: None,
            refreshing: false,
            fetch: 0,
            notifier,
        }
    }

    pub fn entries(&self) -> &[QueryDefinition] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&QueryDefinition> {
        self.entries.iter().find(|q| q.id == id)
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected(&self) -> Option<&QueryDefinition> {
        self.selected.as_deref().and_then(|id| self.get(id))
    }

    pub fn selected_index(&self) -> Option<usize> {
        let id = self.selected.as_deref()?;
        self.entries.iter().position(|q| q.id == id)
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    /// Mark a list fetch as issued, returning its fetch number
    pub fn begin_refresh(&mut self) -> u64 {
        self.fetch += 1;
        self.refreshing = true;
        self.fetch
    }

    /// Apply the outcome of a list fetch.
    ///
    /// Answers to anything but the latest fetch are dropped, so a slow
    /// listing cannot undo a later add or delete. On success the entries are replaced and a selection that no longer
    /// exists resets to the first entry, or to none for an empty catalog.
    /// On failure the last known entries stay and the failure is reported.
    pub fn apply_list(&mut self, fetch: u64, result: Result<Vec<QueryDefinition>>) -> bool {
        if fetch != self.fetch {
            debug!(fetch, latest = self.fetch, "Discarding stale query list");
            return false;
        }
        self.refreshing = false;

        let entries = match result {
            Ok(entries) => entries,
            Err(e) => {
                self.notifier.error(e.user_message(FETCH_FAILED));
                return true;
            }
        };

        info!(count = entries.len(), "Query catalog refreshed");
        self.entries = entries;

        let still_present = self
            .selected
            .as_deref()
            .is_some_and(|id| self.entries.iter().any(|q| q.id == id));
        if !still_present {
            self.selected = self.entries.first().map(|q| q.id.clone());
            debug!(selected = ?self.selected, "Query selection reset");
        }
        true
    }

    /// Check a new query locally before anything is sent.
    ///
    /// Blank names or query text are rejected with a warning.
    pub fn validate_new(&self, name: &str, sql: &str) -> Result<NewQuery> {
        let name = name.trim();
        let sql = sql.trim();

        let problem = match (name.is_empty(), sql.is_empty()) {
            (true, true) => Some("Query name and SQL are required."),
            (true, false) => Some("Query name is required."),
            (false, true) => Some("Query SQL is required."),
            (false, false) => None,
        };
        if let Some(msg) = problem {
            self.notifier.warning(msg);
            return Err(Error::validation(msg));
        }

        Ok(NewQuery {
            name: name.to_string(),
            sql: sql.to_string(),
        })
    }

    /// Check a removal request locally
    pub fn validate_remove(&self, id: &str) -> Result<()> {
        if id.trim().is_empty() {
            let msg = "Please select a query to delete.";
            self.notifier.warning(msg);
            return Err(Error::validation(msg));
        }
        Ok(())
    }

    /// Report an add outcome; returns whether the list should be re-fetched
    pub fn apply_added(&mut self, name: &str, result: Result<()>) -> bool {
        match result {
            Ok(()) => {
                self.notifier.success(format!("Query '{name}' saved."));
                true
            }
            Err(e) => {
                self.notifier.error(e.user_message(ADD_FAILED));
                false
            }
        }
    }

    /// Report a removal outcome.
    ///
    /// The list is re-fetched either way so the cache matches the service.
    pub fn apply_removed(&mut self, id: &str, result: Result<()>) -> bool {
        match result {
            Ok(()) => {
                self.notifier.success(format!("Query '{id}' deleted."));
            }
            Err(e) => {
                self.notifier.error(e.user_message(REMOVE_FAILED));
            }
        }
        true
    }

    pub fn select(&mut self, id: &str) -> Result<()> {
        if self.get(id).is_none() {
            return Err(Error::validation(format!("Unknown query: {id}")));
        }
        self.selected = Some(id.to_string());
        Ok(())
    }

    /// Move the selection forward, wrapping around
    pub fn select_next(&mut self) {
        self.step_selection(1);
    }

    /// Move the selection backward, wrapping around
    pub fn select_prev(&mut self) {
        self.step_selection(self.entries.len().saturating_sub(1));
    }

    fn step_selection(&mut self, offset: usize) {
        if self.entries.is_empty() {
            return;
        }
        let current = self.selected_index().unwrap_or(0);
        let next = (current + offset) % self.entries.len();
        self.selected = Some(self.entries[next].id.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn catalog() -> QueryCatalog {
        QueryCatalog::new(Notifier::new(Duration::from_secs(6)))
    }

    fn query(id: &str, builtin: bool) -> QueryDefinition {
        QueryDefinition {
            id: id.to_string(),
            name: id.replace('_', " "),
            sql: "SELECT 1".to_string(),
            builtin,
        }
    }

    fn listed(cat: &mut QueryCatalog, result: Result<Vec<QueryDefinition>>) {
        let fetch = cat.begin_refresh();
        assert!(cat.apply_list(fetch, result));
    }

    #[test]
    fn test_list_selects_first() {
        let mut cat = catalog();
        listed(&mut cat, Ok(vec![query("q_cpu", true), query("q_custom", false)]));
        assert_eq!(cat.selected_id(), Some("q_cpu"));
    }

    #[test]
    fn test_missing_selection_resets_to_first() {
        let mut cat = catalog();
        listed(&mut cat, Ok(vec![query("q_cpu", true), query("q_custom", false)]));
        cat.select("q_custom").unwrap();

        listed(&mut cat, Ok(vec![query("q_cpu", true), query("q_jank", true)]));
        assert_eq!(cat.selected_id(), Some("q_cpu"));
    }

    #[test]
    fn test_empty_list_clears_selection() {
        let mut cat = catalog();
        listed(&mut cat, Ok(vec![query("q_cpu", true)]));
        listed(&mut cat, Ok(vec![]));
        assert_eq!(cat.selected_id(), None);
    }

    #[test]
    fn test_failed_list_keeps_entries() {
        let mut cat = catalog();
        listed(&mut cat, Ok(vec![query("q_cpu", true)]));
        listed(&mut cat, Err(Error::unavailable("down")));
        assert_eq!(cat.entries().len(), 1);
        assert_eq!(cat.notifier.current().message, FETCH_FAILED);
    }

    #[test]
    fn test_validate_rejects_blank_input() {
        let cat = catalog();
        assert!(cat.validate_new("", "SELECT 1").unwrap_err().is_validation());
        assert!(cat.validate_new("cpu", "   ").unwrap_err().is_validation());
        assert_eq!(cat.notifier.sequence(), 2);

        let ok = cat.validate_new("  cpu  ", "SELECT 1").unwrap();
        assert_eq!(ok.name, "cpu");
    }

    #[test]
    fn test_removal_always_refreshes() {
        let mut cat = catalog();
        assert!(cat.apply_removed("q_gone", Err(Error::remote(404, "Query not found"))));
        let note = cat.notifier.current();
        assert_eq!(note.message, "Query not found");
        assert_eq!(note.sequence, 1);
    }

    #[test]
    fn test_stale_listing_does_not_resurrect_entries() {
        let mut cat = catalog();
        let slow = cat.begin_refresh();
        let relist = cat.begin_refresh();

        assert!(cat.apply_list(relist, Ok(vec![query("q_cpu", true)])));
        assert!(!cat.apply_list(slow, Ok(vec![query("q_cpu", true), query("q_custom", false)])));

        let ids: Vec<&str> = cat.entries().iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["q_cpu"]);
        assert!(!cat.is_refreshing());
    }

    #[test]
    fn test_selection_wraps() {
        let mut cat = catalog();
        listed(&mut cat, Ok(vec![query("q_cpu", true), query("q_mem", true), query("q_custom", false)]));
        cat.select_prev();
        assert_eq!(cat.selected_id(), Some("q_custom"));
        cat.select_next();
        assert_eq!(cat.selected_id(), Some("q_cpu"));
        cat.select_next();
        assert_eq!(cat.selected_id(), Some("q_mem"));
    }
}
