//! Device registry: the last fetched set of capture targets and the selection

use tracing::{debug, info};

use super::Notifier;
use crate::error::{Error, Result};
use crate::models::Device;

const FETCH_FAILED: &str = "Could not fetch devices. Is ADB running?";

/// Cached device list with a single selected entry
#[derive(Debug)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
    selected: Option<Device>,
    refreshing: bool,
    fetch: u64,
    notifier: Notifier,
}

impl DeviceRegistry {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            devices: Vec::new(),
            selected: None,
            refreshing: false,
            fetch: 0,
            notifier,
        }
    }

    /// Devices from the last successful refresh
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn selected(&self) -> Option<&Device> {
        self.selected.as_ref()
    }

    /// Position of the selection in the device list
    pub fn selected_index(&self) -> Option<usize> {
        let selected = self.selected.as_ref()?;
        self.devices.iter().position(|d| d == selected)
    }

    /// Whether a refresh request is in flight
    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    /// Mark a refresh as issued, returning the fetch number it must answer with
    pub fn begin_refresh(&mut self) -> u64 {
        self.fetch += 1;
        self.refreshing = true;
        self.fetch
    }

    /// Apply the outcome of a device fetch.
    ///
    /// Only the latest issued fetch is applied; older answers are dropped.
    /// A failure keeps the previous set and is reported once. A successful
    /// fetch replaces the set wholesale; the selection is kept when the device
    /// is still present, otherwise it falls back to the first device, or to
    /// nothing when the set is empty.
    pub fn apply_refresh(&mut self, fetch: u64, result: Result<Vec<Device>>) -> bool {
        if fetch != self.fetch {
            debug!(fetch, latest = self.fetch, "Discarding stale device list");
            return false;
        }
        self.refreshing = false;

        let devices = match result {
            Ok(devices) => devices,
            Err(e) => {
                self.notifier.error(e.user_message(FETCH_FAILED));
                return true;
            }
        };

        info!(count = devices.len(), "Device list refreshed");
        self.devices = devices;

        let still_present = self
            .selected
            .as_ref()
            .is_some_and(|s| self.devices.contains(s));
        if !still_present {
            self.selected = self.devices.first().cloned();
            debug!(selected = ?self.selected, "Device selection reset");
        }
        true
    }

    /// Select a device from the last fetched set
    pub fn select(&mut self, device: &Device) -> Result<()> {
        if !self.devices.contains(device) {
            return Err(Error::validation(format!("Unknown device: {device}")));
        }
        self.selected = Some(device.clone());
        Ok(())
    }

    /// Move the selection forward, wrapping around
    pub fn select_next(&mut self) {
        self.step_selection(1);
    }

    /// Move the selection backward, wrapping around
    pub fn select_prev(&mut self) {
        self.step_selection(self.devices.len().saturating_sub(1));
    }

    fn step_selection(&mut self, offset: usize) {
        if self.devices.is_empty() {
            return;
        }
        let current = self.selected_index().unwrap_or(0);
        let next = (current + offset) % self.devices.len();
        self.selected = Some(self.devices[next].clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn registry() -> DeviceRegistry {
        DeviceRegistry::new(Notifier::new(Duration::from_secs(6)))
    }

    fn devices(ids: &[&str]) -> Vec<Device> {
        ids.iter().map(|id| Device::from(*id)).collect()
    }

    fn refreshed(reg: &mut DeviceRegistry, result: Result<Vec<Device>>) {
        let fetch = reg.begin_refresh();
        assert!(reg.apply_refresh(fetch, result));
    }

    #[test]
    fn test_first_device_selected_by_default() {
        let mut reg = registry();
        refreshed(&mut reg, Ok(devices(&["emulator-5554", "R58M123"])));
        assert_eq!(reg.selected().map(Device::as_str), Some("emulator-5554"));
    }

    #[test]
    fn test_selection_kept_when_present() {
        let mut reg = registry();
        refreshed(&mut reg, Ok(devices(&["a", "b"])));
        reg.select(&Device::from("b")).unwrap();
        refreshed(&mut reg, Ok(devices(&["c", "b"])));
        assert_eq!(reg.selected().map(Device::as_str), Some("b"));
    }

    #[test]
    fn test_empty_set_clears_selection() {
        let mut reg = registry();
        refreshed(&mut reg, Ok(devices(&["a"])));
        refreshed(&mut reg, Ok(vec![]));
        assert!(reg.selected().is_none());
        assert!(reg.devices().is_empty());
    }

    #[test]
    fn test_failure_keeps_previous_set_and_notifies() {
        let mut reg = registry();
        refreshed(&mut reg, Ok(devices(&["a"])));
        refreshed(&mut reg, Err(Error::unavailable("connection refused")));

        assert_eq!(reg.devices(), devices(&["a"]).as_slice());
        assert!(!reg.is_refreshing());
        let note = reg.notifier.current();
        assert_eq!(note.message, FETCH_FAILED);
        assert_eq!(note.sequence, 1);
    }

    #[test]
    fn test_select_requires_membership() {
        let mut reg = registry();
        refreshed(&mut reg, Ok(devices(&["a"])));
        assert!(reg.select(&Device::from("zzz")).unwrap_err().is_validation());
        assert_eq!(reg.selected().map(Device::as_str), Some("a"));
    }

    #[test]
    fn test_selection_wraps() {
        let mut reg = registry();
        refreshed(&mut reg, Ok(devices(&["a", "b", "c"])));
        reg.select_prev();
        assert_eq!(reg.selected().map(Device::as_str), Some("c"));
        reg.select_next();
        assert_eq!(reg.selected().map(Device::as_str), Some("a"));
    }

    #[test]
    fn test_older_fetch_is_dropped() {
        let mut reg = registry();
        let slow = reg.begin_refresh();
        let fast = reg.begin_refresh();

        assert!(reg.apply_refresh(fast, Ok(devices(&["pixel-7"]))));
        assert!(!reg.apply_refresh(slow, Ok(devices(&["emulator-5554"]))));
        assert_eq!(reg.devices(), devices(&["pixel-7"]).as_slice());
        assert!(!reg.is_refreshing());
    }

    #[test]
    fn test_refreshing_until_latest_answers() {
        let mut reg = registry();
        let first = reg.begin_refresh();
        let second = reg.begin_refresh();

        assert!(!reg.apply_refresh(first, Err(Error::unavailable("down"))));
        assert!(reg.is_refreshing());
        assert_eq!(reg.notifier.sequence(), 0);

        reg.apply_refresh(second, Ok(devices(&["a"])));
        assert!(!reg.is_refreshing());
    }
}
