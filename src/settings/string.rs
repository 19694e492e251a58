//! # String settings
//!
//! A [StringSetting] accepts any string, or only the values of a set reported by the device.

use super::controller::{Rollback, SettingController};
use super::ValueBackend;
use crate::tasks::lock;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

struct State {
    value: String,
    // None when the device accepts any string
    available: Option<BTreeSet<String>>,
}

/// # String setting
///
/// A free text setting, such as a network name. When the device reports a list of accepted strings, user changes
/// must pick one of them.
pub struct StringSetting {
    state: Arc<Mutex<State>>,
    controller: SettingController,
    backend: ValueBackend<String>,
}

impl StringSetting {
    /// Create a setting accepting any string
    pub fn new(
        default: impl Into<String>,
        controller: SettingController,
        backend: impl Fn(String) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                value: default.into(),
                available: None,
            })),
            controller,
            backend: Box::new(backend),
        }
    }

    /// Current value
    pub fn value(&self) -> String {
        lock(&self.state).value.clone()
    }

    /// Accepted strings, `None` when any string is accepted
    pub fn available_values(&self) -> Option<BTreeSet<String>> {
        lock(&self.state).available.clone()
    }

    /// True while a user change waits for device confirmation
    pub fn is_updating(&self) -> bool {
        self.controller.has_pending_rollback()
    }

    /// Change the value.
    ///
    /// Does nothing if `value` is the current value, is not accepted or cannot be sent.
    pub fn set_value(&self, value: impl Into<String>) {
        let value = value.into();
        let previous = {
            let state = lock(&self.state);
            let accepted = state
                .available
                .as_ref()
                .map_or(true, |available| available.contains(&value));
            if state.value == value || !accepted {
                return;
            }
            state.value.clone()
        };
        if !(self.backend)(value.clone()) {
            return;
        }

        let name = format!("{:?} -> {:?}", value, previous);
        lock(&self.state).value = value;
        let state = self.state.clone();
        self.controller
            .post_rollback(Rollback::new(name, move || lock(&state).value = previous));
    }

    /// Apply a value reported by the device
    pub fn update_value(&self, value: impl Into<String>) -> &Self {
        let value = value.into();
        let canceled = self.controller.cancel_rollback();
        let changed = {
            let mut state = lock(&self.state);
            let changed = state.value != value;
            state.value = value;
            changed
        };
        if canceled || changed {
            self.controller.notify_change(false);
        }
        self
    }

    /// Apply the accepted strings reported by the device, `None` to accept any string
    pub fn update_available_values(&self, values: Option<BTreeSet<String>>) -> &Self {
        let changed = {
            let mut state = lock(&self.state);
            let changed = state.available != values;
            state.available = values;
            changed
        };
        if changed {
            self.controller.notify_change(false);
        }
        self
    }

    /// Confirm the user change in progress, if any, without waiting for the device
    pub fn cancel_rollback(&self) {
        if self.controller.cancel_rollback() {
            self.controller.notify_change(false);
        }
    }
}
