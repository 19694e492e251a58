//! # Boolean settings

use super::controller::{Rollback, SettingController};
use super::ValueBackend;
use crate::tasks::lock;
use std::sync::{Arc, Mutex};

/// # Boolean setting
///
/// An on/off setting, disabled until the device says otherwise.
pub struct BooleanSetting {
    enabled: Arc<Mutex<bool>>,
    controller: SettingController,
    backend: ValueBackend<bool>,
}

impl BooleanSetting {
    /// Create a disabled setting
    pub fn new(controller: SettingController, backend: impl Fn(bool) -> bool + Send + Sync + 'static) -> Self {
        Self {
            enabled: Arc::new(Mutex::new(false)),
            controller,
            backend: Box::new(backend),
        }
    }

    /// True if enabled
    pub fn is_enabled(&self) -> bool {
        *lock(&self.enabled)
    }

    /// True while a user change waits for device confirmation
    pub fn is_updating(&self) -> bool {
        self.controller.has_pending_rollback()
    }

    /// Enable or disable.
    ///
    /// Does nothing if already in the requested state or if the change cannot be sent.
    pub fn set_enabled(&self, enabled: bool) {
        if self.is_enabled() == enabled || !(self.backend)(enabled) {
            return;
        }

        *lock(&self.enabled) = enabled;
        let state = self.enabled.clone();
        self.controller.post_rollback(Rollback::new(
            format!("enabled {} -> {}", enabled, !enabled),
            move || *lock(&state) = !enabled,
        ));
    }

    /// Flip the current state
    pub fn toggle(&self) {
        self.set_enabled(!self.is_enabled())
    }

    /// Apply a state reported by the device
    pub fn update_value(&self, enabled: bool) -> &Self {
        let canceled = self.controller.cancel_rollback();
        let changed = std::mem::replace(&mut *lock(&self.enabled), enabled) != enabled;
        if canceled || changed {
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
