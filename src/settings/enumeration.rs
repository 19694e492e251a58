//! # Enumeration settings
//!
//! An [EnumSetting] holds one value of a [SettingEnum] and the subset of values the device supports. User
//! changes to an unsupported value are ignored:
//!
//! ```
//! # use groundsdk_core::settings::{EnumSet, EnumSetting, SettingController};
//! # use groundsdk_core::settings::wifi::Environment;
//! # use groundsdk_core::tasks::{DirectBackgroundScheduler, DirectMainScheduler};
//! # use groundsdk_core::Executor;
//! # use std::sync::Arc;
//! # let executor = Executor::new(Arc::new(DirectBackgroundScheduler::new()), Arc::new(DirectMainScheduler::new()));
//! let controller = SettingController::new(&executor, Arc::new(|_| ()));
//! let setting = EnumSetting::new(Environment::Outdoor, controller, |_| true);
//! setting.update_available_values(EnumSet::of(&[Environment::Outdoor]));
//!
//! setting.set_value(Environment::Indoor);
//! assert_eq!(setting.value(), Environment::Outdoor);
//! assert!(!setting.is_updating());
//! ```

use super::controller::{Rollback, SettingController};
use super::enum_set::{EnumSet, SettingEnum};
use super::ValueBackend;
use crate::tasks::lock;
use std::sync::{Arc, Mutex};

struct State<E> {
    value: E,
    available: EnumSet<E>,
}

/// # Enumeration setting
///
/// A setting holding one value of a [SettingEnum], among the values the device supports.
///
/// User changes must pick a supported value. Device updates are applied as is, even when the value is not
/// listed as supported.
pub struct EnumSetting<E: SettingEnum> {
    state: Arc<Mutex<State<E>>>,
    controller: SettingController,
    backend: ValueBackend<E>,
}

impl<E: SettingEnum> EnumSetting<E> {
    /// Setting with all values supported until told otherwise
    pub fn new(
        default: E,
        controller: SettingController,
        backend: impl Fn(E) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::build(default, EnumSet::all(), controller, backend)
    }

    /// Setting supporting `default` and `others` until told otherwise
    pub fn with_available(
        default: E,
        others: EnumSet<E>,
        controller: SettingController,
        backend: impl Fn(E) -> bool + Send + Sync + 'static,
    ) -> Self {
        let mut available = others;
        available.insert(default);
        Self::build(default, available, controller, backend)
    }

    /// Setting with no supported value until told otherwise, its value is the first enum value
    pub fn unavailable(
        controller: SettingController,
        backend: impl Fn(E) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::build(E::first(), EnumSet::empty(), controller, backend)
    }

    fn build(
        value: E,
        available: EnumSet<E>,
        controller: SettingController,
        backend: impl Fn(E) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(State { value, available })),
            controller,
            backend: Box::new(backend),
        }
    }

    /// Current value
    pub fn value(&self) -> E {
        lock(&self.state).value
    }

    /// Values currently supported by the device
    pub fn available_values(&self) -> EnumSet<E> {
        lock(&self.state).available
    }

    /// True while a user change waits for device confirmation
    pub fn is_updating(&self) -> bool {
        self.controller.has_pending_rollback()
    }

    /// Change the value.
    ///
    /// Does nothing if `value` is the current value, is not supported or cannot be sent.
    pub fn set_value(&self, value: E) {
        let previous = {
            let state = lock(&self.state);
            if state.value == value || !state.available.contains(value) {
                return;
            }
            state.value
        };
        if !(self.backend)(value) {
            return;
        }

        lock(&self.state).value = value;
        let state = self.state.clone();
        self.controller.post_rollback(Rollback::new(
            format!("{:?} -> {:?}", value, previous),
            move || lock(&state).value = previous,
        ));
    }

    /// Apply a value reported by the device
    pub fn update_value(&self, value: E) -> &Self {
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

    /// Apply the supported values reported by the device
    pub fn update_available_values(&self, values: EnumSet<E>) -> &Self {
        if lock(&self.state).available.replace(values) {
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
