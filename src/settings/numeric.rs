//! # Numeric settings
//!
//! A [NumericSetting] holds a number within bounds reported by the device. Values outside the bounds are
//! clamped rather than rejected, for user changes as well as device updates. Values and bounds that cannot
//! be compared, such as NaN, are ignored:
//!
//! ```
//! # use groundsdk_core::settings::{IntSetting, SettingController};
//! # use groundsdk_core::tasks::{DirectBackgroundScheduler, DirectMainScheduler};
//! # use groundsdk_core::{Executor, IntRange};
//! # use std::sync::Arc;
//! # let executor = Executor::new(Arc::new(DirectBackgroundScheduler::new()), Arc::new(DirectMainScheduler::new()));
//! let controller = SettingController::new(&executor, Arc::new(|_| ()));
//! let setting = IntSetting::new(controller, |_| true);
//! setting.update_bounds(IntRange::of(1, 10)).update_value(5);
//!
//! setting.set_value(42);
//! assert_eq!(setting.value(), 10);
//! assert!(setting.is_updating());
//! ```
//!
//! An [OptionalDoubleSetting] is a double setting that only becomes available once the device reports bounds.

use super::controller::{Rollback, SettingController};
use super::ValueBackend;
use crate::tasks::lock;
use crate::value::{Range, SettingNumber};
use std::sync::{Arc, Mutex};

struct State<T> {
    bounds: Range<T>,
    value: T,
    available: bool,
}

/// # Bounded numeric setting
///
/// See the [numeric module documentation](crate::settings::numeric). Until the device reports its bounds, the
/// setting is at zero within `[0, 0]`.
pub struct NumericSetting<T: SettingNumber> {
    state: Arc<Mutex<State<T>>>,
    controller: SettingController,
    backend: ValueBackend<T>,
}

/// Integer setting
pub type IntSetting = NumericSetting<i32>;

/// Floating point setting
pub type DoubleSetting = NumericSetting<f64>;

impl<T: SettingNumber> NumericSetting<T> {
    /// Create a setting at zero within `[0, 0]`
    pub fn new(
        controller: SettingController,
        backend: impl Fn(T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::build(true, controller, backend)
    }

    fn build(
        available: bool,
        controller: SettingController,
        backend: impl Fn(T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                bounds: Range::default(),
                value: T::default(),
                available,
            })),
            controller,
            backend: Box::new(backend),
        }
    }

    /// Current value
    pub fn value(&self) -> T {
        lock(&self.state).value
    }

    /// Lower bound
    pub fn min(&self) -> T {
        lock(&self.state).bounds.min()
    }

    /// Upper bound
    pub fn max(&self) -> T {
        lock(&self.state).bounds.max()
    }

    /// Bounds of the value
    pub fn bounds(&self) -> Range<T> {
        lock(&self.state).bounds
    }

    /// True while a user change waits for device confirmation
    pub fn is_updating(&self) -> bool {
        self.controller.has_pending_rollback()
    }

    /// Change the value, clamped within the bounds.
    ///
    /// Does nothing if the clamped value is the current value or cannot be sent.
    pub fn set_value(&self, value: T) {
        if !value.is_comparable() {
            return;
        }
        let (value, previous) = {
            let state = lock(&self.state);
            let value = state.bounds.clamp(value);
            if !state.available || value == state.value {
                return;
            }
            (value, state.value)
        };
        if !(self.backend)(value) {
            return;
        }

        lock(&self.state).value = value;
        let state = self.state.clone();
        self.controller.post_rollback(Rollback::new(
            format!("{:?} -> {:?}", value, previous),
            move || {
                let mut state = lock(&state);
                state.value = state.bounds.clamp(previous);
            },
        ));
    }

    /// Apply the bounds reported by the device, clamping the current value within them
    pub fn update_bounds(&self, bounds: Range<T>) -> &Self {
        if !bounds.min().is_comparable() || !bounds.max().is_comparable() {
            return self;
        }
        let changed = {
            let mut state = lock(&self.state);
            let changed = !state.available || state.bounds != bounds;
            if changed {
                state.available = true;
                state.bounds = bounds;
                state.value = bounds.clamp(state.value);
            }
            changed
        };
        if changed {
            self.controller.notify_change(false);
        }
        self
    }

    /// Apply a value reported by the device, clamped within the bounds
    pub fn update_value(&self, value: T) -> &Self {
        if !value.is_comparable() {
            return self;
        }
        let canceled = self.controller.cancel_rollback();
        let changed = {
            let mut state = lock(&self.state);
            let value = state.bounds.clamp(value);
            let changed = state.value != value;
            state.value = value;
            changed
        };
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

    fn is_available(&self) -> bool {
        lock(&self.state).available
    }
}

/// # Optional floating point setting
///
/// A [DoubleSetting] that is unavailable until the device reports its bounds. User changes on an unavailable
/// setting do nothing.
pub struct OptionalDoubleSetting {
    setting: NumericSetting<f64>,
}

impl OptionalDoubleSetting {
    /// Create an unavailable setting
    pub fn new(
        controller: SettingController,
        backend: impl Fn(f64) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            setting: NumericSetting::build(false, controller, backend),
        }
    }

    /// True once the device reported bounds
    pub fn is_available(&self) -> bool {
        self.setting.is_available()
    }

    /// Current value, `None` while unavailable
    pub fn value(&self) -> Option<f64> {
        self.is_available().then(|| self.setting.value())
    }

    /// Bounds of the value, `None` while unavailable
    pub fn bounds(&self) -> Option<Range<f64>> {
        self.is_available().then(|| self.setting.bounds())
    }

    /// See [NumericSetting::is_updating]
    pub fn is_updating(&self) -> bool {
        self.setting.is_updating()
    }

    /// See [NumericSetting::set_value]. Does nothing while unavailable.
    pub fn set_value(&self, value: f64) {
        self.setting.set_value(value)
    }

    /// Apply the bounds reported by the device, making the setting available
    pub fn update_bounds(&self, bounds: Range<f64>) -> &Self {
        self.setting.update_bounds(bounds);
        self
    }

    /// See [NumericSetting::update_value]
    pub fn update_value(&self, value: f64) -> &Self {
        self.setting.update_value(value);
        self
    }

    /// See [NumericSetting::cancel_rollback]
    pub fn cancel_rollback(&self) {
        self.setting.cancel_rollback()
    }
}
