//! # Country setting
//!
//! The access point country is an ISO 3166-1 alpha-2 code chosen among the codes the device allows. The device
//! also reports whether it fell back to its default country, in which case the available codes may be limited
//! to that single default.

use crate::settings::controller::{Rollback, SettingController};
use crate::settings::ValueBackend;
use crate::tasks::lock;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct State {
    code: String,
    available: BTreeSet<String>,
    default_country_used: bool,
}

/// # Wi-Fi country setting
///
/// The country whose regulations the access point follows, as an ISO 3166-1 alpha-2 code. The code is empty until
/// the device reports one. Only codes the device lists as available can be selected.
pub struct CountrySetting {
    state: Arc<Mutex<State>>,
    controller: SettingController,
    backend: ValueBackend<String>,
}

impl CountrySetting {
    /// Create a country setting with no code and no available code
    pub fn new(controller: SettingController, backend: impl Fn(String) -> bool + Send + Sync + 'static) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            controller,
            backend: Box::new(backend),
        }
    }

    /// Current country code
    pub fn code(&self) -> String {
        lock(&self.state).code.clone()
    }

    /// Country codes that can be selected
    pub fn available_codes(&self) -> BTreeSet<String> {
        lock(&self.state).available.clone()
    }

    /// True when the device fell back to its default country, because none could be determined
    pub fn is_default_country_used(&self) -> bool {
        lock(&self.state).default_country_used
    }

    /// True while a user change waits for device confirmation
    pub fn is_updating(&self) -> bool {
        self.controller.has_pending_rollback()
    }

    /// Select a country.
    ///
    /// Does nothing if `code` is the current code, is not available or cannot be sent.
    pub fn select(&self, code: &str) {
        let previous = {
            let state = lock(&self.state);
            if state.code == code || !state.available.contains(code) {
                return;
            }
            state.code.clone()
        };
        if !(self.backend)(code.to_owned()) {
            return;
        }

        lock(&self.state).code = code.to_owned();
        let state = self.state.clone();
        self.controller.post_rollback(Rollback::new(
            format!("country {} -> {}", code, previous),
            move || lock(&state).code = previous,
        ));
    }

    /// Apply the country code reported by the device
    pub fn update_code(&self, code: impl Into<String>) -> &Self {
        let code = code.into();
        let canceled = self.controller.cancel_rollback();
        let changed = {
            let mut state = lock(&self.state);
            let changed = state.code != code;
            state.code = code;
            changed
        };
        if canceled || changed {
            self.controller.notify_change(false);
        }
        self
    }

    /// Apply the available country codes reported by the device
    pub fn update_available_codes(&self, codes: BTreeSet<String>) -> &Self {
        let changed = {
            let mut state = lock(&self.state);
            let changed = state.available != codes;
            state.available = codes;
            changed
        };
        if changed {
            self.controller.notify_change(false);
        }
        self
    }

    /// Tell whether the device uses its default country
    pub fn update_default_country_used(&self, used: bool) -> &Self {
        let changed = std::mem::replace(&mut lock(&self.state).default_country_used, used) != used;
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
