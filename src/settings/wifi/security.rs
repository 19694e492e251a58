//! # Access point security
//!
//! The access point is either open or secured with WPA2. Securing it requires a password that passes
//! [is_password_valid]; the password itself is sent to the device and never stored by the setting.

use crate::settings::controller::{Rollback, SettingController};
use crate::settings::enum_set::{EnumSet, SettingEnum};
use crate::tasks::lock;
use std::sync::{Arc, Mutex};

/// Wi-Fi access point security mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityMode {
    /// No password
    Open,
    /// WPA2 with a pre-shared password
    Wpa2Secured,
}

impl SettingEnum for SecurityMode {
    const ALL: &'static [Self] = &[SecurityMode::Open, SecurityMode::Wpa2Secured];
}

/// Minimum WPA2 password length
pub const MIN_PASSWORD_LEN: usize = 8;

/// Maximum WPA2 password length
pub const MAX_PASSWORD_LEN: usize = 63;

/// Check a WPA2 password: 8 to 63 printable ASCII characters
///
/// ```
/// # use groundsdk_core::settings::wifi::is_password_valid;
/// assert!(is_password_valid("password"));
/// assert!(!is_password_valid("short"));
/// assert!(!is_password_valid("pässword"));
/// ```
pub fn is_password_valid(password: &str) -> bool {
    (MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&password.len())
        && password.bytes().all(|c| (0x20..=0x7e).contains(&c))
}

/// Device side of the security setting
///
/// Receives the requested mode and, for [SecurityMode::Wpa2Secured], the password. Returns `false` if the
/// request could not be sent.
pub type SecurityBackend = Box<dyn Fn(SecurityMode, Option<&str>) -> bool + Send + Sync + 'static>;

struct State {
    mode: SecurityMode,
    supported: EnumSet<SecurityMode>,
}

/// # Wi-Fi security setting
///
/// Access point security, open until the device says otherwise. Only [SecurityMode::Open] is supported until the
/// device reports its supported modes.
///
/// The password is write only: it is handed to the backend and never stored.
pub struct SecuritySetting {
    state: Arc<Mutex<State>>,
    controller: SettingController,
    backend: SecurityBackend,
}

impl SecuritySetting {
    /// Create an open security setting
    pub fn new(
        controller: SettingController,
        backend: impl Fn(SecurityMode, Option<&str>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                mode: SecurityMode::Open,
                supported: EnumSet::of(&[SecurityMode::Open]),
            })),
            controller,
            backend: Box::new(backend),
        }
    }

    /// Current security mode
    pub fn mode(&self) -> SecurityMode {
        lock(&self.state).mode
    }

    /// Modes the device supports
    pub fn supported_modes(&self) -> EnumSet<SecurityMode> {
        lock(&self.state).supported
    }

    /// True while a user change waits for device confirmation
    pub fn is_updating(&self) -> bool {
        self.controller.has_pending_rollback()
    }

    /// Remove access point security.
    ///
    /// Does nothing if already open, if open mode is not supported or if the change cannot be sent.
    pub fn open(&self) {
        {
            let state = lock(&self.state);
            if state.mode == SecurityMode::Open || !state.supported.contains(SecurityMode::Open) {
                return;
            }
        }
        if (self.backend)(SecurityMode::Open, None) {
            self.apply(SecurityMode::Open);
        }
    }

    /// Secure the access point with WPA2 and `password`.
    ///
    /// Returns `false` only when the password is [invalid](is_password_valid), in which case nothing is sent.
    /// Otherwise the request is sent if WPA2 is supported, even when the access point is already secured, so that
    /// the password can be changed.
    pub fn secure_with_wpa2(&self, password: &str) -> bool {
        if !is_password_valid(password) {
            return false;
        }
        let supported = lock(&self.state).supported.contains(SecurityMode::Wpa2Secured);
        if supported && (self.backend)(SecurityMode::Wpa2Secured, Some(password)) {
            self.apply(SecurityMode::Wpa2Secured);
        }
        true
    }

    fn apply(&self, mode: SecurityMode) {
        let previous = std::mem::replace(&mut lock(&self.state).mode, mode);
        let state = self.state.clone();
        self.controller.post_rollback(Rollback::new(
            format!("security {:?} -> {:?}", mode, previous),
            move || lock(&state).mode = previous,
        ));
    }

    /// Apply the security mode reported by the device
    pub fn update_mode(&self, mode: SecurityMode) -> &Self {
        let canceled = self.controller.cancel_rollback();
        let changed = std::mem::replace(&mut lock(&self.state).mode, mode) != mode;
        if canceled || changed {
            self.controller.notify_change(false);
        }
        self
    }

    /// Apply the supported modes reported by the device
    pub fn update_supported_modes(&self, modes: EnumSet<SecurityMode>) -> &Self {
        if lock(&self.state).supported.replace(modes) {
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
