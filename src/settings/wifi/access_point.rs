//! # Wi-Fi access point
//!
//! [AccessPoint] gathers the settings of a device Wi-Fi access point and publishes their changes as a whole, the
//! way a device component is exposed to applications.
//!
//! Each setting has its own controller, so each has its own rollback. Changes are aggregated:
//!  - a user change is published immediately,
//!  - device updates only mark the access point as changed. The device protocol layer calls
//!    [AccessPoint::notify_updated] once it has applied a whole batch of updates, which publishes them as one
//!    change.
//!
//! Changes are only published while the access point is [published](AccessPoint::publish).

use super::channel::{Band, Channel, ChannelBackend, ChannelSetting};
use super::country::CountrySetting;
use super::security::{SecurityMode, SecuritySetting};
use crate::config::SdkConfig;
use crate::settings::controller::{ChangeListener, SettingController};
use crate::settings::enum_set::SettingEnum;
use crate::settings::enumeration::EnumSetting;
use crate::settings::string::StringSetting;
use crate::settings::watch::ChangeWatchers;
use crate::Executor;
use futures::channel::mpsc::UnboundedReceiver;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const TAG: &str = "groundsdk::setting";

/// Radio environment of the access point, which constrains the channels it may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    /// Indoor use
    Indoor,
    /// Outdoor use
    Outdoor,
}

impl SettingEnum for Environment {
    const ALL: &'static [Self] = &[Environment::Indoor, Environment::Outdoor];
}

/// Device side of an access point
///
/// Every method tries to send one change to the device and returns `false` if it could not.
pub trait AccessPointBackend: Send + Sync {
    /// Change the radio environment
    fn set_environment(&self, environment: Environment) -> bool;

    /// Change the country
    fn set_country(&self, code: &str) -> bool;

    /// Change the network name
    fn set_ssid(&self, ssid: &str) -> bool;

    /// Select a channel manually
    fn select_channel(&self, channel: Channel) -> bool;

    /// Let the device select a channel, within `band` if given
    fn auto_select_channel(&self, band: Option<Band>) -> bool;

    /// Change the security mode, `password` is given for [SecurityMode::Wpa2Secured]
    fn set_security(&self, mode: SecurityMode, password: Option<&str>) -> bool;
}

struct ChannelAdapter(Arc<dyn AccessPointBackend>);

impl ChannelBackend for ChannelAdapter {
    fn select_channel(&self, channel: Channel) -> bool {
        self.0.select_channel(channel)
    }

    fn auto_select_channel(&self, band: Option<Band>) -> bool {
        self.0.auto_select_channel(band)
    }
}

#[derive(Default)]
struct Publisher {
    published: AtomicBool,
    changed: AtomicBool,
    watchers: ChangeWatchers,
}

impl Publisher {
    fn on_setting_change(&self, from_user: bool) {
        self.changed.store(true, Ordering::SeqCst);
        if from_user {
            self.flush(true);
        }
    }

    fn flush(&self, from_user: bool) {
        if self.published.load(Ordering::SeqCst) && self.changed.swap(false, Ordering::SeqCst) {
            self.watchers.notify(from_user);
        }
    }
}

/// # Wi-Fi access point
///
/// See the [access point module documentation](crate::settings::wifi::access_point).
///
/// The access point starts unpublished, outdoor, with an empty network name and an open security.
pub struct AccessPoint {
    environment: EnumSetting<Environment>,
    ssid: StringSetting,
    country: CountrySetting,
    channel: ChannelSetting,
    security: SecuritySetting,
    publisher: Arc<Publisher>,
}

impl AccessPoint {
    /// Create an access point whose settings roll back after the configured setting timeout
    pub fn new(executor: &Executor, config: &SdkConfig, backend: Arc<dyn AccessPointBackend>) -> Self {
        let publisher = Arc::new(Publisher::default());
        let controller = || {
            let publisher = publisher.clone();
            let listener: ChangeListener = Arc::new(move |from_user| publisher.on_setting_change(from_user));
            SettingController::from_config(executor, listener, config)
        };

        let environment = {
            let backend = backend.clone();
            EnumSetting::new(Environment::Outdoor, controller(), move |environment| {
                backend.set_environment(environment)
            })
        };
        let ssid = {
            let backend = backend.clone();
            StringSetting::new("", controller(), move |ssid: String| backend.set_ssid(&ssid))
        };
        let country = {
            let backend = backend.clone();
            CountrySetting::new(controller(), move |code: String| backend.set_country(&code))
        };
        let channel = ChannelSetting::new(controller(), Arc::new(ChannelAdapter(backend.clone())));
        let security = SecuritySetting::new(controller(), move |mode, password| backend.set_security(mode, password));

        Self {
            environment,
            ssid,
            country,
            channel,
            security,
            publisher,
        }
    }

    /// Radio environment setting
    pub fn environment(&self) -> &EnumSetting<Environment> {
        &self.environment
    }

    /// Network name setting
    pub fn ssid(&self) -> &StringSetting {
        &self.ssid
    }

    /// Country setting
    pub fn country(&self) -> &CountrySetting {
        &self.country
    }

    /// Channel setting
    pub fn channel(&self) -> &ChannelSetting {
        &self.channel
    }

    /// Security setting
    pub fn security(&self) -> &SecuritySetting {
        &self.security
    }

    /// Watch published changes
    ///
    /// The stream yields `true` for changes caused by the user, including timed out changes being rolled back,
    /// and `false` for device updates.
    pub fn watch(&self) -> UnboundedReceiver<bool> {
        self.publisher.watchers.watch()
    }

    /// True while the access point is published
    pub fn is_published(&self) -> bool {
        self.publisher.published.load(Ordering::SeqCst)
    }

    /// Make the access point available, which counts as a change
    pub fn publish(&self) {
        if !self.publisher.published.swap(true, Ordering::SeqCst) {
            debug!(target: TAG, "Publishing access point");
            self.publisher.changed.store(false, Ordering::SeqCst);
            self.publisher.watchers.notify(false);
        }
    }

    /// Withdraw the access point, dropping any unpublished change. Watchers are notified of the withdrawal.
    pub fn unpublish(&self) {
        if self.publisher.published.swap(false, Ordering::SeqCst) {
            debug!(target: TAG, "Unpublishing access point");
            self.publisher.changed.store(false, Ordering::SeqCst);
            self.publisher.watchers.notify(false);
        }
    }

    /// Publish the device updates applied since the last publication, if any
    pub fn notify_updated(&self) {
        self.publisher.flush(false)
    }

    /// Confirm every user change in progress, typically when the device disconnects.
    ///
    /// Canceled rollbacks count as device updates: call [AccessPoint::notify_updated] to publish them.
    pub fn cancel_rollbacks(&self) -> &Self {
        self.environment.cancel_rollback();
        self.ssid.cancel_rollback();
        self.country.cancel_rollback();
        self.channel.cancel_rollback();
        self.security.cancel_rollback();
        self
    }
}
