// Wi-Fi access point settings

mod common;

use common::{Changes, Harness};
use futures::StreamExt;
use groundsdk_core::settings::wifi::{
    is_password_valid, AccessPoint, AccessPointBackend, Band, Channel, ChannelBackend, ChannelSetting,
    CountrySetting, Environment, SecurityMode, SecuritySetting, SelectionMode,
};
use groundsdk_core::settings::EnumSet;
use groundsdk_core::SdkConfig;
use std::collections::BTreeSet;
use std::convert::TryFrom;
use std::sync::atomic::{AtomicBool, Ordering::SeqCst};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
enum Request {
    Environment(Environment),
    Country(String),
    Ssid(String),
    Channel(Channel),
    AutoChannel(Option<Band>),
    Security(SecurityMode, Option<String>),
}

struct MockBackend {
    accept: AtomicBool,
    requests: Mutex<Vec<Request>>,
}

impl MockBackend {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            accept: AtomicBool::new(true),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn record(&self, request: Request) -> bool {
        self.requests.lock().unwrap().push(request);
        self.accept.load(SeqCst)
    }

    fn last(&self) -> Option<Request> {
        self.requests.lock().unwrap().last().cloned()
    }

    fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl ChannelBackend for MockBackend {
    fn select_channel(&self, channel: Channel) -> bool {
        self.record(Request::Channel(channel))
    }

    fn auto_select_channel(&self, band: Option<Band>) -> bool {
        self.record(Request::AutoChannel(band))
    }
}

impl AccessPointBackend for MockBackend {
    fn set_environment(&self, environment: Environment) -> bool {
        self.record(Request::Environment(environment))
    }

    fn set_country(&self, code: &str) -> bool {
        self.record(Request::Country(code.to_owned()))
    }

    fn set_ssid(&self, ssid: &str) -> bool {
        self.record(Request::Ssid(ssid.to_owned()))
    }

    fn select_channel(&self, channel: Channel) -> bool {
        self.record(Request::Channel(channel))
    }

    fn auto_select_channel(&self, band: Option<Band>) -> bool {
        self.record(Request::AutoChannel(band))
    }

    fn set_security(&self, mode: SecurityMode, password: Option<&str>) -> bool {
        self.record(Request::Security(mode, password.map(str::to_owned)))
    }
}

fn codes(codes: &[&str]) -> BTreeSet<String> {
    codes.iter().map(|code| code.to_string()).collect()
}

#[test]
fn channel_ids() {
    assert_eq!(Channel::try_from(1u8).ok(), Some(Channel::Band2_4Channel1));
    assert_eq!(Channel::try_from(165u8).ok().map(Channel::band), Some(Band::B5Ghz));
    assert!(Channel::try_from(15u8).is_err());
    assert_eq!(Channel::Band2_4Channel14.band(), Band::B2_4Ghz);
    assert_eq!(Channel::Band5Channel149.id(), 149);
    assert_eq!(EnumSet::<Channel>::all().len(), 60);
}

#[test]
fn channel_setting() {
    let harness = Harness::new();
    let changes = Changes::default();
    let backend = MockBackend::new();
    let setting = ChannelSetting::new(harness.controller(&changes), backend.clone());

    assert_eq!(setting.channel(), Channel::Band2_4Channel1);
    assert_eq!(setting.selection_mode(), SelectionMode::Manual);
    assert_eq!(setting.available_channels(), EnumSet::of(&[Channel::Band2_4Channel1]));
    assert!(!setting.can_auto_select());

    // not available
    setting.select(Channel::Band2_4Channel6);
    assert_eq!(backend.count(), 0);

    setting.update_available_channels(EnumSet::of(&[Channel::Band2_4Channel6, Channel::Band2_4Channel11]));
    assert_eq!(changes.count(), 1);
    assert!(setting.can_auto_select());
    assert!(setting.can_auto_select_band(Band::B2_4Ghz));
    assert!(!setting.can_auto_select_band(Band::B5Ghz));
    assert_eq!(
        setting.available_channels(),
        EnumSet::of(&[Channel::Band2_4Channel1, Channel::Band2_4Channel6, Channel::Band2_4Channel11])
    );

    setting.select(Channel::Band2_4Channel6);
    assert_eq!(backend.last(), Some(Request::Channel(Channel::Band2_4Channel6)));
    assert_eq!(setting.channel(), Channel::Band2_4Channel6);
    assert!(setting.is_updating());
    assert_eq!((changes.count(), changes.last()), (2, Some(true)));

    setting.update_channel(SelectionMode::Manual, Channel::Band2_4Channel6);
    assert!(!setting.is_updating());
    assert_eq!((changes.count(), changes.last()), (3, Some(false)));

    // already manually selected
    setting.select(Channel::Band2_4Channel6);
    assert_eq!(backend.count(), 1);

    // automatic selection in an unavailable band
    setting.auto_select_band(Band::B5Ghz);
    assert_eq!(backend.count(), 1);

    setting.auto_select();
    assert_eq!(backend.last(), Some(Request::AutoChannel(None)));
    assert_eq!(setting.selection_mode(), SelectionMode::AutoAnyBand);
    assert_eq!(setting.channel(), Channel::Band2_4Channel6);

    // timeout restores the mode
    harness.advance_ms(5000);
    assert_eq!(setting.selection_mode(), SelectionMode::Manual);
    assert_eq!((changes.count(), changes.last()), (5, Some(true)));

    setting.auto_select_band(Band::B2_4Ghz);
    assert_eq!(backend.last(), Some(Request::AutoChannel(Some(Band::B2_4Ghz))));
    assert_eq!(setting.selection_mode(), SelectionMode::Auto2_4GhzBand);

    // device picks a channel
    setting.update_channel(SelectionMode::Auto2_4GhzBand, Channel::Band2_4Channel11);
    assert_eq!(setting.channel(), Channel::Band2_4Channel11);
    assert!(!setting.is_updating());

    // selecting the current channel manually switches back to manual mode
    setting.select(Channel::Band2_4Channel11);
    assert_eq!(backend.last(), Some(Request::Channel(Channel::Band2_4Channel11)));
    assert_eq!(setting.selection_mode(), SelectionMode::Manual);
    harness.advance_ms(5000);
    assert_eq!(setting.selection_mode(), SelectionMode::Auto2_4GhzBand);
    assert_eq!(setting.channel(), Channel::Band2_4Channel11);

    setting.update_auto_select_supported(false);
    assert!(!setting.can_auto_select());
    let count = backend.count();
    setting.auto_select();
    assert_eq!(backend.count(), count);
}

#[test]
fn channel_setting_backend_denied() {
    let harness = Harness::new();
    let changes = Changes::default();
    let backend = MockBackend::new();
    let setting = ChannelSetting::new(harness.controller(&changes), backend.clone());
    setting.update_available_channels(EnumSet::of(&[Channel::Band5Channel36]));

    backend.accept.store(false, SeqCst);
    setting.select(Channel::Band5Channel36);
    setting.auto_select_band(Band::B5Ghz);
    assert_eq!(backend.count(), 2);
    assert_eq!(setting.channel(), Channel::Band2_4Channel1);
    assert_eq!(setting.selection_mode(), SelectionMode::Manual);
    assert!(!setting.is_updating());
    assert_eq!(changes.count(), 1);
}

#[test]
fn country_setting() {
    let harness = Harness::new();
    let changes = Changes::default();
    let sent = Arc::new(Mutex::new(Vec::new()));
    let setting = CountrySetting::new(harness.controller(&changes), {
        let sent = sent.clone();
        move |code| {
            sent.lock().unwrap().push(code);
            true
        }
    });

    assert_eq!(setting.code(), "");
    assert!(setting.available_codes().is_empty());
    assert!(!setting.is_default_country_used());

    setting.select("FR");
    assert!(sent.lock().unwrap().is_empty());

    setting.update_available_codes(codes(&["FR", "US"])).update_code("US");
    assert_eq!(changes.count(), 2);

    setting.select("DE");
    assert!(sent.lock().unwrap().is_empty());

    setting.select("FR");
    assert_eq!(*sent.lock().unwrap(), vec!["FR".to_owned()]);
    assert_eq!(setting.code(), "FR");
    assert!(setting.is_updating());

    harness.advance_ms(5000);
    assert_eq!(setting.code(), "US");
    assert_eq!((changes.count(), changes.last()), (4, Some(true)));

    setting.update_default_country_used(true);
    assert!(setting.is_default_country_used());
    assert_eq!(changes.count(), 5);
    setting.update_default_country_used(true);
    assert_eq!(changes.count(), 5);
}

#[test]
fn password_validity() {
    assert!(is_password_valid("password"));
    assert!(is_password_valid(&"x".repeat(63)));
    assert!(is_password_valid("with spaces ~"));
    assert!(!is_password_valid("invalid"));
    assert!(!is_password_valid(&"x".repeat(64)));
    assert!(!is_password_valid("tab\tinside"));
    assert!(!is_password_valid("mot de passé"));
}

#[test]
fn security_setting() {
    let harness = Harness::new();
    let changes = Changes::default();
    let backend = MockBackend::new();
    let setting = SecuritySetting::new(harness.controller(&changes), {
        let backend = backend.clone();
        move |mode, password| backend.set_security(mode, password)
    });

    assert_eq!(setting.mode(), SecurityMode::Open);
    assert_eq!(setting.supported_modes(), EnumSet::of(&[SecurityMode::Open]));

    // WPA2 not supported: accepted, nothing sent
    assert!(setting.secure_with_wpa2("not-supported"));
    assert_eq!(backend.count(), 0);
    assert_eq!(changes.count(), 0);

    setting.update_supported_modes(EnumSet::all());
    assert_eq!(changes.count(), 1);

    // invalid password
    assert!(!setting.secure_with_wpa2("invalid"));
    assert_eq!(backend.count(), 0);

    // backend denies
    backend.accept.store(false, SeqCst);
    assert!(setting.secure_with_wpa2("backend-denied"));
    assert_eq!(
        backend.last(),
        Some(Request::Security(SecurityMode::Wpa2Secured, Some("backend-denied".to_owned())))
    );
    assert_eq!(setting.mode(), SecurityMode::Open);
    assert_eq!(changes.count(), 1);
    backend.accept.store(true, SeqCst);

    // already open
    setting.open();
    assert_eq!(backend.count(), 1);

    assert!(setting.secure_with_wpa2("password"));
    assert_eq!(setting.mode(), SecurityMode::Wpa2Secured);
    assert!(setting.is_updating());
    assert_eq!(changes.count(), 2);

    setting.update_mode(SecurityMode::Wpa2Secured);
    assert!(!setting.is_updating());
    assert_eq!(changes.count(), 3);

    // securing again sends the password again
    assert!(setting.secure_with_wpa2("password"));
    assert_eq!(backend.count(), 3);
    assert!(setting.is_updating());
    assert_eq!(changes.count(), 4);
    setting.update_mode(SecurityMode::Wpa2Secured);

    // open not supported
    setting.update_supported_modes(EnumSet::of(&[SecurityMode::Wpa2Secured]));
    setting.open();
    assert_eq!(backend.count(), 3);

    setting.update_supported_modes(EnumSet::all());
    setting.open();
    assert_eq!(backend.last(), Some(Request::Security(SecurityMode::Open, None)));
    assert_eq!(setting.mode(), SecurityMode::Open);

    harness.advance_ms(5000);
    assert_eq!(setting.mode(), SecurityMode::Wpa2Secured);
}

#[test]
fn access_point_publishes_changes() {
    let harness = Harness::new();
    let backend = MockBackend::new();
    let access_point = AccessPoint::new(&harness.executor, &SdkConfig::default(), backend.clone());
    let mut changes = access_point.watch();

    assert!(!access_point.is_published());
    assert_eq!(access_point.environment().value(), Environment::Outdoor);
    assert_eq!(access_point.ssid().value(), "");
    assert_eq!(access_point.security().mode(), SecurityMode::Open);

    // nothing is published before the access point is
    access_point.ssid().update_value("before");
    access_point.notify_updated();

    access_point.publish();
    assert!(access_point.is_published());

    // user change, published right away
    access_point.environment().set_value(Environment::Indoor);
    assert_eq!(backend.last(), Some(Request::Environment(Environment::Indoor)));

    // device updates, published once notified
    access_point.environment().update_value(Environment::Indoor);
    access_point.ssid().update_value("drone");
    access_point.notify_updated();

    // nothing changed
    access_point.notify_updated();

    access_point.ssid().set_value("renamed");
    assert_eq!(backend.last(), Some(Request::Ssid("renamed".to_owned())));

    // timeout
    harness.advance_ms(5000);
    assert_eq!(access_point.ssid().value(), "drone");

    access_point.unpublish();
    access_point.country().update_code("FR");
    access_point.notify_updated();
    drop(access_point);

    let published: Vec<bool> = futures::executor::block_on(changes.by_ref().collect());
    assert_eq!(published, vec![false, true, false, true, true, false]);
}

#[test]
fn access_point_publication_is_notified() {
    let harness = Harness::new();
    let access_point = AccessPoint::new(&harness.executor, &SdkConfig::default(), MockBackend::new());
    let mut changes = access_point.watch();

    access_point.publish();
    access_point.publish();
    assert!(access_point.is_published());

    access_point.unpublish();
    access_point.unpublish();
    assert!(!access_point.is_published());

    // a device update while unpublished is not carried over
    access_point.ssid().update_value("drone");
    access_point.publish();
    access_point.notify_updated();
    drop(access_point);

    let published: Vec<bool> = futures::executor::block_on(changes.by_ref().collect());
    assert_eq!(published, vec![false, false, false]);
}

#[test]
fn access_point_cancel_rollbacks() {
    let harness = Harness::new();
    let backend = MockBackend::new();
    let access_point = AccessPoint::new(&harness.executor, &SdkConfig::default(), backend.clone());
    let mut changes = access_point.watch();
    access_point.publish();

    access_point.channel().update_available_channels(EnumSet::of(&[Channel::Band5Channel36]));
    access_point
        .country()
        .update_available_codes(codes(&["FR"]));
    access_point.security().update_supported_modes(EnumSet::all());
    access_point.notify_updated();

    access_point.ssid().set_value("renamed");
    access_point.channel().select(Channel::Band5Channel36);
    access_point.country().select("FR");
    access_point.security().secure_with_wpa2("password");
    assert!(access_point.ssid().is_updating());
    assert!(access_point.channel().is_updating());
    assert!(access_point.country().is_updating());
    assert!(access_point.security().is_updating());
    assert_eq!(backend.count(), 4);

    access_point.cancel_rollbacks().notify_updated();
    assert!(!access_point.ssid().is_updating());
    assert!(!access_point.channel().is_updating());
    assert!(!access_point.country().is_updating());
    assert!(!access_point.security().is_updating());

    // values are kept
    harness.advance_ms(5000);
    assert_eq!(access_point.ssid().value(), "renamed");
    assert_eq!(access_point.channel().channel(), Channel::Band5Channel36);
    assert_eq!(access_point.country().code(), "FR");
    assert_eq!(access_point.security().mode(), SecurityMode::Wpa2Secured);
    drop(access_point);

    let published: Vec<bool> = futures::executor::block_on(changes.by_ref().collect());
    assert_eq!(published, vec![false, false, true, true, true, true, false]);
}
