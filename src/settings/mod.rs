//! # Settings
//!
//! Typed settings synchronized with a remote device. Every setting follows the same protocol, implemented once
//! by the [SettingController]:
//!  - user intents (`set_value`, `select`, ...) are checked against the values the device currently supports,
//!    then handed to the setting backend which tries to send them to the device. When the backend accepts, the
//!    setting adopts the new value right away and becomes *updating*.
//!  - device updates (`update_value`, `update_bounds`, `update_available_values`, ...) are authoritative: they
//!    confirm or override the value and end the updating state.
//!  - an updating setting that receives no confirmation before the controller timeout rolls back to its
//!    previous value.
//!
//! Every change is reported to the controller change listener with a flag telling whether it comes from the
//! user. Rejected intents, because the value is unchanged, unsupported or refused by the backend, change nothing
//! and report nothing.
//!
//! All setting methods must be called from the main thread.

pub mod boolean;
pub mod controller;
pub mod enum_set;
pub mod enumeration;
pub mod numeric;
pub mod string;
pub mod watch;
pub mod wifi;

pub use boolean::BooleanSetting;
pub use controller::{ChangeListener, Rollback, SettingController};
pub use enum_set::{EnumSet, SettingEnum};
pub use enumeration::EnumSetting;
pub use numeric::{DoubleSetting, IntSetting, NumericSetting, OptionalDoubleSetting};
pub use string::StringSetting;
pub use watch::ChangeWatchers;

/// Device side of a single value setting
///
/// Tries to send a value to the device and tells whether it could. It says nothing about the device applying
/// the value: that confirmation comes back later as a device update.
pub type ValueBackend<T> = Box<dyn Fn(T) -> bool + Send + Sync + 'static>;
