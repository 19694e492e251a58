//! # Wi-Fi settings
//!
//! Compound settings of a device Wi-Fi access point: the [channel](channel) with its selection mode, the
//! regulatory [country](country) and the [security](security) mode, gathered with the network name and radio
//! environment in an [AccessPoint].

pub mod access_point;
pub mod channel;
pub mod country;
pub mod security;

pub use access_point::{AccessPoint, AccessPointBackend, Environment};
pub use channel::{Band, Channel, ChannelBackend, ChannelSetting, SelectionMode};
pub use country::CountrySetting;
pub use security::{is_password_valid, SecurityBackend, SecurityMode, SecuritySetting};
