//! # Wi-Fi channel setting
//!
//! The access point channel is either selected manually or left to the device, which picks the best channel
//! within one band or any band. Channel and selection mode changes share one rollback: only one change can be in
//! flight at a time.

use crate::settings::controller::{Rollback, SettingController};
use crate::settings::enum_set::{EnumSet, SettingEnum};
use crate::tasks::lock;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::sync::{Arc, Mutex};

/// Wi-Fi frequency band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    /// 2.4 GHz band
    B2_4Ghz,
    /// 5 GHz band
    B5Ghz,
}

impl SettingEnum for Band {
    const ALL: &'static [Self] = &[Band::B2_4Ghz, Band::B5Ghz];
}

macro_rules! channels {
    ($($band:ident { $($name:ident = $id:literal),* $(,)? })*) => {
        /// Wi-Fi channel
        ///
        /// Converts from and into the channel id used on the wire:
        /// ```
        /// # use groundsdk_core::settings::wifi::{Band, Channel};
        /// # use std::convert::TryFrom;
        /// let channel = Channel::try_from(36).unwrap();
        /// assert_eq!(channel, Channel::Band5Channel36);
        /// assert_eq!(channel.band(), Band::B5Ghz);
        /// assert_eq!(channel.id(), 36);
        /// ```
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, TryFromPrimitive, IntoPrimitive)]
        #[repr(u8)]
        pub enum Channel {
            $($(
                #[doc = concat!("Channel ", stringify!($id))]
                $name = $id,
            )*)*
        }

        impl Channel {
            /// Band of the channel
            pub fn band(self) -> Band {
                match self {
                    $($(Channel::$name => Band::$band,)*)*
                }
            }
        }

        impl SettingEnum for Channel {
            const ALL: &'static [Self] = &[$($(Channel::$name,)*)*];
        }
    };
}

channels! {
    B2_4Ghz {
        Band2_4Channel1 = 1, Band2_4Channel2 = 2, Band2_4Channel3 = 3, Band2_4Channel4 = 4,
        Band2_4Channel5 = 5, Band2_4Channel6 = 6, Band2_4Channel7 = 7, Band2_4Channel8 = 8,
        Band2_4Channel9 = 9, Band2_4Channel10 = 10, Band2_4Channel11 = 11, Band2_4Channel12 = 12,
        Band2_4Channel13 = 13, Band2_4Channel14 = 14,
    }
    B5Ghz {
        Band5Channel34 = 34, Band5Channel36 = 36, Band5Channel38 = 38, Band5Channel40 = 40,
        Band5Channel42 = 42, Band5Channel44 = 44, Band5Channel46 = 46, Band5Channel48 = 48,
        Band5Channel50 = 50, Band5Channel52 = 52, Band5Channel54 = 54, Band5Channel56 = 56,
        Band5Channel58 = 58, Band5Channel60 = 60, Band5Channel62 = 62, Band5Channel64 = 64,
        Band5Channel100 = 100, Band5Channel102 = 102, Band5Channel104 = 104, Band5Channel106 = 106,
        Band5Channel108 = 108, Band5Channel110 = 110, Band5Channel112 = 112, Band5Channel114 = 114,
        Band5Channel116 = 116, Band5Channel118 = 118, Band5Channel120 = 120, Band5Channel122 = 122,
        Band5Channel124 = 124, Band5Channel126 = 126, Band5Channel128 = 128, Band5Channel132 = 132,
        Band5Channel134 = 134, Band5Channel136 = 136, Band5Channel138 = 138, Band5Channel140 = 140,
        Band5Channel142 = 142, Band5Channel144 = 144, Band5Channel149 = 149, Band5Channel151 = 151,
        Band5Channel153 = 153, Band5Channel155 = 155, Band5Channel157 = 157, Band5Channel159 = 159,
        Band5Channel161 = 161, Band5Channel165 = 165,
    }
}

impl Channel {
    /// Channel id
    pub fn id(self) -> u8 {
        self.into()
    }
}

/// How the access point channel is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionMode {
    /// Channel selected by the user
    Manual,
    /// Channel selected by the device, in any band
    AutoAnyBand,
    /// Channel selected by the device, in the 2.4 GHz band
    Auto2_4GhzBand,
    /// Channel selected by the device, in the 5 GHz band
    Auto5GhzBand,
}

impl SelectionMode {
    /// True for the automatic modes
    pub fn is_auto(self) -> bool {
        self != SelectionMode::Manual
    }
}

impl SettingEnum for SelectionMode {
    const ALL: &'static [Self] = &[
        SelectionMode::Manual,
        SelectionMode::AutoAnyBand,
        SelectionMode::Auto2_4GhzBand,
        SelectionMode::Auto5GhzBand,
    ];
}

/// Device side of the channel setting
pub trait ChannelBackend: Send + Sync {
    /// Select a channel manually. Returns `false` if the request could not be sent.
    fn select_channel(&self, channel: Channel) -> bool;

    /// Let the device select a channel, within `band` if given. Returns `false` if the request could not be sent.
    fn auto_select_channel(&self, band: Option<Band>) -> bool;
}

struct State {
    channel: Channel,
    mode: SelectionMode,
    available_channels: EnumSet<Channel>,
    available_bands: EnumSet<Band>,
    auto_select_supported: bool,
}

/// # Wi-Fi channel setting
///
/// See the [channel module documentation](crate::settings::wifi::channel). Starts on channel 1 of the 2.4 GHz band,
/// manually selected, with no available channel.
pub struct ChannelSetting {
    state: Arc<Mutex<State>>,
    controller: SettingController,
    backend: Arc<dyn ChannelBackend>,
}

impl ChannelSetting {
    /// Create a channel setting
    pub fn new(controller: SettingController, backend: Arc<dyn ChannelBackend>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                channel: Channel::Band2_4Channel1,
                mode: SelectionMode::Manual,
                available_channels: EnumSet::empty(),
                available_bands: EnumSet::empty(),
                auto_select_supported: true,
            })),
            controller,
            backend,
        }
    }

    /// Current channel
    pub fn channel(&self) -> Channel {
        lock(&self.state).channel
    }

    /// Current selection mode
    pub fn selection_mode(&self) -> SelectionMode {
        lock(&self.state).mode
    }

    /// Channels that can be selected, always including the current channel
    pub fn available_channels(&self) -> EnumSet<Channel> {
        let state = lock(&self.state);
        let mut channels = state.available_channels;
        channels.insert(state.channel);
        channels
    }

    /// True while a user change waits for device confirmation
    pub fn is_updating(&self) -> bool {
        self.controller.has_pending_rollback()
    }

    /// True if the device can select a channel by itself in at least one band
    pub fn can_auto_select(&self) -> bool {
        let state = lock(&self.state);
        state.auto_select_supported && !state.available_bands.is_empty()
    }

    /// True if the device can select a channel by itself within `band`
    pub fn can_auto_select_band(&self, band: Band) -> bool {
        let state = lock(&self.state);
        state.auto_select_supported && state.available_bands.contains(band)
    }

    /// Select a channel manually.
    ///
    /// Does nothing if the channel is already manually selected, is not available or cannot be sent.
    pub fn select(&self, channel: Channel) {
        let (previous_channel, previous_mode) = {
            let state = lock(&self.state);
            let unchanged = state.channel == channel && state.mode == SelectionMode::Manual;
            if unchanged || !state.available_channels.contains(channel) {
                return;
            }
            (state.channel, state.mode)
        };
        if !self.backend.select_channel(channel) {
            return;
        }

        {
            let mut state = lock(&self.state);
            state.channel = channel;
            state.mode = SelectionMode::Manual;
        }
        let state = self.state.clone();
        self.controller.post_rollback(Rollback::new(
            format!("channel {:?} -> {:?} {:?}", channel, previous_mode, previous_channel),
            move || {
                let mut state = lock(&state);
                state.channel = previous_channel;
                state.mode = previous_mode;
            },
        ));
    }

    /// Let the device select a channel in any band.
    ///
    /// Does nothing if automatic selection is not possible or cannot be sent.
    pub fn auto_select(&self) {
        if self.can_auto_select() && self.backend.auto_select_channel(None) {
            self.switch_mode(SelectionMode::AutoAnyBand);
        }
    }

    /// Let the device select a channel within `band`.
    ///
    /// Does nothing if automatic selection is not possible in that band or cannot be sent.
    pub fn auto_select_band(&self, band: Band) {
        if self.can_auto_select_band(band) && self.backend.auto_select_channel(Some(band)) {
            self.switch_mode(match band {
                Band::B2_4Ghz => SelectionMode::Auto2_4GhzBand,
                Band::B5Ghz => SelectionMode::Auto5GhzBand,
            });
        }
    }

    fn switch_mode(&self, mode: SelectionMode) {
        let previous = std::mem::replace(&mut lock(&self.state).mode, mode);
        let state = self.state.clone();
        self.controller.post_rollback(Rollback::new(
            format!("mode {:?} -> {:?}", mode, previous),
            move || lock(&state).mode = previous,
        ));
    }

    /// Apply the channel and selection mode reported by the device
    pub fn update_channel(&self, mode: SelectionMode, channel: Channel) -> &Self {
        let canceled = self.controller.cancel_rollback();
        let changed = {
            let mut state = lock(&self.state);
            let changed = state.mode != mode || state.channel != channel;
            state.mode = mode;
            state.channel = channel;
            changed
        };
        if canceled || changed {
            self.controller.notify_change(false);
        }
        self
    }

    /// Apply the available channels reported by the device, which also define the bands available for automatic
    /// selection
    pub fn update_available_channels(&self, channels: EnumSet<Channel>) -> &Self {
        let changed = {
            let mut state = lock(&self.state);
            let changed = state.available_channels.replace(channels);
            if changed {
                state.available_bands = channels.iter().map(Channel::band).collect();
            }
            changed
        };
        if changed {
            self.controller.notify_change(false);
        }
        self
    }

    /// Tell whether the device supports automatic selection at all
    pub fn update_auto_select_supported(&self, supported: bool) -> &Self {
        let changed = std::mem::replace(&mut lock(&self.state).auto_select_supported, supported) != supported;
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
