//! # GroundSDK core
//!
//! This crate implements the device independent core of a drone ground SDK: typed settings kept in sync with a
//! remote device, and the task scheduling they rely on.
//!
//! ## Settings
//!
//! Device settings are updated optimistically. When the user changes a setting, the change is sent to the device
//! and the new value is shown right away while the setting is *updating*. The device then confirms the value, or
//! the change rolls back to the previous value after a timeout. See the [settings] module for the available
//! settings and the exact protocol.
//!
//! ## Tasks
//!
//! Setting state lives on a single *main thread*, blocking work runs on *background* threads. The [Executor]
//! provides both, and background work is tracked with cancellable [tasks](tasks::Task), optionally wrapped in
//! [jobs](tasks::Job) and grouped in [task groups](tasks::TaskGroup).
//!
//! ## Usage
//!
//! The basic procedure to use the lib is:
//!  - Start an [Executor] from a tokio runtime, the calling thread becomes the main thread
//!  - Drive the returned [MainLoop](tasks::MainLoop) on that thread
//!  - Create settings with a [SettingController](settings::SettingController) bound to the executor and a backend
//!    that sends changes to the device
//!  - Feed device updates to the settings from the main thread
//!  - Dispose the executor when done
//!
//! All the setting methods only take an un-mutable reference to self (`&self`), settings can be shared between the
//! parts of the application that run on the main thread.
//!
//! For example:
//! ```
//! # use groundsdk_core::{Executor, SdkConfig};
//! # use groundsdk_core::settings::{BooleanSetting, SettingController};
//! # use std::sync::Arc;
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> groundsdk_core::Result<()> {
//! let config = SdkConfig::default();
//! let (executor, main_loop) = Executor::start(&config)?;
//!
//! let listener = Arc::new(|from_user: bool| println!("setting changed, from user: {}", from_user));
//! let controller = SettingController::from_config(&executor, listener, &config);
//! let setting = BooleanSetting::new(controller, |enabled| {
//!     println!("sending {} to the device", enabled);
//!     true
//! });
//!
//! setting.set_enabled(true);
//! assert!(setting.is_updating());
//!
//! // The device confirms
//! setting.update_value(true);
//! assert!(!setting.is_updating());
//!
//! main_loop.run_pending();
//! executor.dispose();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
mod error;
mod executor;
pub mod settings;
pub mod tasks;
mod value;

pub use crate::config::SdkConfig;
pub use crate::error::{BoxError, Error, Result};
pub use crate::executor::Executor;
pub use crate::value::{DoubleRange, IntRange, Range, SettingNumber};
