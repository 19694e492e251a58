//! # Setting controller
//!
//! Every setting embeds a [SettingController] that implements the optimistic update protocol:
//!  - when the user changes a setting and the device backend accepts to send the change, the setting adopts the
//!    new value right away and arms a [Rollback] that restores the previous value,
//!  - when the device confirms a value, the setting cancels the rollback,
//!  - when no confirmation arrives before the timeout, the rollback runs and the previous value is restored.
//!
//! A setting is *updating* while a rollback is armed. At most one rollback is armed at a time: arming a new one
//! discards the previous one without running it.
//!
//! All controller methods must be called from the main thread.

use crate::config::SdkConfig;
use crate::tasks::{lock, Runnable, ScheduleId};
use crate::Executor;
use log::{debug, warn};
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

const TAG: &str = "groundsdk::setting";

/// Default delay before an unconfirmed change is rolled back.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Setting change callback.
///
/// Called on the main thread with `true` when the change comes from a local user action, including a timed out
/// change being rolled back, and `false` when it comes from the device.
pub type ChangeListener = Arc<dyn Fn(bool) + Send + Sync + 'static>;

/// Action restoring a setting to its value before a user change
pub struct Rollback {
    name: String,
    action: Box<dyn FnOnce() + Send + 'static>,
}

impl Rollback {
    /// Create a rollback, `name` is used in logs
    pub fn new(name: impl Into<String>, action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            name: name.into(),
            action: Box::new(action),
        }
    }

    /// Rollback name
    pub fn name(&self) -> &str {
        &self.name
    }

    fn run(self) {
        (self.action)()
    }
}

impl fmt::Debug for Rollback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rollback [{}]", self.name)
    }
}

struct Armed {
    rollback: Rollback,
    timer: Option<ScheduleId>,
    generation: u64,
}

#[derive(Default)]
struct State {
    armed: Option<Armed>,
    generation: u64,
}

struct Inner {
    executor: Executor,
    listener: ChangeListener,
    timeout: Duration,
    state: Mutex<State>,
}

impl Inner {
    fn notify(&self, from_user: bool) {
        (self.listener)(from_user)
    }

    fn fire(&self, generation: u64) {
        let armed = {
            let mut state = lock(&self.state);
            // A stale timer may fire after its rollback was replaced
            if state.armed.as_ref().map(|armed| armed.generation) == Some(generation) {
                state.armed.take()
            } else {
                None
            }
        };

        if let Some(armed) = armed {
            debug!(target: TAG, "Setting change timed out, running {:?}", armed.rollback);
            armed.rollback.run();
            self.notify(true);
        }
    }

    fn disarm(&self) -> Option<Rollback> {
        let armed = lock(&self.state).armed.take()?;
        if let Some(timer) = armed.timer {
            self.executor.unschedule(timer);
        }
        Some(armed.rollback)
    }
}

/// # Optimistic update controller
///
/// See the [controller module documentation](crate::settings::controller).
///
/// A controller belongs to one setting. Cloning it shares the same state, which is how compound settings make
/// several values share one rollback.
#[derive(Clone)]
pub struct SettingController {
    inner: Arc<Inner>,
}

impl SettingController {
    /// Create a controller with the [default timeout](DEFAULT_TIMEOUT)
    pub fn new(executor: &Executor, listener: ChangeListener) -> Self {
        Self::with_timeout(executor, listener, DEFAULT_TIMEOUT)
    }

    /// Create a controller using the configured setting timeout
    pub fn from_config(executor: &Executor, listener: ChangeListener, config: &SdkConfig) -> Self {
        Self::with_timeout(executor, listener, config.setting_timeout())
    }

    /// Create a controller with an explicit timeout.
    ///
    /// [Duration::ZERO] disables timeouts: rollbacks then only go away when canceled or confirmed.
    pub fn with_timeout(executor: &Executor, listener: ChangeListener, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                executor: executor.clone(),
                listener,
                timeout,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Rollback timeout, [Duration::ZERO] when disabled
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Arm a rollback after a user change and notify the change.
    ///
    /// A rollback that was already armed is discarded without running.
    ///
    /// # Panics
    ///
    /// Panics if not called from the main thread.
    pub fn post_rollback(&self, rollback: Rollback) {
        self.inner.executor.require_main_thread();

        if let Some(previous) = self.inner.disarm() {
            debug!(target: TAG, "Discarding {:?}", previous);
        }

        let generation = {
            let mut state = lock(&self.inner.state);
            state.generation += 1;
            state.generation
        };

        let timer = if self.inner.timeout.is_zero() {
            None
        } else {
            let inner: Weak<Inner> = Arc::downgrade(&self.inner);
            let runnable = Runnable::new(format!("{:?} timeout", rollback), move || {
                if let Some(inner) = inner.upgrade() {
                    inner.fire(generation);
                }
            });
            match self.inner.executor.schedule(runnable, self.inner.timeout) {
                Ok(timer) => Some(timer),
                Err(e) => {
                    warn!(target: TAG, "Could not arm timeout of {:?}: {}", rollback, e);
                    None
                }
            }
        };

        lock(&self.inner.state).armed = Some(Armed {
            rollback,
            timer,
            generation,
        });

        self.inner.notify(true);
    }

    /// Cancel the armed rollback, keeping the current value.
    ///
    /// Returns `true` if a rollback was armed. Callers use it to decide whether to notify a change.
    ///
    /// # Panics
    ///
    /// Panics if not called from the main thread.
    pub fn cancel_rollback(&self) -> bool {
        self.inner.executor.require_main_thread();
        self.inner.disarm().is_some()
    }

    /// Notify a change that does not involve a rollback
    pub fn notify_change(&self, from_user: bool) {
        self.inner.notify(from_user)
    }

    /// True while a rollback is armed
    pub fn has_pending_rollback(&self) -> bool {
        lock(&self.inner.state).armed.is_some()
    }
}

impl fmt::Debug for SettingController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingController")
            .field("timeout", &self.inner.timeout)
            .field("updating", &self.has_pending_rollback())
            .finish()
    }
}
