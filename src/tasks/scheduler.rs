//! # Scheduler interfaces
//!
//! Two execution contexts back the whole SDK:
//!  - a [BackgroundScheduler] that runs blocking work on a pool of worker threads,
//!  - a [MainThreadScheduler] that serializes runnables on one designated thread, the *main thread*, where all
//!    setting state is mutated and all listeners are notified.
//!
//! Both are traits so that tests can substitute the synchronous implementations of the
//! [direct module](crate::tasks::direct).

use crate::{Error, Result};
use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::SeqCst;
use std::sync::Arc;
use std::time::Duration;

/// Policy to observe when [MainThreadScheduler::post] is called from the main thread itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostPolicy {
    /// Deny the call: posting from the main thread is a programming error and panics.
    Deny,
    /// Queue the runnable for a later turn of the main loop.
    Post,
    /// Run the runnable immediately, on the caller stack.
    Run,
}

/// A named unit of work for a scheduler.
///
/// The name is used for debug logs and dumps only.
pub struct Runnable {
    name: String,
    body: Box<dyn FnOnce() + Send + 'static>,
}

impl Runnable {
    /// Create a runnable from a name and a closure
    pub fn new(name: impl Into<String>, body: impl FnOnce() + Send + 'static) -> Self {
        Self {
            name: name.into(),
            body: Box::new(body),
        }
    }

    /// Runnable name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Consume and execute the runnable
    pub fn run(self) {
        (self.body)()
    }
}

impl fmt::Debug for Runnable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Runnable [{}]", self.name)
    }
}

/// Identifies a delayed runnable, used to cancel it before it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScheduleId(pub(crate) u64);

/// # Main thread scheduler
///
/// A sequential executor bound to one thread. Each runnable is either run or canceled, never both, and a
/// canceled delayed runnable never fires since cancellation happens on the thread that would run it.
pub trait MainThreadScheduler: Send + Sync {
    /// Post a runnable for execution on the main thread.
    ///
    /// When called from a background thread the runnable is always queued. When called from the main thread,
    /// `policy` decides between panicking, queuing and running immediately.
    ///
    /// Returns [Error::SchedulerShutdown] if the scheduler does not accept runnables anymore.
    fn post(&self, runnable: Runnable, policy: PostPolicy) -> Result<()>;

    /// Schedule a runnable for execution on the main thread after `delay`.
    ///
    /// # Panics
    ///
    /// Panics if not called from the main thread.
    fn schedule(&self, runnable: Runnable, delay: Duration) -> Result<ScheduleId>;

    /// Cancel a delayed runnable. Returns `true` if it had not fired yet.
    ///
    /// # Panics
    ///
    /// Panics if not called from the main thread.
    fn cancel(&self, id: ScheduleId) -> bool;

    /// Drop every pending runnable, immediate or delayed, and stop accepting new ones.
    ///
    /// # Panics
    ///
    /// Panics if not called from the main thread.
    fn shutdown(&self);

    /// Tell whether the calling thread is the main thread.
    fn is_main_thread(&self) -> bool;

    /// Ensure the calling thread is the main thread.
    ///
    /// # Panics
    ///
    /// Panics if not called from the main thread.
    fn assert_main_thread(&self) {
        if !self.is_main_thread() {
            panic!(
                "Not on main thread [{}]",
                std::thread::current().name().unwrap_or("unnamed")
            );
        }
    }

    /// Write a plain-text description of pending runnables.
    fn dump(&self, out: &mut String);
}

/// Cooperative cancellation flag handed to background bodies.
///
/// Blocking bodies should poll [CancelToken::check] between steps so that canceling their task stops them
/// promptly.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    canceled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the non-canceled state
    pub fn new() -> Self {
        Self::default()
    }

    /// Tell whether cancellation was requested
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(SeqCst)
    }

    /// Return [Error::Interrupted] once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_canceled() {
            Err(Error::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Request cancellation. Returns `true` if this call changed the state.
    pub fn cancel(&self) -> bool {
        !self.canceled.swap(true, SeqCst)
    }
}

/// A named background work item with its cancellation token.
///
/// The body must honour the token itself: a work item drained at shutdown still has its body run, with the
/// token canceled, so that it can report its cancellation.
pub struct Work {
    name: String,
    token: CancelToken,
    body: Box<dyn FnOnce() + Send + 'static>,
}

impl Work {
    /// Create a work item
    pub fn new(name: impl Into<String>, token: CancelToken, body: impl FnOnce() + Send + 'static) -> Self {
        Self {
            name: name.into(),
            token,
            body: Box::new(body),
        }
    }

    /// Work item name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cancellation token of the work item
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Consume and execute the work item
    pub fn run(self) {
        (self.body)()
    }

    /// Cancel the token, then run the body so it reports its cancellation.
    pub fn abort(self) {
        self.token.cancel();
        self.run()
    }
}

impl fmt::Debug for Work {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Work [{}]", self.name)
    }
}

/// # Background scheduler
///
/// Runs work items off the main thread, in parallel.
pub trait BackgroundScheduler: Send + Sync {
    /// Submit a work item for background execution.
    ///
    /// Once shut down, submitted work is aborted right away and [Error::SchedulerShutdown] is returned.
    fn submit(&self, work: Work) -> Result<()>;

    /// Stop accepting work, abort queued work items and cancel running ones.
    fn shutdown(&self);

    /// Write a plain-text description of queued and running work.
    fn dump(&self, out: &mut String);
}
