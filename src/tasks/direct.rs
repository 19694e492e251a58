//! # Direct schedulers
//!
//! Synchronous scheduler implementations that make asynchronous code deterministic:
//!  - [DirectMainScheduler] runs posted runnables right away and keeps delayed runnables on a virtual clock that
//!    only moves when [DirectMainScheduler::advance] is called,
//!  - [DirectBackgroundScheduler] runs work inline on the submitting thread, or queues it until
//!    [DirectBackgroundScheduler::run_all] when created [deferred](DirectBackgroundScheduler::deferred).
//!
//! ```
//! use groundsdk_core::tasks::{DirectMainScheduler, MainThreadScheduler, Runnable};
//! use std::sync::atomic::{AtomicBool, Ordering::SeqCst};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let main = DirectMainScheduler::new();
//! let fired = Arc::new(AtomicBool::new(false));
//! let flag = fired.clone();
//! main.schedule(Runnable::new("timeout", move || flag.store(true, SeqCst)), Duration::from_secs(5)).unwrap();
//!
//! main.advance(Duration::from_millis(4999));
//! assert!(!fired.load(SeqCst));
//! main.advance(Duration::from_millis(1));
//! assert!(fired.load(SeqCst));
//! ```

use super::lock;
use super::scheduler::{BackgroundScheduler, MainThreadScheduler, PostPolicy, Runnable, ScheduleId, Work};
use crate::{Error, Result};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::Ordering::{Relaxed, SeqCst};
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Mutex;
use std::thread::{self, ThreadId};
use std::time::Duration;

/// # Synchronous main thread scheduler with a virtual clock
///
/// The thread creating the scheduler is the main thread. See the
/// [direct module documentation](crate::tasks::direct).
pub struct DirectMainScheduler {
    thread: ThreadId,
    now: Mutex<Duration>,
    delayed: Mutex<BTreeMap<u64, (Duration, Runnable)>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl DirectMainScheduler {
    /// Create a scheduler bound to the calling thread, with its clock at zero
    pub fn new() -> Self {
        Self {
            thread: thread::current().id(),
            now: Mutex::new(Duration::ZERO),
            delayed: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        *lock(&self.now)
    }

    /// Number of delayed runnables that have not fired yet
    pub fn pending_count(&self) -> usize {
        lock(&self.delayed).len()
    }

    /// Move the virtual clock forward, running due runnables in deadline order.
    ///
    /// Runnables scheduled by a firing runnable also run if they fall due before the end of the advance.
    ///
    /// # Panics
    ///
    /// Panics if not called from the main thread.
    pub fn advance(&self, duration: Duration) {
        self.assert_main_thread();
        let target = self.now() + duration;

        loop {
            let next = {
                let mut delayed = lock(&self.delayed);
                let due = delayed
                    .iter()
                    .filter(|(_, (deadline, _))| *deadline <= target)
                    .min_by_key(|(id, (deadline, _))| (*deadline, **id))
                    .map(|(id, (deadline, _))| (*id, *deadline));
                due.and_then(|(id, deadline)| delayed.remove(&id).map(|(_, runnable)| (deadline, runnable)))
            };

            match next {
                Some((deadline, runnable)) => {
                    *lock(&self.now) = deadline;
                    runnable.run();
                }
                None => break,
            }
        }

        *lock(&self.now) = target;
    }
}

impl Default for DirectMainScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl MainThreadScheduler for DirectMainScheduler {
    fn post(&self, runnable: Runnable, policy: PostPolicy) -> Result<()> {
        if self.closed.load(SeqCst) {
            return Err(Error::SchedulerShutdown);
        }
        if policy == PostPolicy::Deny && self.is_main_thread() {
            panic!("Already on main thread");
        }
        runnable.run();
        Ok(())
    }

    fn schedule(&self, runnable: Runnable, delay: Duration) -> Result<ScheduleId> {
        self.assert_main_thread();
        if self.closed.load(SeqCst) {
            return Err(Error::SchedulerShutdown);
        }

        let id = self.next_id.fetch_add(1, Relaxed);
        let deadline = self.now() + delay;
        lock(&self.delayed).insert(id, (deadline, runnable));
        Ok(ScheduleId(id))
    }

    fn cancel(&self, id: ScheduleId) -> bool {
        self.assert_main_thread();
        lock(&self.delayed).remove(&id.0).is_some()
    }

    fn shutdown(&self) {
        self.assert_main_thread();
        self.closed.store(true, SeqCst);
        lock(&self.delayed).clear();
    }

    fn is_main_thread(&self) -> bool {
        thread::current().id() == self.thread
    }

    fn dump(&self, out: &mut String) {
        let delayed = lock(&self.delayed);
        out.push_str("Direct main scheduler: \n");
        out.push_str(&format!("\tPending runnables:{}\n", delayed.len()));
        for (deadline, runnable) in delayed.values() {
            out.push_str(&format!("\t\t{} @{:?}\n", runnable.name(), deadline));
        }
    }
}

/// # Synchronous background scheduler
///
/// See the [direct module documentation](crate::tasks::direct).
pub struct DirectBackgroundScheduler {
    deferred: bool,
    queue: Mutex<VecDeque<Work>>,
    closed: AtomicBool,
}

impl DirectBackgroundScheduler {
    /// Create a scheduler that runs work inline, on submission
    pub fn new() -> Self {
        Self {
            deferred: false,
            queue: Mutex::new(VecDeque::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Create a scheduler that queues work until [DirectBackgroundScheduler::run_all] or
    /// [DirectBackgroundScheduler::run_next] is called
    pub fn deferred() -> Self {
        Self {
            deferred: true,
            ..Self::new()
        }
    }

    /// Number of queued work items
    pub fn queued_count(&self) -> usize {
        lock(&self.queue).len()
    }

    /// Run the oldest queued work item. Returns `false` if the queue was empty.
    pub fn run_next(&self) -> bool {
        let work = lock(&self.queue).pop_front();
        match work {
            Some(work) => {
                work.run();
                true
            }
            None => false,
        }
    }

    /// Run queued work items until the queue is empty. Returns how many ran.
    pub fn run_all(&self) -> usize {
        let mut count = 0;
        while self.run_next() {
            count += 1;
        }
        count
    }
}

impl Default for DirectBackgroundScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl BackgroundScheduler for DirectBackgroundScheduler {
    fn submit(&self, work: Work) -> Result<()> {
        if self.closed.load(SeqCst) {
            work.abort();
            return Err(Error::SchedulerShutdown);
        }
        if self.deferred {
            lock(&self.queue).push_back(work);
        } else {
            work.run();
        }
        Ok(())
    }

    fn shutdown(&self) {
        self.closed.store(true, SeqCst);
        let drained: Vec<Work> = lock(&self.queue).drain(..).collect();
        for work in drained {
            work.abort();
        }
    }

    fn dump(&self, out: &mut String) {
        let queue = lock(&self.queue);
        out.push_str("Direct background scheduler: \n");
        out.push_str(&format!("\tQueued tasks:{}\n", queue.len()));
        for work in queue.iter() {
            out.push_str(&format!("\t\t{}\n", work.name()));
        }
    }
}
