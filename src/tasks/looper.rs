//! # Main loop
//!
//! Default [MainThreadScheduler] implementation. The thread creating the [MainLoop] becomes the main thread; it
//! must then drive the loop, either with [MainLoop::run] from a `block_on` or a current-thread tokio runtime, or
//! by calling [MainLoop::run_pending] from its own event loop.
//!
//! Delayed runnables are armed as tokio timers that push the runnable to the loop queue once elapsed. Every
//! queued runnable is tracked in a pending table: canceling a runnable removes it from that table, so a timer
//! that already fired cannot run it anymore.
//!
//! ``` no_run
//! # async fn example() -> groundsdk_core::Result<()> {
//! use groundsdk_core::tasks::{MainLoop, MainThreadScheduler, PostPolicy, Runnable};
//!
//! let (main_loop, scheduler) = MainLoop::new()?;
//! scheduler.post(Runnable::new("hello", || println!("Hello from main")), PostPolicy::Post)?;
//! scheduler.post(Runnable::new("quit", {
//!     let scheduler = scheduler.clone();
//!     move || scheduler.shutdown()
//! }), PostPolicy::Post)?;
//! main_loop.run().await;
//! # Ok(())
//! # }
//! ```

use super::lock;
use super::scheduler::{MainThreadScheduler, PostPolicy, Runnable, ScheduleId};
use crate::{Error, Result};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::atomic::Ordering::{Relaxed, SeqCst};
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

const TAG: &str = "groundsdk::executor";

enum Message {
    Run(u64, Runnable),
    Quit,
}

struct Pending {
    name: String,
    timer: Option<AbortHandle>,
}

struct Shared {
    thread: ThreadId,
    runtime: Handle,
    sender: flume::Sender<Message>,
    pending: Mutex<BTreeMap<u64, Pending>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl Shared {
    fn is_main_thread(&self) -> bool {
        thread::current().id() == self.thread
    }

    fn enqueue(&self, runnable: Runnable) -> Result<()> {
        let id = self.next_id.fetch_add(1, Relaxed);
        lock(&self.pending).insert(
            id,
            Pending {
                name: runnable.name().to_owned(),
                timer: None,
            },
        );
        if let Err(e) = self.sender.send(Message::Run(id, runnable)) {
            // Main loop is gone
            lock(&self.pending).remove(&id);
            return Err(e.into());
        }
        Ok(())
    }
}

/// # Main loop driver
///
/// Receives runnables posted to its [LooperScheduler] and runs them on the main thread. See the
/// [looper module documentation](crate::tasks::looper).
pub struct MainLoop {
    receiver: flume::Receiver<Message>,
    shared: Arc<Shared>,
}

impl MainLoop {
    /// Create a main loop bound to the calling thread.
    ///
    /// Must be called from within a tokio runtime, which is used to arm delayed runnables. Returns
    /// [Error::NoRuntime] otherwise.
    pub fn new() -> Result<(MainLoop, Arc<LooperScheduler>)> {
        let runtime = Handle::try_current()?;
        let (sender, receiver) = flume::unbounded();

        let shared = Arc::new(Shared {
            thread: thread::current().id(),
            runtime,
            sender,
            pending: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        });

        info!(target: TAG, "Starting main thread scheduler");

        Ok((
            MainLoop {
                receiver,
                shared: shared.clone(),
            },
            Arc::new(LooperScheduler { shared }),
        ))
    }

    /// Run posted runnables until the scheduler is shut down.
    ///
    /// # Panics
    ///
    /// Panics if not called from the main thread.
    pub async fn run(&self) {
        while self.turn().await {}
    }

    /// Wait for the next message and process it.
    ///
    /// Returns `false` once the scheduler is shut down.
    ///
    /// # Panics
    ///
    /// Panics if not called from the main thread.
    pub async fn turn(&self) -> bool {
        self.assert_main_thread();
        if self.shared.closed.load(SeqCst) {
            return false;
        }

        match self.receiver.recv_async().await {
            Ok(message) => self.dispatch(message),
            Err(_) => false,
        }
    }

    /// Run every runnable that is ready now, without waiting. Returns how many ran.
    ///
    /// # Panics
    ///
    /// Panics if not called from the main thread.
    pub fn run_pending(&self) -> usize {
        self.assert_main_thread();
        let mut count = 0;
        while !self.shared.closed.load(SeqCst) {
            match self.receiver.try_recv() {
                Ok(Message::Run(id, runnable)) => {
                    if self.process(id, runnable) {
                        count += 1;
                    }
                }
                Ok(Message::Quit) | Err(_) => break,
            }
        }
        count
    }

    fn assert_main_thread(&self) {
        if !self.shared.is_main_thread() {
            panic!("Main loop must be driven from the main thread");
        }
    }

    fn dispatch(&self, message: Message) -> bool {
        match message {
            Message::Run(id, runnable) => {
                self.process(id, runnable);
                !self.shared.closed.load(SeqCst)
            }
            Message::Quit => false,
        }
    }

    fn process(&self, id: u64, runnable: Runnable) -> bool {
        // Canceled and shut down runnables are no longer pending
        if lock(&self.shared.pending).remove(&id).is_none() {
            return false;
        }

        debug!(target: TAG, "[main] About to process: {:?}", runnable);
        let name = runnable.name().to_owned();
        runnable.run();
        debug!(target: TAG, "[main] Done processing: {}", name);
        true
    }
}

/// # Main thread scheduler backed by a [MainLoop]
#[derive(Clone)]
pub struct LooperScheduler {
    shared: Arc<Shared>,
}

impl MainThreadScheduler for LooperScheduler {
    fn post(&self, runnable: Runnable, policy: PostPolicy) -> Result<()> {
        debug!(
            target: TAG,
            "[{}] Posting on main [policy: {:?}]: {:?}",
            thread::current().name().unwrap_or("unnamed"),
            policy,
            runnable
        );

        if self.shared.closed.load(SeqCst) {
            warn!(target: TAG, "Dropping {:?}: main scheduler is shut down", runnable);
            return Err(Error::SchedulerShutdown);
        }

        if self.shared.is_main_thread() {
            match policy {
                PostPolicy::Deny => panic!("Already on main thread"),
                PostPolicy::Run => {
                    runnable.run();
                    return Ok(());
                }
                PostPolicy::Post => (),
            }
        }

        self.shared.enqueue(runnable)
    }

    fn schedule(&self, runnable: Runnable, delay: Duration) -> Result<ScheduleId> {
        debug!(
            target: TAG,
            "[main] Scheduling on main [delay: {:?}]: {:?}",
            delay,
            runnable
        );

        // Delayed posts are meant for timeouts armed from the main thread, to the main thread
        self.assert_main_thread();

        if self.shared.closed.load(SeqCst) {
            return Err(Error::SchedulerShutdown);
        }

        let id = self.shared.next_id.fetch_add(1, Relaxed);
        let name = runnable.name().to_owned();
        let sender = self.shared.sender.clone();
        let timer = self.shared.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = sender.send(Message::Run(id, runnable));
        });

        lock(&self.shared.pending).insert(
            id,
            Pending {
                name,
                timer: Some(timer.abort_handle()),
            },
        );

        Ok(ScheduleId(id))
    }

    fn cancel(&self, id: ScheduleId) -> bool {
        self.assert_main_thread();

        match lock(&self.shared.pending).remove(&id.0) {
            Some(pending) => {
                if let Some(timer) = pending.timer {
                    timer.abort();
                }
                debug!(target: TAG, "[main] Unscheduled from main: {}", pending.name);
                true
            }
            None => false,
        }
    }

    fn shutdown(&self) {
        self.assert_main_thread();

        self.shared.closed.store(true, SeqCst);
        let pending = std::mem::take(&mut *lock(&self.shared.pending));
        for timer in pending.into_values().filter_map(|pending| pending.timer) {
            timer.abort();
        }
        // Wake up the loop in case it is waiting
        let _ = self.shared.sender.send(Message::Quit);

        info!(target: TAG, "Stopped main thread scheduler");
    }

    fn is_main_thread(&self) -> bool {
        self.shared.is_main_thread()
    }

    fn dump(&self, out: &mut String) {
        let pending = lock(&self.shared.pending);
        out.push_str("Main scheduler: \n");
        out.push_str(&format!("\tPending runnables:{}\n", pending.len()));
        for entry in pending.values() {
            out.push_str(&format!("\t\t{}\n", entry.name));
        }
    }
}
