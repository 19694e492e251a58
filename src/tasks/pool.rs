//! # Background thread pool
//!
//! Default [BackgroundScheduler] implementation: a cached pool of worker threads. A new worker is started when
//! work is submitted and no worker is idle; idle workers exit after the configured keep-alive delay.
//!
//! On Linux and Android each worker raises its own nice value by [WORKER_NICE_INCREMENT] when it starts, so that
//! background work runs at a lower priority than the thread that submitted it. Other platforms keep the default
//! priority.

use super::lock;
use super::scheduler::{BackgroundScheduler, CancelToken, Work};
use crate::config::SdkConfig;
use crate::{Error, Result};
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering::{Relaxed, SeqCst};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const TAG: &str = "groundsdk::executor";

/// Nice value increment applied to worker threads, capped by the OS at the lowest priority
pub const WORKER_NICE_INCREMENT: i32 = 10;

#[cfg(any(target_os = "linux", target_os = "android"))]
fn lower_thread_priority() {
    // SAFETY: nice only updates the scheduling attributes of the calling thread
    let niceness = unsafe { libc::nice(WORKER_NICE_INCREMENT) };
    debug!(
        target: TAG,
        "[{}] Worker niceness: {}",
        thread::current().name().unwrap_or("unnamed"),
        niceness
    );
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn lower_thread_priority() {
    debug!(target: TAG, "Worker priority left unchanged on this platform");
}

struct PoolShared {
    sender: Mutex<Option<flume::Sender<(u64, Work)>>>,
    receiver: flume::Receiver<(u64, Work)>,
    keep_alive: Duration,
    name_prefix: String,
    max_workers: usize,
    // Idle workers not yet claimed by a submission
    idle: AtomicUsize,
    workers: AtomicUsize,
    next_worker: AtomicUsize,
    next_work: AtomicU64,
    closed: AtomicBool,
    queued: Mutex<BTreeMap<u64, String>>,
    running: Mutex<BTreeMap<u64, (String, CancelToken)>>,
}

impl PoolShared {
    fn process(&self, id: u64, work: Work) {
        lock(&self.queued).remove(&id);
        let name = work.name().to_owned();
        lock(&self.running).insert(id, (name.clone(), work.token().clone()));

        let worker = thread::current();
        let worker = worker.name().unwrap_or("unnamed");
        debug!(target: TAG, "[{}] About to process: {}", worker, name);
        if panic::catch_unwind(AssertUnwindSafe(|| work.run())).is_err() {
            warn!(target: TAG, "[{}] Work panicked: {}", worker, name);
        }
        debug!(target: TAG, "[{}] Done processing: {}", worker, name);

        lock(&self.running).remove(&id);
    }

    fn worker_loop(&self) {
        loop {
            match self.receiver.recv_timeout(self.keep_alive) {
                Ok((id, work)) => {
                    self.process(id, work);
                    self.idle.fetch_add(1, SeqCst);
                }
                Err(flume::RecvTimeoutError::Timeout) => {
                    // A failed decrement means a submission claimed this worker, wait for its work
                    if self
                        .idle
                        .fetch_update(SeqCst, SeqCst, |idle| idle.checked_sub(1))
                        .is_ok()
                    {
                        break;
                    }
                }
                Err(flume::RecvTimeoutError::Disconnected) => break,
            }
        }
        self.workers.fetch_sub(1, SeqCst);
    }
}

/// # Cached background thread pool
///
/// See the [pool module documentation](crate::tasks::pool).
///
/// Worker threads run at a lowered priority where the platform allows it.
#[derive(Clone)]
pub struct ThreadPoolScheduler {
    shared: Arc<PoolShared>,
}

impl ThreadPoolScheduler {
    /// Create a pool with the default configuration
    pub fn new() -> Self {
        Self::with_config(&SdkConfig::default())
    }

    /// Create a pool using the worker fields of `config`
    pub fn with_config(config: &SdkConfig) -> Self {
        let (sender, receiver) = flume::unbounded();

        info!(target: TAG, "Starting background thread scheduler");

        Self {
            shared: Arc::new(PoolShared {
                sender: Mutex::new(Some(sender)),
                receiver,
                keep_alive: config.worker_keep_alive(),
                name_prefix: config.worker_name_prefix.clone(),
                max_workers: config.max_workers,
                idle: AtomicUsize::new(0),
                workers: AtomicUsize::new(0),
                next_worker: AtomicUsize::new(0),
                next_work: AtomicU64::new(0),
                closed: AtomicBool::new(false),
                queued: Mutex::new(BTreeMap::new()),
                running: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// Number of live worker threads
    pub fn worker_count(&self) -> usize {
        self.shared.workers.load(SeqCst)
    }

    fn spawn_worker(&self) {
        let shared = self.shared.clone();
        let index = shared.next_worker.fetch_add(1, Relaxed);
        shared.workers.fetch_add(1, SeqCst);

        let spawned = thread::Builder::new()
            .name(format!("{}-{}", shared.name_prefix, index))
            .spawn({
                let shared = shared.clone();
                move || {
                    lower_thread_priority();
                    shared.worker_loop()
                }
            });

        if let Err(e) = spawned {
            shared.workers.fetch_sub(1, SeqCst);
            error!(target: TAG, "Could not start background worker: {}", e);
        }
    }
}

impl Default for ThreadPoolScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl BackgroundScheduler for ThreadPoolScheduler {
    fn submit(&self, work: Work) -> Result<()> {
        if self.shared.closed.load(SeqCst) {
            warn!(target: TAG, "Aborting {:?}: background scheduler is shut down", work);
            work.abort();
            return Err(Error::SchedulerShutdown);
        }

        let id = self.shared.next_work.fetch_add(1, Relaxed);
        lock(&self.shared.queued).insert(id, work.name().to_owned());

        let sent = match lock(&self.shared.sender).as_ref() {
            Some(sender) => sender.send((id, work)).map_err(|e| e.into_inner().1),
            None => Err(work),
        };
        if let Err(work) = sent {
            lock(&self.shared.queued).remove(&id);
            work.abort();
            return Err(Error::SchedulerShutdown);
        }

        let claimed_idle = self
            .shared
            .idle
            .fetch_update(SeqCst, SeqCst, |idle| idle.checked_sub(1))
            .is_ok();
        let may_grow = self.shared.max_workers == 0 || self.worker_count() < self.shared.max_workers;
        if !claimed_idle && may_grow {
            self.spawn_worker();
        }

        Ok(())
    }

    fn shutdown(&self) {
        self.shared.closed.store(true, SeqCst);
        // Dropping the sender makes workers exit as soon as the queue is empty
        lock(&self.shared.sender).take();

        while let Ok((id, work)) = self.shared.receiver.try_recv() {
            lock(&self.shared.queued).remove(&id);
            work.abort();
        }
        for (name, token) in lock(&self.shared.running).values() {
            if token.cancel() {
                debug!(target: TAG, "Interrupted running work: {}", name);
            }
        }

        info!(target: TAG, "Stopped background thread scheduler");
    }

    fn dump(&self, out: &mut String) {
        let queued = lock(&self.shared.queued);
        let running = lock(&self.shared.running);
        out.push_str("Background scheduler: \n");
        out.push_str(&format!("\tWorkers:{}\n", self.worker_count()));
        out.push_str(&format!("\tQueued tasks:{}\n", queued.len()));
        for name in queued.values() {
            out.push_str(&format!("\t\t{}\n", name));
        }
        out.push_str(&format!("\tRunning tasks:{}\n", running.len()));
        for (name, _) in running.values() {
            out.push_str(&format!("\t\t{}\n", name));
        }
    }
}
