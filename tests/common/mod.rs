// Shared fixtures of the integration tests
#![allow(dead_code)]

use groundsdk_core::settings::{ChangeListener, SettingController};
use groundsdk_core::tasks::{DirectBackgroundScheduler, DirectMainScheduler};
use groundsdk_core::Executor;
use std::sync::atomic::{AtomicBool, Ordering::SeqCst};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Executor on the direct schedulers, with access to the virtual clock
pub struct Harness {
    pub executor: Executor,
    pub main: Arc<DirectMainScheduler>,
    pub background: Arc<DirectBackgroundScheduler>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_background(DirectBackgroundScheduler::new())
    }

    pub fn deferred() -> Self {
        Self::with_background(DirectBackgroundScheduler::deferred())
    }

    fn with_background(background: DirectBackgroundScheduler) -> Self {
        init_logger();
        let main = Arc::new(DirectMainScheduler::new());
        let background = Arc::new(background);
        let executor = Executor::new(background.clone(), main.clone());
        Self {
            executor,
            main,
            background,
        }
    }

    pub fn advance_ms(&self, millis: u64) {
        self.main.advance(Duration::from_millis(millis));
    }

    pub fn controller(&self, changes: &Changes) -> SettingController {
        SettingController::new(&self.executor, changes.listener())
    }
}

/// Records setting change notifications
#[derive(Clone, Default)]
pub struct Changes {
    seen: Arc<Mutex<Vec<bool>>>,
}

impl Changes {
    pub fn listener(&self) -> ChangeListener {
        let seen = self.seen.clone();
        Arc::new(move |from_user| seen.lock().unwrap().push(from_user))
    }

    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<bool> {
        self.seen.lock().unwrap().last().copied()
    }
}

/// Backend recording the values it is asked to send
#[derive(Clone)]
pub struct Recorder<T> {
    accept: Arc<AtomicBool>,
    sent: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone + Send + 'static> Recorder<T> {
    pub fn new() -> Self {
        Self {
            accept: Arc::new(AtomicBool::new(true)),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn backend(&self) -> impl Fn(T) -> bool + Send + Sync + 'static {
        let accept = self.accept.clone();
        let sent = self.sent.clone();
        move |value| {
            sent.lock().unwrap().push(value);
            accept.load(SeqCst)
        }
    }

    pub fn set_accept(&self, accept: bool) {
        self.accept.store(accept, SeqCst);
    }

    pub fn last(&self) -> Option<T> {
        self.sent.lock().unwrap().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}
