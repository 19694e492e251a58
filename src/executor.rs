use crate::config::SdkConfig;
use crate::tasks::{
    BackgroundScheduler, CancelToken, LooperScheduler, MainLoop, MainThreadScheduler, PostPolicy, Runnable,
    ScheduleId, Task, ThreadPoolScheduler,
};
use crate::{BoxError, Result};
use log::{debug, info};
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::SeqCst;
use std::sync::Arc;
use std::time::Duration;

const TAG: &str = "groundsdk::executor";

/// # The executor
///
/// Scheduling context of the SDK: a background scheduler for blocking work and a main thread scheduler where
/// setting state is mutated and listeners are notified. The executor is cheap to clone, clones share the same
/// schedulers.
///
/// It is explicitly created, either with [Executor::start] for the default schedulers or [Executor::new] for
/// custom ones (typically the [direct](crate::tasks::direct) schedulers in tests), and explicitly disposed with
/// [Executor::dispose].
///
/// See the [crate root documentation](crate) for more context.
#[derive(Clone)]
pub struct Executor {
    background: Arc<dyn BackgroundScheduler>,
    main: Arc<dyn MainThreadScheduler>,
    disposed: Arc<AtomicBool>,
}

impl Executor {
    /// Create an executor from explicit schedulers
    pub fn new(background: Arc<dyn BackgroundScheduler>, main: Arc<dyn MainThreadScheduler>) -> Self {
        Self {
            background,
            main,
            disposed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the default schedulers: a [ThreadPoolScheduler] configured from `config` and a [MainLoop] bound to
    /// the calling thread.
    ///
    /// The calling thread becomes the main thread and must drive the returned [MainLoop]. Must be called from
    /// within a tokio runtime, [Error::NoRuntime](crate::Error::NoRuntime) is returned otherwise.
    pub fn start(config: &SdkConfig) -> Result<(Self, MainLoop)> {
        config.validate()?;
        let (main_loop, main): (MainLoop, Arc<LooperScheduler>) = MainLoop::new()?;
        let background = Arc::new(ThreadPoolScheduler::with_config(config));

        info!(target: TAG, "Executor started");

        Ok((Self::new(background, main), main_loop))
    }

    /// Run a body in background.
    ///
    /// The body runs on the background scheduler, the returned [Task] reports its outcome on the main thread.
    /// Once the executor is disposed, the body never runs and the returned task is already canceled.
    ///
    /// # Panics
    ///
    /// Panics if not called from the main thread.
    pub fn run_in_background<T, F>(&self, name: impl Into<String>, body: F) -> Task<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce(&CancelToken) -> std::result::Result<T, BoxError> + Send + 'static,
    {
        self.main.assert_main_thread();
        if self.is_disposed() {
            let name = name.into();
            debug!(target: TAG, "Task [{}] canceled: executor disposed", name);
            return Task::canceled(&name);
        }
        Task::execute(name, body, self.background.as_ref(), self.main.clone())
    }

    /// Post a runnable on the main thread from a background thread.
    ///
    /// # Panics
    ///
    /// Panics if called from the main thread.
    pub fn post_on_main_thread(&self, runnable: Runnable) -> Result<()> {
        self.main.post(runnable, PostPolicy::Deny)
    }

    /// Schedule a runnable on the main thread after `delay`.
    ///
    /// # Panics
    ///
    /// Panics if not called from the main thread.
    pub fn schedule(&self, runnable: Runnable, delay: Duration) -> Result<ScheduleId> {
        self.main.schedule(runnable, delay)
    }

    /// Cancel a runnable scheduled with [Executor::schedule]. Returns `true` if it had not run yet.
    ///
    /// # Panics
    ///
    /// Panics if not called from the main thread.
    pub fn unschedule(&self, id: ScheduleId) -> bool {
        self.main.cancel(id)
    }

    /// Ensure the calling thread is the main thread.
    ///
    /// # Panics
    ///
    /// Panics if not called from the main thread.
    pub fn require_main_thread(&self) {
        self.main.assert_main_thread()
    }

    /// Tell whether the calling thread is the main thread
    pub fn is_main_thread(&self) -> bool {
        self.main.is_main_thread()
    }

    /// Main thread scheduler
    pub fn main_thread_scheduler(&self) -> &Arc<dyn MainThreadScheduler> {
        &self.main
    }

    /// Background scheduler
    pub fn background_scheduler(&self) -> &Arc<dyn BackgroundScheduler> {
        &self.background
    }

    /// Shut both schedulers down.
    ///
    /// Pending background work is canceled, then pending main thread runnables are dropped. Disposing twice has
    /// no effect.
    ///
    /// # Panics
    ///
    /// Panics if not called from the main thread.
    pub fn dispose(&self) {
        self.main.assert_main_thread();
        if self.disposed.swap(true, SeqCst) {
            return;
        }
        self.background.shutdown();
        self.main.shutdown();
        info!(target: TAG, "Executor disposed");
    }

    /// True once [Executor::dispose] has been called
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(SeqCst)
    }

    /// Dump executor state for debugging.
    ///
    /// Without arguments or with `--help`, writes the supported option. With `--executor` or `--all`, writes the
    /// pending work of both schedulers.
    pub fn dump(&self, out: &mut String, args: &[&str]) {
        if args.is_empty() || args.contains(&"--help") {
            out.push_str("\t--executor: dumps executor info\n");
        } else if args.contains(&"--executor") || args.contains(&"--all") {
            if self.is_disposed() {
                out.push_str("Background scheduler inactive\n");
                out.push_str("Foreground scheduler inactive\n");
            } else {
                self.background.dump(out);
                self.main.dump(out);
            }
        }
    }
}
