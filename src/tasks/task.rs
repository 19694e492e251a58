//! # Cancellable background tasks
//!
//! A [Task] is the observable handle of one unit of background work. It goes from pending to exactly one
//! terminal [TaskOutcome], exactly once:
//!  - [TaskOutcome::Success] when the body returns a result,
//!  - [TaskOutcome::Failure] when the body returns an error or panics,
//!  - [TaskOutcome::Canceled] when the task is canceled, whatever the body was doing at that time.
//!
//! Completion listeners always run on the main thread. A listener registered on a terminal task runs
//! immediately, on the caller stack.

use super::lock;
use super::scheduler::{BackgroundScheduler, CancelToken, MainThreadScheduler, PostPolicy, Runnable, Work};
use crate::{BoxError, Error};
use log::{debug, warn};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::{Arc, Mutex};

const TAG: &str = "groundsdk::executor";

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(0);

/// Terminal state of a [Task]
#[derive(Debug)]
pub enum TaskOutcome<T> {
    /// The body completed and produced a result
    Success(T),
    /// The body failed, the error is reported verbatim
    Failure(BoxError),
    /// The task was canceled before completion
    Canceled,
}

impl<T> TaskOutcome<T> {
    /// Task result, if the task succeeded
    pub fn result(&self) -> Option<&T> {
        match self {
            TaskOutcome::Success(result) => Some(result),
            _ => None,
        }
    }

    /// Task error, if the task failed
    pub fn error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            TaskOutcome::Failure(error) => Some(error.as_ref()),
            _ => None,
        }
    }

    /// True if the task was canceled
    pub fn is_canceled(&self) -> bool {
        matches!(self, TaskOutcome::Canceled)
    }

    /// True if the task succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success(_))
    }
}

impl<T> fmt::Display for TaskOutcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Success(_) => f.write_str("SUCCESS"),
            TaskOutcome::Failure(error) => write!(f, "FAILED [{}]", error),
            TaskOutcome::Canceled => f.write_str("CANCELED"),
        }
    }
}

type Listener<T> = Box<dyn FnOnce(&Arc<TaskOutcome<T>>) + Send + 'static>;

enum State<T> {
    Pending(Vec<Listener<T>>),
    Complete(Arc<TaskOutcome<T>>),
}

struct TaskInner<T> {
    id: u64,
    name: String,
    token: CancelToken,
    // None for tasks created already complete
    main: Option<Arc<dyn MainThreadScheduler>>,
    state: Mutex<State<T>>,
}

/// Delivers a background outcome to its task.
///
/// Dropped undelivered when the main scheduler discards the runnable carrying it, in which case the task
/// completes as canceled on the dropping thread.
struct Delivery<T> {
    inner: Arc<TaskInner<T>>,
    outcome: Option<TaskOutcome<T>>,
}

impl<T> Delivery<T> {
    fn deliver(mut self) {
        if let Some(outcome) = self.outcome.take() {
            self.inner.complete(outcome);
        }
    }
}

impl<T> Drop for Delivery<T> {
    fn drop(&mut self) {
        if self.outcome.take().is_some() {
            debug!(target: TAG, "Task [{}] outcome discarded by main scheduler", self.inner.name);
            self.inner.token.cancel();
            self.inner.complete(TaskOutcome::Canceled);
        }
    }
}

impl<T> TaskInner<T> {
    fn assert_main_thread(&self) {
        if let Some(main) = &self.main {
            main.assert_main_thread();
        }
    }

    fn complete(&self, outcome: TaskOutcome<T>) {
        let mut state = lock(&self.state);
        let listeners = match &mut *state {
            State::Pending(listeners) => std::mem::take(listeners),
            // Canceled tasks complete early, the late background result is dropped
            State::Complete(_) => return,
        };

        let outcome = Arc::new(if self.token.is_canceled() {
            TaskOutcome::Canceled
        } else {
            outcome
        });
        *state = State::Complete(outcome.clone());
        drop(state);

        debug!(target: TAG, "Task [{}] {}", self.name, outcome);
        for listener in listeners {
            listener(&outcome);
        }
    }

    fn register(&self, listener: Listener<T>) {
        self.assert_main_thread();
        let outcome = match &mut *lock(&self.state) {
            State::Pending(listeners) => {
                listeners.push(listener);
                return;
            }
            State::Complete(outcome) => outcome.clone(),
        };
        listener(&outcome);
    }
}

trait TaskControl: Send + Sync {
    fn id(&self) -> u64;
    fn name(&self) -> &str;
    fn is_complete(&self) -> bool;
    fn cancel(&self) -> bool;
}

impl<T: Send + Sync + 'static> TaskControl for TaskInner<T> {
    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_complete(&self) -> bool {
        self.assert_main_thread();
        matches!(&*lock(&self.state), State::Complete(_))
    }

    fn cancel(&self) -> bool {
        self.assert_main_thread();
        if self.is_complete() {
            return false;
        }
        if self.token.cancel() {
            debug!(target: TAG, "Canceled: Task [{}]", self.name);
        }
        self.complete(TaskOutcome::Canceled);
        true
    }
}

/// # Observable handle of a background task
///
/// See the [task module documentation](crate::tasks::task). Tasks are created by
/// [Executor::run_in_background](crate::Executor::run_in_background), or already complete with
/// [Task::success] and [Task::failure].
///
/// Cloning a task clones the handle, not the work.
pub struct Task<T> {
    inner: Arc<TaskInner<T>>,
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> Task<T> {
    /// Submit `body` for background execution and monitor it.
    ///
    /// # Panics
    ///
    /// Panics if not called from the main thread.
    pub(crate) fn execute<F>(
        name: impl Into<String>,
        body: F,
        background: &dyn BackgroundScheduler,
        main: Arc<dyn MainThreadScheduler>,
    ) -> Self
    where
        F: FnOnce(&CancelToken) -> std::result::Result<T, BoxError> + Send + 'static,
    {
        main.assert_main_thread();

        let token = CancelToken::new();
        let inner = Arc::new(TaskInner {
            id: NEXT_TASK_ID.fetch_add(1, Relaxed),
            name: name.into(),
            token: token.clone(),
            main: Some(main),
            state: Mutex::new(State::Pending(Vec::new())),
        });

        let work = Work::new(inner.name.clone(), token, {
            let inner = inner.clone();
            move || {
                let outcome = if inner.token.is_canceled() {
                    TaskOutcome::Canceled
                } else {
                    match panic::catch_unwind(AssertUnwindSafe(|| body(&inner.token))) {
                        Ok(Ok(result)) => TaskOutcome::Success(result),
                        Ok(Err(error)) => TaskOutcome::Failure(error),
                        Err(payload) => {
                            let reason = panic_message(payload.as_ref());
                            warn!(target: TAG, "Task [{}] panicked: {}", inner.name, reason);
                            TaskOutcome::Failure(Box::new(Error::TaskPanicked(reason)))
                        }
                    }
                };

                let label = format!("Task [{}] {}", inner.name, outcome);
                let delivery = Delivery {
                    inner: inner.clone(),
                    outcome: Some(outcome),
                };
                let runnable = Runnable::new(label, move || delivery.deliver());
                if let Some(main) = &inner.main {
                    if let Err(e) = main.post(runnable, PostPolicy::Run) {
                        debug!(target: TAG, "Task [{}] result not posted: {}", inner.name, e);
                    }
                }
            }
        });

        if let Err(e) = background.submit(work) {
            debug!(target: TAG, "Task [{}] not started: {}", inner.name, e);
        }

        Task { inner }
    }

    /// Create a task that already completed successfully
    pub fn success(result: T) -> Self {
        Self::completed("", TaskOutcome::Success(result))
    }

    /// Create a task that already failed
    pub fn failure(error: impl Into<BoxError>) -> Self {
        Self::completed("", TaskOutcome::Failure(error.into()))
    }

    /// Create a task that was canceled before it could start
    pub(crate) fn canceled(name: &str) -> Self {
        let task = Self::completed(name, TaskOutcome::Canceled);
        task.inner.token.cancel();
        task
    }

    fn completed(name: &str, outcome: TaskOutcome<T>) -> Self {
        Task {
            inner: Arc::new(TaskInner {
                id: NEXT_TASK_ID.fetch_add(1, Relaxed),
                name: name.to_owned(),
                token: CancelToken::new(),
                main: None,
                state: Mutex::new(State::Complete(Arc::new(outcome))),
            }),
        }
    }

    /// Register a completion listener.
    ///
    /// The listener is called on the main thread once the task completes, or right away if it already did.
    ///
    /// # Panics
    ///
    /// Panics if not called from the main thread.
    pub fn when_complete(&self, listener: impl FnOnce(&TaskOutcome<T>) + Send + 'static) -> &Self {
        self.inner
            .register(Box::new(move |outcome: &Arc<TaskOutcome<T>>| listener(outcome.as_ref())));
        self
    }

    /// Future resolving to the task outcome once the task completes.
    ///
    /// Resolves to `None` if the listener is dropped without being called. Tasks still running when the
    /// executor is disposed complete as canceled instead.
    ///
    /// # Panics
    ///
    /// Panics if not called from the main thread.
    pub fn completion(&self) -> impl Future<Output = Option<Arc<TaskOutcome<T>>>> + Send + 'static {
        let (tx, rx) = futures::channel::oneshot::channel();
        self.inner.register(Box::new(move |outcome: &Arc<TaskOutcome<T>>| {
            let _ = tx.send(outcome.clone());
        }));
        async move { rx.await.ok() }
    }

    /// Tell whether the task has completed, successfully, with failure or because it was canceled.
    ///
    /// # Panics
    ///
    /// Panics if not called from the main thread.
    pub fn is_complete(&self) -> bool {
        TaskControl::is_complete(self.inner.as_ref())
    }

    /// Cancel the task.
    ///
    /// The background body is asked to stop through its [CancelToken] and listeners are notified of the
    /// cancellation right away. Returns `false` if the task had already completed.
    ///
    /// # Panics
    ///
    /// Panics if not called from the main thread.
    pub fn cancel(&self) -> bool {
        TaskControl::cancel(self.inner.as_ref())
    }

    /// Task name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Type-erased handle on this task
    pub fn handle(&self) -> TaskHandle {
        TaskHandle(self.inner.clone())
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task [{}]", self.inner.name)
    }
}

/// Type-erased [Task] handle
///
/// Allows handling tasks of different result types together, see [TaskGroup](crate::tasks::TaskGroup).
/// Two handles are equal when they refer to the same task.
#[derive(Clone)]
pub struct TaskHandle(Arc<dyn TaskControl>);

impl TaskHandle {
    /// Task name
    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// See [Task::is_complete]
    pub fn is_complete(&self) -> bool {
        self.0.is_complete()
    }

    /// See [Task::cancel]
    pub fn cancel(&self) -> bool {
        self.0.cancel()
    }

    pub(crate) fn id(&self) -> u64 {
        self.0.id()
    }
}

impl PartialEq for TaskHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for TaskHandle {}

impl Hash for TaskHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state)
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task [{}]", self.0.name())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}
