//! # Single-shot jobs
//!
//! A [Job] bundles a background body with a main thread completion handler, both supplied by a [JobBody]
//! implementation. A job models one occurrence of work: it is launched at most once, later launches return the
//! same [Task].
//!
//! ```
//! use groundsdk_core::tasks::{CancelToken, DirectBackgroundScheduler, DirectMainScheduler, Job, JobBody, TaskOutcome};
//! use groundsdk_core::{BoxError, Executor};
//! use std::sync::Arc;
//!
//! struct Sum(Vec<u32>);
//!
//! impl JobBody for Sum {
//!     type Output = u32;
//!
//!     fn name(&self) -> &str {
//!         "sum"
//!     }
//!
//!     fn do_in_background(&self, token: &CancelToken) -> Result<Option<u32>, BoxError> {
//!         token.check()?;
//!         Ok(Some(self.0.iter().sum()))
//!     }
//!
//!     fn on_complete(&self, outcome: &TaskOutcome<Option<u32>>) {
//!         println!("sum complete: {}", outcome);
//!     }
//! }
//!
//! let executor = Executor::new(Arc::new(DirectBackgroundScheduler::new()), Arc::new(DirectMainScheduler::new()));
//! let job = Job::new(Sum(vec![1, 2, 3]));
//! let task = job.launch(&executor);
//! task.when_complete(|outcome| assert_eq!(outcome.result(), Some(&Some(6))));
//! ```

use super::lock;
use super::scheduler::CancelToken;
use super::task::{Task, TaskOutcome};
use crate::{BoxError, Executor};
use std::sync::{Arc, Mutex};

/// Work performed by a [Job]
pub trait JobBody: Send + Sync + 'static {
    /// Type of the background result
    type Output: Send + Sync + 'static;

    /// Job name, used in logs and dumps
    fn name(&self) -> &str;

    /// Background phase, runs off the main thread. Returns no result by default.
    ///
    /// Long bodies should poll `token` and return early once canceled.
    fn do_in_background(&self, token: &CancelToken) -> Result<Option<Self::Output>, BoxError> {
        let _ = token;
        Ok(None)
    }

    /// Completion phase, runs on the main thread once the background phase is over or the job is canceled.
    fn on_complete(&self, outcome: &TaskOutcome<Option<Self::Output>>) {
        let _ = outcome;
    }
}

enum JobState<T> {
    NotLaunched,
    Launched(Task<Option<T>>),
}

/// # Single-shot background job
///
/// See the [job module documentation](crate::tasks::job).
pub struct Job<B: JobBody> {
    body: Arc<B>,
    state: Mutex<JobState<B::Output>>,
}

impl<B: JobBody> Job<B> {
    /// Wrap a job body, the job is not launched yet
    pub fn new(body: B) -> Self {
        Self {
            body: Arc::new(body),
            state: Mutex::new(JobState::NotLaunched),
        }
    }

    /// Launch the job on `executor`.
    ///
    /// The first call submits the background phase and returns its task. Later calls return the same task and
    /// run nothing.
    ///
    /// # Panics
    ///
    /// Panics if not called from the main thread.
    pub fn launch(&self, executor: &Executor) -> Task<Option<B::Output>> {
        let mut state = lock(&self.state);
        if let JobState::Launched(task) = &*state {
            return task.clone();
        }

        let task = executor.run_in_background(self.body.name().to_owned(), {
            let body = self.body.clone();
            move |token: &CancelToken| body.do_in_background(token)
        });
        *state = JobState::Launched(task.clone());
        drop(state);

        let body = self.body.clone();
        task.when_complete(move |outcome| body.on_complete(outcome));
        task
    }

    /// Task of the job, once launched
    pub fn task(&self) -> Option<Task<Option<B::Output>>> {
        match &*lock(&self.state) {
            JobState::Launched(task) => Some(task.clone()),
            JobState::NotLaunched => None,
        }
    }

    /// Job body
    pub fn body(&self) -> &B {
        &self.body
    }
}
