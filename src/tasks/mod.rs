//! # Task execution
//!
//! The scheduling infrastructure of the SDK:
//!  - [scheduler] defines the main thread and background scheduler interfaces,
//!  - [looper] and [pool] are their default implementations,
//!  - [direct] provides synchronous implementations for deterministic tests,
//!  - [task], [job] and [group] build cancellable, observable background tasks on top of them.
//!
//! Schedulers are usually not used directly but through an [Executor](crate::Executor).

pub mod direct;
pub mod group;
pub mod job;
pub mod looper;
pub mod pool;
pub mod scheduler;
pub mod task;

pub use direct::{DirectBackgroundScheduler, DirectMainScheduler};
pub use group::TaskGroup;
pub use job::{Job, JobBody};
pub use looper::{LooperScheduler, MainLoop};
pub use pool::ThreadPoolScheduler;
pub use scheduler::{BackgroundScheduler, CancelToken, MainThreadScheduler, PostPolicy, Runnable, ScheduleId, Work};
pub use task::{Task, TaskHandle, TaskOutcome};

use std::sync::{Mutex, MutexGuard, PoisonError};

// Listeners never run under a lock, a poisoned mutex still holds consistent state
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
