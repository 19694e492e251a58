// Tasks, jobs and task groups on the direct schedulers

mod common;

use common::Harness;
use groundsdk_core::tasks::{CancelToken, Job, JobBody, MainThreadScheduler, Task, TaskGroup, TaskOutcome};
use groundsdk_core::{BoxError, Error};
use std::sync::atomic::{AtomicUsize, Ordering::SeqCst};
use std::sync::{Arc, Mutex};

fn outcomes<T: Send + Sync + 'static>(task: &Task<T>) -> Arc<Mutex<Vec<String>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    task.when_complete(move |outcome| sink.lock().unwrap().push(outcome.to_string()));
    seen
}

#[test]
fn background_result_reaches_listeners() {
    let harness = Harness::new();
    let task = harness.executor.run_in_background("answer", |_| Ok(42));

    assert!(task.is_complete());
    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    task.when_complete(move |outcome| *sink.lock().unwrap() = outcome.result().copied());
    assert_eq!(*seen.lock().unwrap(), Some(42));
    assert_eq!(task.name(), "answer");
}

#[test]
fn background_error_is_reported_verbatim() {
    let harness = Harness::new();
    let task: Task<()> = harness
        .executor
        .run_in_background("failing", |_| Err("disk full".into()));

    task.when_complete(|outcome| {
        assert!(!outcome.is_success());
        assert_eq!(outcome.error().map(|e| e.to_string()), Some("disk full".to_owned()));
    });
    assert_eq!(*outcomes(&task).lock().unwrap(), vec!["FAILED [disk full]".to_owned()]);
}

#[test]
fn panicking_body_fails_the_task() {
    let harness = Harness::new();
    let task: Task<()> = harness.executor.run_in_background("panicking", |_| panic!("boom"));

    task.when_complete(|outcome| {
        let error = outcome.error().and_then(|e| e.downcast_ref::<Error>());
        assert!(matches!(error, Some(Error::TaskPanicked(reason)) if reason == "boom"));
    });
    assert!(task.is_complete());
}

#[test]
fn cancel_completes_once() {
    let harness = Harness::deferred();
    let task = harness.executor.run_in_background("slow", |token: &CancelToken| {
        token.check()?;
        Ok("done")
    });
    let seen = outcomes(&task);

    assert!(!task.is_complete());
    assert!(task.cancel());
    assert!(task.is_complete());
    assert!(!task.cancel());

    // The late background result is dropped
    harness.background.run_all();
    assert_eq!(*seen.lock().unwrap(), vec!["CANCELED".to_owned()]);
}

#[test]
fn interrupted_body_is_canceled() {
    let harness = Harness::deferred();
    let token = Arc::new(Mutex::new(None));
    let stash = token.clone();
    let task: Task<()> = harness.executor.run_in_background("interrupted", move |token: &CancelToken| {
        *stash.lock().unwrap() = Some(token.clone());
        token.cancel();
        token.check()?;
        Ok(())
    });
    let seen = outcomes(&task);

    harness.background.run_all();
    assert!(token.lock().unwrap().as_ref().map_or(false, CancelToken::is_canceled));
    assert_eq!(*seen.lock().unwrap(), vec!["CANCELED".to_owned()]);
}

#[test]
fn completed_tasks() {
    let task = Task::success(7);
    assert!(task.is_complete());
    task.when_complete(|outcome| assert_eq!(outcome.result(), Some(&7)));
    assert!(!task.cancel());

    let task: Task<u8> = Task::failure(Error::Interrupted);
    task.when_complete(|outcome| assert!(outcome.error().is_some()));
}

#[test]
fn completion_future_resolves() {
    let harness = Harness::deferred();
    let task = harness.executor.run_in_background("future", |_| Ok(String::from("value")));
    let completion = task.completion();

    harness.background.run_all();
    let outcome = futures::executor::block_on(completion);
    assert_eq!(outcome.and_then(|outcome| outcome.result().cloned()), Some("value".to_owned()));
}

#[test]
fn shutdown_cancels_queued_work() {
    let harness = Harness::deferred();
    let task = harness.executor.run_in_background("queued", |_| Ok(()));
    let seen = outcomes(&task);

    harness.executor.dispose();
    assert_eq!(*seen.lock().unwrap(), vec!["CANCELED".to_owned()]);

    // Disposing twice is harmless
    harness.executor.dispose();
    assert!(harness.executor.is_disposed());
}

#[test]
fn disposed_executor_cancels_new_tasks() {
    let harness = Harness::new();
    harness.executor.dispose();

    let ran = Arc::new(AtomicUsize::new(0));
    let counter = ran.clone();
    let task = harness.executor.run_in_background("late", move |_| {
        counter.fetch_add(1, SeqCst);
        Ok(1)
    });

    assert!(task.is_complete());
    assert_eq!(task.name(), "late");
    assert!(!task.cancel());
    assert_eq!(*outcomes(&task).lock().unwrap(), vec!["CANCELED".to_owned()]);
    assert_eq!(ran.load(SeqCst), 0);
}

#[test]
fn result_without_main_scheduler_cancels_task() {
    let harness = Harness::deferred();
    let task = harness.executor.run_in_background("orphan", |_| Ok("done"));
    let seen = outcomes(&task);
    let completion = task.completion();

    // Main scheduler stops while the body is still queued
    harness.main.shutdown();
    harness.background.run_all();

    assert!(task.is_complete());
    assert_eq!(*seen.lock().unwrap(), vec!["CANCELED".to_owned()]);
    let outcome = futures::executor::block_on(completion);
    assert!(outcome.map_or(false, |outcome| outcome.is_canceled()));
}

struct Counting {
    runs: AtomicUsize,
    completions: AtomicUsize,
}

impl JobBody for Counting {
    type Output = usize;

    fn name(&self) -> &str {
        "counting"
    }

    fn do_in_background(&self, _token: &CancelToken) -> Result<Option<usize>, BoxError> {
        Ok(Some(self.runs.fetch_add(1, SeqCst) + 1))
    }

    fn on_complete(&self, outcome: &TaskOutcome<Option<usize>>) {
        assert!(outcome.is_success());
        self.completions.fetch_add(1, SeqCst);
    }
}

#[test]
fn job_launches_once() {
    let harness = Harness::new();
    let job = Job::new(Counting {
        runs: AtomicUsize::new(0),
        completions: AtomicUsize::new(0),
    });
    assert!(job.task().is_none());

    let first = job.launch(&harness.executor);
    let second = job.launch(&harness.executor);
    assert_eq!(first.handle(), second.handle());
    assert_eq!(job.body().runs.load(SeqCst), 1);
    assert_eq!(job.body().completions.load(SeqCst), 1);
    first.when_complete(|outcome| assert_eq!(outcome.result(), Some(&Some(1))));
}

struct Idle;

impl JobBody for Idle {
    type Output = ();

    fn name(&self) -> &str {
        "idle"
    }
}

#[test]
fn job_defaults() {
    let harness = Harness::new();
    let job = Job::new(Idle);
    let task = job.launch(&harness.executor);
    task.when_complete(|outcome| assert_eq!(outcome.result(), Some(&None)));
}

#[test]
fn group_cancels_subsets() {
    let harness = Harness::deferred();
    let group = TaskGroup::new();

    let first = harness.executor.run_in_background("first", |_| Ok(1));
    let second = harness.executor.run_in_background("second", |_| Ok(2));
    let third = harness.executor.run_in_background("third", |_| Ok(3));
    group.add(&first).add(&second).add_to_subset(&third, 1);

    assert_eq!(group.list_all().len(), 3);
    assert_eq!(group.list(0).len(), 2);
    assert_eq!(group.subsets(), vec![0, 1]);
    assert!(!group.all_complete());

    group.cancel(1);
    assert!(third.is_complete());
    assert!(!first.is_complete());
    assert_eq!(group.subsets(), vec![0]);
    assert!(group.is_complete(1));

    group.cancel_all();
    assert!(first.is_complete() && second.is_complete());
    assert!(group.list_all().is_empty());
    assert!(group.all_complete());
}

#[test]
fn group_forgets_completed_tasks() {
    let harness = Harness::deferred();
    let group = TaskGroup::new();

    let task = harness.executor.run_in_background("quick", |_| Ok(()));
    group.add(&task);
    assert!(group.list(0).contains(&task.handle()));

    harness.background.run_all();
    assert!(group.list_all().is_empty());

    // Already complete: removed right away
    group.add(&Task::success(()));
    assert!(group.subsets().is_empty());
}

#[test]
fn group_forgets_failed_tasks() {
    let harness = Harness::deferred();
    let group = TaskGroup::new();

    let failing: Task<()> = harness
        .executor
        .run_in_background("failing", |_| Err("no link".into()));
    let panicking: Task<()> = harness.executor.run_in_background("panicking", |_| panic!("boom"));
    group.add(&failing).add_to_subset(&panicking, 2);
    assert_eq!(group.list_all().len(), 2);

    harness.background.run_all();
    assert!(group.list_all().is_empty());
    assert!(group.subsets().is_empty());
    assert!(group.all_complete());
}
