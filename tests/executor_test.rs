// Executor lifecycle, default schedulers and configuration

mod common;

use common::{init_logger, Harness};
use groundsdk_core::tasks::{
    BackgroundScheduler, CancelToken, MainLoop, MainThreadScheduler, PostPolicy, Runnable, ThreadPoolScheduler, Work,
};
use groundsdk_core::{Error, Executor, SdkConfig};
use std::sync::atomic::{AtomicUsize, Ordering::SeqCst};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn counter_runnable(name: &str, counter: &Arc<AtomicUsize>) -> Runnable {
    let counter = counter.clone();
    Runnable::new(name, move || {
        counter.fetch_add(1, SeqCst);
    })
}

#[tokio::test(start_paused = true)]
async fn looper_runs_delayed_runnables() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let (main_loop, scheduler) = MainLoop::new()?;
    let fired = Arc::new(AtomicUsize::new(0));

    scheduler.schedule(counter_runnable("later", &fired), Duration::from_secs(5))?;
    let canceled = scheduler.schedule(counter_runnable("canceled", &fired), Duration::from_secs(1))?;
    assert!(scheduler.cancel(canceled));
    assert!(!scheduler.cancel(canceled));

    assert!(main_loop.turn().await);
    assert_eq!(fired.load(SeqCst), 1);

    let mut dump = String::new();
    scheduler.dump(&mut dump);
    assert_eq!(dump, "Main scheduler: \n\tPending runnables:0\n");
    Ok(())
}

#[tokio::test]
async fn looper_post_policies() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let (main_loop, scheduler) = MainLoop::new()?;
    let ran = Arc::new(AtomicUsize::new(0));

    scheduler.post(counter_runnable("inline", &ran), PostPolicy::Run)?;
    assert_eq!(ran.load(SeqCst), 1);

    scheduler.post(counter_runnable("queued", &ran), PostPolicy::Post)?;
    assert_eq!(ran.load(SeqCst), 1);
    assert_eq!(main_loop.run_pending(), 1);
    assert_eq!(ran.load(SeqCst), 2);

    // Posts from other threads are always queued
    let remote = scheduler.clone();
    let runnable = counter_runnable("remote", &ran);
    thread::spawn(move || remote.post(runnable, PostPolicy::Deny)).join().unwrap()?;
    assert_eq!(main_loop.run_pending(), 1);
    assert_eq!(ran.load(SeqCst), 3);

    scheduler.shutdown();
    assert!(!main_loop.turn().await);
    assert!(matches!(
        scheduler.post(counter_runnable("late", &ran), PostPolicy::Post),
        Err(Error::SchedulerShutdown)
    ));
    Ok(())
}

#[test]
fn looper_requires_runtime() {
    assert!(matches!(MainLoop::new(), Err(Error::NoRuntime)));
}

#[tokio::test]
async fn executor_runs_background_work() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let config = SdkConfig::from_json(r#"{ "worker_name_prefix": "test-bg" }"#)?;
    let (executor, main_loop) = Executor::start(&config)?;
    assert!(executor.is_main_thread());

    let task = executor.run_in_background("thread name", |_| {
        Ok(thread::current().name().map(str::to_owned))
    });
    let completion = task.completion();

    // Completion is posted to the main loop
    assert!(main_loop.turn().await);
    assert!(task.is_complete());
    let outcome = completion.await.ok_or("task dropped")?;
    let name = outcome.result().cloned().flatten().unwrap_or_default();
    assert!(name.starts_with("test-bg-"), "unexpected worker name {}", name);

    executor.dispose();
    assert!(executor.is_disposed());
    Ok(())
}

#[tokio::test]
async fn executor_dump() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let (executor, _main_loop) = Executor::start(&SdkConfig::default())?;

    let mut help = String::new();
    executor.dump(&mut help, &[]);
    assert_eq!(help, "\t--executor: dumps executor info\n");
    let mut help = String::new();
    executor.dump(&mut help, &["--help"]);
    assert_eq!(help, "\t--executor: dumps executor info\n");

    let mut dump = String::new();
    executor.dump(&mut dump, &["--executor"]);
    assert!(dump.starts_with("Background scheduler: \n"));
    assert!(dump.contains("Main scheduler: \n"));

    let mut other = String::new();
    executor.dump(&mut other, &["--other"]);
    assert!(other.is_empty());

    executor.dispose();
    let mut dump = String::new();
    executor.dump(&mut dump, &["--all"]);
    assert_eq!(dump, "Background scheduler inactive\nForeground scheduler inactive\n");
    Ok(())
}

#[test]
#[should_panic(expected = "Already on main thread")]
fn deny_policy_panics_on_main_thread() {
    let harness = Harness::new();
    let _ = harness.executor.post_on_main_thread(Runnable::new("denied", || ()));
}

#[test]
fn main_thread_checks() {
    let harness = Harness::new();
    harness.executor.require_main_thread();

    let executor = harness.executor.clone();
    let result = thread::spawn(move || executor.require_main_thread()).join();
    assert!(result.is_err());

    let executor = harness.executor.clone();
    assert!(!thread::spawn(move || executor.is_main_thread()).join().unwrap());
}

#[test]
fn thread_pool_runs_and_shuts_down() {
    init_logger();
    let pool = ThreadPoolScheduler::new();
    let (tx, rx) = flume::unbounded();

    let sender = tx.clone();
    pool.submit(Work::new("ping", CancelToken::new(), move || {
        let _ = sender.send("ping");
    }))
    .unwrap();
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok("ping"));
    assert!(pool.worker_count() >= 1);

    pool.shutdown();
    let token = CancelToken::new();
    let aborted = token.clone();
    let result = pool.submit(Work::new("late", token, move || {
        let _ = tx.send(if aborted.is_canceled() { "aborted" } else { "ran" });
    }));
    assert!(matches!(result, Err(Error::SchedulerShutdown)));
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok("aborted"));
}

#[cfg(target_os = "linux")]
fn thread_niceness() -> i32 {
    let stat = std::fs::read_to_string("/proc/thread-self/stat").unwrap();
    // Fields after the command name start with the state, the nice value is the 17th of them
    let fields = &stat[stat.rfind(')').unwrap() + 1..];
    fields.split_whitespace().nth(16).unwrap().parse().unwrap()
}

#[cfg(target_os = "linux")]
#[test]
fn thread_pool_lowers_worker_priority() {
    use groundsdk_core::tasks::pool::WORKER_NICE_INCREMENT;

    init_logger();
    let main_niceness = thread_niceness();
    let pool = ThreadPoolScheduler::new();
    let (tx, rx) = flume::unbounded();
    pool.submit(Work::new("niceness", CancelToken::new(), move || {
        let _ = tx.send(thread_niceness());
    }))
    .unwrap();

    let worker_niceness = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(worker_niceness, (main_niceness + WORKER_NICE_INCREMENT).min(19));
    // The submitting thread keeps its priority
    assert_eq!(thread_niceness(), main_niceness);
    pool.shutdown();
}

#[test]
fn thread_pool_keep_alive() {
    init_logger();
    let config = SdkConfig {
        worker_keep_alive_ms: 50,
        ..SdkConfig::default()
    };
    let pool = ThreadPoolScheduler::with_config(&config);
    let (tx, rx) = flume::unbounded();
    pool.submit(Work::new("short", CancelToken::new(), move || {
        let _ = tx.send(());
    }))
    .unwrap();
    rx.recv_timeout(Duration::from_secs(5)).unwrap();

    // Idle worker exits after the keep-alive delay
    let mut waited = Duration::ZERO;
    while pool.worker_count() > 0 && waited < Duration::from_secs(5) {
        thread::sleep(Duration::from_millis(10));
        waited += Duration::from_millis(10);
    }
    assert_eq!(pool.worker_count(), 0);
}

#[test]
fn config_defaults_and_validation() {
    let config = SdkConfig::default();
    assert_eq!(config.setting_timeout(), Duration::from_secs(5));
    assert_eq!(config.worker_keep_alive(), Duration::from_secs(60));
    assert_eq!(config.worker_name_prefix, "groundsdk-bg");
    assert_eq!(config.max_workers, 0);

    assert_eq!(SdkConfig::from_json("{}").unwrap(), config);
    assert!(matches!(
        SdkConfig::from_json(r#"{ "worker_name_prefix": " " }"#),
        Err(Error::Config(_))
    ));
    assert!(matches!(SdkConfig::from_json("not json"), Err(Error::Config(_))));

    let json = serde_json::to_string(&SdkConfig { max_workers: 4, ..config }).unwrap();
    assert_eq!(SdkConfig::from_json(&json).unwrap().max_workers, 4);
}
