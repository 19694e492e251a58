//! # Task groups
//!
//! A [TaskGroup] keeps track of pending tasks, sorted in subsets, so that they can be canceled together. Tasks
//! leave the group on their own when they complete; subsets left empty are pruned.
//!
//! The group does not own its tasks' work, only handles on them, and tasks only keep a weak reference back to
//! the group.

use super::lock;
use super::task::{Task, TaskHandle};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, Weak};

/// Subset used by [TaskGroup::add]
pub const DEFAULT_SUBSET: u32 = 0;

type Subsets = BTreeMap<u32, Vec<TaskHandle>>;

/// # Group of pending tasks
///
/// All methods must be called from the main thread, like the [Task] methods they rely on.
#[derive(Clone, Default)]
pub struct TaskGroup {
    subsets: Arc<Mutex<Subsets>>,
}

impl TaskGroup {
    /// Create an empty group
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task to the default subset
    pub fn add<T: Send + Sync + 'static>(&self, task: &Task<T>) -> &Self {
        self.add_to_subset(task, DEFAULT_SUBSET)
    }

    /// Add a task to the given subset.
    ///
    /// The task is removed from the group once it completes. A task that already completed is removed right
    /// away.
    pub fn add_to_subset<T: Send + Sync + 'static>(&self, task: &Task<T>, subset: u32) -> &Self {
        let handle = task.handle();
        {
            let mut subsets = lock(&self.subsets);
            let members = subsets.entry(subset).or_default();
            if !members.contains(&handle) {
                members.push(handle.clone());
            }
        }

        let group = Arc::downgrade(&self.subsets);
        task.when_complete(move |_| remove(&group, subset, &handle));
        self
    }

    /// Cancel all pending tasks of a subset
    pub fn cancel(&self, subset: u32) {
        // Canceling completes the task, which removes it from the subset under our feet
        let snapshot = lock(&self.subsets).get(&subset).cloned().unwrap_or_default();
        for task in snapshot {
            task.cancel();
        }
    }

    /// Cancel all pending tasks of all subsets
    pub fn cancel_all(&self) {
        let subsets: Vec<u32> = lock(&self.subsets).keys().copied().collect();
        for subset in subsets {
            self.cancel(subset);
        }
    }

    /// Snapshot of the pending tasks of a subset
    pub fn list(&self, subset: u32) -> HashSet<TaskHandle> {
        lock(&self.subsets)
            .get(&subset)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of the pending tasks of all subsets
    pub fn list_all(&self) -> HashSet<TaskHandle> {
        lock(&self.subsets).values().flatten().cloned().collect()
    }

    /// True if no task of the subset is pending
    pub fn is_complete(&self, subset: u32) -> bool {
        self.list(subset).iter().all(TaskHandle::is_complete)
    }

    /// True if no task of any subset is pending
    pub fn all_complete(&self) -> bool {
        self.list_all().iter().all(TaskHandle::is_complete)
    }

    /// Identifiers of the subsets that still hold pending tasks
    pub fn subsets(&self) -> Vec<u32> {
        lock(&self.subsets).keys().copied().collect()
    }
}

fn remove(group: &Weak<Mutex<Subsets>>, subset: u32, task: &TaskHandle) {
    let Some(group) = group.upgrade() else {
        return;
    };
    let mut subsets = lock(&group);
    if let Some(members) = subsets.get_mut(&subset) {
        members.retain(|member| member != task);
        if members.is_empty() {
            subsets.remove(&subset);
        }
    }
}
