//! # Setting change streams
//!
//! [ChangeWatchers] turns setting change notifications into [futures] streams, for async consumers that do not
//! want to register a callback. Each item is the `from_user` flag of the notification.

use super::controller::ChangeListener;
use crate::tasks::lock;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use std::sync::{Arc, Mutex};

/// Fan-out of change notifications to any number of streams
#[derive(Clone, Default)]
pub struct ChangeWatchers {
    watchers: Arc<Mutex<Vec<UnboundedSender<bool>>>>,
}

impl ChangeWatchers {
    /// Create a fan-out with no watcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Watch changes
    ///
    /// Returns a stream that yields the `from_user` flag of every change notified after this call. The stream
    /// ends when the [ChangeWatchers] and all its clones are dropped.
    pub fn watch(&self) -> UnboundedReceiver<bool> {
        let (tx, rx) = mpsc::unbounded();
        lock(&self.watchers).push(tx);
        rx
    }

    /// Send a change notification to all watchers
    pub fn notify(&self, from_user: bool) {
        // Drop watchers whose stream is gone
        lock(&self.watchers).retain(|watcher| watcher.unbounded_send(from_user).is_ok());
    }

    /// Number of live watchers
    pub fn len(&self) -> usize {
        lock(&self.watchers).len()
    }

    /// True if nobody watches
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Change listener that forwards to this fan-out, to hand to a
    /// [SettingController](crate::settings::SettingController)
    pub fn listener(&self) -> ChangeListener {
        let watchers = self.clone();
        Arc::new(move |from_user| watchers.notify(from_user))
    }
}
