use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

/// How many files of the current batch have finished processing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.current >= self.total
    }
}

/// Lock-free completion counter, published on a watch channel.
///
/// Observers only ever see `current` grow between resets, whatever order
/// concurrent completions land in.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    completed: Arc<AtomicUsize>,
    sender: Arc<watch::Sender<Progress>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Progress::default());
        Self {
            completed: Arc::new(AtomicUsize::new(0)),
            sender: Arc::new(sender),
        }
    }

    /// Start a new batch of `total` files.
    pub fn reset(&self, total: usize) {
        self.completed.store(0, Ordering::SeqCst);
        self.sender.send_replace(Progress { current: 0, total });
    }

    /// Record one finished file and return the published progress.
    pub fn increment(&self) -> Progress {
        let current = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        self.sender.send_modify(|progress| {
            progress.current = progress.current.max(current);
        });
        *self.sender.borrow()
    }

    pub fn snapshot(&self) -> Progress {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.sender.subscribe()
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
