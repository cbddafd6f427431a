//! Per-document debouncing.
//!
//! Each key has at most one scheduled task. Scheduling again before the
//! delay elapses cancels the earlier task, so a burst of edits runs the task
//! once, `delay` after the last edit. A task that already started is left
//! to finish, and `flush` waits for it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use tuginspect_core::DocumentKey;

struct Scheduled {
    generation: u64,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Slots {
    next_generation: u64,
    scheduled: HashMap<DocumentKey, Scheduled>,
    /// Replaced or cancelled tasks that may still be running.
    retired: Vec<JoinHandle<()>>,
}

impl Slots {
    fn retire(&mut self, scheduled: Scheduled) {
        scheduled.cancel.cancel();
        self.retired.retain(|handle| !handle.is_finished());
        self.retired.push(scheduled.handle);
    }
}

#[derive(Clone)]
pub struct Debouncer {
    delay: Duration,
    slots: Arc<Mutex<Slots>>,
}

fn lock(slots: &Mutex<Slots>) -> MutexGuard<'_, Slots> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            slots: Arc::new(Mutex::new(Slots::default())),
        }
    }

    /// Run `task` for `key` after the delay unless rescheduled first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, key: DocumentKey, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slots = lock(&self.slots);
        slots.next_generation += 1;
        let generation = slots.next_generation;
        let cancel = CancellationToken::new();

        let delay = self.delay;
        let token = cancel.clone();
        let shared = Arc::clone(&self.slots);
        let owner = key.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            task.await;
            let mut slots = lock(&shared);
            if slots.scheduled.get(&owner).map(|s| s.generation) == Some(generation) {
                slots.scheduled.remove(&owner);
            }
        });

        if let Some(previous) = slots.scheduled.insert(
            key,
            Scheduled {
                generation,
                cancel,
                handle,
            },
        ) {
            slots.retire(previous);
        }
    }

    /// Cancel the task scheduled for `key`, if any. A task already running
    /// is not interrupted.
    pub fn cancel(&self, key: &DocumentKey) -> bool {
        let mut slots = lock(&self.slots);
        match slots.scheduled.remove(key) {
            Some(scheduled) => {
                slots.retire(scheduled);
                true
            }
            None => false,
        }
    }

    /// Number of keys with a task waiting or running.
    pub fn pending(&self) -> usize {
        lock(&self.slots).scheduled.len()
    }

    /// Wait until every task scheduled so far has run.
    pub async fn flush(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut slots = lock(&self.slots);
            let mut handles: Vec<JoinHandle<()>> = slots.retired.drain(..).collect();
            handles.extend(slots.scheduled.drain().map(|(_, scheduled)| scheduled.handle));
            handles
        };
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("debounced task failed: {}", e);
            }
        }
    }
}
