use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::time::Duration as StdDuration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::error::Result;

const SCAVENGE_INTERVAL: StdDuration = StdDuration::from_secs(10);

struct Inner {
    to_process_queue: VecDeque<i64>,
    to_process_set: HashSet<i64>,
    processed: HashSet<i64>,
    failed: HashSet<i64>,
}

/// Three-set frontier of identifiers under traversal: queued for
/// processing, permanently done, and temporarily failed (retried by the
/// scavenger). An id lives in at most one set at a time.
pub struct IdPool {
    inner: Mutex<Inner>,
    notify: Notify,
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    mid_to_process: Vec<i64>,
    mid_processed: Vec<i64>,
    mid_failed: Vec<i64>,
}

impl Default for IdPool {
    fn default() -> Self {
        Self::new()
    }
}

impl IdPool {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                to_process_queue: VecDeque::new(),
                to_process_set: HashSet::new(),
                processed: HashSet::new(),
                failed: HashSet::new(),
            }),
            notify: Notify::new(),
        }
    }

    /// Adds ids not already present in any of the three sets to the
    /// to-process queue. Idempotent: an id already queued, done, or
    /// failed is left untouched.
    pub fn offer<I: IntoIterator<Item = i64>>(&self, ids: I) {
        let mut inner = self.inner.lock();
        let mut added = false;
        for id in ids {
            if inner.to_process_set.contains(&id)
                || inner.processed.contains(&id)
                || inner.failed.contains(&id)
            {
                continue;
            }
            inner.to_process_set.insert(id);
            inner.to_process_queue.push_back(id);
            added = true;
        }
        drop(inner);
        if added {
            self.notify.notify_waiters();
        }
    }

    /// Blocks until an id is queued, then pops and returns it. Registers
    /// notification interest before checking the queue to avoid a missed
    /// wakeup between a concurrent `offer` and this check.
    pub async fn pop(&self) -> i64 {
        loop {
            let notified = self.notify.notified();
            if let Some(id) = self.try_pop() {
                return id;
            }
            notified.await;
        }
    }

    fn try_pop(&self) -> Option<i64> {
        let mut inner = self.inner.lock();
        let id = inner.to_process_queue.pop_front()?;
        inner.to_process_set.remove(&id);
        Some(id)
    }

    /// Marks an id as permanently processed. Idempotent with respect to
    /// the to-process/failed sets: removing from either is a no-op if
    /// absent.
    pub fn mark_done(&self, id: i64) {
        let mut inner = self.inner.lock();
        if inner.to_process_set.remove(&id) {
            inner.to_process_queue.retain(|queued| *queued != id);
        }
        inner.failed.remove(&id);
        inner.processed.insert(id);
    }

    /// Marks an id as failed; the scavenger will re-offer it later.
    pub fn mark_failed(&self, id: i64) {
        let mut inner = self.inner.lock();
        if inner.processed.contains(&id) {
            return;
        }
        if inner.to_process_set.remove(&id) {
            inner.to_process_queue.retain(|queued| *queued != id);
        }
        inner.failed.insert(id);
    }

    /// Moves every currently failed id back onto the to-process queue.
    fn scavenge_once(&self) {
        let mut inner = self.inner.lock();
        let retry_ids: Vec<i64> = inner.failed.drain().collect();
        let mut moved = false;
        for id in retry_ids {
            if inner.to_process_set.insert(id) {
                inner.to_process_queue.push_back(id);
                moved = true;
            }
        }
        drop(inner);
        if moved {
            self.notify.notify_waiters();
        }
    }

    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&contents)?;
        let mut inner = self.inner.lock();
        inner.to_process_set = snapshot.mid_to_process.iter().copied().collect();
        inner.to_process_queue = snapshot.mid_to_process.into_iter().collect();
        inner.processed = snapshot.mid_processed.into_iter().collect();
        inner.failed = snapshot.mid_failed.into_iter().collect();
        Ok(())
    }

    pub fn dump<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let inner = self.inner.lock();
        let snapshot = Snapshot {
            mid_to_process: inner.to_process_queue.iter().copied().collect(),
            mid_processed: inner.processed.iter().copied().collect(),
            mid_failed: inner.failed.iter().copied().collect(),
        };
        drop(inner);
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }
}

/// Handle to the background scavenger task.
pub struct IdPoolScavengerHandle {
    task: JoinHandle<()>,
}

impl IdPoolScavengerHandle {
    pub fn spawn(pool: std::sync::Arc<IdPool>) -> Self {
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(SCAVENGE_INTERVAL);
            loop {
                interval.tick().await;
                pool.scavenge_once();
            }
        });
        Self { task }
    }

    pub fn stop(self) {
        self.task.abort();
    }
}
