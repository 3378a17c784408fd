//! Single background executor that drains a work queue of durable-write
//! actions, retrying failures up to a bound before dropping them.

use crossbeam_channel::{Receiver, Sender};
use tracing::warn;

pub const MAX_WORK_ATTEMPTS: u32 = 3;

/// A unit of durable-write work: a description for logging, an action to
/// run, and a count of attempts already made.
pub struct WorkItem {
    description: String,
    action: Box<dyn FnMut() -> anyhow::Result<()> + Send>,
    attempts: u32,
}

impl WorkItem {
    pub fn new(
        description: impl Into<String>,
        action: impl FnMut() -> anyhow::Result<()> + Send + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            action: Box::new(action),
            attempts: 0,
        }
    }
}

/// Handle to the running worker thread. Dropping every clone of the
/// enqueue side lets the worker thread observe a closed channel and exit;
/// for this crate the engine holds the sender for its entire lifetime.
#[derive(Clone)]
pub struct WorkQueue {
    sender: Sender<WorkItem>,
    receiver: Receiver<WorkItem>,
}

impl WorkQueue {
    pub fn start() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded::<WorkItem>();
        spawn_worker(sender.clone(), receiver.clone());
        Self { sender, receiver }
    }

    pub fn enqueue(&self, item: WorkItem) {
        // A send can only fail if every receiver has been dropped, which
        // only happens if the worker thread itself has panicked away.
        let _ = self.sender.send(item);
    }

    /// Number of items currently queued, used by `Sync` to poll for an
    /// empty queue.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn spawn_worker(sender: Sender<WorkItem>, receiver: Receiver<WorkItem>) {
    std::thread::spawn(move || {
        tracing::debug!("worker starting");
        for mut work in receiver.iter() {
            if let Err(e) = (work.action)() {
                work.attempts += 1;
                warn!(
                    description = %work.description,
                    error = %e,
                    attempt = work.attempts,
                    "work failed"
                );
                if work.attempts < MAX_WORK_ATTEMPTS {
                    let _ = sender.send(work);
                } else {
                    warn!(description = %work.description, "work hit max attempts");
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn successful_work_runs_once() {
        let queue = WorkQueue::start();
        let calls = Arc::new(AtomicUsize::new(0));

        let calls2 = calls.clone();
        queue.enqueue(WorkItem::new("noop", move || {
            calls2.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        wait_for_call_count(&calls, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_work_is_retried_then_dropped() {
        let queue = WorkQueue::start();
        let calls = Arc::new(AtomicUsize::new(0));

        let calls2 = calls.clone();
        queue.enqueue(WorkItem::new("always fails", move || {
            calls2.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("boom")
        }));

        wait_for_call_count(&calls, MAX_WORK_ATTEMPTS as usize);
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_WORK_ATTEMPTS as usize);
    }

    fn wait_for_call_count(calls: &AtomicUsize, expected: usize) {
        for _ in 0..200 {
            if calls.load(Ordering::SeqCst) >= expected {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("work did not complete in time");
    }
}
