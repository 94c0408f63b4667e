use super::{BackendKind, EventLoop, LoopHandle, ScheduledAction, ScheduledEntry};
use crate::backend::{BackendCandidate, LOOP_BACKENDS};
use crate::error::{LoopError, Result};

use linkme::distributed_slice;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Instant;
use tokio::sync::Notify;

#[distributed_slice(LOOP_BACKENDS)]
static TOKIO_BACKEND: BackendCandidate = BackendCandidate {
    kind: BackendKind::Tokio,
    rank: 0,
    available: TokioLoop::available,
    construct: construct,
};

fn construct() -> Result<LoopHandle> {
    Ok(LoopHandle::new(Arc::new(TokioLoop::new()?)))
}

/// Loop backend driving a current-thread Tokio runtime.
///
/// Scheduled actions live in a deadline heap; the driver sleeps on the Tokio
/// timer until the earliest deadline, or until a registration from another
/// thread wakes it.
pub struct TokioLoop {
    runtime: tokio::runtime::Runtime,
    queue: Mutex<BinaryHeap<ScheduledEntry>>,
    seq: AtomicU64,
    notify: Notify,
    stopped: AtomicBool,
    thread: ThreadId,
}

impl TokioLoop {
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| LoopError::Backend {
                kind: BackendKind::Tokio,
                reason: e.to_string(),
            })?;

        Ok(Self {
            runtime,
            queue: Mutex::new(BinaryHeap::new()),
            seq: AtomicU64::new(0),
            notify: Notify::new(),
            stopped: AtomicBool::new(false),
            thread: thread::current().id(),
        })
    }

    /// Availability probe: a current-thread runtime must be constructible.
    pub fn available() -> bool {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .is_ok()
    }

    fn take_due(&self) -> (Vec<ScheduledAction>, Option<Instant>) {
        let mut queue = self.queue.lock().unwrap();
        let now = Instant::now();
        let mut due = Vec::new();
        while queue.peek().is_some_and(|entry| entry.deadline <= now) {
            due.push(queue.pop().unwrap().action);
        }
        (due, queue.peek().map(|entry| entry.deadline))
    }
}

impl EventLoop for TokioLoop {
    fn kind(&self) -> BackendKind {
        BackendKind::Tokio
    }

    fn schedule_at(&self, deadline: Instant, action: ScheduledAction) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.queue.lock().unwrap().push(ScheduledEntry {
            deadline,
            seq,
            action,
        });
        self.notify.notify_one();
    }

    fn run(&self) -> Result<()> {
        self.stopped.store(false, Ordering::SeqCst);
        self.runtime.block_on(async {
            loop {
                if self.stopped.load(Ordering::SeqCst) {
                    break;
                }

                let (due, next) = self.take_due();
                if !due.is_empty() {
                    // Actions run with no lock held; a re-registration lands
                    // in the heap and is picked up on the next pass.
                    for action in due {
                        action();
                    }
                    continue;
                }

                match next {
                    Some(deadline) => {
                        tokio::select! {
                            _ = tokio::time::sleep_until(deadline.into()) => {}
                            _ = self.notify.notified() => {}
                        }
                    }
                    None => self.notify.notified().await,
                }
            }
        });
        Ok(())
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    fn thread(&self) -> ThreadId {
        self.thread
    }
}
