use super::{BackendKind, EventLoop, LoopHandle, ScheduledAction, ScheduledEntry};
use crate::backend::{BackendCandidate, LOOP_BACKENDS};
use crate::error::Result;

use linkme::distributed_slice;
use std::collections::BinaryHeap;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, ThreadId};
use std::time::Instant;

#[distributed_slice(LOOP_BACKENDS)]
static STD_BACKEND: BackendCandidate = BackendCandidate {
    kind: BackendKind::Std,
    rank: 1,
    available: always_available,
    construct: construct,
};

fn always_available() -> bool {
    true
}

fn construct() -> Result<LoopHandle> {
    Ok(LoopHandle::new(Arc::new(StdLoop::new())))
}

/// Fallback loop backend built on a condvar, used when the preferred
/// backend cannot be constructed.
pub struct StdLoop {
    state: Mutex<State>,
    condvar: Condvar,
    thread: ThreadId,
}

struct State {
    queue: BinaryHeap<ScheduledEntry>,
    seq: u64,
    stopped: bool,
}

impl StdLoop {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                queue: BinaryHeap::new(),
                seq: 0,
                stopped: false,
            }),
            condvar: Condvar::new(),
            thread: thread::current().id(),
        }
    }
}

impl Default for StdLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop for StdLoop {
    fn kind(&self) -> BackendKind {
        BackendKind::Std
    }

    fn schedule_at(&self, deadline: Instant, action: ScheduledAction) {
        let mut state = self.state.lock().unwrap();
        let seq = state.seq;
        state.seq += 1;
        state.queue.push(ScheduledEntry {
            deadline,
            seq,
            action,
        });
        self.condvar.notify_one();
    }

    fn run(&self) -> Result<()> {
        self.state.lock().unwrap().stopped = false;
        loop {
            let mut state = self.state.lock().unwrap();
            if state.stopped {
                break;
            }

            let now = Instant::now();
            let mut due = Vec::new();
            while state.queue.peek().is_some_and(|entry| entry.deadline <= now) {
                due.push(state.queue.pop().unwrap().action);
            }

            if !due.is_empty() {
                drop(state);
                for action in due {
                    action();
                }
                continue;
            }

            match state.queue.peek().map(|entry| entry.deadline) {
                Some(deadline) => {
                    let timeout = deadline.saturating_duration_since(now);
                    let (guard, _) = self.condvar.wait_timeout(state, timeout).unwrap();
                    drop(guard);
                }
                None => {
                    drop(self.condvar.wait(state).unwrap());
                }
            }
        }
        Ok(())
    }

    fn stop(&self) {
        self.state.lock().unwrap().stopped = true;
        self.condvar.notify_all();
    }

    fn thread(&self) -> ThreadId {
        self.thread
    }
}
