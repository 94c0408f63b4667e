use crate::error::{LoopError, Result};

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Weak};
use std::thread::ThreadId;
use std::time::Instant;

mod std_loop;
mod tokio_loop;

pub use std_loop::StdLoop;
pub use tokio_loop::TokioLoop;

/// Identifies a concrete loop implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Current-thread Tokio runtime. Preferred when it can be built.
    Tokio,
    /// Plain-std condvar loop. Always available.
    Std,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Tokio => "tokio",
            BackendKind::Std => "std",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = LoopError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "tokio" => Ok(BackendKind::Tokio),
            "std" => Ok(BackendKind::Std),
            other => Err(LoopError::UnknownBackend(other.to_string())),
        }
    }
}

/// A callback registered with [`EventLoop::schedule_at`].
pub type ScheduledAction = Box<dyn FnOnce() + Send + 'static>;

/// The run/stop/schedule contract a loop backend must provide.
///
/// One thread owns and drives `run`; scheduled actions execute sequentially
/// on that thread, and a long-running action delays every later deadline on
/// the same loop. `schedule_at` and `stop` may be called from any thread.
pub trait EventLoop: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Clock used for all deadline arithmetic against this loop.
    fn now(&self) -> Instant {
        Instant::now()
    }

    /// Registers `action` to run at or after `deadline` on the loop thread.
    fn schedule_at(&self, deadline: Instant, action: ScheduledAction);

    /// Drives the loop until [`stop`](EventLoop::stop) is called.
    fn run(&self) -> Result<()>;

    /// Halts `run`. Non-blocking; actions already being dispatched finish.
    fn stop(&self);

    /// The thread this loop was resolved on.
    fn thread(&self) -> ThreadId;
}

/// Cloneable shared handle to a loop instance.
#[derive(Clone)]
pub struct LoopHandle {
    inner: Arc<dyn EventLoop>,
}

impl LoopHandle {
    pub fn new(inner: Arc<dyn EventLoop>) -> Self {
        Self { inner }
    }

    pub fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    pub fn now(&self) -> Instant {
        self.inner.now()
    }

    pub fn schedule_at(&self, deadline: Instant, action: ScheduledAction) {
        self.inner.schedule_at(deadline, action);
    }

    pub fn run(&self) -> Result<()> {
        self.inner.run()
    }

    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn thread(&self) -> ThreadId {
        self.inner.thread()
    }

    /// Whether two handles refer to the same loop instance.
    pub fn same_loop(&self, other: &LoopHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // Timers keep a non-owning back-reference to their loop; a handle held
    // inside a scheduled entry would keep the loop alive through its own
    // queue.
    pub(crate) fn downgrade(&self) -> Weak<dyn EventLoop> {
        Arc::downgrade(&self.inner)
    }
}

impl fmt::Debug for LoopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopHandle")
            .field("kind", &self.kind())
            .field("thread", &self.thread())
            .finish()
    }
}

/// Deadline-ordered queue entry. `seq` keeps dispatch FIFO among entries
/// sharing a deadline.
pub(crate) struct ScheduledEntry {
    pub(crate) deadline: Instant,
    pub(crate) seq: u64,
    pub(crate) action: ScheduledAction,
}

impl Eq for ScheduledEntry {}

impl PartialEq for ScheduledEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Ord for ScheduledEntry {
    // inverted so BinaryHeap pops the earliest deadline first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ScheduledEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
