use crate::error::Result;
use crate::event_loop::{EventLoop, LoopHandle};
use crate::registry;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};
use tracing::error;

/// Floor applied to every timer interval. Keeps a zero or negative caller
/// value from busy-looping the owning loop.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    /// Fires once, then the timer is inert until started again.
    OneShot,
    /// Fires every interval until stopped.
    Periodic,
}

pub type TimerCallback = Box<dyn FnMut() + Send + 'static>;

struct TimerState {
    running: bool,
    // Bumped by every start; a dispatch carrying an older generation is
    // stale and must not execute.
    generation: u64,
    next_deadline: Instant,
}

struct Inner {
    callback: Mutex<TimerCallback>,
    state: Mutex<TimerState>,
    interval: Duration,
    mode: TimerMode,
    // Non-owning: a strong handle here would keep the loop alive through
    // its own timer queue while a dispatch is pending.
    event_loop: Weak<dyn EventLoop>,
}

/// A one-shot or periodic callback scheduled against an event loop.
///
/// Construction schedules nothing; [`start`](Timer::start) registers the
/// first firing. The periodic schedule advances from the previous deadline
/// rather than from the current time, so a slow callback does not drag
/// every later firing behind wall-clock time.
#[derive(Clone)]
pub struct Timer {
    inner: Arc<Inner>,
}

impl Timer {
    /// A timer that fires `callback` once after `delay`.
    pub fn one_shot(
        event_loop: &LoopHandle,
        delay: Duration,
        callback: impl FnMut() + Send + 'static,
    ) -> Timer {
        Self::new(event_loop, delay, TimerMode::OneShot, Box::new(callback))
    }

    /// A timer that fires `callback` every `interval` until stopped.
    pub fn periodic(
        event_loop: &LoopHandle,
        interval: Duration,
        callback: impl FnMut() + Send + 'static,
    ) -> Timer {
        Self::new(event_loop, interval, TimerMode::Periodic, Box::new(callback))
    }

    /// Like [`one_shot`](Timer::one_shot), bound to the calling thread's
    /// loop. Fails when no backend can be resolved.
    pub fn one_shot_on_current(
        delay: Duration,
        callback: impl FnMut() + Send + 'static,
    ) -> Result<Timer> {
        Ok(Self::one_shot(&registry::current()?, delay, callback))
    }

    /// Like [`periodic`](Timer::periodic), bound to the calling thread's
    /// loop. Fails when no backend can be resolved.
    pub fn periodic_on_current(
        interval: Duration,
        callback: impl FnMut() + Send + 'static,
    ) -> Result<Timer> {
        Ok(Self::periodic(&registry::current()?, interval, callback))
    }

    fn new(
        event_loop: &LoopHandle,
        interval: Duration,
        mode: TimerMode,
        callback: TimerCallback,
    ) -> Timer {
        Timer {
            inner: Arc::new(Inner {
                callback: Mutex::new(callback),
                state: Mutex::new(TimerState {
                    running: false,
                    generation: 0,
                    next_deadline: event_loop.now(),
                }),
                interval: interval.max(MIN_INTERVAL),
                mode,
                event_loop: event_loop.downgrade(),
            }),
        }
    }

    /// Registers the first firing at `now + interval`. A no-op while the
    /// timer is already running, or after the owning loop has gone away.
    pub fn start(&self) {
        let Some(event_loop) = self.inner.event_loop.upgrade() else {
            return;
        };
        let (deadline, generation) = {
            let mut state = self.inner.state.lock().unwrap();
            if state.running {
                return;
            }
            state.running = true;
            state.generation += 1;
            state.next_deadline = event_loop.now() + self.inner.interval;
            (state.next_deadline, state.generation)
        };
        Inner::schedule(&self.inner, &event_loop, deadline, generation);
    }

    /// Marks the timer stopped. Best-effort: a dispatch already handed to
    /// the loop is suppressed by the staleness check inside firing, not
    /// cancelled here.
    pub fn stop(&self) {
        self.inner.state.lock().unwrap().running = false;
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.lock().unwrap().running
    }

    /// The effective interval after clamping.
    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    pub fn mode(&self) -> TimerMode {
        self.inner.mode
    }
}

impl Inner {
    fn schedule(this: &Arc<Inner>, event_loop: &Arc<dyn EventLoop>, deadline: Instant, generation: u64) {
        let inner = Arc::clone(this);
        event_loop.schedule_at(deadline, Box::new(move || Inner::fire(&inner, generation)));
    }

    fn fire(this: &Arc<Inner>, generation: u64) {
        {
            let mut state = this.state.lock().unwrap();
            if !state.running || state.generation != generation {
                // Stale dispatch from a stopped or restarted timer.
                return;
            }
            match this.mode {
                TimerMode::OneShot => {
                    // Cleared before the callback runs so re-entrant
                    // inspection sees the timer as finished.
                    state.running = false;
                }
                TimerMode::Periodic => {
                    let Some(event_loop) = this.event_loop.upgrade() else {
                        state.running = false;
                        return;
                    };
                    let now = event_loop.now();
                    let mut next = state.next_deadline;
                    while next <= now {
                        next += this.interval;
                    }
                    state.next_deadline = next;
                    drop(state);
                    // Re-register before invoking, so a slow or failing
                    // callback cannot delay the next registration.
                    Self::schedule(this, &event_loop, next, generation);
                }
            }
        }
        this.invoke();
    }

    fn invoke(&self) {
        let mut callback = self.callback.lock().unwrap();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (*callback)()));
        if let Err(payload) = outcome {
            error!(cause = panic_message(&payload), "timer callback failed");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_loop::{BackendKind, EventLoop, ScheduledAction};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread::{self, ThreadId};

    /// Loop double with a manually advanced clock. Scheduled actions are
    /// held until the test pumps them.
    struct FakeLoop {
        now: Mutex<Instant>,
        scheduled: Mutex<Vec<(Instant, ScheduledAction)>>,
        thread: ThreadId,
    }

    impl FakeLoop {
        fn handle() -> (LoopHandle, Arc<FakeLoop>) {
            let fake = Arc::new(FakeLoop {
                now: Mutex::new(Instant::now()),
                scheduled: Mutex::new(Vec::new()),
                thread: thread::current().id(),
            });
            (LoopHandle::new(fake.clone()), fake)
        }

        fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }

        /// Runs every action whose deadline has passed; returns how many ran.
        fn pump(&self) -> usize {
            let now = *self.now.lock().unwrap();
            let due: Vec<ScheduledAction> = {
                let mut scheduled = self.scheduled.lock().unwrap();
                let mut due = Vec::new();
                let mut pending = Vec::new();
                for (deadline, action) in scheduled.drain(..) {
                    if deadline <= now {
                        due.push(action);
                    } else {
                        pending.push((deadline, action));
                    }
                }
                *scheduled = pending;
                due
            };
            let count = due.len();
            for action in due {
                action();
            }
            count
        }

        fn pending_deadlines(&self) -> Vec<Instant> {
            self.scheduled
                .lock()
                .unwrap()
                .iter()
                .map(|(deadline, _)| *deadline)
                .collect()
        }
    }

    impl EventLoop for FakeLoop {
        fn kind(&self) -> BackendKind {
            BackendKind::Std
        }

        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }

        fn schedule_at(&self, deadline: Instant, action: ScheduledAction) {
            self.scheduled.lock().unwrap().push((deadline, action));
        }

        fn run(&self) -> Result<()> {
            Ok(())
        }

        fn stop(&self) {}

        fn thread(&self) -> ThreadId {
            self.thread
        }
    }

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let cloned = count.clone();
        (count, move || {
            cloned.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn zero_interval_clamps_to_floor() {
        let (handle, _) = FakeLoop::handle();
        let timer = Timer::periodic(&handle, Duration::ZERO, || {});
        assert_eq!(timer.interval(), MIN_INTERVAL);

        let timer = Timer::one_shot(&handle, Duration::ZERO, || {});
        assert_eq!(timer.interval(), MIN_INTERVAL);
    }

    #[test]
    fn construction_schedules_nothing() {
        let (handle, fake) = FakeLoop::handle();
        let _timer = Timer::periodic(&handle, Duration::from_millis(10), || {});
        assert!(fake.pending_deadlines().is_empty());
    }

    #[test]
    fn one_shot_fires_exactly_once() {
        let (handle, fake) = FakeLoop::handle();
        let (count, callback) = counter();
        let timer = Timer::one_shot(&handle, Duration::from_millis(10), callback);

        timer.start();
        assert!(timer.is_running());
        assert_eq!(fake.pending_deadlines().len(), 1);

        fake.advance(Duration::from_millis(10));
        assert_eq!(fake.pump(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!timer.is_running());

        // Nothing left in the queue and nothing new gets registered.
        fake.advance(Duration::from_millis(100));
        assert_eq!(fake.pump(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(fake.pending_deadlines().is_empty());
    }

    #[test]
    fn periodic_fires_on_a_fixed_grid() {
        let (handle, fake) = FakeLoop::handle();
        let (count, callback) = counter();
        let interval = Duration::from_millis(10);
        let timer = Timer::periodic(&handle, interval, callback);

        let t0 = fake.now();
        timer.start();
        for firing in 1..=5u32 {
            assert_eq!(fake.pending_deadlines(), vec![t0 + interval * firing]);
            fake.advance(interval);
            assert_eq!(fake.pump(), 1);
            assert_eq!(count.load(Ordering::SeqCst), firing as usize);
        }
        assert!(timer.is_running());

        timer.stop();
        fake.advance(interval);
        fake.pump();
        assert_eq!(count.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn overrun_skips_missed_intervals_without_drifting() {
        let (handle, fake) = FakeLoop::handle();
        let (count, callback) = counter();
        let interval = Duration::from_millis(10);
        let timer = Timer::periodic(&handle, interval, callback);

        let t0 = fake.now();
        timer.start();

        // The loop gets around to the first dispatch 35ms late.
        fake.advance(Duration::from_millis(35));
        assert_eq!(fake.pump(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Deadlines 20ms and 30ms were missed; the next one is back on the
        // original grid at t0+40ms.
        assert_eq!(fake.pending_deadlines(), vec![t0 + Duration::from_millis(40)]);
    }

    #[test]
    fn panicking_callback_does_not_stop_the_schedule() {
        let (handle, fake) = FakeLoop::handle();
        let count = Arc::new(AtomicUsize::new(0));
        let cloned = count.clone();
        let interval = Duration::from_millis(10);
        let timer = Timer::periodic(&handle, interval, move || {
            if cloned.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first firing fails");
            }
        });

        timer.start();
        fake.advance(interval);
        assert_eq!(fake.pump(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(timer.is_running());

        // The firing after the failure still happens on schedule.
        assert_eq!(fake.pending_deadlines().len(), 1);
        fake.advance(interval);
        assert_eq!(fake.pump(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn stop_before_dispatch_executes_is_a_silent_no_op() {
        let (handle, fake) = FakeLoop::handle();
        let (count, callback) = counter();
        let timer = Timer::one_shot(&handle, Duration::from_millis(10), callback);

        timer.start();
        fake.advance(Duration::from_millis(10));
        // The dispatch is due but the timer stops before the loop runs it.
        timer.stop();
        assert_eq!(fake.pump(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn restart_after_stop_ignores_the_stale_dispatch() {
        let (handle, fake) = FakeLoop::handle();
        let (count, callback) = counter();
        let interval = Duration::from_millis(10);
        let timer = Timer::periodic(&handle, interval, callback);

        timer.start();
        timer.stop();
        timer.start();
        // Two entries queued: the stale one and the live one.
        assert_eq!(fake.pending_deadlines().len(), 2);

        fake.advance(interval);
        fake.pump();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(fake.pending_deadlines().len(), 1);
    }

    #[test]
    fn start_while_running_is_a_no_op() {
        let (handle, fake) = FakeLoop::handle();
        let (count, callback) = counter();
        let timer = Timer::periodic(&handle, Duration::from_millis(10), callback);

        timer.start();
        timer.start();
        assert_eq!(fake.pending_deadlines().len(), 1);

        fake.advance(Duration::from_millis(10));
        assert_eq!(fake.pump(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callback_may_stop_its_own_timer() {
        let (handle, fake) = FakeLoop::handle();
        let timer_slot: Arc<Mutex<Option<Timer>>> = Arc::new(Mutex::new(None));
        let slot = timer_slot.clone();
        let (count, mut callback) = counter();
        let timer = Timer::periodic(&handle, Duration::from_millis(10), move || {
            callback();
            if let Some(timer) = slot.lock().unwrap().as_ref() {
                timer.stop();
            }
        });
        *timer_slot.lock().unwrap() = Some(timer.clone());

        timer.start();
        fake.advance(Duration::from_millis(10));
        fake.pump();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!timer.is_running());

        // The already re-registered entry is stale once stopped.
        fake.advance(Duration::from_millis(10));
        fake.pump();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
