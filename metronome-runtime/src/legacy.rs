use crate::error::Result;
use crate::notify::deprecation_notice;
use crate::timer::Timer;

use std::time::Duration;

/// Schedules a callback to be called once, after `delay_ms` milliseconds,
/// counted from [`start`](DelayedCallback::start).
#[deprecated(note = "use Timer::one_shot instead")]
pub struct DelayedCallback {
    timer: Timer,
}

#[allow(deprecated)]
impl DelayedCallback {
    /// Binds to the calling thread's loop. Emits a deprecation notice.
    pub fn new(callback: impl FnMut() + Send + 'static, delay_ms: u64) -> Result<Self> {
        deprecation_notice("DelayedCallback is deprecated. Use Timer::one_shot instead.");
        let timer = Timer::one_shot_on_current(Duration::from_millis(delay_ms), callback)?;
        Ok(Self { timer })
    }

    /// Starts the countdown.
    pub fn start(&self) {
        self.timer.start();
    }

    pub fn stop(&self) {
        self.timer.stop();
    }
}

/// Historical global-integration entry point. Loop selection needs no
/// special installation anymore; this only emits a deprecation notice.
#[deprecated(note = "no special loop integration is needed")]
pub fn install() {
    deprecation_notice("install() is deprecated. No special loop integration is needed.");
}
