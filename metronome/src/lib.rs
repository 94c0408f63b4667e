//! # Metronome - Shared Event Loop with Timer Scheduling for Rust
//!
//! This library provides a minimal single-threaded event loop with one-shot
//! and periodic timers, plus a per-thread singleton so unrelated parts of a
//! program can share one loop without explicit wiring.
//!
//! ## Features
//!
//! - **One-shot timers**: Run a callback once after a delay
//! - **Periodic timers**: Run a callback at a fixed interval; the schedule
//!   advances from the previous deadline, so it does not drift
//! - **Failure isolation**: A panicking callback is logged and contained;
//!   it never takes the shared loop down
//! - **Pluggable backends**: The concrete loop implementation is chosen at
//!   first use from an ordered candidate table, with a fallback when the
//!   preferred one is unavailable
//! - **Singleton registry**: `current()` resolves one loop per thread;
//!   `instance()` shares one main loop across threads
//! - **Config support**: Pin the backend via `eventloop.backend` in a
//!   TOML/YAML file or `METRONOME_`-prefixed environment variables
//!
//! ## Quick Start
//!
//! ```no_run
//! use metronome::{current, Timer};
//! use std::time::Duration;
//!
//! fn main() -> metronome::Result<()> {
//!     let event_loop = current()?;
//!
//!     let heartbeat = Timer::periodic(&event_loop, Duration::from_millis(500), || {
//!         println!("tick");
//!     });
//!     heartbeat.start();
//!
//!     // Drives timers until something calls event_loop.stop().
//!     event_loop.run()
//! }
//! ```
//!
//! ## Configuration
//!
//! Create `config/application.toml`:
//!
//! ```toml
//! [eventloop]
//! backend = "tokio"
//! ```
//!
//! ```no_run
//! # fn main() -> metronome::Result<()> {
//! let config = metronome::load_toml_config("config/application.toml")?;
//! metronome::configure_from(&config)?;
//! # Ok(())
//! # }
//! ```
//!
//! You can also use environment variables with the `METRONOME_` prefix:
//!
//! ```bash
//! export METRONOME_EVENTLOOP_BACKEND=std
//! ```

// Re-export core types
pub use metronome_runtime::{
    configure_from, current, global_selector, instance, load_toml_config, load_yaml_config,
    reset, BackendCandidate, BackendKind, BackendSelector, EventLoop, LoopError, LoopHandle,
    LoopSettings, Result, ScheduledAction, Timer, TimerCallback, TimerMode, LOOP_BACKENDS,
    MIN_INTERVAL,
};

// Deprecated compatibility surface
#[allow(deprecated)]
pub use metronome_runtime::{install, DelayedCallback};

pub use metronome_runtime::{deprecation_notice, set_deprecation_hook, DeprecationHook};

// Make the runtime crate available to embedders that need the concrete
// backend types.
pub use metronome_runtime;
