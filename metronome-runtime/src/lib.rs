//! Metronome Runtime - single-threaded event loop core with timer scheduling
//!
//! This crate provides the loop resolution, singleton registry, and timer
//! machinery behind the `metronome` facade.

mod backend;
mod config;
mod error;
mod event_loop;
mod legacy;
mod notify;
mod registry;
mod timer;

// Re-export public API
pub use backend::{global as global_selector, BackendCandidate, BackendSelector, LOOP_BACKENDS};
pub use config::{configure_from, load_toml_config, load_yaml_config, LoopSettings};
pub use error::{LoopError, Result};
pub use event_loop::{
    BackendKind, EventLoop, LoopHandle, ScheduledAction, StdLoop, TokioLoop,
};
#[allow(deprecated)]
pub use legacy::{install, DelayedCallback};
pub use linkme;
pub use notify::{deprecation_notice, set_deprecation_hook, DeprecationHook};
pub use registry::{current, instance, reset};
pub use timer::{Timer, TimerCallback, TimerMode, MIN_INTERVAL};
