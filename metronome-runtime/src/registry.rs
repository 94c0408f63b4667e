use crate::backend;
use crate::error::Result;
use crate::event_loop::LoopHandle;

use std::cell::RefCell;
use std::sync::Mutex;
use tracing::warn;

thread_local! {
    static CURRENT_LOOP: RefCell<Option<LoopHandle>> = const { RefCell::new(None) };
}

static MAIN_INSTANCE: Mutex<Option<LoopHandle>> = Mutex::new(None);

/// Returns the calling thread's loop, resolving a backend and constructing
/// the instance on first use. Each thread gets its own instance; repeated
/// calls return the same one until [`reset`].
pub fn current() -> Result<LoopHandle> {
    CURRENT_LOOP.with(|cell| {
        if let Some(handle) = cell.borrow().as_ref() {
            return Ok(handle.clone());
        }
        let handle = backend::global().construct()?;
        *cell.borrow_mut() = Some(handle.clone());
        Ok(handle)
    })
}

/// Returns the process-wide main loop, callable from any thread.
///
/// The instance is constructed at most once even when several threads race
/// here for the first time. If the cached instance no longer matches the
/// configured backend kind, a warning is emitted and the instance is
/// returned anyway.
pub fn instance() -> Result<LoopHandle> {
    let mut slot = MAIN_INSTANCE.lock().unwrap();
    let handle = match slot.as_ref() {
        Some(handle) => handle.clone(),
        None => {
            let handle = backend::global().construct()?;
            *slot = Some(handle.clone());
            handle
        }
    };
    drop(slot);

    if let Some(expected) = backend::global().selected() {
        if expected != handle.kind() {
            warn!(
                expected = expected.as_str(),
                actual = handle.kind().as_str(),
                "main loop instance does not match the configured backend"
            );
        }
    }
    Ok(handle)
}

/// Forgets the calling thread's cached loop; the next [`current`] resolves
/// a fresh instance. Timers scheduled against the old instance stay with
/// it and are not migrated.
pub fn reset() {
    CURRENT_LOOP.with(|cell| {
        cell.borrow_mut().take();
    });
}
