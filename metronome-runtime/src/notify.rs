use std::panic::{self, AssertUnwindSafe};
use std::sync::RwLock;
use tracing::warn;

pub type DeprecationHook = Box<dyn Fn(&str) + Send + Sync + 'static>;

static HOOK: RwLock<Option<DeprecationHook>> = RwLock::new(None);

/// Installs a process-wide sink for deprecation notices. `None` restores
/// the default, which logs a warning.
pub fn set_deprecation_hook(hook: Option<DeprecationHook>) {
    *HOOK.write().unwrap() = hook;
}

/// Reports use of a deprecated entry point through the installed hook.
/// A hook that panics is contained; notices never fail the caller.
pub fn deprecation_notice(message: &str) {
    let hook = HOOK.read().unwrap();
    match hook.as_ref() {
        Some(hook) => {
            let _ = panic::catch_unwind(AssertUnwindSafe(|| hook(message)));
        }
        None => warn!("{message}"),
    }
}
