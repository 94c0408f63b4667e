use crate::error::{LoopError, Result};
use crate::event_loop::{BackendKind, LoopHandle};

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, OnceLock};

/// One selectable loop implementation.
///
/// Candidates register themselves into [`LOOP_BACKENDS`]; `rank` orders the
/// preference list because distributed-slice order is unspecified. Lower
/// ranks are preferred. The availability probe must be side-effect free.
pub struct BackendCandidate {
    pub kind: BackendKind,
    pub rank: u8,
    pub available: fn() -> bool,
    pub construct: fn() -> Result<LoopHandle>,
}

/// Global registration table for loop backends.
#[linkme::distributed_slice]
pub static LOOP_BACKENDS: [BackendCandidate] = [..];

/// Resolves which backend to use and keeps the choice sticky until
/// explicitly reconfigured.
pub struct BackendSelector {
    candidates: Vec<&'static BackendCandidate>,
    selected: Mutex<Option<BackendKind>>,
}

impl BackendSelector {
    pub fn new(mut candidates: Vec<&'static BackendCandidate>) -> Self {
        candidates.sort_by_key(|candidate| candidate.rank);
        Self {
            candidates,
            selected: Mutex::new(None),
        }
    }

    fn from_registry() -> Self {
        Self::new(LOOP_BACKENDS.iter().collect())
    }

    /// Returns the configured backend, probing candidates in preference
    /// order on first use. Probes do not run again once a choice is made.
    pub fn resolve(&self) -> Result<BackendKind> {
        let mut selected = self.selected.lock().unwrap();
        if let Some(kind) = *selected {
            return Ok(kind);
        }
        for candidate in &self.candidates {
            if probe(candidate) {
                *selected = Some(candidate.kind);
                return Ok(candidate.kind);
            }
        }
        Err(LoopError::NoBackendAvailable)
    }

    /// Pins `kind` as the backend for subsequent resolutions.
    pub fn configure(&self, kind: BackendKind) -> Result<()> {
        if !self.candidates.iter().any(|c| c.kind == kind) {
            return Err(LoopError::UnknownBackend(kind.as_str().to_string()));
        }
        *self.selected.lock().unwrap() = Some(kind);
        Ok(())
    }

    /// The sticky choice, if one has been made.
    pub fn selected(&self) -> Option<BackendKind> {
        *self.selected.lock().unwrap()
    }

    /// Resolves and constructs an instance of the chosen backend.
    pub fn construct(&self) -> Result<LoopHandle> {
        let kind = self.resolve()?;
        let candidate = self
            .candidates
            .iter()
            .find(|c| c.kind == kind)
            .ok_or(LoopError::NoBackendAvailable)?;
        (candidate.construct)()
    }
}

// A probe that panics counts as unavailable; it must not poison the
// selector or abort resolution of later candidates.
fn probe(candidate: &BackendCandidate) -> bool {
    panic::catch_unwind(AssertUnwindSafe(candidate.available)).unwrap_or(false)
}

/// The process-wide selector over all registered backends.
pub fn global() -> &'static BackendSelector {
    static SELECTOR: OnceLock<BackendSelector> = OnceLock::new();
    SELECTOR.get_or_init(BackendSelector::from_registry)
}
