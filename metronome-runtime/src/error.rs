use crate::event_loop::BackendKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoopError {
    /// No backend candidate passed its availability probe.
    #[error("no event loop backend is available")]
    NoBackendAvailable,

    #[error("unknown event loop backend: {0}")]
    UnknownBackend(String),

    #[error("{kind} backend failed: {reason}")]
    Backend { kind: BackendKind, reason: String },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, LoopError>;
