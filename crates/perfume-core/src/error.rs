//! Error types for the metric engine
//!
//! None of these cross the public [`Perfume`](crate::Perfume) surface. They are
//! produced by the internal components and turned into warnings or silent drops
//! by the engine.

use thiserror::Error;

use crate::entry::EntryKind;

/// Errors raised inside the engine and by host capabilities
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PerfumeError {
    /// `start` was called for a name that is already being recorded
    #[error("Recording already started.")]
    AlreadyStarted(String),

    /// `end` was called for a name that is not being recorded
    #[error("Recording already stopped.")]
    AlreadyStopped(String),

    /// A required host capability is missing
    #[error("Unsupported capability: {0}")]
    Unsupported(&'static str),

    /// The host refused a stream subscription
    #[error("Cannot initialize {kind} observer: {reason}")]
    Observer {
        /// Stream the subscription was requested for
        kind: EntryKind,
        /// Host-provided failure description
        reason: String,
    },

    /// A host call (mark, measure, ...) failed
    #[error("Host call failed: {0}")]
    Host(String),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PerfumeError {
    /// Name of the recording this error refers to, if any
    pub fn metric_name(&self) -> Option<&str> {
        match self {
            PerfumeError::AlreadyStarted(name) | PerfumeError::AlreadyStopped(name) => Some(name),
            _ => None,
        }
    }
}

/// Result alias used across the engine
pub type Result<T> = std::result::Result<T, PerfumeError>;
