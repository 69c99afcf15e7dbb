//! Error types. None of these are fatal to the overlay; every caller has a
//! degraded path (single-frame sprite, default settings, scheduler retry).

use thiserror::Error;

use crate::agent::AgentActivity;

/// Sprite sheet could not be inspected.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("sprite {0} not found")]
    Missing(String),

    #[error("failed to read sprite {url}: {source}")]
    Unreadable {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("sprite {0} is not a PNG image")]
    NotPng(String),
}

/// Settings store read or write was rejected.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings file is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("settings store unavailable: {0}")]
    Unavailable(String),
}

/// Attempted an activity change the agent's lifecycle does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal activity transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: AgentActivity,
    pub to: AgentActivity,
}

/// Failure inside one scheduler cycle.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
}
