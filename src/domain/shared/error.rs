//! Domain errors

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DomainError {
    /// A command or signaling event that is not legal for the current
    /// call phase. The command is rejected and the phase is unchanged.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Local capture could not be acquired (permission denied, no device).
    #[error("Media acquisition failed: {0}")]
    MediaAcquisitionFailed(String),

    /// The signaling adapter reported a network or negotiation error.
    #[error("Signaling failure: {0}")]
    SignalingFailure(String),

    /// An asynchronous event that no longer matches the current session.
    /// Discarded by the orchestrator, logged only.
    #[error("Stale event: {0}")]
    StaleEvent(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
