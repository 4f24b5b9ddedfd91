//! Session value objects: call phase machine, role, end reason

use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the call this endpoint is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallRole {
    /// This endpoint entered a sharing code and placed the call
    Caller,
    /// This endpoint received the call
    Callee,
}

/// Phase of the endpoint's call lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallPhase {
    /// Local capture has not been acquired yet; calls cannot proceed
    AwaitingLocalMedia,
    /// Ready to place or receive a call
    Idle,
    /// Outbound call placed, awaiting the remote answer
    Dialing,
    /// Inbound call received, awaiting the local accept/reject decision
    Ringing,
    /// Media is flowing between the peers
    Connected,
    /// Tearing down the connection
    Closing,
    /// A signaling error occurred; requires an explicit reset
    Failed,
}

/// Input driving the phase machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseInput {
    LocalMediaReady,
    PlaceCall,
    InboundCall,
    Accept,
    Reject,
    RemoteStreamAttached,
    HangUp,
    Closed,
    SignalingError,
    Reset,
}

impl CallPhase {
    /// Apply an input to the machine.
    ///
    /// Returns the next phase, or `InvalidTransition` for any pair not in
    /// the transition table. Illegal inputs leave the caller's state
    /// untouched and observable rather than silently ignored.
    pub fn on(&self, input: PhaseInput) -> Result<CallPhase> {
        use CallPhase::*;
        use PhaseInput::*;

        // A signaling error can strike in any phase, including while idle
        // (the registration with the signaling server may drop). Only a
        // phase already marked Failed refuses it.
        if input == SignalingError {
            return if *self == Failed {
                Err(self.rejected(input))
            } else {
                Ok(Failed)
            };
        }

        match (self, input) {
            (AwaitingLocalMedia, LocalMediaReady) => Ok(Idle),
            (Idle, PlaceCall) => Ok(Dialing),
            (Idle, InboundCall) => Ok(Ringing),
            (Ringing, Accept) => Ok(Connected),
            (Ringing, Reject) => Ok(Idle),
            (Dialing, RemoteStreamAttached) => Ok(Connected),
            (Dialing | Ringing | Connected, HangUp) => Ok(Closing),
            (Closing, Closed) => Ok(Idle),
            (Failed, Reset) => Ok(Idle),
            _ => Err(self.rejected(input)),
        }
    }

    fn rejected(&self, input: PhaseInput) -> DomainError {
        DomainError::InvalidTransition(format!("{:?} is not valid in phase {:?}", input, self))
    }

    /// True while a call attempt is pending or established
    pub fn is_in_call(&self) -> bool {
        matches!(
            self,
            CallPhase::Dialing | CallPhase::Ringing | CallPhase::Connected
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallPhase::AwaitingLocalMedia => "awaiting_local_media",
            CallPhase::Idle => "idle",
            CallPhase::Dialing => "dialing",
            CallPhase::Ringing => "ringing",
            CallPhase::Connected => "connected",
            CallPhase::Closing => "closing",
            CallPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for CallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a call attempt ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// This endpoint hung up
    LocalHangUp,
    /// The remote peer hung up or closed the connection
    RemoteHangUp,
    /// The inbound call was rejected before being answered
    Rejected,
    /// The attempt was torn down by a signaling error
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_PHASES: [CallPhase; 7] = [
        CallPhase::AwaitingLocalMedia,
        CallPhase::Idle,
        CallPhase::Dialing,
        CallPhase::Ringing,
        CallPhase::Connected,
        CallPhase::Closing,
        CallPhase::Failed,
    ];

    const ALL_INPUTS: [PhaseInput; 10] = [
        PhaseInput::LocalMediaReady,
        PhaseInput::PlaceCall,
        PhaseInput::InboundCall,
        PhaseInput::Accept,
        PhaseInput::Reject,
        PhaseInput::RemoteStreamAttached,
        PhaseInput::HangUp,
        PhaseInput::Closed,
        PhaseInput::SignalingError,
        PhaseInput::Reset,
    ];

    /// The transition table as listed in the design, used to check that
    /// everything outside it is rejected.
    fn expected(phase: CallPhase, input: PhaseInput) -> Option<CallPhase> {
        use CallPhase::*;
        use PhaseInput::*;

        match (phase, input) {
            (AwaitingLocalMedia, LocalMediaReady) => Some(Idle),
            (Idle, PlaceCall) => Some(Dialing),
            (Idle, InboundCall) => Some(Ringing),
            (Ringing, Accept) => Some(Connected),
            (Ringing, Reject) => Some(Idle),
            (Dialing, RemoteStreamAttached) => Some(Connected),
            (Dialing, HangUp) | (Ringing, HangUp) | (Connected, HangUp) => Some(Closing),
            (Closing, Closed) => Some(Idle),
            (Failed, SignalingError) => None,
            (_, SignalingError) => Some(Failed),
            (Failed, Reset) => Some(Idle),
            _ => None,
        }
    }

    #[test]
    fn test_listed_transitions_are_accepted() {
        for phase in ALL_PHASES {
            for input in ALL_INPUTS {
                if let Some(next) = expected(phase, input) {
                    assert_eq!(
                        phase.on(input).unwrap(),
                        next,
                        "{:?} --{:?}--> should reach {:?}",
                        phase,
                        input,
                        next
                    );
                }
            }
        }
    }

    #[test]
    fn test_unlisted_transitions_are_rejected() {
        for phase in ALL_PHASES {
            for input in ALL_INPUTS {
                if expected(phase, input).is_none() {
                    let result = phase.on(input);
                    assert!(
                        matches!(result, Err(DomainError::InvalidTransition(_))),
                        "{:?} --{:?}--> should be rejected, got {:?}",
                        phase,
                        input,
                        result
                    );
                }
            }
        }
    }

    #[test]
    fn test_signaling_error_from_idle() {
        assert_eq!(
            CallPhase::Idle.on(PhaseInput::SignalingError).unwrap(),
            CallPhase::Failed
        );
    }

    #[test]
    fn test_failed_requires_reset() {
        let failed = CallPhase::Failed;
        assert!(failed.on(PhaseInput::PlaceCall).is_err());
        assert!(failed.on(PhaseInput::InboundCall).is_err());
        assert_eq!(failed.on(PhaseInput::Reset).unwrap(), CallPhase::Idle);
    }

    #[test]
    fn test_is_in_call() {
        assert!(CallPhase::Dialing.is_in_call());
        assert!(CallPhase::Ringing.is_in_call());
        assert!(CallPhase::Connected.is_in_call());
        assert!(!CallPhase::Idle.is_in_call());
        assert!(!CallPhase::Closing.is_in_call());
        assert!(!CallPhase::Failed.is_in_call());
    }
}
