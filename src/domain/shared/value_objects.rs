//! Shared value objects used across the session core

use crate::domain::shared::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque token naming the local endpoint on the signaling network.
///
/// Generated once at startup, immutable for the process lifetime, never
/// reused across sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerIdentity(String);

impl PeerIdentity {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller-entered sharing code naming the target peer of an outbound call.
///
/// Untrusted input: may be malformed, may not resolve to a live peer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionCode(String);

impl SessionCode {
    /// Parse user input into a sharing code.
    ///
    /// Trims surrounding whitespace, rejects the empty string and any
    /// character outside the alphanumeric token alphabet.
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let code = input.trim();

        if code.is_empty() {
            return Err(DomainError::ValidationError(
                "sharing code must not be empty".to_string(),
            ));
        }

        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DomainError::ValidationError(format!(
                "sharing code '{}' contains non-alphanumeric characters",
                code
            )));
        }

        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identity this code resolves to. A sharing code is the remote
    /// peer's identity token, read aloud or messaged out-of-band.
    pub fn as_identity(&self) -> PeerIdentity {
        PeerIdentity::new(self.0.clone())
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one logical call, derived from the remote peer identity
/// once it is known.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn for_remote(remote: &PeerIdentity) -> Self {
        Self(remote.as_str().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to an audio stream owned by the media bridge.
///
/// Opaque to the core: adapters mint it, the session stores and returns
/// it, nothing here interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamHandle(Uuid);

impl StreamHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for StreamHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a data connection between two peers, used for hang-up
/// signaling independently of media.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionHandle {
    id: Uuid,
    peer: PeerIdentity,
}

impl ConnectionHandle {
    pub fn new(id: Uuid, peer: PeerIdentity) -> Self {
        Self { id, peer }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The peer on the other end of this connection.
    pub fn peer(&self) -> &PeerIdentity {
        &self.peer
    }
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn:{}@{}", self.id, self.peer)
    }
}

/// Handle to one media call placed through the signaling adapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallHandle {
    id: Uuid,
    peer: PeerIdentity,
}

impl CallHandle {
    pub fn new(id: Uuid, peer: PeerIdentity) -> Self {
        Self { id, peer }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The peer on the other end of this call.
    pub fn peer(&self) -> &PeerIdentity {
        &self.peer
    }
}

impl fmt::Display for CallHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call:{}@{}", self.id, self.peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_code_parse() {
        let code = SessionCode::parse("abc123").unwrap();
        assert_eq!(code.as_str(), "abc123");
        assert_eq!(code.as_identity(), PeerIdentity::new("abc123"));

        let trimmed = SessionCode::parse("  0x9z \n").unwrap();
        assert_eq!(trimmed.as_str(), "0x9z");
    }

    #[test]
    fn test_session_code_rejects_empty() {
        assert!(SessionCode::parse("").is_err());
        assert!(SessionCode::parse("   ").is_err());
    }

    #[test]
    fn test_session_code_rejects_bad_characters() {
        assert!(SessionCode::parse("abc 123").is_err());
        assert!(SessionCode::parse("abc-123").is_err());
        assert!(SessionCode::parse("ab\u{e9}12").is_err());
    }

    #[test]
    fn test_session_id_derived_from_remote() {
        let remote = PeerIdentity::new("7f2k");
        let id = SessionId::for_remote(&remote);
        assert_eq!(id.as_str(), "7f2k");
    }
}
