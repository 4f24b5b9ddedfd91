//! Identity provider

use crate::domain::shared::value_objects::PeerIdentity;
use rand::Rng;

const TOKEN_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Default token length, short enough to read aloud
pub const DEFAULT_TOKEN_LENGTH: usize = 4;

/// Generates the local endpoint's addressable identity.
///
/// Produces a random base-36 token. Collision probability is acceptable
/// for ad-hoc demo use on a small signaling namespace; this is not a
/// security guarantee.
#[derive(Debug, Clone)]
pub struct IdentityProvider {
    token_length: usize,
}

impl IdentityProvider {
    pub fn new(token_length: usize) -> Self {
        Self {
            token_length: token_length.max(1),
        }
    }

    /// Pure generation, no side effects beyond producing the value
    pub fn generate(&self) -> PeerIdentity {
        let mut rng = rand::thread_rng();
        let token: String = (0..self.token_length)
            .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
            .collect();
        PeerIdentity::new(token)
    }
}

impl Default for IdentityProvider {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_LENGTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_identity_shape() {
        let provider = IdentityProvider::default();
        let identity = provider.generate();

        assert_eq!(identity.as_str().len(), DEFAULT_TOKEN_LENGTH);
        assert!(identity
            .as_str()
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_configured_length_is_honored() {
        let provider = IdentityProvider::new(8);
        assert_eq!(provider.generate().as_str().len(), 8);

        // Zero is clamped rather than producing an unusable empty token
        let clamped = IdentityProvider::new(0);
        assert_eq!(clamped.generate().as_str().len(), 1);
    }

    #[test]
    fn test_tokens_are_reasonably_unique() {
        let provider = IdentityProvider::new(8);
        let tokens: HashSet<String> = (0..100)
            .map(|_| provider.generate().as_str().to_string())
            .collect();
        assert_eq!(tokens.len(), 100);
    }
}
