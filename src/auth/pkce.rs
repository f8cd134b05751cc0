//! PKCE (RFC 7636) verifier/challenge pairs and CSRF state values
//!
//! Every provider sign-in, popup or redirect, carries a fresh pair and state.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use sha2::{Digest, Sha256};

const VERIFIER_LENGTH: usize = 64;

/// Unreserved URI characters allowed in a verifier
const VERIFIER_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

const STATE_LENGTH: usize = 32;

fn random_string(charset: &[u8], len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| charset[rng.gen_range(0..charset.len())] as char)
        .collect()
}

/// S256 challenge: BASE64URL(SHA256(verifier))
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Opaque value echoed back by the provider on the callback
pub fn generate_state() -> String {
    random_string(b"abcdefghijklmnopqrstuvwxyz0123456789", STATE_LENGTH)
}

#[derive(Debug, Clone)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    pub fn new() -> Self {
        let verifier = random_string(VERIFIER_CHARSET, VERIFIER_LENGTH);
        let challenge = code_challenge(&verifier);
        Self { verifier, challenge }
    }
}

impl Default for PkcePair {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verifier_shape() {
        let pair = PkcePair::new();
        assert_eq!(pair.verifier.len(), VERIFIER_LENGTH);
        assert!(pair.verifier.bytes().all(|b| VERIFIER_CHARSET.contains(&b)));
    }

    #[test]
    fn test_challenge_matches_verifier() {
        let pair = PkcePair::new();
        assert_eq!(pair.challenge, code_challenge(&pair.verifier));
        // 32-byte digest, unpadded base64url
        assert_eq!(pair.challenge.len(), 43);
    }

    #[test]
    fn test_rfc7636_appendix_b_vector() {
        assert_eq!(
            code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_states_are_unique_and_alphanumeric() {
        let a = generate_state();
        let b = generate_state();
        assert_ne!(a, b);
        assert_eq!(a.len(), STATE_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
