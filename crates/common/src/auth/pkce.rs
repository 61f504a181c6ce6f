//! CSRF nonces and PKCE material for authorization requests
//!
//! Every authorization attempt gets a fresh `state` nonce. The code-flow
//! variant additionally carries an RFC 7636 verifier / S256 challenge pair.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

const STATE_BYTES: usize = 16;
const VERIFIER_BYTES: usize = 32;

fn random_token(len: usize) -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a random state nonce (16 bytes, base64url, 22 characters)
#[must_use]
pub fn generate_state() -> String {
    random_token(STATE_BYTES)
}

/// Generate a PKCE code verifier (32 bytes, 43 characters)
#[must_use]
pub fn generate_code_verifier() -> String {
    random_token(VERIFIER_BYTES)
}

/// BASE64URL(SHA256(verifier))
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Compare the stored nonce with the one returned on redirect.
///
/// Runs in time independent of where the inputs first differ.
#[must_use]
pub fn validate_state(expected: &str, actual: &str) -> bool {
    let expected = expected.as_bytes();
    let actual = actual.as_bytes();
    if expected.is_empty() || expected.len() != actual.len() {
        return false;
    }
    expected.iter().zip(actual).fold(0u8, |diff, (a, b)| diff | (a ^ b)) == 0
}

/// Nonce plus verifier/challenge for one code-flow attempt
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// Kept in the session store until the code is exchanged
    pub code_verifier: String,
    /// Sent on the authorization request
    pub code_challenge: String,
    pub state: String,
}

impl PkceChallenge {
    #[must_use]
    pub fn generate() -> Self {
        let code_verifier = generate_code_verifier();
        let code_challenge = generate_code_challenge(&code_verifier);
        Self { code_verifier, code_challenge, state: generate_state() }
    }

    #[must_use]
    pub const fn challenge_method(&self) -> &'static str {
        "S256"
    }
}
