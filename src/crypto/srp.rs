use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::crypto::random_bytes;
use crate::error::{BackendError, Result};
use crate::storage::hasher;
use crate::types::{AuthInfo, Credentials};

type HmacSha256 = Hmac<Sha256>;

pub const AUTH_VERSION: u8 = 4;

const SALT_LEN: usize = 16;
const EPHEMERAL_LEN: usize = 32;

fn mac_for(key: &[u8]) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(key)
        .map_err(|e| BackendError::AuthFailed(format!("bad MAC key: {}", e)))
}

/// Salt and verifier derived from an account password. The password itself
/// is never stored.
#[derive(Debug, Clone)]
pub struct PasswordVerifier {
    salt: Vec<u8>,
    verifier: [u8; 32],
}

impl PasswordVerifier {
    pub fn new(password: &[u8]) -> Self {
        let salt = random_bytes(SALT_LEN);
        let verifier = hasher::salted_digest(&salt, password);
        Self { salt, verifier }
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// Whether `password` is the one this verifier was derived from.
    pub fn matches(&self, password: &[u8]) -> bool {
        hasher::salted_digest(&self.salt, password) == self.verifier
    }

    /// Checks a client proof against `ephemeral`. On success returns the
    /// server proof the client can use to authenticate the server.
    pub fn verify_proof(&self, ephemeral: &[u8], client_proof: &str) -> Result<String> {
        let proof = hex::decode(client_proof)
            .map_err(|_| BackendError::AuthFailed("malformed client proof".to_string()))?;

        let mut mac = mac_for(&self.verifier)?;
        mac.update(ephemeral);
        mac.verify_slice(&proof)
            .map_err(|_| BackendError::AuthFailed("invalid client proof".to_string()))?;

        let mut mac = mac_for(&self.verifier)?;
        mac.update(&proof);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// An outstanding server challenge, consumed by the first proof checked
/// against it.
#[derive(Debug, Clone)]
pub struct Challenge {
    pub ephemeral: Vec<u8>,
}

impl Challenge {
    pub fn new() -> Self {
        Self {
            ephemeral: random_bytes(EPHEMERAL_LEN),
        }
    }
}

impl Default for Challenge {
    fn default() -> Self {
        Self::new()
    }
}

/// Client side of the exchange: computes the proof for `info` from the
/// plaintext password.
pub fn client_credentials(password: &[u8], info: &AuthInfo) -> Result<Credentials> {
    let salt = BASE64_STANDARD
        .decode(&info.salt)
        .map_err(|_| BackendError::AuthFailed("malformed salt".to_string()))?;
    let ephemeral = BASE64_STANDARD
        .decode(&info.server_ephemeral)
        .map_err(|_| BackendError::AuthFailed("malformed server ephemeral".to_string()))?;

    let key = hasher::salted_digest(&salt, password);
    let mut mac = mac_for(&key)?;
    mac.update(&ephemeral);

    Ok(Credentials {
        srp_session: info.srp_session.clone(),
        client_proof: hex::encode(mac.finalize().into_bytes()),
    })
}

pub fn auth_info(verifier: &PasswordVerifier, challenge: &Challenge, srp_session: &str) -> AuthInfo {
    AuthInfo {
        version: AUTH_VERSION,
        salt: BASE64_STANDARD.encode(verifier.salt()),
        server_ephemeral: BASE64_STANDARD.encode(&challenge.ephemeral),
        srp_session: srp_session.to_string(),
    }
}
