//! Stateless session sealing with ChaCha20-Poly1305
//!
//! A session is a small JSON payload (username + expiry instant) sealed
//! into an opaque token with authenticated encryption. There is no
//! server-side session table: the token in the client's cookie is the only
//! record of login state, so authenticity rests entirely on the Poly1305
//! tag. A consequence the caller must live with: an unexpired token cannot
//! be revoked server-side, only outlived.
//!
//! Token layout: URL-safe base64 of `nonce (12 bytes) || ciphertext+tag`.
//! The 256-bit cipher key is derived from the configured passphrase with
//! SHA-256.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, Key, KeyInit, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::debug;

use crate::config::MIN_SESSION_KEY_CHARS;
use crate::types::{AuthError, Result};

/// Nonce length for ChaCha20-Poly1305 (12 bytes)
const NONCE_LEN: usize = 12;

/// The value sealed inside a session token
///
/// Exists only inside sealed tokens; never persisted server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPayload {
    pub username: String,
    /// Expiry instant in epoch milliseconds, set once at seal time
    pub expires_at: i64,
}

impl SessionPayload {
    /// Create a payload expiring `ttl` from now
    pub fn new(username: impl Into<String>, ttl: Duration) -> Self {
        Self {
            username: username.into(),
            expires_at: chrono::Utc::now().timestamp_millis() + ttl.as_millis() as i64,
        }
    }

    /// Whether the expiry instant has passed
    ///
    /// Expiry is the caller's check, separate from unsealing: an
    /// expired-but-authentic token must be treated exactly like a forged
    /// one, but only after authenticity has been established.
    pub fn is_expired(&self) -> bool {
        chrono::Utc::now().timestamp_millis() >= self.expires_at
    }
}

/// Seals and unseals session payloads under a fixed key
#[derive(Clone)]
pub struct SessionCodec {
    key: [u8; 32],
}

impl SessionCodec {
    /// Create a codec from the configured passphrase
    ///
    /// A passphrase shorter than 32 characters is a fatal configuration
    /// error; construction happens once at startup, never per-request.
    pub fn new(secret: &str) -> Result<Self> {
        if secret.chars().count() < MIN_SESSION_KEY_CHARS {
            return Err(AuthError::Config(format!(
                "session private key must be at least {} characters",
                MIN_SESSION_KEY_CHARS
            )));
        }

        Ok(Self {
            key: Sha256::digest(secret.as_bytes()).into(),
        })
    }

    /// Seal a payload into an opaque token
    pub fn seal(&self, payload: &SessionPayload) -> Result<String> {
        let plaintext = serde_json::to_vec(payload)
            .map_err(|e| AuthError::Internal(format!("Failed to serialize session: {e}")))?;

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|e| AuthError::Internal(format!("Failed to seal session: {e}")))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);

        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    /// Unseal a token back into its payload
    ///
    /// Fails closed: a malformed, truncated, tampered, or wrong-key token
    /// yields `None`, never an error the request path has to handle. The
    /// caller still owns the expiry check.
    pub fn unseal(&self, token: &str) -> Option<SessionPayload> {
        let sealed = match URL_SAFE_NO_PAD.decode(token) {
            Ok(bytes) => bytes,
            Err(_) => {
                debug!("Rejected session token: not valid base64");
                return None;
            }
        };

        if sealed.len() <= NONCE_LEN {
            debug!("Rejected session token: too short");
            return None;
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));
        let plaintext = match cipher.decrypt(Nonce::from_slice(nonce), ciphertext) {
            Ok(bytes) => bytes,
            Err(_) => {
                debug!("Rejected session token: authentication failed");
                return None;
            }
        };

        match serde_json::from_slice(&plaintext) {
            Ok(payload) => Some(payload),
            Err(e) => {
                debug!("Rejected session token: bad payload ({e})");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "an-absolutely-minimal-32-char-key!!";
    const OTHER_KEY: &str = "a-completely-different-32-char-key!";

    fn codec() -> SessionCodec {
        SessionCodec::new(KEY).unwrap()
    }

    #[test]
    fn test_short_key_is_fatal() {
        let result = SessionCodec::new("short");
        assert!(matches!(result, Err(AuthError::Config(_))));
    }

    #[test]
    fn test_seal_unseal_roundtrip() {
        let codec = codec();
        let payload = SessionPayload::new("alice", Duration::from_secs(3600));

        let token = codec.seal(&payload).unwrap();
        let unsealed = codec.unseal(&token).unwrap();

        assert_eq!(unsealed, payload);
    }

    #[test]
    fn test_two_seals_differ() {
        // Random nonce per seal: same payload, different tokens
        let codec = codec();
        let payload = SessionPayload::new("alice", Duration::from_secs(3600));

        assert_ne!(codec.seal(&payload).unwrap(), codec.seal(&payload).unwrap());
    }

    #[test]
    fn test_any_single_byte_mutation_is_rejected() {
        let codec = codec();
        let payload = SessionPayload::new("alice", Duration::from_secs(3600));
        let token = codec.seal(&payload).unwrap();
        let sealed = URL_SAFE_NO_PAD.decode(&token).unwrap();

        // Flip one bit of every byte position: nonce, ciphertext, and tag
        // mutations must all fail authentication
        for position in 0..sealed.len() {
            let mut mutated = sealed.clone();
            mutated[position] ^= 0x01;
            let mutated_token = URL_SAFE_NO_PAD.encode(&mutated);
            assert!(
                codec.unseal(&mutated_token).is_none(),
                "mutation at byte {} was accepted",
                position
            );
        }
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let payload = SessionPayload::new("alice", Duration::from_secs(3600));
        let token = codec().seal(&payload).unwrap();

        let other = SessionCodec::new(OTHER_KEY).unwrap();
        assert!(other.unseal(&token).is_none());
    }

    #[test]
    fn test_garbage_tokens_fail_closed() {
        let codec = codec();
        assert!(codec.unseal("").is_none());
        assert!(codec.unseal("not base64 at all!!!").is_none());
        assert!(codec.unseal("AAAA").is_none());
    }

    #[test]
    fn test_expiry_is_the_callers_check() {
        let codec = codec();
        let expired = SessionPayload {
            username: "alice".into(),
            expires_at: 0,
        };

        // Authentic but expired: unseal succeeds, is_expired flags it
        let token = codec.seal(&expired).unwrap();
        let unsealed = codec.unseal(&token).unwrap();
        assert!(unsealed.is_expired());

        let live = SessionPayload::new("alice", Duration::from_secs(3600));
        assert!(!live.is_expired());
    }
}
