//! Storage codec for encrypted notes.
//!
//! The persisted form is a small JSON object with base64 fields named
//! `encrypted`, `salt` and `iv`, matching the envelopes already written by
//! earlier releases. Decoding validates structure exhaustively and never
//! touches key derivation or the cipher, so corruption stays distinguishable
//! from a wrong password.

use crate::cipher::{NONCE_SIZE, TAG_SIZE};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{Salt, SALT_SIZE};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

/// A complete encrypted-notes envelope: everything needed to decrypt the
/// buffer given the password.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    /// KDF salt, regenerated on every save.
    pub salt: Salt,
    /// AEAD nonce, regenerated on every save.
    pub nonce: [u8; NONCE_SIZE],
    /// Ciphertext with the authentication tag appended.
    pub ciphertext: Vec<u8>,
}

/// Wire form of [`Envelope`]. Field names are fixed by the stored data
/// format; extra fields from newer writers are ignored.
#[derive(Serialize, Deserialize)]
struct StoredEnvelope {
    encrypted: String,
    salt: String,
    iv: String,
}

impl Envelope {
    /// Encodes the envelope into its storage form.
    pub fn encode(&self) -> CryptoResult<String> {
        let stored = StoredEnvelope {
            encrypted: STANDARD.encode(&self.ciphertext),
            salt: STANDARD.encode(self.salt.as_bytes()),
            iv: STANDARD.encode(self.nonce),
        };
        Ok(serde_json::to_string(&stored)?)
    }

    /// Decodes an envelope from its storage form.
    ///
    /// Any structural defect (malformed JSON, missing field, bad base64,
    /// wrong salt/nonce length, ciphertext shorter than the tag) yields
    /// [`CryptoError::CorruptedEnvelope`].
    pub fn decode(raw: &str) -> CryptoResult<Self> {
        let stored: StoredEnvelope = serde_json::from_str(raw)
            .map_err(|e| CryptoError::CorruptedEnvelope(format!("invalid envelope JSON: {e}")))?;

        let ciphertext = decode_field(&stored.encrypted, "encrypted")?;
        let salt_bytes = decode_field(&stored.salt, "salt")?;
        let nonce_bytes = decode_field(&stored.iv, "iv")?;

        let salt: [u8; SALT_SIZE] = salt_bytes.as_slice().try_into().map_err(|_| {
            CryptoError::CorruptedEnvelope(format!(
                "salt must be {SALT_SIZE} bytes, got {}",
                salt_bytes.len()
            ))
        })?;
        let nonce: [u8; NONCE_SIZE] = nonce_bytes.as_slice().try_into().map_err(|_| {
            CryptoError::CorruptedEnvelope(format!(
                "iv must be {NONCE_SIZE} bytes, got {}",
                nonce_bytes.len()
            ))
        })?;
        if ciphertext.len() < TAG_SIZE {
            return Err(CryptoError::CorruptedEnvelope(
                "ciphertext shorter than the authentication tag".to_string(),
            ));
        }

        Ok(Self {
            salt: Salt::from_bytes(salt),
            nonce,
            ciphertext,
        })
    }
}

fn decode_field(value: &str, field: &str) -> CryptoResult<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|e| CryptoError::CorruptedEnvelope(format!("invalid base64 in `{field}`: {e}")))
}
