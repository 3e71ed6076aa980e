//! Notes encryption using ChaCha20-Poly1305.
//!
//! Two levels: [`seal`]/[`open`] are the raw AEAD given a derived key, while
//! [`encrypt`]/[`decrypt`] take the password and handle salt generation and
//! key derivation, producing or consuming a complete [`Envelope`].

use crate::envelope::Envelope;
use crate::error::{CryptoError, CryptoResult};
use crate::key::{derive_key, DerivedKey, KdfParams, Salt};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;

/// Size of the AEAD nonce in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Size of the authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

fn random_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypts plaintext under `key` with an explicit nonce.
///
/// The nonce must be unique per (key, message); [`encrypt`] takes care of
/// that by drawing a fresh one per call.
pub fn seal(key: &DerivedKey, nonce: &[u8; NONCE_SIZE], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))
}

/// Decrypts and authenticates ciphertext under `key`.
///
/// # Returns
/// The plaintext, or [`CryptoError::AuthenticationFailed`] when the tag
/// does not verify (wrong key or tampered data).
pub fn open(
    key: &DerivedKey,
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> CryptoResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::AuthenticationFailed)
}

/// Encrypts the notes buffer under a password.
///
/// Generates a fresh salt and nonce, derives the key, and assembles the
/// envelope. Calling this twice with identical inputs yields envelopes that
/// differ in every field.
pub fn encrypt(plaintext: &str, password: &str, params: &KdfParams) -> CryptoResult<Envelope> {
    let salt = Salt::random();
    let key = derive_key(password, &salt, params)?;
    let nonce = random_nonce();
    let ciphertext = seal(&key, &nonce, plaintext.as_bytes())?;
    Ok(Envelope {
        salt,
        nonce,
        ciphertext,
    })
}

/// Decrypts an envelope back into the notes buffer.
///
/// Derives the key from the envelope's own salt. A wrong password or a
/// tampered ciphertext both surface as [`CryptoError::AuthenticationFailed`];
/// structural problems are caught earlier by [`Envelope::decode`].
pub fn decrypt(envelope: &Envelope, password: &str, params: &KdfParams) -> CryptoResult<String> {
    let key = derive_key(password, &envelope.salt, params)?;
    let plaintext = open(&key, &envelope.nonce, &envelope.ciphertext)?;
    String::from_utf8(plaintext)
        .map_err(|_| CryptoError::CorruptedEnvelope("decrypted payload is not UTF-8".to_string()))
}
