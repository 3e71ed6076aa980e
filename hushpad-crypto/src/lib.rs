//! Password-based envelope encryption for the Hushpad notes vault.
//!
//! The vault keeps the user's notes as a single plaintext buffer and
//! persists it as an opaque envelope: ciphertext plus the salt and nonce
//! needed to decrypt it again. Keys are never stored; every save derives a
//! fresh key from the session password with a fresh salt.
//!
//! # Components
//!
//! - **Key derivation** ([`derive_key`]): Argon2id, 16-byte salt, 256-bit key
//! - **Cipher** ([`encrypt`]/[`decrypt`]): ChaCha20-Poly1305 with a fresh
//!   nonce per save
//! - **Envelope codec** ([`Envelope`]): the JSON/base64 storage form
//!
//! # Example
//!
//! ```
//! use hushpad_crypto::{decrypt, encrypt, Envelope, KdfParams};
//!
//! let params = KdfParams::default();
//! let envelope = encrypt("meeting notes", "correct horse battery", &params).unwrap();
//!
//! let stored = envelope.encode().unwrap();
//! let restored = Envelope::decode(&stored).unwrap();
//! let plaintext = decrypt(&restored, "correct horse battery", &params).unwrap();
//! assert_eq!(plaintext, "meeting notes");
//! ```

mod cipher;
mod envelope;
mod error;
mod key;

pub use cipher::{decrypt, encrypt, open, seal, NONCE_SIZE, TAG_SIZE};
pub use envelope::Envelope;
pub use error::{CryptoError, CryptoResult};
pub use key::{derive_key, DerivedKey, KdfParams, Salt, KEY_SIZE, SALT_SIZE};
