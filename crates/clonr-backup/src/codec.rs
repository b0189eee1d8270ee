// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authenticated backup codec: PBKDF2-HMAC-SHA256 key derivation plus
//! AES-256-GCM.
//!
//! Wire layout is a flat concatenation with no length fields:
//!
//! ```text
//! salt(16) || nonce(12) || ciphertext_with_tag
//! ```
//!
//! Salt and nonce sizes are fixed, documented constants -- the importer
//! knows them in advance, nothing is negotiated. Every seal uses a fresh
//! random salt and nonce; keys are never reused across calls.

use std::num::NonZeroU32;

use clonr_core::ClonrError;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

/// PBKDF2 salt length in bytes.
pub const SALT_SIZE: usize = 16;
/// GCM nonce length in bytes.
pub const NONCE_SIZE: usize = 12;
/// GCM authentication tag length in bytes.
pub const TAG_SIZE: usize = 16;
/// Smallest possible valid blob: salt, nonce, and the tag of an empty
/// plaintext. Anything shorter is rejected before any key derivation.
pub const MIN_BLOB_SIZE: usize = SALT_SIZE + NONCE_SIZE + TAG_SIZE;

/// Fixed PBKDF2-HMAC-SHA256 iteration count.
pub const PBKDF2_ITERATIONS: NonZeroU32 = NonZeroU32::new(100_000).unwrap();

/// Seal plaintext under a password.
pub fn seal(plaintext: &[u8], password: &SecretString) -> Result<Vec<u8>, ClonrError> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_SIZE];
    rng.fill(&mut salt)
        .map_err(|_| ClonrError::Internal("failed to generate random salt".to_string()))?;
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rng.fill(&mut nonce_bytes)
        .map_err(|_| ClonrError::Internal("failed to generate random nonce".to_string()))?;

    let key = derive_key(password, &salt);

    let unbound = UnboundKey::new(&AES_256_GCM, key.as_ref())
        .map_err(|_| ClonrError::Internal("failed to create AES-256-GCM key".to_string()))?;
    let less_safe = LessSafeKey::new(unbound);

    let mut in_out = plaintext.to_vec();
    less_safe
        .seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| ClonrError::Internal("AES-256-GCM encryption failed".to_string()))?;

    let mut blob = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + in_out.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&in_out);
    Ok(blob)
}

/// Open a sealed blob with a password.
///
/// A wrong password and a tampered or corrupted blob are cryptographically
/// indistinguishable; both fail with the same error.
pub fn open(blob: &[u8], password: &SecretString) -> Result<Zeroizing<Vec<u8>>, ClonrError> {
    if blob.len() < MIN_BLOB_SIZE {
        return Err(ClonrError::WrongSecretOrCorrupted);
    }

    let mut salt = [0u8; SALT_SIZE];
    salt.copy_from_slice(&blob[..SALT_SIZE]);
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    nonce_bytes.copy_from_slice(&blob[SALT_SIZE..SALT_SIZE + NONCE_SIZE]);
    let ciphertext = &blob[SALT_SIZE + NONCE_SIZE..];

    let key = derive_key(password, &salt);

    let unbound = UnboundKey::new(&AES_256_GCM, key.as_ref())
        .map_err(|_| ClonrError::Internal("failed to create AES-256-GCM key".to_string()))?;
    let less_safe = LessSafeKey::new(unbound);

    let mut in_out = ciphertext.to_vec();
    let plaintext = less_safe
        .open_in_place(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| ClonrError::WrongSecretOrCorrupted)?;

    Ok(Zeroizing::new(plaintext.to_vec()))
}

fn derive_key(password: &SecretString, salt: &[u8; SALT_SIZE]) -> Zeroizing<[u8; 32]> {
    let mut key = Zeroizing::new([0u8; 32]);
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        PBKDF2_ITERATIONS,
        salt,
        password.expose_secret().as_bytes(),
        key.as_mut(),
    );
    key
}
