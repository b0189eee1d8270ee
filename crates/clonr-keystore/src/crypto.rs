// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Low-level AES-256-GCM seal/open operations.
//!
//! Every call to [`seal`] generates a fresh random 96-bit nonce via the
//! system CSPRNG. Nonce reuse would be catastrophic for GCM security.
//! Additional authenticated data binds a ciphertext to its owning entity or
//! host so an envelope cannot be replayed under a different record.

use clonr_core::ClonrError;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

/// AES-256 key length in bytes.
pub const KEY_SIZE: usize = 32;
/// GCM nonce length in bytes.
pub const NONCE_SIZE: usize = 12;
/// GCM authentication tag length in bytes.
pub const TAG_SIZE: usize = 16;

/// Encrypt plaintext with AES-256-GCM using a random 96-bit nonce.
///
/// Returns `(ciphertext_with_tag, nonce_bytes)`. The caller must store both
/// the ciphertext and the nonce to be able to decrypt later.
pub fn seal(
    key: &[u8; KEY_SIZE],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; NONCE_SIZE]), ClonrError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| ClonrError::Internal("failed to create AES-256-GCM key".to_string()))?;
    let less_safe = LessSafeKey::new(unbound);

    let rng = SystemRandom::new();
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rng.fill(&mut nonce_bytes)
        .map_err(|_| ClonrError::Internal("failed to generate random nonce".to_string()))?;

    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    // Seal in place: plaintext buffer is extended with the authentication tag.
    let mut in_out = plaintext.to_vec();
    less_safe
        .seal_in_place_append_tag(nonce, Aad::from(aad), &mut in_out)
        .map_err(|_| ClonrError::Internal("AES-256-GCM encryption failed".to_string()))?;

    Ok((in_out, nonce_bytes))
}

/// Decrypt ciphertext with AES-256-GCM.
///
/// `ciphertext` must include the 16-byte authentication tag appended by
/// [`seal`], and `aad` must match what was sealed. Wrong key, wrong AAD, and
/// tampered data all fail the same way.
pub fn open(
    key: &[u8; KEY_SIZE],
    aad: &[u8],
    nonce_bytes: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, ClonrError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| ClonrError::Internal("failed to create AES-256-GCM key".to_string()))?;
    let less_safe = LessSafeKey::new(unbound);

    let nonce = Nonce::assume_unique_for_key(*nonce_bytes);

    let mut in_out = ciphertext.to_vec();
    let plaintext = less_safe
        .open_in_place(nonce, Aad::from(aad), &mut in_out)
        .map_err(|_| ClonrError::WrongSecretOrCorrupted)?;

    Ok(Zeroizing::new(plaintext.to_vec()))
}

/// Generate a random 32-byte key suitable for AES-256-GCM.
pub fn generate_random_key() -> Result<Zeroizing<[u8; KEY_SIZE]>, ClonrError> {
    let rng = SystemRandom::new();
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    rng.fill(key.as_mut())
        .map_err(|_| ClonrError::Internal("failed to generate random key".to_string()))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let key = generate_random_key().unwrap();
        let plaintext = b"ghp_sample_token_value";

        let (ciphertext, nonce) = seal(&key, b"github.com", plaintext).unwrap();
        let decrypted = open(&key, b"github.com", &nonce, &ciphertext).unwrap();

        assert_eq!(&*decrypted, plaintext);
    }

    #[test]
    fn seal_produces_different_ciphertext_for_same_plaintext() {
        let key = generate_random_key().unwrap();
        let plaintext = b"same input twice";

        let (ct1, nonce1) = seal(&key, b"", plaintext).unwrap();
        let (ct2, nonce2) = seal(&key, b"", plaintext).unwrap();

        assert_ne!(nonce1, nonce2);
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn open_with_wrong_key_fails() {
        let key1 = generate_random_key().unwrap();
        let key2 = generate_random_key().unwrap();

        let (ciphertext, nonce) = seal(&key1, b"", b"secret data").unwrap();
        let result = open(&key2, b"", &nonce, &ciphertext);

        assert!(matches!(result, Err(ClonrError::WrongSecretOrCorrupted)));
    }

    #[test]
    fn open_with_wrong_aad_fails() {
        let key = generate_random_key().unwrap();

        let (ciphertext, nonce) = seal(&key, b"github.com", b"secret data").unwrap();
        let result = open(&key, b"gitlab.com", &nonce, &ciphertext);

        assert!(matches!(result, Err(ClonrError::WrongSecretOrCorrupted)));
    }

    #[test]
    fn ciphertext_is_longer_than_plaintext() {
        let key = generate_random_key().unwrap();
        let (ciphertext, _) = seal(&key, b"", b"hello").unwrap();
        assert_eq!(ciphertext.len(), 5 + TAG_SIZE);
    }

    #[test]
    fn tampered_ciphertext_fails_decryption() {
        let key = generate_random_key().unwrap();
        let (mut ciphertext, nonce) = seal(&key, b"", b"do not tamper").unwrap();

        for i in 0..ciphertext.len() {
            ciphertext[i] ^= 0x01;
            let result = open(&key, b"", &nonce, &ciphertext);
            assert!(
                matches!(result, Err(ClonrError::WrongSecretOrCorrupted)),
                "flipping byte {i} must fail closed"
            );
            ciphertext[i] ^= 0x01;
        }
    }
}
