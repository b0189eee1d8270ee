// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tagged, self-describing credential envelopes.
//!
//! Every stored secret is prefixed with a literal ASCII marker identifying
//! its protection generation. Classification is a pure prefix check over the
//! stored bytes -- no external state, no decryption -- and is total:
//! unrecognized bytes classify as [`Classification::Unknown`], never as
//! plaintext.
//!
//! On-disk layouts after the marker:
//! - `PLAIN:` -- the secret in the clear (deliberate, logged degradation).
//! - `ENC1:`  -- legacy single-key format: `nonce(12) || ciphertext_with_tag`.
//! - `KS1:`   -- keystore format: `key_version(4, LE) || nonce(12) ||
//!   ciphertext_with_tag`, decryptable knowing only the owning entity.

use clonr_core::ClonrError;

use crate::crypto::NONCE_SIZE;

/// Marker prefix for plaintext envelopes.
pub const MARKER_OPEN: &[u8] = b"PLAIN:";
/// Marker prefix for legacy single-key envelopes.
pub const MARKER_ENCRYPTED: &[u8] = b"ENC1:";
/// Marker prefix for keystore envelopes.
pub const MARKER_KEYSTORE: &[u8] = b"KS1:";

/// Protection generation of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeTag {
    /// Secret stored in the clear.
    Open,
    /// Legacy single-layer ciphertext (no per-entity DEK).
    Encrypted,
    /// Ciphertext under a keystore-managed per-entity DEK.
    Keystore,
}

impl EnvelopeTag {
    fn marker(self) -> &'static [u8] {
        match self {
            EnvelopeTag::Open => MARKER_OPEN,
            EnvelopeTag::Encrypted => MARKER_ENCRYPTED,
            EnvelopeTag::Keystore => MARKER_KEYSTORE,
        }
    }
}

/// Outcome of classifying arbitrary stored bytes.
///
/// One exhaustive enum instead of parallel `is_*` predicates: a new
/// generation is added by extending the match in [`classify`], and callers
/// cannot observe disagreeing answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Open,
    Encrypted,
    Keystore,
    /// Unrecognized prefix -- possibly a future format. Distinct from a
    /// decryption failure so operators can tell the two apart.
    Unknown,
}

impl Classification {
    /// Display label for status output. Always derived from the stored
    /// bytes, never persisted, so it cannot drift from the envelope.
    pub fn storage_kind(self) -> &'static str {
        match self {
            Classification::Open => "plaintext",
            Classification::Encrypted => "encrypted (legacy)",
            Classification::Keystore => "keystore",
            Classification::Unknown => "unknown",
        }
    }
}

/// Classify stored bytes by marker prefix. Total over arbitrary input.
pub fn classify(bytes: &[u8]) -> Classification {
    if bytes.starts_with(MARKER_OPEN) {
        Classification::Open
    } else if bytes.starts_with(MARKER_ENCRYPTED) {
        Classification::Encrypted
    } else if bytes.starts_with(MARKER_KEYSTORE) {
        Classification::Keystore
    } else {
        Classification::Unknown
    }
}

/// A tagged secret container.
///
/// Envelopes are immutable: re-encryption (rotation, migration) produces a
/// new envelope that replaces the old one wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub tag: EnvelopeTag,
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Wrap a payload under a tag.
    pub fn wrap(tag: EnvelopeTag, payload: Vec<u8>) -> Self {
        Self { tag, payload }
    }

    /// Serialize for storage: marker prefix followed by the payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let marker = self.tag.marker();
        let mut out = Vec::with_capacity(marker.len() + self.payload.len());
        out.extend_from_slice(marker);
        out.extend_from_slice(&self.payload);
        out
    }

    /// Parse stored bytes back into a tagged envelope.
    ///
    /// Unrecognized prefixes are an explicit error, never a silent
    /// plaintext interpretation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ClonrError> {
        let (tag, marker) = match classify(bytes) {
            Classification::Open => (EnvelopeTag::Open, MARKER_OPEN),
            Classification::Encrypted => (EnvelopeTag::Encrypted, MARKER_ENCRYPTED),
            Classification::Keystore => (EnvelopeTag::Keystore, MARKER_KEYSTORE),
            Classification::Unknown => return Err(ClonrError::UnknownEnvelopeFormat),
        };
        Ok(Self {
            tag,
            payload: bytes[marker.len()..].to_vec(),
        })
    }
}

/// Keystore payload framing: which DEK generation, which nonce, what bytes.
#[derive(Debug)]
pub(crate) struct KeystoreFraming {
    pub key_version: u32,
    pub nonce: [u8; NONCE_SIZE],
    pub ciphertext: Vec<u8>,
}

pub(crate) fn encode_keystore_payload(
    key_version: u32,
    nonce: [u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&key_version.to_le_bytes());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(ciphertext);
    out
}

/// Parse keystore framing. Truncated framing is corruption, reported the
/// same way as a failed authentication.
pub(crate) fn parse_keystore_payload(payload: &[u8]) -> Result<KeystoreFraming, ClonrError> {
    if payload.len() < 4 + NONCE_SIZE {
        return Err(ClonrError::WrongSecretOrCorrupted);
    }
    let mut version_bytes = [0u8; 4];
    version_bytes.copy_from_slice(&payload[..4]);
    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(&payload[4..4 + NONCE_SIZE]);
    Ok(KeystoreFraming {
        key_version: u32::from_le_bytes(version_bytes),
        nonce,
        ciphertext: payload[4 + NONCE_SIZE..].to_vec(),
    })
}

/// Parse legacy framing: `nonce(12) || ciphertext_with_tag`.
pub(crate) fn parse_legacy_payload(
    payload: &[u8],
) -> Result<([u8; NONCE_SIZE], Vec<u8>), ClonrError> {
    if payload.len() < NONCE_SIZE {
        return Err(ClonrError::WrongSecretOrCorrupted);
    }
    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(&payload[..NONCE_SIZE]);
    Ok((nonce, payload[NONCE_SIZE..].to_vec()))
}
