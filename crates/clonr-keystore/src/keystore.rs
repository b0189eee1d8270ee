// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keystore lifecycle: init, encrypt, decrypt, rotate.
//!
//! One DEK per protected entity, wrapped under a single root secret held by
//! the active [`Sealer`]. Rotation inserts a new DEK generation and leaves
//! every stored ciphertext valid under the generation that produced it; the
//! envelope framing records which generation to unwrap at decrypt time.
//!
//! The keystore holds no per-record state between calls: it receives an
//! envelope, transforms it, and returns a new one. Writers (init, first
//! encrypt, rotate) go through IMMEDIATE transactions in the storage layer
//! so concurrent CLI invocations cannot interleave.

use clonr_core::ClonrError;
use clonr_storage::{queries::keystore as keys, Database, EntityKeyInfo};
use secrecy::SecretString;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::crypto::{self, KEY_SIZE};
use crate::envelope::{
    encode_keystore_payload, parse_keystore_payload, parse_legacy_payload, Envelope, EnvelopeTag,
};
use crate::sealer::{Sealer, SealerBackend, LEGACY_MASTER_ENTRY, ROOT_SECRET_ENTRY};

/// The unlocked keystore, holding the root secret in memory.
///
/// Debug output intentionally omits the root secret.
pub struct Keystore {
    db: Database,
    sealer: Box<dyn Sealer>,
    /// The unwrapped root secret -- only in memory, never in the database.
    root_key: Zeroizing<[u8; KEY_SIZE]>,
}

impl std::fmt::Debug for Keystore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keystore")
            .field("backend", &self.sealer.backend())
            .field("root_key", &"[REDACTED]")
            .finish()
    }
}

impl Keystore {
    /// Check whether a root secret exists under the given sealer.
    pub fn is_initialized(sealer: &dyn Sealer) -> Result<bool, ClonrError> {
        Ok(sealer.load(ROOT_SECRET_ENTRY)?.is_some())
    }

    /// Generate and seal a fresh root secret.
    ///
    /// Refuses to re-key an already-initialized keystore: that would orphan
    /// every wrapped DEK.
    pub async fn init(db: Database, sealer: Box<dyn Sealer>) -> Result<Self, ClonrError> {
        if sealer.load(ROOT_SECRET_ENTRY)?.is_some() {
            return Err(ClonrError::Keystore(
                "keystore is already initialized -- run `clonr keystore reset` first if you \
                 really want to discard all protected credentials"
                    .to_string(),
            ));
        }

        let root_key = crypto::generate_random_key()?;
        sealer.store(ROOT_SECRET_ENTRY, root_key.as_ref())?;
        keys::meta_put(
            &db,
            "initialized_at",
            chrono::Utc::now().to_rfc3339().into_bytes(),
        )
        .await?;

        info!(backend = %sealer.backend(), "keystore initialized");
        Ok(Self {
            db,
            sealer,
            root_key,
        })
    }

    /// Open an initialized keystore by loading the sealed root secret.
    pub async fn open(db: Database, sealer: Box<dyn Sealer>) -> Result<Self, ClonrError> {
        let root = sealer.load(ROOT_SECRET_ENTRY)?.ok_or_else(|| {
            ClonrError::Keystore(
                "keystore is not initialized -- run `clonr keystore init`".to_string(),
            )
        })?;
        let root_key: [u8; KEY_SIZE] = root.as_slice().try_into().map_err(|_| {
            ClonrError::Keystore("sealed root secret has wrong length (expected 32 bytes)".into())
        })?;

        debug!(backend = %sealer.backend(), "keystore opened");
        Ok(Self {
            db,
            sealer,
            root_key: Zeroizing::new(root_key),
        })
    }

    /// Whether the root secret is sealed to host hardware (OS keychain) as
    /// opposed to the software file fallback.
    pub fn capability_available(&self) -> bool {
        self.sealer.backend() == SealerBackend::Keychain
    }

    /// The active sealing backend, for status output.
    pub fn backend(&self) -> SealerBackend {
        self.sealer.backend()
    }

    /// Encrypt a secret for `entity`, tagged `Keystore`.
    ///
    /// Generates the entity's DEK on first use. `context` (host/registry)
    /// is bound as authenticated data, not stored in the envelope.
    pub async fn encrypt(
        &self,
        entity: &str,
        context: &str,
        plaintext: &[u8],
    ) -> Result<Envelope, ClonrError> {
        // A candidate DEK for the get-or-create; discarded if the entity
        // already has key material.
        let candidate = crypto::generate_random_key()?;
        let (candidate_wrapped, candidate_nonce) =
            crypto::seal(&self.root_key, entity.as_bytes(), candidate.as_ref())?;

        let (info, dek_row) = keys::ensure_entity_dek(
            &self.db,
            entity,
            candidate_wrapped,
            candidate_nonce.to_vec(),
        )
        .await?;

        let dek = self.unwrap_dek(entity, &dek_row.wrap_nonce, &dek_row.wrapped_dek)?;
        let (ciphertext, nonce) = crypto::seal(&dek, context.as_bytes(), plaintext)?;

        debug!(entity = %entity, key_version = info.current_version, "secret encrypted");
        Ok(Envelope::wrap(
            EnvelopeTag::Keystore,
            encode_keystore_payload(info.current_version, nonce, &ciphertext),
        ))
    }

    /// Decrypt an envelope for `entity`, dispatching on its tag.
    ///
    /// Error categories are distinct per failure: a missing sealer entry is
    /// `CapabilityUnavailable`, a failed authentication is
    /// `WrongSecretOrCorrupted`, and an unrecognized marker never reaches
    /// here (classification rejects it as `UnknownEnvelopeFormat`).
    pub async fn decrypt(
        &self,
        entity: &str,
        context: &str,
        envelope: &Envelope,
    ) -> Result<SecretString, ClonrError> {
        let plaintext = match envelope.tag {
            EnvelopeTag::Open => Zeroizing::new(envelope.payload.clone()),
            EnvelopeTag::Encrypted => {
                let legacy = self.sealer.load(LEGACY_MASTER_ENTRY)?.ok_or_else(|| {
                    ClonrError::CapabilityUnavailable(
                        "legacy master key is not present on this host -- the envelope was \
                         produced elsewhere"
                            .to_string(),
                    )
                })?;
                let legacy_key: [u8; KEY_SIZE] =
                    legacy.as_slice().try_into().map_err(|_| {
                        ClonrError::Keystore(
                            "legacy master key has wrong length (expected 32 bytes)".into(),
                        )
                    })?;
                let (nonce, ciphertext) = parse_legacy_payload(&envelope.payload)?;
                // Legacy envelopes predate context binding.
                crypto::open(&legacy_key, b"", &nonce, &ciphertext)?
            }
            EnvelopeTag::Keystore => {
                let framing = parse_keystore_payload(&envelope.payload)?;
                let dek_row = keys::get_dek(&self.db, entity, framing.key_version)
                    .await?
                    .ok_or_else(|| {
                        ClonrError::Keystore(format!(
                            "no key generation {} for entity `{entity}` -- the envelope does \
                             not belong to this keystore",
                            framing.key_version
                        ))
                    })?;
                let dek = self.unwrap_dek(entity, &dek_row.wrap_nonce, &dek_row.wrapped_dek)?;
                crypto::open(&dek, context.as_bytes(), &framing.nonce, &framing.ciphertext)?
            }
        };

        let value = String::from_utf8(plaintext.to_vec()).map_err(|_| {
            ClonrError::Keystore("decrypted value is not valid UTF-8".to_string())
        })?;
        Ok(SecretString::from(value))
    }

    /// Parse stored bytes and decrypt in one step.
    pub async fn decrypt_bytes(
        &self,
        entity: &str,
        context: &str,
        stored: &[u8],
    ) -> Result<SecretString, ClonrError> {
        let envelope = Envelope::from_bytes(stored)?;
        self.decrypt(entity, context, &envelope).await
    }

    /// Issue a new DEK generation for `entity`.
    ///
    /// Stored envelopes are not touched: ciphertexts under older generations
    /// remain decryptable. Only new encryptions use the new DEK.
    pub async fn rotate(&self, entity: &str) -> Result<EntityKeyInfo, ClonrError> {
        let new_dek = crypto::generate_random_key()?;
        let (wrapped, nonce) = crypto::seal(&self.root_key, entity.as_bytes(), new_dek.as_ref())?;

        let info = keys::rotate_entity(&self.db, entity, wrapped, nonce.to_vec())
            .await?
            .ok_or_else(|| {
                ClonrError::Keystore(format!(
                    "entity `{entity}` has no key material -- nothing to rotate"
                ))
            })?;

        info!(entity = %entity, version = info.current_version, "DEK rotated");
        Ok(info)
    }

    /// Destroy all key material: DEK table, metadata, and sealed secrets.
    pub async fn reset(db: &Database, sealer: &dyn Sealer) -> Result<(), ClonrError> {
        keys::clear_keystore(db).await?;
        sealer.remove(ROOT_SECRET_ENTRY)?;
        sealer.remove(LEGACY_MASTER_ENTRY)?;
        info!("keystore reset -- all key material destroyed");
        Ok(())
    }

    fn unwrap_dek(
        &self,
        entity: &str,
        wrap_nonce: &[u8],
        wrapped_dek: &[u8],
    ) -> Result<Zeroizing<[u8; KEY_SIZE]>, ClonrError> {
        let nonce: [u8; crypto::NONCE_SIZE] = wrap_nonce.try_into().map_err(|_| {
            ClonrError::Keystore("corrupted DEK wrap nonce (expected 12 bytes)".to_string())
        })?;
        let dek_bytes = crypto::open(&self.root_key, entity.as_bytes(), &nonce, wrapped_dek)?;
        let dek: [u8; KEY_SIZE] = dek_bytes.as_slice().try_into().map_err(|_| {
            ClonrError::Keystore("unwrapped DEK has wrong length (expected 32 bytes)".to_string())
        })?;
        Ok(Zeroizing::new(dek))
    }
}

/// Mask a secret value for display: `ghp_...wxyz` format.
///
/// Shows up to 4 leading and 4 trailing characters with `...` in between.
/// Short values (< 10 chars) are fully masked as `****`.
pub fn mask_secret(value: &str) -> String {
    if value.len() < 10 {
        return "****".to_string();
    }
    let prefix = &value[..4.min(value.len())];
    let suffix = &value[value.len().saturating_sub(4)..];
    format!("{prefix}...{suffix}")
}
