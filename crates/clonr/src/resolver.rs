// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token resolution backed by stored profiles and the keystore.

use async_trait::async_trait;
use clonr_core::{ClonrError, TokenResolver};
use clonr_keystore::{classify, Classification, Envelope, Keystore};
use clonr_storage::{queries::profiles, Database};
use secrecy::SecretString;
use tracing::debug;

/// Resolves a host to the token of the first profile bound to it.
pub struct StoreTokenResolver {
    db: Database,
    keystore: Option<Keystore>,
}

impl StoreTokenResolver {
    pub fn new(db: Database, keystore: Option<Keystore>) -> Self {
        Self { db, keystore }
    }
}

#[async_trait]
impl TokenResolver for StoreTokenResolver {
    async fn resolve(&self, host: &str) -> Result<Option<SecretString>, ClonrError> {
        let Some(profile) = profiles::get_profile_by_host(&self.db, host).await? else {
            return Ok(None);
        };
        debug!(host = %host, profile = %profile.name, "profile matched for host");

        match classify(&profile.token) {
            // Open envelopes need no keystore; resolve even before init.
            Classification::Open => {
                let envelope = Envelope::from_bytes(&profile.token)?;
                let value = String::from_utf8(envelope.payload).map_err(|_| {
                    ClonrError::Keystore("stored token is not valid UTF-8".to_string())
                })?;
                Ok(Some(SecretString::from(value)))
            }
            Classification::Unknown => Err(ClonrError::UnknownEnvelopeFormat),
            Classification::Encrypted | Classification::Keystore => {
                let keystore = self.keystore.as_ref().ok_or_else(|| {
                    ClonrError::Keystore(
                        "profile token is encrypted but the keystore is not initialized -- \
                         run `clonr keystore init`"
                            .to_string(),
                    )
                })?;
                let token = keystore
                    .decrypt_bytes(&profile.name, &profile.host, &profile.token)
                    .await?;
                Ok(Some(token))
            }
        }
    }
}
