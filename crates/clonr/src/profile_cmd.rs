// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `clonr profile` command implementations.

use chrono::Utc;
use clonr_config::ClonrConfig;
use clonr_core::ClonrError;
use clonr_keystore::{classify, mask_secret, Classification, Envelope, EnvelopeTag};
use clonr_storage::{queries::profiles, Profile};
use secrecy::ExposeSecret;
use tracing::warn;

use crate::runtime;

/// `clonr profile add <name> <host> [--token <value>]`
pub async fn run_add(
    config: &ClonrConfig,
    name: &str,
    host: &str,
    token: Option<String>,
) -> Result<(), ClonrError> {
    let token = match token {
        Some(token) => token,
        None => {
            eprint!("Token for {host}: ");
            rpassword_read()?
        }
    };
    if token.is_empty() {
        return Err(ClonrError::Keystore("empty token not allowed".to_string()));
    }

    let db = runtime::open_database(config).await?;
    let envelope = match runtime::open_keystore_if_initialized(config, &db).await? {
        Some(keystore) => keystore.encrypt(name, host, token.as_bytes()).await?,
        None => {
            // Deliberate, visible degradation: without a keystore the token
            // is stored in the clear and tagged as such.
            warn!(profile = %name, "keystore not initialized -- storing token as plaintext");
            eprintln!(
                "Warning: keystore not initialized; token stored unprotected. \
                 Run `clonr keystore init` then `clonr keystore migrate`."
            );
            Envelope::wrap(EnvelopeTag::Open, token.into_bytes())
        }
    };

    let now = Utc::now();
    profiles::upsert_profile(
        &db,
        &Profile {
            name: name.to_string(),
            host: host.to_string(),
            token: envelope.to_bytes(),
            created_at: now,
            updated_at: now,
        },
    )
    .await?;
    eprintln!("Profile `{name}` saved for {host}.");
    Ok(())
}

/// `clonr profile list`
pub async fn run_list(config: &ClonrConfig) -> Result<(), ClonrError> {
    let db = runtime::open_database(config).await?;
    let keystore = runtime::open_keystore_if_initialized(config, &db).await?;

    for profile in profiles::list_profiles(&db).await? {
        let classification = classify(&profile.token);
        // Preview decrypts only what is actually decryptable here; a failed
        // decrypt must not fail the listing.
        let preview = match (&keystore, classification) {
            (Some(ks), Classification::Keystore | Classification::Encrypted) => ks
                .decrypt_bytes(&profile.name, &profile.host, &profile.token)
                .await
                .map(|t| mask_secret(t.expose_secret()))
                .unwrap_or_else(|_| "[cannot decrypt]".to_string()),
            (None, Classification::Keystore | Classification::Encrypted) => {
                "[locked]".to_string()
            }
            (_, Classification::Open) => Envelope::from_bytes(&profile.token)
                .ok()
                .and_then(|e| String::from_utf8(e.payload).ok())
                .map(|t| mask_secret(&t))
                .unwrap_or_else(|| "[unreadable]".to_string()),
            (_, Classification::Unknown) => "[unknown format]".to_string(),
        };
        println!(
            "{}  {}  {}  {}",
            profile.name,
            profile.host,
            classification.storage_kind(),
            preview
        );
    }
    Ok(())
}

/// `clonr profile remove <name>`
pub async fn run_remove(config: &ClonrConfig, name: &str) -> Result<(), ClonrError> {
    let db = runtime::open_database(config).await?;
    profiles::delete_profile(&db, name).await?;
    eprintln!("Profile `{name}` removed.");
    Ok(())
}

fn rpassword_read() -> Result<String, ClonrError> {
    rpassword::read_password()
        .map_err(|e| ClonrError::Keystore(format!("failed to read token: {e}")))
}
