// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared wiring: database, sealer, and keystore construction from config.

use std::path::PathBuf;

use clonr_config::ClonrConfig;
use clonr_core::ClonrError;
use clonr_keystore::{select_sealer, Keystore, Sealer};
use clonr_storage::Database;

/// Open the configured database.
pub async fn open_database(config: &ClonrConfig) -> Result<Database, ClonrError> {
    Database::open(&config.storage.database_path).await
}

/// Directory for file-backed sealer entries: configured, or `keys/` next to
/// the database.
pub fn sealer_dir(config: &ClonrConfig) -> PathBuf {
    if let Some(dir) = &config.keystore.sealer_dir {
        return PathBuf::from(dir);
    }
    let db_path = PathBuf::from(&config.storage.database_path);
    match db_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join("keys"),
        _ => PathBuf::from("keys"),
    }
}

/// Build the configured sealer backend.
pub fn build_sealer(config: &ClonrConfig) -> Result<Box<dyn Sealer>, ClonrError> {
    select_sealer(
        &config.keystore.sealer,
        &config.keystore.service_name,
        &sealer_dir(config),
    )
}

/// Open the keystore if it has been initialized; `None` otherwise.
pub async fn open_keystore_if_initialized(
    config: &ClonrConfig,
    db: &Database,
) -> Result<Option<Keystore>, ClonrError> {
    let sealer = build_sealer(config)?;
    if !Keystore::is_initialized(sealer.as_ref())? {
        return Ok(None);
    }
    Keystore::open(db.clone(), sealer).await.map(Some)
}

/// Open the keystore, failing with remediation text when uninitialized.
pub async fn open_keystore(config: &ClonrConfig, db: &Database) -> Result<Keystore, ClonrError> {
    let sealer = build_sealer(config)?;
    Keystore::open(db.clone(), sealer).await
}
