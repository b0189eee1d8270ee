// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `clonr backup` command implementations.
//!
//! Export with secrets first normalizes every envelope to the current
//! keystore generation, so a bundle never carries a mixed-generation token
//! set; `--exclude-secrets` skips normalization entirely.

use std::path::Path;

use clonr_backup::{apply_bundle, collect_bundle, open_bundle, seal_bundle};
use clonr_config::ClonrConfig;
use clonr_core::ClonrError;
use clonr_keystore::{prompt, MigrationEngine};
use tokio::io::AsyncReadExt;
use tracing::warn;

use crate::runtime;

/// `clonr backup export [--exclude-secrets] [--output <path>]`
pub async fn run_export(
    config: &ClonrConfig,
    exclude_secrets: bool,
    output: Option<&Path>,
) -> Result<(), ClonrError> {
    let db = runtime::open_database(config).await?;

    if !exclude_secrets {
        match runtime::open_keystore_if_initialized(config, &db).await? {
            Some(keystore) => {
                let report = MigrationEngine::new(&keystore, &db).migrate(false).await?;
                if !report.is_clean() {
                    for failure in &report.failed {
                        eprintln!("  cannot normalize {}: {}", failure.record, failure.reason);
                    }
                    return Err(ClonrError::Keystore(
                        "some envelopes could not be normalized to the current generation -- \
                         fix them or export with --exclude-secrets"
                            .to_string(),
                    ));
                }
            }
            None => {
                warn!("keystore not initialized -- exporting envelopes as stored");
            }
        }
    }

    // Passphrase discipline before any cryptographic work: twice, matched,
    // minimum length.
    let passphrase = prompt::get_backup_passphrase_with_confirm()?;

    let bundle = collect_bundle(&db, !exclude_secrets).await?;
    let armored = seal_bundle(&bundle, &passphrase)?;

    match output {
        Some(path) => {
            tokio::fs::write(path, format!("{armored}\n"))
                .await
                .map_err(|e| ClonrError::Storage {
                    source: Box::new(e),
                })?;
            eprintln!("Backup written to {}.", path.display());
        }
        None => println!("{armored}"),
    }
    Ok(())
}

/// `clonr backup import [--file <path>] [--merge]`
pub async fn run_import(
    config: &ClonrConfig,
    file: Option<&Path>,
    merge: bool,
) -> Result<(), ClonrError> {
    let armored = match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ClonrError::Storage {
                source: Box::new(e),
            })?,
        None => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .map_err(|e| ClonrError::Storage {
                    source: Box::new(e),
                })?;
            buffer
        }
    };
    if armored.trim().is_empty() {
        return Err(ClonrError::Backup(
            "no backup data supplied -- pass --file or pipe a CLONR: string on stdin".to_string(),
        ));
    }

    let passphrase = prompt::get_backup_passphrase()?;
    let bundle = open_bundle(&armored, &passphrase)?;

    let db = runtime::open_database(config).await?;
    let summary = apply_bundle(&db, &bundle, merge).await?;

    eprintln!(
        "Imported {} profiles, {} docker profiles, {} workspaces, {} repositories.",
        summary.profiles_imported,
        summary.docker_profiles_imported,
        summary.workspaces_imported,
        summary.repositories_imported
    );
    if summary.kept_existing > 0 {
        eprintln!("Kept {} existing records (--merge).", summary.kept_existing);
    }
    if summary.redacted_skipped > 0 {
        eprintln!(
            "Skipped {} profiles exported without secrets; re-authenticate them.",
            summary.redacted_skipped
        );
    }
    Ok(())
}
