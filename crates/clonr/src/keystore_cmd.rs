// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `clonr keystore` command implementations.

use clonr_config::ClonrConfig;
use clonr_core::ClonrError;
use clonr_keystore::{classify, prompt, Keystore, MigrationEngine};
use clonr_storage::queries::{keystore as keys, profiles};

use crate::runtime;

/// `clonr keystore init`
pub async fn run_init(config: &ClonrConfig) -> Result<(), ClonrError> {
    let db = runtime::open_database(config).await?;
    let sealer = runtime::build_sealer(config)?;
    let keystore = Keystore::init(db, sealer).await?;

    eprintln!(
        "Keystore initialized (sealing backend: {}).",
        keystore.backend()
    );
    if !keystore.capability_available() {
        eprintln!(
            "Note: the OS keychain is unavailable; the root secret is file-backed. \
             Protect the key directory accordingly."
        );
    }
    Ok(())
}

/// `clonr keystore status`
pub async fn run_status(config: &ClonrConfig) -> Result<(), ClonrError> {
    let db = runtime::open_database(config).await?;
    let sealer = runtime::build_sealer(config)?;

    if !Keystore::is_initialized(sealer.as_ref())? {
        println!("Keystore: not initialized (run `clonr keystore init`)");
        return Ok(());
    }
    println!("Keystore: initialized (sealing backend: {})", sealer.backend());

    let entities = keys::list_entities(&db).await?;
    println!("Entities: {}", entities.len());
    for entity in entities {
        let rotated = entity
            .rotated_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "  {}  v{}  created {}  rotated {}",
            entity.entity,
            entity.current_version,
            entity.created_at.to_rfc3339(),
            rotated
        );
    }

    // Envelope census across all credential-bearing records, derived from
    // the stored bytes alone.
    let mut open = 0usize;
    let mut legacy = 0usize;
    let mut current = 0usize;
    let mut unknown = 0usize;
    for profile in profiles::list_profiles(&db).await? {
        count(classify(&profile.token), &mut open, &mut legacy, &mut current, &mut unknown);
    }
    for docker in profiles::list_docker_profiles(&db).await? {
        count(classify(&docker.password), &mut open, &mut legacy, &mut current, &mut unknown);
    }
    println!(
        "Envelopes: keystore={current} plaintext={open} legacy={legacy} unknown={unknown}"
    );
    if open + legacy > 0 {
        println!("Run `clonr keystore migrate --all` to upgrade older envelopes.");
    }
    Ok(())
}

fn count(
    classification: clonr_keystore::Classification,
    open: &mut usize,
    legacy: &mut usize,
    current: &mut usize,
    unknown: &mut usize,
) {
    use clonr_keystore::Classification;
    match classification {
        Classification::Open => *open += 1,
        Classification::Encrypted => *legacy += 1,
        Classification::Keystore => *current += 1,
        Classification::Unknown => *unknown += 1,
    }
}

/// `clonr keystore reset`
///
/// Declining the confirmation is a successful no-op.
pub async fn run_reset(config: &ClonrConfig) -> Result<(), ClonrError> {
    if !prompt::confirm_destructive(
        "This destroys all key material; keystore-protected tokens become unrecoverable.",
    )? {
        eprintln!("Reset declined.");
        return Ok(());
    }

    let db = runtime::open_database(config).await?;
    let sealer = runtime::build_sealer(config)?;
    Keystore::reset(&db, sealer.as_ref()).await?;
    eprintln!("Keystore reset.");
    Ok(())
}

/// `clonr keystore rotate <entity>`
pub async fn run_rotate(config: &ClonrConfig, entity: &str) -> Result<(), ClonrError> {
    let db = runtime::open_database(config).await?;
    let keystore = runtime::open_keystore(config, &db).await?;

    let info = keystore.rotate(entity).await?;
    eprintln!(
        "Rotated `{}` to key version {}. Existing envelopes remain valid.",
        entity, info.current_version
    );
    Ok(())
}

/// `clonr keystore migrate [--all] [--dry-run]`
pub async fn run_migrate(config: &ClonrConfig, all: bool, dry_run: bool) -> Result<(), ClonrError> {
    let db = runtime::open_database(config).await?;
    let keystore = runtime::open_keystore(config, &db).await?;
    let engine = MigrationEngine::new(&keystore, &db);

    let report = if all {
        engine.migrate(dry_run).await?
    } else {
        engine.migrate_profiles_only(dry_run).await?
    };

    let verb = if dry_run { "would migrate" } else { "migrated" };
    eprintln!(
        "{}: {}  skipped: {}  failed: {}",
        verb,
        report.migrated.len(),
        report.skipped.len(),
        report.failed.len()
    );
    for failure in &report.failed {
        eprintln!("  failed {}: {}", failure.record, failure.reason);
    }
    if !report.is_clean() {
        eprintln!("Re-run with --dry-run to inspect, or fix the listed records and retry.");
    }
    Ok(())
}
