// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch migration of credential envelopes to the current generation.
//!
//! Walks every credential-bearing record, classifies its envelope, and
//! re-encrypts older generations through the keystore. Each record is an
//! independent transaction: decrypt, re-encrypt, persist, then move on. A
//! failure on one record is recorded and the batch continues -- partial
//! failure isolation is the central contract here.

use clonr_core::ClonrError;
use clonr_storage::{queries::profiles, Database};
use secrecy::ExposeSecret;
use tracing::{info, warn};

use crate::envelope::{classify, Classification, Envelope, EnvelopeTag};
use crate::keystore::Keystore;

/// Report of what a migration run did (or, for a dry run, would do).
#[derive(Debug, Default)]
pub struct MigrationReport {
    /// Records re-encrypted into the current generation.
    pub migrated: Vec<String>,
    /// Records already current (skipped).
    pub skipped: Vec<String>,
    /// Records that failed, with the reason. The batch continued past them.
    pub failed: Vec<MigrationFailure>,
}

/// One record that could not be migrated.
#[derive(Debug)]
pub struct MigrationFailure {
    pub record: String,
    pub reason: String,
}

impl MigrationReport {
    /// True when nothing failed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Re-encrypts stored envelopes into the current keystore generation.
pub struct MigrationEngine<'a> {
    keystore: &'a Keystore,
    db: &'a Database,
}

impl<'a> MigrationEngine<'a> {
    pub fn new(keystore: &'a Keystore, db: &'a Database) -> Self {
        Self { keystore, db }
    }

    /// Migrate all profiles and docker profiles.
    ///
    /// With `dry_run`, records are classified and bucketed by intended
    /// action; nothing is decrypted, encrypted, or persisted.
    ///
    /// Returns an error only when at least one record needed migration and
    /// none succeeded; any other mix of outcomes is a successful batch with
    /// the details in the report.
    pub async fn migrate(&self, dry_run: bool) -> Result<MigrationReport, ClonrError> {
        self.run(dry_run, true).await
    }

    /// Migrate service profiles only, leaving docker profiles untouched.
    pub async fn migrate_profiles_only(
        &self,
        dry_run: bool,
    ) -> Result<MigrationReport, ClonrError> {
        self.run(dry_run, false).await
    }

    async fn run(&self, dry_run: bool, include_docker: bool) -> Result<MigrationReport, ClonrError> {
        let mut report = MigrationReport::default();

        for profile in profiles::list_profiles(self.db).await? {
            self.migrate_record(
                &mut report,
                dry_run,
                profile.name.clone(),
                &profile.name,
                &profile.host,
                &profile.token,
                RecordKind::Profile,
            )
            .await;
        }

        if include_docker {
            for docker in profiles::list_docker_profiles(self.db).await? {
                // Docker profiles get their own entity namespace so a profile
                // and a docker profile sharing a name do not share a DEK.
                let entity = format!("docker/{}", docker.name);
                self.migrate_record(
                    &mut report,
                    dry_run,
                    entity,
                    &docker.name,
                    &docker.registry,
                    &docker.password,
                    RecordKind::Docker,
                )
                .await;
            }
        }

        let attempted = report.migrated.len() + report.failed.len();
        if !dry_run && attempted > 0 && report.migrated.is_empty() {
            return Err(ClonrError::PartialMigrationFailure {
                attempted,
                failed: report.failed.len(),
            });
        }

        info!(
            migrated = report.migrated.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            dry_run,
            "migration finished"
        );
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    async fn migrate_record(
        &self,
        report: &mut MigrationReport,
        dry_run: bool,
        entity: String,
        name: &str,
        context: &str,
        stored: &[u8],
        kind: RecordKind,
    ) {
        // The entity id doubles as the record id in reports: profile names
        // are already unique, and docker profiles carry the `docker/` prefix.
        let record_id = entity.clone();

        match classify(stored) {
            Classification::Keystore => {
                report.skipped.push(record_id);
            }
            Classification::Unknown => {
                warn!(record = %record_id, "unrecognized envelope format -- cannot migrate");
                report.failed.push(MigrationFailure {
                    record: record_id,
                    reason: ClonrError::UnknownEnvelopeFormat.to_string(),
                });
            }
            Classification::Open | Classification::Encrypted => {
                if dry_run {
                    report.migrated.push(record_id);
                    return;
                }
                match self.reencrypt(&entity, name, context, stored, kind).await {
                    Ok(()) => {
                        info!(record = %record_id, "envelope migrated to keystore generation");
                        report.migrated.push(record_id);
                    }
                    Err(e) => {
                        warn!(record = %record_id, error = %e, "migration failed -- continuing");
                        report.failed.push(MigrationFailure {
                            record: record_id,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }
    }

    /// Decrypt one old-generation envelope, re-encrypt, and persist it
    /// before returning -- a crash leaves at most this record in flight.
    async fn reencrypt(
        &self,
        entity: &str,
        name: &str,
        context: &str,
        stored: &[u8],
        kind: RecordKind,
    ) -> Result<(), ClonrError> {
        let envelope = Envelope::from_bytes(stored)?;
        let plaintext = self.keystore.decrypt(entity, context, &envelope).await?;
        let replacement = self
            .keystore
            .encrypt(entity, context, plaintext.expose_secret().as_bytes())
            .await?;
        debug_assert_eq!(replacement.tag, EnvelopeTag::Keystore);

        let bytes = replacement.to_bytes();
        match kind {
            RecordKind::Profile => profiles::update_profile_token(self.db, name, bytes).await,
            RecordKind::Docker => profiles::update_docker_password(self.db, name, bytes).await,
        }
    }
}

#[derive(Clone, Copy)]
enum RecordKind {
    Profile,
    Docker,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto;
    use crate::sealer::{FileSealer, Sealer, LEGACY_MASTER_ENTRY};
    use chrono::Utc;
    use clonr_storage::Profile;
    use secrecy::ExposeSecret;

    async fn open_test_keystore() -> (Keystore, Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let sealer = Box::new(FileSealer::new(dir.path()));
        let keystore = Keystore::init(db.clone(), sealer).await.unwrap();
        (keystore, db, dir)
    }

    async fn insert_open_profile(db: &Database, name: &str, host: &str, token: &str) {
        let now = Utc::now();
        let envelope = Envelope::wrap(EnvelopeTag::Open, token.as_bytes().to_vec());
        profiles::upsert_profile(
            db,
            &Profile {
                name: name.to_string(),
                host: host.to_string(),
                token: envelope.to_bytes(),
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn migrates_open_records_and_preserves_plaintext() {
        let (keystore, db, _dir) = open_test_keystore().await;
        insert_open_profile(&db, "work", "github.com", "ghp_open_token").await;

        let report = MigrationEngine::new(&keystore, &db)
            .migrate(false)
            .await
            .unwrap();
        assert_eq!(report.migrated, vec!["work"]);
        assert!(report.skipped.is_empty());
        assert!(report.is_clean());

        // The stored envelope is now keystore-tagged and decrypts to the
        // original plaintext.
        let stored = profiles::get_profile(&db, "work").await.unwrap().unwrap();
        assert_eq!(classify(&stored.token), Classification::Keystore);
        let plaintext = keystore
            .decrypt_bytes("work", "github.com", &stored.token)
            .await
            .unwrap();
        assert_eq!(plaintext.expose_secret(), "ghp_open_token");
    }

    #[tokio::test]
    async fn second_run_is_all_skipped() {
        let (keystore, db, _dir) = open_test_keystore().await;
        insert_open_profile(&db, "work", "github.com", "ghp_token").await;
        insert_open_profile(&db, "oss", "github.com", "ghp_other").await;

        let engine = MigrationEngine::new(&keystore, &db);
        let first = engine.migrate(false).await.unwrap();
        assert_eq!(first.migrated.len(), 2);

        let second = engine.migrate(false).await.unwrap();
        assert!(second.migrated.is_empty());
        assert_eq!(second.skipped.len(), 2);
        assert!(second.failed.is_empty());
    }

    #[tokio::test]
    async fn one_corrupted_record_does_not_fail_the_batch() {
        let (keystore, db, _dir) = open_test_keystore().await;
        insert_open_profile(&db, "alpha", "github.com", "token-a").await;
        insert_open_profile(&db, "beta", "github.com", "token-b").await;
        insert_open_profile(&db, "gamma", "github.com", "token-c").await;

        // Corrupt one record with a legacy envelope no host can decrypt
        // (no legacy master key is present).
        let now = Utc::now();
        profiles::upsert_profile(
            &db,
            &Profile {
                name: "beta".to_string(),
                host: "github.com".to_string(),
                token: Envelope::wrap(EnvelopeTag::Encrypted, vec![0u8; 40]).to_bytes(),
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();

        let report = MigrationEngine::new(&keystore, &db)
            .migrate(false)
            .await
            .unwrap();
        assert_eq!(report.migrated.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].record, "beta");
        assert!(report.failed[0].reason.contains("capability"));
    }

    #[tokio::test]
    async fn all_failures_escalate_to_an_error() {
        let (keystore, db, _dir) = open_test_keystore().await;
        let now = Utc::now();
        profiles::upsert_profile(
            &db,
            &Profile {
                name: "only".to_string(),
                host: "github.com".to_string(),
                token: b"???:not-an-envelope".to_vec(),
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();

        let result = MigrationEngine::new(&keystore, &db).migrate(false).await;
        assert!(matches!(
            result,
            Err(ClonrError::PartialMigrationFailure {
                attempted: 1,
                failed: 1
            })
        ));
    }

    #[tokio::test]
    async fn dry_run_reports_without_touching_records() {
        let (keystore, db, _dir) = open_test_keystore().await;
        insert_open_profile(&db, "work", "github.com", "ghp_token").await;

        let report = MigrationEngine::new(&keystore, &db)
            .migrate(true)
            .await
            .unwrap();
        assert_eq!(report.migrated, vec!["work"]);

        // Still plaintext on disk.
        let stored = profiles::get_profile(&db, "work").await.unwrap().unwrap();
        assert_eq!(classify(&stored.token), Classification::Open);
    }

    #[tokio::test]
    async fn migrates_legacy_records_when_master_key_present() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let sealer = FileSealer::new(dir.path());

        let legacy_key = crypto::generate_random_key().unwrap();
        sealer.store(LEGACY_MASTER_ENTRY, legacy_key.as_ref()).unwrap();
        let (ciphertext, nonce) = crypto::seal(&legacy_key, b"", b"legacy-token").unwrap();
        let mut payload = nonce.to_vec();
        payload.extend_from_slice(&ciphertext);

        let now = Utc::now();
        profiles::upsert_profile(
            &db,
            &Profile {
                name: "old".to_string(),
                host: "github.com".to_string(),
                token: Envelope::wrap(EnvelopeTag::Encrypted, payload).to_bytes(),
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();

        let keystore = Keystore::init(db.clone(), Box::new(sealer)).await.unwrap();
        let report = MigrationEngine::new(&keystore, &db)
            .migrate(false)
            .await
            .unwrap();
        assert_eq!(report.migrated, vec!["old"]);

        let stored = profiles::get_profile(&db, "old").await.unwrap().unwrap();
        let plaintext = keystore
            .decrypt_bytes("old", "github.com", &stored.token)
            .await
            .unwrap();
        assert_eq!(plaintext.expose_secret(), "legacy-token");
    }

    #[tokio::test]
    async fn docker_profiles_use_their_own_entity_namespace() {
        let (keystore, db, _dir) = open_test_keystore().await;
        let now = Utc::now();
        clonr_storage::queries::profiles::upsert_docker_profile(
            &db,
            &clonr_storage::DockerProfile {
                name: "hub".to_string(),
                registry: "registry-1.docker.io".to_string(),
                password: Envelope::wrap(EnvelopeTag::Open, b"hunter2".to_vec()).to_bytes(),
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();

        let report = MigrationEngine::new(&keystore, &db)
            .migrate(false)
            .await
            .unwrap();
        assert_eq!(report.migrated, vec!["docker/hub"]);

        let stored = clonr_storage::queries::profiles::get_docker_profile(&db, "hub")
            .await
            .unwrap()
            .unwrap();
        let plaintext = keystore
            .decrypt_bytes("docker/hub", "registry-1.docker.io", &stored.password)
            .await
            .unwrap();
        assert_eq!(plaintext.expose_secret(), "hunter2");
    }

    #[tokio::test]
    async fn profiles_only_scope_leaves_docker_records_alone() {
        let (keystore, db, _dir) = open_test_keystore().await;
        insert_open_profile(&db, "work", "github.com", "ghp_token").await;
        let now = Utc::now();
        clonr_storage::queries::profiles::upsert_docker_profile(
            &db,
            &clonr_storage::DockerProfile {
                name: "hub".to_string(),
                registry: "registry-1.docker.io".to_string(),
                password: Envelope::wrap(EnvelopeTag::Open, b"hunter2".to_vec()).to_bytes(),
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();

        let report = MigrationEngine::new(&keystore, &db)
            .migrate_profiles_only(false)
            .await
            .unwrap();
        assert_eq!(report.migrated, vec!["work"]);

        let docker = clonr_storage::queries::profiles::get_docker_profile(&db, "hub")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(classify(&docker.password), Classification::Open);
    }
}
