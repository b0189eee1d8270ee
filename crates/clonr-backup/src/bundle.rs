// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Versioned export bundles: what goes into a backup and how it comes back.
//!
//! The bundle keeps profile tokens as their already-stored envelope bytes --
//! export never decrypts them. `--exclude-secrets` drops the token bytes
//! entirely; such profiles come back on import as identity-only records the
//! user must re-authenticate.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use clonr_core::ClonrError;
use clonr_storage::{
    queries::{profiles, workspaces},
    Database, DockerProfile, Profile, Repository, Workspace,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{armor, codec};

/// Current bundle format version. Importers reject anything newer.
pub const BUNDLE_VERSION: u32 = 1;

/// A full-database snapshot, serialized as JSON inside one sealed blob.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportBundle {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub profiles: Vec<BundleProfile>,
    pub docker_profiles: Vec<BundleDockerProfile>,
    pub workspaces: Vec<BundleWorkspace>,
    pub repositories: Vec<BundleRepository>,
    pub config: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BundleProfile {
    pub name: String,
    pub host: String,
    /// Stored envelope bytes, base64-armored for JSON; `None` when secrets
    /// were excluded at export time.
    #[serde(with = "opt_b64", default)]
    pub token: Option<Vec<u8>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BundleDockerProfile {
    pub name: String,
    pub registry: String,
    #[serde(with = "opt_b64", default)]
    pub password: Option<Vec<u8>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BundleWorkspace {
    pub name: String,
    pub root_path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BundleRepository {
    pub workspace: String,
    pub name: String,
    pub url: String,
    pub local_path: String,
}

/// What an import actually did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub profiles_imported: usize,
    pub docker_profiles_imported: usize,
    pub workspaces_imported: usize,
    pub repositories_imported: usize,
    /// Records left untouched because `--merge` kept an existing one.
    pub kept_existing: usize,
    /// Profiles skipped because the bundle carried no token for them.
    pub redacted_skipped: usize,
}

/// Snapshot the database into a bundle.
pub async fn collect_bundle(
    db: &Database,
    include_secrets: bool,
) -> Result<ExportBundle, ClonrError> {
    let profiles_out = profiles::list_profiles(db)
        .await?
        .into_iter()
        .map(|p| BundleProfile {
            name: p.name,
            host: p.host,
            token: include_secrets.then_some(p.token),
        })
        .collect();

    let docker_out = profiles::list_docker_profiles(db)
        .await?
        .into_iter()
        .map(|p| BundleDockerProfile {
            name: p.name,
            registry: p.registry,
            password: include_secrets.then_some(p.password),
        })
        .collect();

    let workspaces_out = workspaces::list_workspaces(db)
        .await?
        .into_iter()
        .map(|w| BundleWorkspace {
            name: w.name,
            root_path: w.root_path,
        })
        .collect();

    let repositories_out = workspaces::list_repositories(db)
        .await?
        .into_iter()
        .map(|r| BundleRepository {
            workspace: r.workspace,
            name: r.name,
            url: r.url,
            local_path: r.local_path,
        })
        .collect();

    Ok(ExportBundle {
        version: BUNDLE_VERSION,
        exported_at: Utc::now(),
        profiles: profiles_out,
        docker_profiles: docker_out,
        workspaces: workspaces_out,
        repositories: repositories_out,
        config: workspaces::list_config_values(db).await?,
    })
}

/// Serialize, seal, and armor a bundle into a `CLONR:` string.
pub fn seal_bundle(bundle: &ExportBundle, password: &SecretString) -> Result<String, ClonrError> {
    let json = serde_json::to_vec(bundle)
        .map_err(|e| ClonrError::Internal(format!("bundle serialization failed: {e}")))?;
    let blob = codec::seal(&json, password)?;
    Ok(armor::encode(&blob))
}

/// De-armor, open, and parse a bundle, rejecting unsupported versions.
///
/// The version check happens before any record is applied, so a too-new
/// bundle can never be partially imported.
pub fn open_bundle(text: &str, password: &SecretString) -> Result<ExportBundle, ClonrError> {
    let blob = armor::decode(text)?;
    let json = codec::open(&blob, password)?;
    let bundle: ExportBundle = serde_json::from_slice(&json)
        .map_err(|_| ClonrError::WrongSecretOrCorrupted)?;

    if bundle.version > BUNDLE_VERSION {
        return Err(ClonrError::VersionTooNew {
            found: bundle.version,
            supported: BUNDLE_VERSION,
        });
    }
    Ok(bundle)
}

/// Write a bundle's records into the database.
///
/// With `merge`, existing records win on name collision; without it, the
/// incoming record replaces the stored one.
pub async fn apply_bundle(
    db: &Database,
    bundle: &ExportBundle,
    merge: bool,
) -> Result<ImportSummary, ClonrError> {
    let mut summary = ImportSummary::default();
    let now = Utc::now();

    for p in &bundle.profiles {
        let Some(token) = &p.token else {
            summary.redacted_skipped += 1;
            continue;
        };
        if merge && profiles::get_profile(db, &p.name).await?.is_some() {
            summary.kept_existing += 1;
            continue;
        }
        profiles::upsert_profile(
            db,
            &Profile {
                name: p.name.clone(),
                host: p.host.clone(),
                token: token.clone(),
                created_at: now,
                updated_at: now,
            },
        )
        .await?;
        summary.profiles_imported += 1;
    }

    for p in &bundle.docker_profiles {
        let Some(password) = &p.password else {
            summary.redacted_skipped += 1;
            continue;
        };
        if merge && profiles::get_docker_profile(db, &p.name).await?.is_some() {
            summary.kept_existing += 1;
            continue;
        }
        profiles::upsert_docker_profile(
            db,
            &DockerProfile {
                name: p.name.clone(),
                registry: p.registry.clone(),
                password: password.clone(),
                created_at: now,
                updated_at: now,
            },
        )
        .await?;
        summary.docker_profiles_imported += 1;
    }

    for w in &bundle.workspaces {
        workspaces::upsert_workspace(
            db,
            &Workspace {
                name: w.name.clone(),
                root_path: w.root_path.clone(),
            },
        )
        .await?;
        summary.workspaces_imported += 1;
    }

    for r in &bundle.repositories {
        workspaces::upsert_repository(
            db,
            &Repository {
                workspace: r.workspace.clone(),
                name: r.name.clone(),
                url: r.url.clone(),
                local_path: r.local_path.clone(),
            },
        )
        .await?;
        summary.repositories_imported += 1;
    }

    for (key, value) in &bundle.config {
        workspaces::put_config_value(db, key, value).await?;
    }

    info!(
        profiles = summary.profiles_imported,
        docker_profiles = summary.docker_profiles_imported,
        workspaces = summary.workspaces_imported,
        repositories = summary.repositories_imported,
        kept_existing = summary.kept_existing,
        redacted = summary.redacted_skipped,
        "bundle applied"
    );
    Ok(summary)
}

/// `Option<Vec<u8>>` as base64 text, keeping the JSON readable and compact.
mod opt_b64 {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => serializer.serialize_some(&STANDARD.encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let text: Option<String> = Option::deserialize(deserializer)?;
        match text {
            Some(t) => STANDARD
                .decode(&t)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn password(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    async fn seeded_db() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        let now = Utc::now();
        profiles::upsert_profile(
            &db,
            &Profile {
                name: "work".to_string(),
                host: "github.com".to_string(),
                token: b"KS1:fake-envelope-bytes".to_vec(),
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();
        workspaces::upsert_workspace(
            &db,
            &Workspace {
                name: "platform".to_string(),
                root_path: "/src/platform".to_string(),
            },
        )
        .await
        .unwrap();
        workspaces::upsert_repository(
            &db,
            &Repository {
                workspace: "platform".to_string(),
                name: "api".to_string(),
                url: "https://github.com/acme/api.git".to_string(),
                local_path: "/src/platform/api".to_string(),
            },
        )
        .await
        .unwrap();
        workspaces::put_config_value(&db, "default_workspace", "platform")
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn export_import_roundtrip() {
        let db = seeded_db().await;
        let bundle = collect_bundle(&db, true).await.unwrap();
        let armored = seal_bundle(&bundle, &password("bundle-password")).unwrap();
        assert!(armored.starts_with("CLONR:"));

        let restored = open_bundle(&armored, &password("bundle-password")).unwrap();
        let target = Database::open_in_memory().await.unwrap();
        let summary = apply_bundle(&target, &restored, false).await.unwrap();

        assert_eq!(summary.profiles_imported, 1);
        assert_eq!(summary.workspaces_imported, 1);
        assert_eq!(summary.repositories_imported, 1);

        // Token envelope bytes survive verbatim: export never decrypts.
        let profile = profiles::get_profile(&target, "work").await.unwrap().unwrap();
        assert_eq!(profile.token, b"KS1:fake-envelope-bytes");
        let config = workspaces::list_config_values(&target).await.unwrap();
        assert_eq!(config.get("default_workspace").unwrap(), "platform");
    }

    #[tokio::test]
    async fn wrong_password_fails_to_open() {
        let db = seeded_db().await;
        let bundle = collect_bundle(&db, true).await.unwrap();
        let armored = seal_bundle(&bundle, &password("right-password")).unwrap();

        let result = open_bundle(&armored, &password("wrong-password"));
        assert!(matches!(result, Err(ClonrError::WrongSecretOrCorrupted)));
    }

    #[tokio::test]
    async fn exclude_secrets_drops_tokens() {
        let db = seeded_db().await;
        let bundle = collect_bundle(&db, false).await.unwrap();
        assert!(bundle.profiles[0].token.is_none());

        let target = Database::open_in_memory().await.unwrap();
        let summary = apply_bundle(&target, &bundle, false).await.unwrap();
        assert_eq!(summary.profiles_imported, 0);
        assert_eq!(summary.redacted_skipped, 1);
        assert!(profiles::get_profile(&target, "work").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn too_new_version_is_fatal() {
        let db = seeded_db().await;
        let mut bundle = collect_bundle(&db, true).await.unwrap();
        bundle.version = BUNDLE_VERSION + 1;
        let armored = seal_bundle(&bundle, &password("bundle-password")).unwrap();

        let result = open_bundle(&armored, &password("bundle-password"));
        assert!(matches!(result, Err(ClonrError::VersionTooNew { .. })));
    }

    #[tokio::test]
    async fn merge_keeps_existing_records() {
        let db = seeded_db().await;
        let bundle = collect_bundle(&db, true).await.unwrap();

        // Target already has a different token under the same name.
        let target = Database::open_in_memory().await.unwrap();
        let now = Utc::now();
        profiles::upsert_profile(
            &target,
            &Profile {
                name: "work".to_string(),
                host: "github.com".to_string(),
                token: b"PLAIN:existing-token".to_vec(),
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();

        let summary = apply_bundle(&target, &bundle, true).await.unwrap();
        assert_eq!(summary.kept_existing, 1);
        assert_eq!(summary.profiles_imported, 0);

        let profile = profiles::get_profile(&target, "work").await.unwrap().unwrap();
        assert_eq!(profile.token, b"PLAIN:existing-token");
    }

    #[tokio::test]
    async fn without_merge_incoming_wins() {
        let db = seeded_db().await;
        let bundle = collect_bundle(&db, true).await.unwrap();

        let target = Database::open_in_memory().await.unwrap();
        let now = Utc::now();
        profiles::upsert_profile(
            &target,
            &Profile {
                name: "work".to_string(),
                host: "github.com".to_string(),
                token: b"PLAIN:existing-token".to_vec(),
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();

        apply_bundle(&target, &bundle, false).await.unwrap();
        let profile = profiles::get_profile(&target, "work").await.unwrap().unwrap();
        assert_eq!(profile.token, b"KS1:fake-envelope-bytes");
    }

    #[tokio::test]
    async fn corrupted_json_inside_valid_seal_is_corruption() {
        let blob = codec::seal(b"{ not json", &password("p@ssw0rd!")).unwrap();
        let armored = armor::encode(&blob);
        let result = open_bundle(&armored, &password("p@ssw0rd!"));
        assert!(matches!(result, Err(ClonrError::WrongSecretOrCorrupted)));
    }
}
