// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Profile and docker-profile CRUD operations.

use clonr_core::ClonrError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::{DockerProfile, Profile};
use crate::queries::{parse_ts, ts};

/// Insert or replace a profile.
pub async fn upsert_profile(db: &Database, profile: &Profile) -> Result<(), ClonrError> {
    let profile = profile.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT OR REPLACE INTO profiles (name, host, token, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    profile.name,
                    profile.host,
                    profile.token,
                    ts(&profile.created_at),
                    ts(&profile.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a profile by name.
pub async fn get_profile(db: &Database, name: &str) -> Result<Option<Profile>, ClonrError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Profile>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT name, host, token, created_at, updated_at FROM profiles WHERE name = ?1",
            )?;
            let result = stmt.query_row(params![name], row_to_profile);
            match result {
                Ok(profile) => Ok(Some(profile)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Get the first profile bound to `host`, by name order.
///
/// The credential helper resolves hosts through this lookup.
pub async fn get_profile_by_host(
    db: &Database,
    host: &str,
) -> Result<Option<Profile>, ClonrError> {
    let host = host.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Profile>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT name, host, token, created_at, updated_at FROM profiles
                 WHERE host = ?1 ORDER BY name LIMIT 1",
            )?;
            let result = stmt.query_row(params![host], row_to_profile);
            match result {
                Ok(profile) => Ok(Some(profile)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List all profiles ordered by name.
pub async fn list_profiles(db: &Database) -> Result<Vec<Profile>, ClonrError> {
    db.connection()
        .call(|conn| -> Result<Vec<Profile>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT name, host, token, created_at, updated_at FROM profiles ORDER BY name",
            )?;
            let rows = stmt.query_map([], row_to_profile)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Replace only a profile's stored envelope.
///
/// The migration engine persists each re-encrypted record through this call
/// before moving on to the next one.
pub async fn update_profile_token(
    db: &Database,
    name: &str,
    token: Vec<u8>,
) -> Result<(), ClonrError> {
    let name = name.to_string();
    let now = ts(&chrono::Utc::now());
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE profiles SET token = ?2, updated_at = ?3 WHERE name = ?1",
                params![name, token, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a profile by name.
pub async fn delete_profile(db: &Database, name: &str) -> Result<(), ClonrError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute("DELETE FROM profiles WHERE name = ?1", params![name])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or replace a docker profile.
pub async fn upsert_docker_profile(
    db: &Database,
    profile: &DockerProfile,
) -> Result<(), ClonrError> {
    let profile = profile.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT OR REPLACE INTO docker_profiles
                 (name, registry, password, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    profile.name,
                    profile.registry,
                    profile.password,
                    ts(&profile.created_at),
                    ts(&profile.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a docker profile by name.
pub async fn get_docker_profile(
    db: &Database,
    name: &str,
) -> Result<Option<DockerProfile>, ClonrError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<DockerProfile>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT name, registry, password, created_at, updated_at
                 FROM docker_profiles WHERE name = ?1",
            )?;
            let result = stmt.query_row(params![name], row_to_docker_profile);
            match result {
                Ok(profile) => Ok(Some(profile)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List all docker profiles ordered by name.
pub async fn list_docker_profiles(db: &Database) -> Result<Vec<DockerProfile>, ClonrError> {
    db.connection()
        .call(|conn| -> Result<Vec<DockerProfile>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT name, registry, password, created_at, updated_at
                 FROM docker_profiles ORDER BY name",
            )?;
            let rows = stmt.query_map([], row_to_docker_profile)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Replace only a docker profile's stored envelope.
pub async fn update_docker_password(
    db: &Database,
    name: &str,
    password: Vec<u8>,
) -> Result<(), ClonrError> {
    let name = name.to_string();
    let now = ts(&chrono::Utc::now());
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE docker_profiles SET password = ?2, updated_at = ?3 WHERE name = ?1",
                params![name, password, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

fn row_to_profile(row: &rusqlite::Row<'_>) -> Result<Profile, rusqlite::Error> {
    let created_raw: String = row.get(3)?;
    let updated_raw: String = row.get(4)?;
    Ok(Profile {
        name: row.get(0)?,
        host: row.get(1)?,
        token: row.get(2)?,
        created_at: parse_ts(3, &created_raw)?,
        updated_at: parse_ts(4, &updated_raw)?,
    })
}

fn row_to_docker_profile(row: &rusqlite::Row<'_>) -> Result<DockerProfile, rusqlite::Error> {
    let created_raw: String = row.get(3)?;
    let updated_raw: String = row.get(4)?;
    Ok(DockerProfile {
        name: row.get(0)?,
        registry: row.get(1)?,
        password: row.get(2)?,
        created_at: parse_ts(3, &created_raw)?,
        updated_at: parse_ts(4, &updated_raw)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_profile(name: &str, host: &str) -> Profile {
        let now = Utc::now();
        Profile {
            name: name.to_string(),
            host: host.to_string(),
            token: b"PLAIN:ghp_sample".to_vec(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn upsert_and_get_roundtrip() {
        let db = Database::open_in_memory().await.unwrap();
        let profile = sample_profile("work", "github.com");
        upsert_profile(&db, &profile).await.unwrap();

        let loaded = get_profile(&db, "work").await.unwrap().unwrap();
        assert_eq!(loaded.host, "github.com");
        assert_eq!(loaded.token, b"PLAIN:ghp_sample");
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(get_profile(&db, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lookup_by_host_prefers_name_order() {
        let db = Database::open_in_memory().await.unwrap();
        upsert_profile(&db, &sample_profile("zeta", "github.com"))
            .await
            .unwrap();
        upsert_profile(&db, &sample_profile("alpha", "github.com"))
            .await
            .unwrap();

        let found = get_profile_by_host(&db, "github.com").await.unwrap().unwrap();
        assert_eq!(found.name, "alpha");
    }

    #[tokio::test]
    async fn update_token_replaces_envelope_only() {
        let db = Database::open_in_memory().await.unwrap();
        upsert_profile(&db, &sample_profile("work", "github.com"))
            .await
            .unwrap();

        update_profile_token(&db, "work", b"KS1:newbytes".to_vec())
            .await
            .unwrap();

        let loaded = get_profile(&db, "work").await.unwrap().unwrap();
        assert_eq!(loaded.token, b"KS1:newbytes");
        assert_eq!(loaded.host, "github.com");
    }

    #[tokio::test]
    async fn delete_removes_profile() {
        let db = Database::open_in_memory().await.unwrap();
        upsert_profile(&db, &sample_profile("gone", "github.com"))
            .await
            .unwrap();
        delete_profile(&db, "gone").await.unwrap();
        assert!(get_profile(&db, "gone").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn docker_profile_roundtrip() {
        let db = Database::open_in_memory().await.unwrap();
        let now = Utc::now();
        let profile = DockerProfile {
            name: "hub".to_string(),
            registry: "registry-1.docker.io".to_string(),
            password: b"PLAIN:hunter2".to_vec(),
            created_at: now,
            updated_at: now,
        };
        upsert_docker_profile(&db, &profile).await.unwrap();

        let listed = list_docker_profiles(&db).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].registry, "registry-1.docker.io");
    }
}
