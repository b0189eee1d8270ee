// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keystore key-material CRUD.
//!
//! Every read-modify-write here runs inside an IMMEDIATE transaction so two
//! concurrent CLI invocations cannot interleave and corrupt the DEK table.

use chrono::Utc;
use clonr_core::ClonrError;
use rusqlite::{params, TransactionBehavior};

use crate::database::{map_tr_err, Database};
use crate::models::{DekRecord, EntityKeyInfo};
use crate::queries::{parse_ts, ts};

/// Get a keystore metadata value.
pub async fn meta_get(db: &Database, key: &str) -> Result<Option<Vec<u8>>, ClonrError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Vec<u8>>, rusqlite::Error> {
            let result = conn.query_row(
                "SELECT value FROM keystore_meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            );
            match result {
                Ok(value) => Ok(Some(value)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Set a keystore metadata value.
pub async fn meta_put(db: &Database, key: &str, value: Vec<u8>) -> Result<(), ClonrError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT OR REPLACE INTO keystore_meta (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Load an entity's key metadata.
pub async fn get_entity(db: &Database, entity: &str) -> Result<Option<EntityKeyInfo>, ClonrError> {
    let entity = entity.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<EntityKeyInfo>, rusqlite::Error> {
            let result = conn.query_row(
                "SELECT entity, current_version, created_at, rotated_at
                 FROM keystore_entities WHERE entity = ?1",
                params![entity],
                row_to_entity,
            );
            match result {
                Ok(info) => Ok(Some(info)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List all entities ordered by name.
pub async fn list_entities(db: &Database) -> Result<Vec<EntityKeyInfo>, ClonrError> {
    db.connection()
        .call(|conn| -> Result<Vec<EntityKeyInfo>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT entity, current_version, created_at, rotated_at
                 FROM keystore_entities ORDER BY entity",
            )?;
            let rows = stmt.query_map([], row_to_entity)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Load one DEK generation.
pub async fn get_dek(
    db: &Database,
    entity: &str,
    version: u32,
) -> Result<Option<DekRecord>, ClonrError> {
    let entity = entity.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<DekRecord>, rusqlite::Error> {
            let result = conn.query_row(
                "SELECT entity, version, wrapped_dek, wrap_nonce, created_at
                 FROM keystore_deks WHERE entity = ?1 AND version = ?2",
                params![entity, version],
                row_to_dek,
            );
            match result {
                Ok(dek) => Ok(Some(dek)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Get-or-create the current DEK row for an entity, atomically.
///
/// If the entity already has key material, the candidate wrap is discarded
/// and the stored current generation is returned. Otherwise the candidate
/// becomes generation 1. The whole decision runs in one IMMEDIATE
/// transaction so concurrent first-encrypts cannot both insert.
pub async fn ensure_entity_dek(
    db: &Database,
    entity: &str,
    candidate_wrapped: Vec<u8>,
    candidate_nonce: Vec<u8>,
) -> Result<(EntityKeyInfo, DekRecord), ClonrError> {
    let entity = entity.to_string();
    let now = ts(&Utc::now());
    db.connection()
        .call(
            move |conn| -> Result<(EntityKeyInfo, DekRecord), rusqlite::Error> {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let existing = tx.query_row(
                    "SELECT entity, current_version, created_at, rotated_at
                     FROM keystore_entities WHERE entity = ?1",
                    params![entity],
                    row_to_entity,
                );

                let (info, dek) = match existing {
                    Ok(info) => {
                        let dek = tx.query_row(
                            "SELECT entity, version, wrapped_dek, wrap_nonce, created_at
                             FROM keystore_deks WHERE entity = ?1 AND version = ?2",
                            params![info.entity, info.current_version],
                            row_to_dek,
                        )?;
                        (info, dek)
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => {
                        tx.execute(
                            "INSERT INTO keystore_entities
                             (entity, current_version, created_at, rotated_at)
                             VALUES (?1, 1, ?2, NULL)",
                            params![entity, now],
                        )?;
                        tx.execute(
                            "INSERT INTO keystore_deks
                             (entity, version, wrapped_dek, wrap_nonce, created_at)
                             VALUES (?1, 1, ?2, ?3, ?4)",
                            params![entity, candidate_wrapped, candidate_nonce, now],
                        )?;
                        let info = tx.query_row(
                            "SELECT entity, current_version, created_at, rotated_at
                             FROM keystore_entities WHERE entity = ?1",
                            params![entity],
                            row_to_entity,
                        )?;
                        let dek = tx.query_row(
                            "SELECT entity, version, wrapped_dek, wrap_nonce, created_at
                             FROM keystore_deks WHERE entity = ?1 AND version = 1",
                            params![entity],
                            row_to_dek,
                        )?;
                        (info, dek)
                    }
                    Err(e) => return Err(e),
                };

                tx.commit()?;
                Ok((info, dek))
            },
        )
        .await
        .map_err(map_tr_err)
}

/// Add a new DEK generation for an existing entity, atomically.
///
/// Returns `None` if the entity has no key material yet. Old generations
/// are left untouched; ciphertexts produced under them stay decryptable.
pub async fn rotate_entity(
    db: &Database,
    entity: &str,
    new_wrapped: Vec<u8>,
    new_nonce: Vec<u8>,
) -> Result<Option<EntityKeyInfo>, ClonrError> {
    let entity = entity.to_string();
    let now = ts(&Utc::now());
    db.connection()
        .call(
            move |conn| -> Result<Option<EntityKeyInfo>, rusqlite::Error> {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let existing = tx.query_row(
                    "SELECT entity, current_version, created_at, rotated_at
                     FROM keystore_entities WHERE entity = ?1",
                    params![entity],
                    row_to_entity,
                );
                let info = match existing {
                    Ok(info) => info,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e),
                };

                let next = info.current_version + 1;
                tx.execute(
                    "INSERT INTO keystore_deks
                     (entity, version, wrapped_dek, wrap_nonce, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![entity, next, new_wrapped, new_nonce, now],
                )?;
                tx.execute(
                    "UPDATE keystore_entities
                     SET current_version = ?2, rotated_at = ?3 WHERE entity = ?1",
                    params![entity, next, now],
                )?;
                let updated = tx.query_row(
                    "SELECT entity, current_version, created_at, rotated_at
                     FROM keystore_entities WHERE entity = ?1",
                    params![entity],
                    row_to_entity,
                )?;

                tx.commit()?;
                Ok(Some(updated))
            },
        )
        .await
        .map_err(map_tr_err)
}

/// Delete all keystore key material and metadata (destructive reset).
pub async fn clear_keystore(db: &Database) -> Result<(), ClonrError> {
    db.connection()
        .call(|conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute("DELETE FROM keystore_deks", [])?;
            tx.execute("DELETE FROM keystore_entities", [])?;
            tx.execute("DELETE FROM keystore_meta", [])?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

fn row_to_entity(row: &rusqlite::Row<'_>) -> Result<EntityKeyInfo, rusqlite::Error> {
    let created_raw: String = row.get(2)?;
    let rotated_raw: Option<String> = row.get(3)?;
    let rotated_at = match rotated_raw {
        Some(raw) => Some(parse_ts(3, &raw)?),
        None => None,
    };
    Ok(EntityKeyInfo {
        entity: row.get(0)?,
        current_version: row.get::<_, i64>(1)? as u32,
        created_at: parse_ts(2, &created_raw)?,
        rotated_at,
    })
}

fn row_to_dek(row: &rusqlite::Row<'_>) -> Result<DekRecord, rusqlite::Error> {
    let created_raw: String = row.get(4)?;
    Ok(DekRecord {
        entity: row.get(0)?,
        version: row.get::<_, i64>(1)? as u32,
        wrapped_dek: row.get(2)?,
        wrap_nonce: row.get(3)?,
        created_at: parse_ts(4, &created_raw)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_creates_generation_one() {
        let db = Database::open_in_memory().await.unwrap();
        let (info, dek) = ensure_entity_dek(&db, "work", vec![1; 48], vec![2; 12])
            .await
            .unwrap();
        assert_eq!(info.current_version, 1);
        assert!(info.rotated_at.is_none());
        assert_eq!(dek.version, 1);
        assert_eq!(dek.wrapped_dek, vec![1; 48]);
    }

    #[tokio::test]
    async fn ensure_is_get_on_second_call() {
        let db = Database::open_in_memory().await.unwrap();
        ensure_entity_dek(&db, "work", vec![1; 48], vec![2; 12])
            .await
            .unwrap();

        // A second candidate must be discarded in favor of the stored DEK.
        let (info, dek) = ensure_entity_dek(&db, "work", vec![9; 48], vec![9; 12])
            .await
            .unwrap();
        assert_eq!(info.current_version, 1);
        assert_eq!(dek.wrapped_dek, vec![1; 48]);
    }

    #[tokio::test]
    async fn rotate_bumps_version_and_keeps_old_dek() {
        let db = Database::open_in_memory().await.unwrap();
        ensure_entity_dek(&db, "work", vec![1; 48], vec![2; 12])
            .await
            .unwrap();

        let info = rotate_entity(&db, "work", vec![3; 48], vec![4; 12])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(info.current_version, 2);
        assert!(info.rotated_at.is_some());
        assert!(info.rotated_at.unwrap() >= info.created_at);

        // Both generations remain loadable.
        assert!(get_dek(&db, "work", 1).await.unwrap().is_some());
        assert!(get_dek(&db, "work", 2).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn rotate_unknown_entity_returns_none() {
        let db = Database::open_in_memory().await.unwrap();
        let result = rotate_entity(&db, "ghost", vec![0; 48], vec![0; 12])
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let db = Database::open_in_memory().await.unwrap();
        ensure_entity_dek(&db, "work", vec![1; 48], vec![2; 12])
            .await
            .unwrap();
        meta_put(&db, "initialized_at", b"now".to_vec()).await.unwrap();

        clear_keystore(&db).await.unwrap();

        assert!(list_entities(&db).await.unwrap().is_empty());
        assert!(meta_get(&db, "initialized_at").await.unwrap().is_none());
    }
}
