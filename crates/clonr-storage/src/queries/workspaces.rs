// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Workspace, repository, and config-value CRUD.
//!
//! These records carry no secrets; they exist so a full-database export is
//! actually full.

use clonr_core::ClonrError;
use rusqlite::params;
use std::collections::BTreeMap;

use crate::database::{map_tr_err, Database};
use crate::models::{Repository, Workspace};

/// Insert or replace a workspace.
pub async fn upsert_workspace(db: &Database, workspace: &Workspace) -> Result<(), ClonrError> {
    let workspace = workspace.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT OR REPLACE INTO workspaces (name, root_path) VALUES (?1, ?2)",
                params![workspace.name, workspace.root_path],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// List all workspaces ordered by name.
pub async fn list_workspaces(db: &Database) -> Result<Vec<Workspace>, ClonrError> {
    db.connection()
        .call(|conn| -> Result<Vec<Workspace>, rusqlite::Error> {
            let mut stmt =
                conn.prepare("SELECT name, root_path FROM workspaces ORDER BY name")?;
            let rows = stmt.query_map([], |row| {
                Ok(Workspace {
                    name: row.get(0)?,
                    root_path: row.get(1)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or replace a repository.
pub async fn upsert_repository(db: &Database, repo: &Repository) -> Result<(), ClonrError> {
    let repo = repo.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT OR REPLACE INTO repositories (workspace, name, url, local_path)
                 VALUES (?1, ?2, ?3, ?4)",
                params![repo.workspace, repo.name, repo.url, repo.local_path],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// List all repositories ordered by workspace then name.
pub async fn list_repositories(db: &Database) -> Result<Vec<Repository>, ClonrError> {
    db.connection()
        .call(|conn| -> Result<Vec<Repository>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT workspace, name, url, local_path FROM repositories
                 ORDER BY workspace, name",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(Repository {
                    workspace: row.get(0)?,
                    name: row.get(1)?,
                    url: row.get(2)?,
                    local_path: row.get(3)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Read all config key-value pairs.
pub async fn list_config_values(db: &Database) -> Result<BTreeMap<String, String>, ClonrError> {
    db.connection()
        .call(|conn| -> Result<BTreeMap<String, String>, rusqlite::Error> {
            let mut stmt = conn.prepare("SELECT key, value FROM config_values")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Set a config key-value pair.
pub async fn put_config_value(db: &Database, key: &str, value: &str) -> Result<(), ClonrError> {
    let key = key.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT OR REPLACE INTO config_values (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
