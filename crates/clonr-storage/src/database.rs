// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes: SQLite
//! transactions on the single writer are what make keystore initialization
//! and rotation safe against a concurrently running CLI or RPC server.

use std::path::Path;

use clonr_core::ClonrError;
use tracing::debug;

/// An open clonr database with migrations applied.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run all
    /// pending migrations.
    pub async fn open(path: &str) -> Result<Self, ClonrError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| ClonrError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| map_tr_err(e.into()))?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            // Refinery errors do not convert to rusqlite errors; flatten the
            // message so the single call-site error path stays uniform.
            crate::migrations::run_migrations(conn).map_err(|e| {
                rusqlite::Error::ToSqlConversionFailure(format!("{e}").into())
            })
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path = %path, "database opened");
        Ok(Self { conn })
    }

    /// Open an in-memory database (tests and dry runs).
    pub async fn open_in_memory() -> Result<Self, ClonrError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| map_tr_err(e.into()))?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            crate::migrations::run_migrations(conn).map_err(|e| {
                rusqlite::Error::ToSqlConversionFailure(format!("{e}").into())
            })
        })
        .await
        .map_err(map_tr_err)?;

        Ok(Self { conn })
    }

    /// Returns the underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }
}

/// Convert tokio-rusqlite errors to `ClonrError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> ClonrError {
    ClonrError::Storage {
        source: Box::new(e),
    }
}
