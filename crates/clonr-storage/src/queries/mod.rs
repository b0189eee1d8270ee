// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed CRUD operations, one module per table family.

pub mod keystore;
pub mod profiles;
pub mod workspaces;

use chrono::{DateTime, Utc};

/// Serialize a timestamp for TEXT column storage.
pub(crate) fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Parse a TEXT column timestamp, surfacing corruption as a rusqlite error
/// so it flows through the normal storage error path.
pub(crate) fn parse_ts(idx: usize, raw: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}
