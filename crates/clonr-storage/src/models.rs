// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! Credential-bearing records carry their token as the raw stored envelope
//! bytes; the keystore crate owns interpretation of those bytes. The storage
//! layer never decrypts anything.

use chrono::{DateTime, Utc};

/// A GitHub/service profile with an envelope-protected token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Unique profile name.
    pub name: String,
    /// Host the token authenticates against (e.g. `github.com`). Used as
    /// encryption context, not secret material.
    pub host: String,
    /// The stored credential envelope, verbatim.
    pub token: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A container-registry profile with an envelope-protected password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerProfile {
    pub name: String,
    /// Registry the password authenticates against.
    pub registry: String,
    /// The stored credential envelope, verbatim.
    pub password: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named collection of repositories rooted at one local path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub name: String,
    pub root_path: String,
}

/// A repository tracked inside a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub workspace: String,
    pub name: String,
    pub url: String,
    pub local_path: String,
}

/// One stored DEK generation for an entity.
#[derive(Debug, Clone)]
pub struct DekRecord {
    pub entity: String,
    pub version: u32,
    /// DEK ciphertext under the root secret (includes the AEAD tag).
    pub wrapped_dek: Vec<u8>,
    pub wrap_nonce: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Per-entity key metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityKeyInfo {
    pub entity: String,
    /// Current DEK generation; starts at 1, +1 per rotation.
    pub current_version: u32,
    pub created_at: DateTime<Utc>,
    /// Empty until the first rotation; always >= `created_at` when set.
    pub rotated_at: Option<DateTime<Utc>>,
}
