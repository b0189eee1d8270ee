// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the clonr CLI.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level clonr configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClonrConfig {
    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Credential keystore settings.
    #[serde(default)]
    pub keystore: KeystoreConfig,

    /// Git credential-helper settings.
    #[serde(default)]
    pub helper: HelperConfig,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("clonr/clonr.db").to_string_lossy().into_owned())
        .unwrap_or_else(|| "clonr.db".to_string())
}

/// Credential keystore configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KeystoreConfig {
    /// Sealer backend selection: `auto` probes the OS keychain and falls
    /// back to a file, `keychain` and `file` force one backend.
    #[serde(default = "default_sealer")]
    pub sealer: String,

    /// Service name used for OS keychain entries.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Directory holding the file-backed root secret when the keychain is
    /// unavailable. Defaults next to the database.
    #[serde(default)]
    pub sealer_dir: Option<String>,
}

impl Default for KeystoreConfig {
    fn default() -> Self {
        Self {
            sealer: default_sealer(),
            service_name: default_service_name(),
            sealer_dir: None,
        }
    }
}

fn default_sealer() -> String {
    "auto".to_string()
}

fn default_service_name() -> String {
    "clonr".to_string()
}

/// Git credential-helper configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HelperConfig {
    /// Upper bound on token resolution, in milliseconds. A hung local
    /// server must not hang `git` indefinitely.
    #[serde(default = "default_resolve_timeout_ms")]
    pub resolve_timeout_ms: u64,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            resolve_timeout_ms: default_resolve_timeout_ms(),
        }
    }
}

fn default_resolve_timeout_ms() -> u64 {
    5000
}
