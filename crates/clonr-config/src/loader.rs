// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./clonr.toml` > `~/.config/clonr/clonr.toml` >
//! `/etc/clonr/clonr.toml` with environment variable overrides via the
//! `CLONR_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::ClonrConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/clonr/clonr.toml` (system-wide)
/// 3. `~/.config/clonr/clonr.toml` (user XDG config)
/// 4. `./clonr.toml` (local directory)
/// 5. `CLONR_*` environment variables
pub fn load_config() -> Result<ClonrConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ClonrConfig::default()))
        .merge(Toml::file("/etc/clonr/clonr.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("clonr/clonr.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("clonr.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<ClonrConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ClonrConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ClonrConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ClonrConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `CLONR_HELPER_RESOLVE_TIMEOUT_MS` must
/// map to `helper.resolve_timeout_ms`, not `helper.resolve.timeout.ms`.
fn env_provider() -> Env {
    Env::prefixed("CLONR_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("storage_", "storage.", 1)
            .replacen("keystore_", "keystore.", 1)
            .replacen("helper_", "helper.", 1);
        mapped.into()
    })
}
