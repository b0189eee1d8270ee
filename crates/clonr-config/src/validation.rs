// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes.

use crate::model::ClonrConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<String>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ClonrConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push("storage.database_path must not be empty".to_string());
    }

    match config.keystore.sealer.as_str() {
        "auto" | "keychain" | "file" => {}
        other => errors.push(format!(
            "keystore.sealer must be one of `auto`, `keychain`, `file`, got `{other}`"
        )),
    }

    if config.keystore.service_name.trim().is_empty() {
        errors.push("keystore.service_name must not be empty".to_string());
    }

    // Below 100ms the helper would time out before a healthy local lookup
    // completes; above 60s a hung server would stall git interactively.
    if config.helper.resolve_timeout_ms < 100 || config.helper.resolve_timeout_ms > 60_000 {
        errors.push(format!(
            "helper.resolve_timeout_ms must be between 100 and 60000, got {}",
            config.helper.resolve_timeout_ms
        ));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
