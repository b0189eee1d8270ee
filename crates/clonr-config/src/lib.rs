// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the clonr CLI.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, and environment
//! variable overrides via the `CLONR_` prefix.

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::ClonrConfig;
pub use validation::validate_config;

/// Load configuration from the XDG hierarchy and validate it.
///
/// Returns either a valid [`ClonrConfig`] or the list of everything wrong
/// with it (validation does not fail fast).
pub fn load_and_validate() -> Result<ClonrConfig, Vec<String>> {
    let config = loader::load_config().map_err(|e| vec![e.to_string()])?;
    validation::validate_config(&config)?;
    Ok(config)
}
