// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `clonr credential-helper` command implementations.
//!
//! Wired as `git config credential.helper "!clonr credential-helper"`.
//! stdout carries only the protocol response; everything else goes to
//! stderr.

use std::time::Duration;

use clonr_config::ClonrConfig;
use clonr_core::ClonrError;
use clonr_helper::{drain_request, handle_get};
use tokio::io::BufReader;

use crate::resolver::StoreTokenResolver;
use crate::runtime;

/// `clonr credential-helper get`
pub async fn run_get(config: &ClonrConfig) -> Result<(), ClonrError> {
    let db = runtime::open_database(config).await?;
    let keystore = runtime::open_keystore_if_initialized(config, &db).await?;
    let resolver = StoreTokenResolver::new(db, keystore);

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    let timeout = Duration::from_millis(config.helper.resolve_timeout_ms);

    // Unsupported and no-token outcomes intentionally produce no output and
    // exit 0, deferring to git's other helpers.
    handle_get(stdin, stdout, &resolver, timeout).await?;
    Ok(())
}

/// `clonr credential-helper store|erase` -- accepted no-ops.
pub async fn run_noop() -> Result<(), ClonrError> {
    drain_request(BufReader::new(tokio::io::stdin())).await
}
