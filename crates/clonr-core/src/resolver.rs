// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token resolution seam between the credential helper and the keystore.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::ClonrError;

/// Resolves an access token for a Git host.
///
/// The credential helper depends on this trait rather than on the keystore
/// directly, so tests (and future resolution chains) can substitute their
/// own implementation.
#[async_trait]
pub trait TokenResolver: Send + Sync {
    /// Look up a decrypted token for `host`.
    ///
    /// `Ok(None)` means no profile is bound to the host -- callers treat
    /// this as a deliberate no-op, not an error.
    async fn resolve(&self, host: &str) -> Result<Option<SecretString>, ClonrError>;
}
