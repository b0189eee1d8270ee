// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the clonr CLI.

use thiserror::Error;

/// The primary error type used across the clonr workspace.
#[derive(Debug, Error)]
pub enum ClonrError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Keystore lifecycle errors (not initialized, unknown entity, bad state).
    #[error("keystore error: {0}")]
    Keystore(String),

    /// Backup input errors (missing prefix, empty input, unreadable file).
    #[error("backup error: {0}")]
    Backup(String),

    /// A sealing backend was required but is not present on this host.
    #[error("sealing capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// Authenticated decryption failed. Wrong password/key and tampered or
    /// corrupted ciphertext are indistinguishable and reported as one message.
    #[error("decryption failed -- wrong password/key or corrupted data")]
    WrongSecretOrCorrupted,

    /// Envelope classification could not identify a known format tag.
    #[error("unrecognized credential envelope format")]
    UnknownEnvelopeFormat,

    /// A batch migration attempted records and none of them succeeded.
    #[error("migration failed: {failed} of {attempted} records failed, none succeeded")]
    PartialMigrationFailure { attempted: usize, failed: usize },

    /// An export bundle declares a format version newer than this build supports.
    #[error("backup format version {found} is newer than supported version {supported}")]
    VersionTooNew { found: u32, supported: u32 },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_secret_message_does_not_leak_cause() {
        // Wrong-key and corrupted-data must render identically.
        let msg = ClonrError::WrongSecretOrCorrupted.to_string();
        assert!(msg.contains("wrong password/key or corrupted data"));
    }

    #[test]
    fn version_too_new_names_both_versions() {
        let err = ClonrError::VersionTooNew {
            found: 3,
            supported: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains('3'));
        assert!(msg.contains('1'));
    }

    #[test]
    fn unknown_format_is_distinct_from_wrong_secret() {
        assert_ne!(
            ClonrError::UnknownEnvelopeFormat.to_string(),
            ClonrError::WrongSecretOrCorrupted.to_string()
        );
    }
}
