// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Envelope-encrypted credential keystore for the clonr CLI.
//!
//! Protects long-lived secrets (service tokens, registry passwords) at rest
//! using a key-wrapping pattern:
//!
//! 1. **Root secret**: 32 random bytes, held by a [`sealer::Sealer`] -- the
//!    OS keychain when available, a permission-restricted file otherwise.
//!    Never stored in the database.
//! 2. **DEK per entity**: a random key per protected profile, wrapped under
//!    the root secret and stored alongside the data. Rotation adds a new
//!    DEK generation; ciphertexts under old generations stay valid.
//!
//! Secrets on disk are self-describing [`envelope::Envelope`] values: a
//! literal marker prefix identifies the protection generation, so three
//! on-disk encodings (plaintext, legacy single-key, keystore) coexist and
//! the migration engine can upgrade records one at a time.

pub mod crypto;
pub mod envelope;
pub mod keystore;
pub mod migration;
pub mod prompt;
pub mod sealer;

pub use envelope::{classify, Classification, Envelope, EnvelopeTag};
pub use keystore::{mask_secret, Keystore};
pub use migration::{MigrationEngine, MigrationFailure, MigrationReport};
pub use sealer::{select_sealer, FileSealer, KeyringSealer, Sealer, SealerBackend};
