// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Password-sealed full-database export/import.
//!
//! A snapshot of every record is serialized into an [`bundle::ExportBundle`],
//! sealed as one authenticated blob by [`codec`], and armored into a
//! copy-pasteable `CLONR:` string by [`armor`]. Profile tokens inside the
//! bundle keep whatever envelope they already had -- the bundle ciphertext is
//! an independent second layer, with its own password-derived key schedule,
//! never the keystore's.

pub mod armor;
pub mod bundle;
pub mod codec;

pub use armor::{decode as armor_decode, encode as armor_encode, MAGIC};
pub use bundle::{
    apply_bundle, collect_bundle, open_bundle, seal_bundle, ExportBundle, ImportSummary,
    BUNDLE_VERSION,
};
