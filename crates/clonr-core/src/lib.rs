// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the clonr CLI.
//!
//! Provides the shared error type and the trait seams the credential
//! subsystem components are wired through. Components receive their
//! collaborators explicitly via these traits; there is no global registry.

pub mod error;
pub mod resolver;

pub use error::ClonrError;
pub use resolver::TokenResolver;
