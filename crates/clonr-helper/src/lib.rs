// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Git credential-helper protocol.
//!
//! Implements the `get` operation of git's line-oriented credential
//! protocol; `store` and `erase` are accepted no-ops -- clonr supplies
//! credentials to git, it never learns them from git.
//!
//! Each invocation is a fresh, stateless request/response:
//!
//! ```text
//! AwaitingRequest -> (parsing lines) -> Resolved | Unsupported | NoToken
//! ```
//!
//! All non-`Resolved` terminal states produce empty output and exit
//! successfully, deferring to whatever other credential helpers git has
//! configured. `Resolved` writes the full four-line response in one flush;
//! output is all-or-nothing, never partial.

pub mod protocol;

pub use protocol::{
    drain_request, handle_get, parse_request, CredentialRequest, HelperOutcome, GIT_USERNAME,
};
