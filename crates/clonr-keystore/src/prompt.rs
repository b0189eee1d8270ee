// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Passphrase and confirmation prompts for backup and destructive commands.
//!
//! Passphrases come from the `CLONR_BACKUP_PASSPHRASE` environment variable
//! (headless use) or an interactive TTY prompt via `rpassword`.

use clonr_core::ClonrError;
use secrecy::{ExposeSecret, SecretString};

/// Environment variable overriding the interactive backup passphrase prompt.
pub const BACKUP_PASSPHRASE_ENV_VAR: &str = "CLONR_BACKUP_PASSPHRASE";

/// Minimum backup passphrase length, checked before any cryptographic work.
pub const MIN_BACKUP_PASSPHRASE_LEN: usize = 8;

/// Get the backup passphrase for import (single entry, no minimum -- the
/// passphrase must match whatever sealed the bundle).
pub fn get_backup_passphrase() -> Result<SecretString, ClonrError> {
    if let Ok(pass) = std::env::var(BACKUP_PASSPHRASE_ENV_VAR)
        && !pass.is_empty()
    {
        return Ok(SecretString::from(pass));
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        eprint!("Backup passphrase: ");
        let pass = rpassword::read_password()
            .map_err(|e| ClonrError::Keystore(format!("failed to read passphrase: {e}")))?;
        if pass.is_empty() {
            return Err(ClonrError::Keystore("empty passphrase not allowed".to_string()));
        }
        return Ok(SecretString::from(pass));
    }

    Err(ClonrError::Keystore(
        "No passphrase provided. Set CLONR_BACKUP_PASSPHRASE or run interactively.".to_string(),
    ))
}

/// Get the backup passphrase for export: entered twice, match-checked, and
/// at least [`MIN_BACKUP_PASSPHRASE_LEN`] characters.
pub fn get_backup_passphrase_with_confirm() -> Result<SecretString, ClonrError> {
    if let Ok(pass) = std::env::var(BACKUP_PASSPHRASE_ENV_VAR)
        && !pass.is_empty()
    {
        let pass = SecretString::from(pass);
        check_min_length(&pass)?;
        return Ok(pass);
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        eprint!("New backup passphrase: ");
        let pass1 = rpassword::read_password()
            .map_err(|e| ClonrError::Keystore(format!("failed to read passphrase: {e}")))?;
        eprint!("Confirm backup passphrase: ");
        let pass2 = rpassword::read_password()
            .map_err(|e| ClonrError::Keystore(format!("failed to read passphrase: {e}")))?;

        if pass1 != pass2 {
            return Err(ClonrError::Keystore("passphrases do not match".to_string()));
        }
        let pass = SecretString::from(pass1);
        check_min_length(&pass)?;
        return Ok(pass);
    }

    Err(ClonrError::Keystore(
        "No passphrase provided. Set CLONR_BACKUP_PASSPHRASE or run interactively.".to_string(),
    ))
}

fn check_min_length(pass: &SecretString) -> Result<(), ClonrError> {
    if pass.expose_secret().chars().count() < MIN_BACKUP_PASSPHRASE_LEN {
        return Err(ClonrError::Keystore(format!(
            "backup passphrase must be at least {MIN_BACKUP_PASSPHRASE_LEN} characters"
        )));
    }
    Ok(())
}

/// Ask for an explicit `yes` before a destructive operation.
///
/// Anything other than a literal `yes` declines. Non-interactive stdin
/// declines rather than destroys.
pub fn confirm_destructive(what: &str) -> Result<bool, ClonrError> {
    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Ok(false);
    }
    eprint!("{what} Type `yes` to continue: ");
    let mut answer = String::new();
    std::io::stdin()
        .read_line(&mut answer)
        .map_err(|e| ClonrError::Keystore(format!("failed to read confirmation: {e}")))?;
    Ok(answer.trim() == "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn passphrase_from_env_var() {
        // SAFETY: test-only env mutation, serialized via serial_test.
        unsafe { std::env::set_var(BACKUP_PASSPHRASE_ENV_VAR, "long-enough-pass") };
        let result = get_backup_passphrase();
        unsafe { std::env::remove_var(BACKUP_PASSPHRASE_ENV_VAR) };

        assert!(result.is_ok());
    }

    #[test]
    #[serial]
    fn export_passphrase_from_env_enforces_minimum() {
        unsafe { std::env::set_var(BACKUP_PASSPHRASE_ENV_VAR, "short") };
        let result = get_backup_passphrase_with_confirm();
        unsafe { std::env::remove_var(BACKUP_PASSPHRASE_ENV_VAR) };

        let err = result.unwrap_err().to_string();
        assert!(err.contains("at least 8"), "got: {err}");
    }

    #[test]
    #[serial]
    fn import_passphrase_has_no_minimum() {
        unsafe { std::env::set_var(BACKUP_PASSPHRASE_ENV_VAR, "short") };
        let result = get_backup_passphrase();
        unsafe { std::env::remove_var(BACKUP_PASSPHRASE_ENV_VAR) };

        assert!(result.is_ok());
    }

    #[test]
    #[serial]
    fn missing_passphrase_fails_in_headless_mode() {
        unsafe { std::env::remove_var(BACKUP_PASSPHRASE_ENV_VAR) };
        // In CI stdin is not a terminal, so both paths must fail cleanly.
        assert!(get_backup_passphrase().is_err());
        assert!(get_backup_passphrase_with_confirm().is_err());
    }

    #[test]
    #[serial]
    fn confirm_declines_without_a_terminal() {
        assert!(!confirm_destructive("Delete everything?").unwrap());
    }
}
