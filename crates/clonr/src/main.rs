// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! clonr - multi-repository Git management CLI.
//!
//! This binary wires the credential subsystem together: keystore lifecycle,
//! envelope migration, password-sealed backup, and the git credential
//! helper. Logs go to stderr; stdout is reserved for command output (the
//! credential helper depends on that).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod backup_cmd;
mod helper_cmd;
mod keystore_cmd;
mod profile_cmd;
mod resolver;
mod runtime;

/// clonr - multi-repository Git management CLI.
#[derive(Parser, Debug)]
#[command(name = "clonr", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage the credential keystore.
    Keystore {
        #[command(subcommand)]
        command: KeystoreCommands,
    },
    /// Export or import a password-sealed database snapshot.
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },
    /// Git credential helper (configure as `credential.helper`).
    CredentialHelper {
        #[command(subcommand)]
        command: HelperCommands,
    },
    /// Manage service profiles and their protected tokens.
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
}

#[derive(Subcommand, Debug)]
enum KeystoreCommands {
    /// Generate and seal a fresh root secret.
    Init,
    /// Show sealing backend, key versions, and an envelope census.
    Status,
    /// Destroy all key material (asks for confirmation).
    Reset,
    /// Issue a new DEK generation for an entity.
    Rotate { entity: String },
    /// Re-encrypt stored envelopes into the current generation.
    Migrate {
        /// Include docker-registry profiles, not just service profiles.
        #[arg(long)]
        all: bool,
        /// Classify and report without changing anything.
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand, Debug)]
enum BackupCommands {
    /// Seal a full-database snapshot under a password (prompted twice).
    Export {
        /// Drop all tokens from the bundle.
        #[arg(long)]
        exclude_secrets: bool,
        /// Write the armored backup here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Restore a snapshot from a file or stdin.
    Import {
        /// Read the armored backup from this file.
        #[arg(long)]
        file: Option<PathBuf>,
        /// Keep existing records on name collision.
        #[arg(long)]
        merge: bool,
    },
}

#[derive(Subcommand, Debug)]
enum HelperCommands {
    /// Answer a credential request on stdin.
    Get,
    /// Accepted no-op: clonr does not learn credentials from git.
    Store,
    /// Accepted no-op: clonr does not learn credentials from git.
    Erase,
}

#[derive(Subcommand, Debug)]
enum ProfileCommands {
    /// Add or replace a profile (token prompted when not given).
    Add {
        name: String,
        host: String,
        /// Token value; prompted interactively when omitted.
        #[arg(long)]
        token: Option<String>,
    },
    /// List profiles with storage kind and masked preview.
    List,
    /// Remove a profile.
    Remove { name: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match clonr_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            for error in errors {
                eprintln!("clonr: config error: {error}");
            }
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Keystore { command } => match command {
            KeystoreCommands::Init => keystore_cmd::run_init(&config).await,
            KeystoreCommands::Status => keystore_cmd::run_status(&config).await,
            KeystoreCommands::Reset => keystore_cmd::run_reset(&config).await,
            KeystoreCommands::Rotate { entity } => {
                keystore_cmd::run_rotate(&config, &entity).await
            }
            KeystoreCommands::Migrate { all, dry_run } => {
                keystore_cmd::run_migrate(&config, all, dry_run).await
            }
        },
        Commands::Backup { command } => match command {
            BackupCommands::Export {
                exclude_secrets,
                output,
            } => backup_cmd::run_export(&config, exclude_secrets, output.as_deref()).await,
            BackupCommands::Import { file, merge } => {
                backup_cmd::run_import(&config, file.as_deref(), merge).await
            }
        },
        Commands::CredentialHelper { command } => match command {
            HelperCommands::Get => helper_cmd::run_get(&config).await,
            HelperCommands::Store | HelperCommands::Erase => helper_cmd::run_noop().await,
        },
        Commands::Profile { command } => match command {
            ProfileCommands::Add { name, host, token } => {
                profile_cmd::run_add(&config, &name, &host, token).await
            }
            ProfileCommands::List => profile_cmd::run_list(&config).await,
            ProfileCommands::Remove { name } => profile_cmd::run_remove(&config, &name).await,
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("clonr: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_keystore_migrate_flags() {
        let cli = Cli::try_parse_from(["clonr", "keystore", "migrate", "--all", "--dry-run"])
            .unwrap();
        match cli.command {
            Commands::Keystore {
                command: KeystoreCommands::Migrate { all, dry_run },
            } => {
                assert!(all);
                assert!(dry_run);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn cli_parses_credential_helper_get() {
        let cli = Cli::try_parse_from(["clonr", "credential-helper", "get"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::CredentialHelper {
                command: HelperCommands::Get
            }
        ));
    }

    #[test]
    fn cli_parses_backup_export_options() {
        let cli = Cli::try_parse_from([
            "clonr",
            "backup",
            "export",
            "--exclude-secrets",
            "--output",
            "/tmp/backup.txt",
        ])
        .unwrap();
        match cli.command {
            Commands::Backup {
                command:
                    BackupCommands::Export {
                        exclude_secrets,
                        output,
                    },
            } => {
                assert!(exclude_secrets);
                assert_eq!(output.unwrap().to_str().unwrap(), "/tmp/backup.txt");
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["clonr", "frobnicate"]).is_err());
    }
}
