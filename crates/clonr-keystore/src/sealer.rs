// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Root-secret sealing backends.
//!
//! The keystore never branches on "is the OS keychain present" -- it holds a
//! `Box<dyn Sealer>` selected once at startup by [`select_sealer`]. The
//! keychain backend binds the root secret to this host's credential store;
//! the file backend is the software fallback with 0o600 permissions and
//! atomic writes.

use std::path::{Path, PathBuf};

use clonr_core::ClonrError;
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Keychain entry / file name for the keystore root secret.
pub const ROOT_SECRET_ENTRY: &str = "root-secret";
/// Keychain entry / file name for the legacy single master key.
pub const LEGACY_MASTER_ENTRY: &str = "legacy-master";

/// Which backend a sealer instance is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SealerBackend {
    /// OS keychain -- the secret is not portable off this host.
    Keychain,
    /// Permission-restricted file -- software fallback.
    File,
}

impl std::fmt::Display for SealerBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SealerBackend::Keychain => write!(f, "keychain"),
            SealerBackend::File => write!(f, "file"),
        }
    }
}

/// Storage for host-bound secrets (the root secret and the legacy master key).
pub trait Sealer: Send + Sync {
    fn backend(&self) -> SealerBackend;

    /// Store a secret under `entry`, replacing any previous value.
    fn store(&self, entry: &str, secret: &[u8]) -> Result<(), ClonrError>;

    /// Load a secret. `Ok(None)` means the entry does not exist.
    fn load(&self, entry: &str) -> Result<Option<Zeroizing<Vec<u8>>>, ClonrError>;

    /// Remove a secret. Removing a missing entry is not an error.
    fn remove(&self, entry: &str) -> Result<(), ClonrError>;
}

/// OS-keychain sealer. Key bytes round-trip as hex because keychain entries
/// are strings.
pub struct KeyringSealer {
    service: String,
}

impl KeyringSealer {
    /// Probe whether the OS keychain is usable on this host.
    ///
    /// A missing entry still proves the backend answers; platform failures
    /// (no daemon, locked collection, headless session) mean unavailable.
    pub fn probe(service: &str) -> Option<Self> {
        let entry = keyring::Entry::new(service, "probe").ok()?;
        match entry.get_password() {
            Ok(_) | Err(keyring::Error::NoEntry) => Some(Self {
                service: service.to_string(),
            }),
            Err(e) => {
                debug!(error = %e, "OS keychain probe failed");
                None
            }
        }
    }

    fn entry(&self, name: &str) -> Result<keyring::Entry, ClonrError> {
        keyring::Entry::new(&self.service, name)
            .map_err(|e| ClonrError::CapabilityUnavailable(format!("keychain entry failed: {e}")))
    }
}

impl Sealer for KeyringSealer {
    fn backend(&self) -> SealerBackend {
        SealerBackend::Keychain
    }

    fn store(&self, entry: &str, secret: &[u8]) -> Result<(), ClonrError> {
        let mut encoded = hex::encode(secret);
        let result = self.entry(entry)?.set_password(&encoded).map_err(|e| {
            ClonrError::CapabilityUnavailable(format!("keychain store failed: {e}"))
        });
        use zeroize::Zeroize;
        encoded.zeroize();
        result
    }

    fn load(&self, entry: &str) -> Result<Option<Zeroizing<Vec<u8>>>, ClonrError> {
        match self.entry(entry)?.get_password() {
            Ok(encoded) => {
                let bytes = hex::decode(&encoded).map_err(|_| {
                    ClonrError::Keystore(format!("keychain entry `{entry}` is not valid hex"))
                })?;
                Ok(Some(Zeroizing::new(bytes)))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(ClonrError::CapabilityUnavailable(format!(
                "keychain load failed: {e}"
            ))),
        }
    }

    fn remove(&self, entry: &str) -> Result<(), ClonrError> {
        match self.entry(entry)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(ClonrError::CapabilityUnavailable(format!(
                "keychain remove failed: {e}"
            ))),
        }
    }
}

/// File-backed sealer: one file per entry under a directory that is created
/// with owner-only permissions.
pub struct FileSealer {
    dir: PathBuf,
}

impl FileSealer {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn entry_path(&self, entry: &str) -> PathBuf {
        self.dir.join(format!("{entry}.key"))
    }

    fn ensure_dir(&self) -> Result<(), ClonrError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| ClonrError::Storage {
            source: Box::new(e),
        })?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.dir, std::fs::Permissions::from_mode(0o700)).map_err(
                |e| ClonrError::Storage {
                    source: Box::new(e),
                },
            )?;
        }
        Ok(())
    }
}

impl Sealer for FileSealer {
    fn backend(&self) -> SealerBackend {
        SealerBackend::File
    }

    fn store(&self, entry: &str, secret: &[u8]) -> Result<(), ClonrError> {
        self.ensure_dir()?;
        let path = self.entry_path(entry);
        let tmp = path.with_extension("key.tmp");

        // Write-then-rename so a crash never leaves a truncated key file.
        std::fs::write(&tmp, secret).map_err(|e| ClonrError::Storage {
            source: Box::new(e),
        })?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).map_err(
                |e| ClonrError::Storage {
                    source: Box::new(e),
                },
            )?;
        }
        std::fs::rename(&tmp, &path).map_err(|e| ClonrError::Storage {
            source: Box::new(e),
        })?;
        Ok(())
    }

    fn load(&self, entry: &str) -> Result<Option<Zeroizing<Vec<u8>>>, ClonrError> {
        match std::fs::read(self.entry_path(entry)) {
            Ok(bytes) => Ok(Some(Zeroizing::new(bytes))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ClonrError::Storage {
                source: Box::new(e),
            }),
        }
    }

    fn remove(&self, entry: &str) -> Result<(), ClonrError> {
        match std::fs::remove_file(self.entry_path(entry)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClonrError::Storage {
                source: Box::new(e),
            }),
        }
    }
}

/// Select a sealer backend per configuration.
///
/// `auto` probes the OS keychain and falls back to the file backend with a
/// warning; `keychain` and `file` force one backend, with `keychain` failing
/// loudly when the host cannot provide it.
pub fn select_sealer(
    selection: &str,
    service_name: &str,
    fallback_dir: &Path,
) -> Result<Box<dyn Sealer>, ClonrError> {
    match selection {
        "keychain" => match KeyringSealer::probe(service_name) {
            Some(sealer) => Ok(Box::new(sealer)),
            None => Err(ClonrError::CapabilityUnavailable(
                "OS keychain requested but not usable on this host".to_string(),
            )),
        },
        "file" => Ok(Box::new(FileSealer::new(fallback_dir))),
        _ => match KeyringSealer::probe(service_name) {
            Some(sealer) => {
                debug!("using OS keychain sealer");
                Ok(Box::new(sealer))
            }
            None => {
                warn!("OS keychain unavailable -- falling back to file-backed sealing");
                Ok(Box::new(FileSealer::new(fallback_dir)))
            }
        },
    }
}
