//! Staging of operator-supplied TLS material into the runtime secret directory.
//!
//! # Procedure
//!
//! ```text
//! <source dir>  ──canonicalize──▶  copy (symlinks kept)  ──▶  <secret>/.tls.staging
//!                                                              │ chmod 0600 / 0644
//!                                                              │ chown service / database
//!                                                              ▼
//!                          remove old <secret>/tls, rename staging ──▶ <secret>/tls
//! ```
//!
//! The runtime directory is replaced wholesale on every run; nothing from a
//! previous run survives. A failure leaves either the previous directory or
//! a partial staging directory, and re-running `prepare` is the recovery path.

use std::fs::{self, Permissions};
use std::io;
use std::os::unix::fs::{PermissionsExt, chown, symlink};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::requirements::{CERT_SUFFIX, CertRequirements, KEY_SUFFIX, is_db_cert};
use crate::{Error, Result};

/// Sibling directory the copy is assembled in before being renamed into place.
const STAGING_DIR_NAME: &str = ".tls.staging";

// ─────────────────────────────────────────────────────────────────────────────
// Ownership
// ─────────────────────────────────────────────────────────────────────────────

/// A numeric user/group pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOwner {
    /// User id
    pub uid: u32,
    /// Group id
    pub gid: u32,
}

/// Owners applied to staged files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ownership {
    /// Owner of every non-database file
    pub service: FileOwner,
    /// Owner of the database certificate and key
    pub database: FileOwner,
}

impl Default for Ownership {
    fn default() -> Self {
        Self {
            service: FileOwner {
                uid: 10000,
                gid: 10000,
            },
            database: FileOwner { uid: 999, gid: 999 },
        }
    }
}

impl Ownership {
    /// Owner for files of the given group.
    #[must_use]
    pub fn for_group(&self, group: OwnerGroup) -> FileOwner {
        match group {
            OwnerGroup::Database => self.database,
            OwnerGroup::Service => self.service,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Staged file classification
// ─────────────────────────────────────────────────────────────────────────────

/// Kind of staged file, from its suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    /// `.crt`
    Cert,
    /// `.key`
    Key,
    /// Anything else copied from the source directory
    Other,
}

impl FileCategory {
    /// Classify a filename by suffix.
    #[must_use]
    pub fn of(filename: &str) -> Self {
        if filename.ends_with(KEY_SUFFIX) {
            Self::Key
        } else if filename.ends_with(CERT_SUFFIX) {
            Self::Cert
        } else {
            Self::Other
        }
    }

    /// Mode applied during staging. `Other` files keep their copied mode.
    #[must_use]
    pub fn mode(self) -> Option<u32> {
        match self {
            Self::Cert => Some(0o644),
            Self::Key => Some(0o600),
            Self::Other => None,
        }
    }
}

/// Which owner a staged file receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerGroup {
    /// Database user/group
    Database,
    /// Default service user/group
    Service,
}

/// A file placed in the runtime directory by [`TlsStager::prepare`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedFile {
    /// Bare filename inside the runtime directory
    pub filename: String,
    /// Cert / key / other
    pub category: FileCategory,
    /// Ownership group applied
    pub owner_group: OwnerGroup,
}

impl StagedFile {
    /// Classify `filename`.
    pub fn new(filename: impl Into<String>) -> Self {
        let filename = filename.into();
        let category = FileCategory::of(&filename);
        let owner_group = if is_db_cert(&filename) {
            OwnerGroup::Database
        } else {
            OwnerGroup::Service
        };
        Self {
            filename,
            category,
            owner_group,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stager
// ─────────────────────────────────────────────────────────────────────────────

/// Copies the operator's TLS directory into `<data_volume>/secret/tls`.
pub struct TlsStager<'a> {
    requirements: &'a CertRequirements,
    ownership: Ownership,
}

impl<'a> TlsStager<'a> {
    /// Create a stager for the given requirement set.
    #[must_use]
    pub fn new(requirements: &'a CertRequirements, ownership: Ownership) -> Self {
        Self {
            requirements,
            ownership,
        }
    }

    /// Replace the runtime TLS directory with a fresh copy of the source
    /// directory and apply modes and ownership.
    ///
    /// No-op when internal TLS is disabled. Ownership changes need privileges
    /// unless the configured owners are the current user.
    ///
    /// # Errors
    ///
    /// `Error::Config` when the source directory cannot be resolved;
    /// `Error::Io` for any copy, chmod, chown or rename failure.
    pub fn prepare(&self) -> Result<Vec<StagedFile>> {
        if !self.requirements.enabled() {
            info!("internal TLS not enabled, skipping prepare");
            return Ok(Vec::new());
        }

        let source = resolve_source(self.requirements.source_dir())?;
        let tls_dir = self.requirements.tls_dir();
        let secret_dir = tls_dir
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::Config(format!("Invalid TLS dir '{}'", tls_dir.display())))?;
        fs::create_dir_all(&secret_dir)?;

        let staging = secret_dir.join(STAGING_DIR_NAME);
        if fs::symlink_metadata(&staging).is_ok() {
            warn!(path = %staging.display(), "removing leftover staging directory");
            remove_path(&staging)?;
        }

        copy_tree(&source, &staging)?;
        let staged = self.apply_permissions(&staging)?;

        if fs::symlink_metadata(&tls_dir).is_ok() {
            debug!(path = %tls_dir.display(), "removing previous internal TLS directory");
            remove_path(&tls_dir)?;
        }
        fs::rename(&staging, &tls_dir)?;

        info!(
            source = %source.display(),
            target = %tls_dir.display(),
            files = staged.len(),
            "internal TLS material staged"
        );

        Ok(staged)
    }

    /// Set mode and owner on every regular file directly inside `dir`.
    ///
    /// Symbolic links are skipped: chmod would follow them into the
    /// operator's source files.
    fn apply_permissions(&self, dir: &Path) -> Result<Vec<StagedFile>> {
        let mut entries = fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
        entries.sort_by_key(fs::DirEntry::file_name);

        let mut staged = Vec::with_capacity(entries.len());
        for entry in entries {
            let path = entry.path();
            if !entry.file_type()?.is_file() {
                debug!(path = %path.display(), "not a regular file, leaving as copied");
                continue;
            }

            let file = StagedFile::new(entry.file_name().to_string_lossy());
            if let Some(mode) = file.category.mode() {
                fs::set_permissions(&path, Permissions::from_mode(mode))?;
            }

            let owner = self.ownership.for_group(file.owner_group);
            chown(&path, Some(owner.uid), Some(owner.gid))?;

            debug!(
                file = %file.filename,
                mode = ?file.category.mode().map(|m| format!("{m:o}")),
                uid = owner.uid,
                gid = owner.gid,
                "staged"
            );
            staged.push(file);
        }

        Ok(staged)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Private helpers
// ─────────────────────────────────────────────────────────────────────────────

fn resolve_source(source_dir: &Path) -> Result<PathBuf> {
    let source = fs::canonicalize(source_dir).map_err(|e| {
        Error::Config(format!(
            "Cannot resolve internal TLS dir '{}': {e}",
            source_dir.display()
        ))
    })?;
    if !source.is_dir() {
        return Err(Error::Config(format!(
            "Internal TLS dir '{}' is not a directory",
            source.display()
        )));
    }
    Ok(source)
}

/// Recursive copy that recreates symbolic links instead of following them.
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::Config(format!("Unexpected path during copy: {e}")))?;
        let target = dst.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            symlink(fs::read_link(entry.path())?, &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn remove_path(path: &Path) -> io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
