//! Required certificate/key filenames and their runtime paths.
//!
//! The set of files a deployment needs depends on which optional components
//! are enabled. [`CertRequirements`] computes that set once, from the static
//! catalogs below, and builds a lookup table from logical identifier
//! (`core_crt_path`) to the staged location
//! (`<data_volume>/secret/tls/core.crt`).

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Catalogs
// ─────────────────────────────────────────────────────────────────────────────

/// Internal CA certificate. Optional on disk and exempt from the SAN check.
pub const INTERNAL_CA_FILENAME: &str = "harbor_internal_ca.crt";

/// Certificate suffix.
pub const CERT_SUFFIX: &str = ".crt";

/// Private key suffix.
pub const KEY_SUFFIX: &str = ".key";

/// Files every TLS-enabled deployment needs.
pub const BASE_CERT_FILENAMES: &[&str] = &[
    INTERNAL_CA_FILENAME,
    "proxy.crt",
    "proxy.key",
    "core.crt",
    "core.key",
    "job_service.crt",
    "job_service.key",
    "registryctl.crt",
    "registryctl.key",
    "registry.crt",
    "registry.key",
    "portal.crt",
    "portal.key",
];

/// Notary signer and server.
pub const NOTARY_CERT_FILENAMES: &[&str] = &[
    "notary_signer.crt",
    "notary_signer.key",
    "notary_server.crt",
    "notary_server.key",
];

/// Chart repository.
pub const CHARTMUSEUM_CERT_FILENAMES: &[&str] = &["chartmuseum.crt", "chartmuseum.key"];

/// Vulnerability scanner adapter.
pub const TRIVY_CERT_FILENAMES: &[&str] = &["trivy_adapter.crt", "trivy_adapter.key"];

/// Bundled database. Owned by the database user once staged.
pub const DB_CERT_FILENAMES: &[&str] = &["harbor_db.crt", "harbor_db.key"];

/// Runtime location of staged material, relative to the data volume.
const SECRET_DIR: &str = "secret";
const TLS_DIR: &str = "tls";

// ─────────────────────────────────────────────────────────────────────────────
// Flags
// ─────────────────────────────────────────────────────────────────────────────

/// Optional components that contribute certificate material.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentFlags {
    /// Notary signer/server deployed
    pub with_notary: bool,
    /// Chart repository deployed
    pub with_chartmuseum: bool,
    /// Vulnerability scanner deployed
    pub with_trivy: bool,
    /// Database is managed outside the deployment (suppresses DB certs)
    pub external_database: bool,
}

/// `<data_volume>/secret/tls`
#[must_use]
pub fn runtime_tls_dir(data_volume: &Path) -> PathBuf {
    data_volume.join(SECRET_DIR).join(TLS_DIR)
}

/// Derive the logical identifier for a filename: `job_service.key` →
/// `job_service_key_path`.
#[must_use]
pub fn logical_name(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_{ext}_path"),
        None => format!("{filename}_path"),
    }
}

/// Whether `filename` belongs to the database subset.
#[must_use]
pub fn is_db_cert(filename: &str) -> bool {
    DB_CERT_FILENAMES.contains(&filename)
}

// ─────────────────────────────────────────────────────────────────────────────
// Requirement set
// ─────────────────────────────────────────────────────────────────────────────

/// The flag-dependent set of files that must be staged, plus the
/// identifier → path table consumers use to reference them.
///
/// Immutable after construction. When TLS is disabled both the set and the
/// table are empty, so every lookup misses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertRequirements {
    enabled: bool,
    verify_client_cert: bool,
    source_dir: PathBuf,
    data_volume: PathBuf,
    flags: ComponentFlags,
    required: BTreeSet<String>,
    paths: BTreeMap<String, PathBuf>,
}

impl CertRequirements {
    /// Compute the requirement set for the given flags.
    pub fn new(
        enabled: bool,
        verify_client_cert: bool,
        source_dir: impl Into<PathBuf>,
        data_volume: impl Into<PathBuf>,
        flags: ComponentFlags,
    ) -> Self {
        let source_dir = source_dir.into();
        let data_volume = data_volume.into();

        let required = if enabled {
            required_filenames(flags)
        } else {
            BTreeSet::new()
        };

        let tls_dir = runtime_tls_dir(&data_volume);
        let paths = required
            .iter()
            .map(|name| (logical_name(name), tls_dir.join(name)))
            .collect();

        Self {
            enabled,
            verify_client_cert,
            source_dir,
            data_volume,
            flags,
            required,
            paths,
        }
    }

    /// Whether internal TLS is active.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether services must verify peer client certificates.
    pub fn verify_client_cert(&self) -> bool {
        self.verify_client_cert
    }

    /// Operator-supplied directory holding the material to stage.
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Base directory for runtime secrets.
    pub fn data_volume(&self) -> &Path {
        &self.data_volume
    }

    /// Component flags the set was computed from.
    pub fn flags(&self) -> ComponentFlags {
        self.flags
    }

    /// `<data_volume>/secret/tls`
    pub fn tls_dir(&self) -> PathBuf {
        runtime_tls_dir(&self.data_volume)
    }

    /// Required filenames, sorted.
    pub fn required_filenames(&self) -> &BTreeSet<String> {
        &self.required
    }

    /// Whether `filename` is required for this configuration.
    pub fn is_required(&self, filename: &str) -> bool {
        self.required.contains(filename)
    }

    /// Resolve a logical identifier such as `core_crt_path`.
    ///
    /// Returns `None` when TLS is disabled or the file is not part of the
    /// current requirement set.
    pub fn path(&self, logical_name: &str) -> Option<&Path> {
        self.paths.get(logical_name).map(PathBuf::as_path)
    }

    /// Resolve a filename such as `core.crt`.
    pub fn path_for_file(&self, filename: &str) -> Option<&Path> {
        self.path(&logical_name(filename))
    }

    /// Like [`path`](Self::path) but fails with a configuration error naming
    /// the identifier.
    pub fn require_path(&self, logical_name: &str) -> Result<&Path> {
        self.path(logical_name).ok_or_else(|| {
            Error::Config(format!(
                "'{logical_name}' is not a required internal TLS file for this configuration"
            ))
        })
    }

    /// The complete identifier → path table.
    pub fn paths(&self) -> &BTreeMap<String, PathBuf> {
        &self.paths
    }

    /// The internal CA certificate, `harbor_internal_ca.crt`.
    pub fn internal_ca_crt_path(&self) -> Option<&Path> {
        self.path_for_file(INTERNAL_CA_FILENAME)
    }
}

/// One `<stem>_<ext>_path` accessor per catalog file. Each resolves only when
/// the file is in the requirement set.
macro_rules! path_accessors {
    ($($method:ident => $file:literal),* $(,)?) => {
        impl CertRequirements {
            $(
                #[doc = concat!("`", $file, "`")]
                pub fn $method(&self) -> Option<&Path> {
                    self.path_for_file($file)
                }
            )*
        }
    };
}

path_accessors! {
    harbor_internal_ca_crt_path => "harbor_internal_ca.crt",
    proxy_crt_path => "proxy.crt",
    proxy_key_path => "proxy.key",
    core_crt_path => "core.crt",
    core_key_path => "core.key",
    job_service_crt_path => "job_service.crt",
    job_service_key_path => "job_service.key",
    registryctl_crt_path => "registryctl.crt",
    registryctl_key_path => "registryctl.key",
    registry_crt_path => "registry.crt",
    registry_key_path => "registry.key",
    portal_crt_path => "portal.crt",
    portal_key_path => "portal.key",
    notary_signer_crt_path => "notary_signer.crt",
    notary_signer_key_path => "notary_signer.key",
    notary_server_crt_path => "notary_server.crt",
    notary_server_key_path => "notary_server.key",
    chartmuseum_crt_path => "chartmuseum.crt",
    chartmuseum_key_path => "chartmuseum.key",
    trivy_adapter_crt_path => "trivy_adapter.crt",
    trivy_adapter_key_path => "trivy_adapter.key",
    harbor_db_crt_path => "harbor_db.crt",
    harbor_db_key_path => "harbor_db.key",
}

/// Union of the base catalog and every subset whose flag is active.
fn required_filenames(flags: ComponentFlags) -> BTreeSet<String> {
    let mut catalogs: Vec<&[&str]> = vec![BASE_CERT_FILENAMES];
    if flags.with_notary {
        catalogs.push(NOTARY_CERT_FILENAMES);
    }
    if flags.with_chartmuseum {
        catalogs.push(CHARTMUSEUM_CERT_FILENAMES);
    }
    if flags.with_trivy {
        catalogs.push(TRIVY_CERT_FILENAMES);
    }
    if !flags.external_database {
        catalogs.push(DB_CERT_FILENAMES);
    }

    catalogs
        .into_iter()
        .flatten()
        .map(|name| (*name).to_owned())
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
