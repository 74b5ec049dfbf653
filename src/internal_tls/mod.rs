//! Internal mutual-TLS material: requirement model, staging and validation.
//!
//! # Architecture
//!
//! ```text
//! ComponentFlags
//!   → CertRequirements   (required filenames + logical name → path table)
//!   → TlsStager          (source dir → <data_volume>/secret/tls, chmod/chown)
//!   → TlsValidator       (existence, type, mode, readability, SAN)
//!   → service launchers  (query staged paths via CertRequirements)
//! ```
//!
//! # Modules
//!
//! - [`requirements`] — filename catalogs and [`CertRequirements`]
//! - [`stager`] — [`TlsStager`] and staged file classification
//! - [`validator`] — [`TlsValidator`]
//! - [`san`] — Subject Alternative Name inspection

pub mod requirements;
pub mod san;
pub mod stager;
pub mod validator;

pub use requirements::{
    BASE_CERT_FILENAMES, CHARTMUSEUM_CERT_FILENAMES, CertRequirements, ComponentFlags,
    DB_CERT_FILENAMES, INTERNAL_CA_FILENAME, NOTARY_CERT_FILENAMES, TRIVY_CERT_FILENAMES,
    logical_name,
};
pub use stager::{FileCategory, FileOwner, OwnerGroup, Ownership, StagedFile, TlsStager};
pub use validator::TlsValidator;

use crate::Result;

/// Requirement set plus the owners to stage with.
#[derive(Debug, Clone)]
pub struct InternalTls {
    requirements: CertRequirements,
    ownership: Ownership,
}

impl InternalTls {
    /// Bundle a requirement set with staging ownership.
    #[must_use]
    pub fn new(requirements: CertRequirements, ownership: Ownership) -> Self {
        Self {
            requirements,
            ownership,
        }
    }

    /// The requirement set, for path lookups.
    pub fn requirements(&self) -> &CertRequirements {
        &self.requirements
    }

    /// See [`TlsStager::prepare`].
    pub fn prepare(&self) -> Result<Vec<StagedFile>> {
        TlsStager::new(&self.requirements, self.ownership).prepare()
    }

    /// See [`TlsValidator::validate`].
    pub fn validate(&self) -> Result<bool> {
        TlsValidator::new(&self.requirements).validate()
    }
}
