//! Subject Alternative Name inspection.
//!
//! Services verify their peers by hostname, so a staged certificate without
//! any SAN entry is treated as misissued.

use std::fs;
use std::path::Path;

use x509_parser::certificate::X509Certificate;
use x509_parser::pem::parse_x509_pem;

use crate::{Error, Result};

/// Whether the first PEM certificate in `path` carries at least one SAN entry.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be read and `Error::Config` if it
/// does not contain a parseable PEM certificate.
pub fn has_subject_alt_names(path: &Path) -> Result<bool> {
    let data = fs::read(path)?;
    let (_, pem) = parse_x509_pem(&data).map_err(|e| {
        Error::Config(format!("Failed to read PEM from '{}': {e}", path.display()))
    })?;
    let cert = pem.parse_x509().map_err(|e| {
        Error::Config(format!(
            "Failed to parse certificate '{}': {e}",
            path.display()
        ))
    })?;

    Ok(has_general_names(&cert))
}

/// True when the SAN extension is present, well-formed and non-empty.
fn has_general_names(cert: &X509Certificate<'_>) -> bool {
    matches!(
        cert.subject_alternative_name(),
        Ok(Some(san_ext)) if !san_ext.value.general_names.is_empty()
    )
}
