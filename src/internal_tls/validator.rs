//! Read-only validation of staged internal TLS material.
//!
//! For every required filename:
//!
//! | Check        | Applies to | Fails when                                  |
//! |--------------|------------|---------------------------------------------|
//! | existence    | all        | path absent (internal CA is optional)       |
//! | file type    | all        | path is not a regular file                  |
//! | permission   | `.key`     | mode bits are not exactly `0600`            |
//! | readability  | `.crt`     | owner read bit unset                        |
//! | SAN          | `.crt`     | no SAN entry (internal CA is exempt)        |
//!
//! The first failure aborts validation.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tracing::{debug, info};

use super::requirements::{CERT_SUFFIX, CertRequirements, INTERNAL_CA_FILENAME, KEY_SUFFIX};
use super::san::has_subject_alt_names;
use crate::{Error, Result};

/// Required mode for private keys.
const KEY_MODE: u32 = 0o600;
/// Owner read bit.
const OWNER_READ: u32 = 0o400;

/// Checks the runtime TLS directory against a requirement set.
pub struct TlsValidator<'a> {
    requirements: &'a CertRequirements,
}

impl<'a> TlsValidator<'a> {
    /// Create a validator for the given requirement set.
    #[must_use]
    pub fn new(requirements: &'a CertRequirements) -> Self {
        Self { requirements }
    }

    /// Validate every required file. Returns `Ok(true)` when all pass, and
    /// trivially when internal TLS is disabled.
    ///
    /// # Errors
    ///
    /// `Error::Config` when the runtime TLS directory is missing, otherwise
    /// the error of the first failing check.
    pub fn validate(&self) -> Result<bool> {
        if !self.requirements.enabled() {
            debug!("internal TLS not enabled, validation passes");
            return Ok(true);
        }

        let tls_dir = self.requirements.tls_dir();
        check_tls_dir(&tls_dir)?;

        for filename in self.requirements.required_filenames() {
            check_file(&tls_dir, filename)?;
        }

        info!(
            dir = %tls_dir.display(),
            files = self.requirements.required_filenames().len(),
            "internal TLS material valid"
        );
        Ok(true)
    }
}

fn check_tls_dir(tls_dir: &Path) -> Result<()> {
    match fs::metadata(tls_dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(Error::Config(format!(
            "Internal dir for tls {} is not a directory",
            tls_dir.display()
        ))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::Config(format!(
            "Internal dir for tls {} does not exist",
            tls_dir.display()
        ))),
        Err(e) => Err(Error::Config(format!(
            "Cannot inspect internal dir for tls {}: {e}",
            tls_dir.display()
        ))),
    }
}

fn check_file(tls_dir: &Path, filename: &str) -> Result<()> {
    let path = tls_dir.join(filename);

    let meta = match fs::metadata(&path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if filename == INTERNAL_CA_FILENAME {
                debug!(file = filename, "internal CA not staged, skipping");
                return Ok(());
            }
            return Err(Error::FileMissing {
                filename: filename.to_owned(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    if !meta.is_file() {
        return Err(Error::FileType {
            filename: filename.to_owned(),
        });
    }

    let mode = meta.permissions().mode() & 0o777;

    if filename.ends_with(KEY_SUFFIX) && mode != KEY_MODE {
        return Err(Error::Permission {
            filename: filename.to_owned(),
            expected: KEY_MODE,
            actual: mode,
        });
    }

    if filename.ends_with(CERT_SUFFIX) {
        if mode & OWNER_READ == 0 {
            return Err(Error::Readability {
                filename: filename.to_owned(),
            });
        }
        if filename != INTERNAL_CA_FILENAME && !has_subject_alt_names(&path)? {
            return Err(Error::SanMissing {
                filename: filename.to_owned(),
            });
        }
    }

    debug!(file = filename, mode = %format!("{mode:o}"), "ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CheckKind;
    use crate::internal_tls::requirements::ComponentFlags;
    use rcgen::{CertificateParams, KeyPair};
    use std::fs::Permissions;

    fn cert_pem(san: Option<&str>) -> String {
        let params = match san {
            Some(name) => CertificateParams::new(vec![name.to_string()]).unwrap(),
            None => CertificateParams::default(),
        };
        let key = KeyPair::generate().unwrap();
        params.self_signed(&key).unwrap().pem()
    }

    /// Minimal requirement set (base catalog only) over a temp data volume,
    /// with every file staged correctly.
    fn staged_base() -> (tempfile::TempDir, CertRequirements) {
        let data = tempfile::tempdir().unwrap();
        let reqs = CertRequirements::new(
            true,
            false,
            "/unused",
            data.path(),
            ComponentFlags {
                external_database: true,
                ..ComponentFlags::default()
            },
        );
        let tls_dir = reqs.tls_dir();
        fs::create_dir_all(&tls_dir).unwrap();
        for name in reqs.required_filenames() {
            let path = tls_dir.join(name);
            if name.ends_with(KEY_SUFFIX) {
                fs::write(&path, "key").unwrap();
                fs::set_permissions(&path, Permissions::from_mode(0o600)).unwrap();
            } else {
                let stem = name.trim_end_matches(CERT_SUFFIX);
                fs::write(&path, cert_pem(Some(stem))).unwrap();
                fs::set_permissions(&path, Permissions::from_mode(0o644)).unwrap();
            }
        }
        (data, reqs)
    }

    #[test]
    fn disabled_always_passes() {
        let reqs = CertRequirements::new(
            false,
            false,
            "/nowhere",
            "/nowhere",
            ComponentFlags::default(),
        );
        assert!(TlsValidator::new(&reqs).validate().unwrap());
    }

    #[test]
    fn missing_runtime_dir_is_config_error() {
        let data = tempfile::tempdir().unwrap();
        let reqs = CertRequirements::new(
            true,
            false,
            "/unused",
            data.path(),
            ComponentFlags::default(),
        );
        let err = TlsValidator::new(&reqs).validate().unwrap_err();
        assert_eq!(err.check(), CheckKind::Configuration);
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn runtime_path_that_is_a_file_is_reported_as_not_a_directory() {
        // GIVEN: secret/tls exists but is a regular file
        let data = tempfile::tempdir().unwrap();
        let reqs = CertRequirements::new(
            true,
            false,
            "/unused",
            data.path(),
            ComponentFlags::default(),
        );
        fs::create_dir_all(data.path().join("secret")).unwrap();
        fs::write(reqs.tls_dir(), "not a dir").unwrap();

        // WHEN: validating
        let err = TlsValidator::new(&reqs).validate().unwrap_err();

        // THEN: configuration error that names the real problem
        assert_eq!(err.check(), CheckKind::Configuration);
        let msg = err.to_string();
        assert!(msg.contains("is not a directory"), "{msg}");
        assert!(!msg.contains("does not exist"), "{msg}");
    }

    #[test]
    fn well_formed_set_passes() {
        let (_data, reqs) = staged_base();
        assert!(TlsValidator::new(&reqs).validate().unwrap());
    }

    #[test]
    fn missing_core_cert_fails_existence() {
        let (_data, reqs) = staged_base();
        fs::remove_file(reqs.tls_dir().join("core.crt")).unwrap();
        let err = TlsValidator::new(&reqs).validate().unwrap_err();
        assert_eq!(err.check(), CheckKind::Existence);
        assert_eq!(err.filename(), Some("core.crt"));
    }

    #[test]
    fn missing_internal_ca_is_tolerated() {
        let (_data, reqs) = staged_base();
        fs::remove_file(reqs.tls_dir().join(INTERNAL_CA_FILENAME)).unwrap();
        assert!(TlsValidator::new(&reqs).validate().unwrap());
    }

    #[test]
    fn directory_in_place_of_file_fails_file_type() {
        let (_data, reqs) = staged_base();
        let path = reqs.tls_dir().join("portal.key");
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();
        let err = TlsValidator::new(&reqs).validate().unwrap_err();
        assert_eq!(err.check(), CheckKind::FileType);
        assert_eq!(err.filename(), Some("portal.key"));
    }

    #[test]
    fn world_readable_key_fails_permission() {
        let (_data, reqs) = staged_base();
        let key = reqs.tls_dir().join("core.key");
        fs::set_permissions(&key, Permissions::from_mode(0o644)).unwrap();
        let err = TlsValidator::new(&reqs).validate().unwrap_err();
        assert!(matches!(
            err,
            Error::Permission {
                ref filename,
                expected: 0o600,
                actual: 0o644,
            } if filename == "core.key"
        ));
    }

    #[test]
    fn owner_unreadable_cert_fails_readability() {
        let (_data, reqs) = staged_base();
        let cert = reqs.tls_dir().join("proxy.crt");
        fs::set_permissions(&cert, Permissions::from_mode(0o044)).unwrap();
        let err = TlsValidator::new(&reqs).validate().unwrap_err();
        assert_eq!(err.check(), CheckKind::Readability);
        assert_eq!(err.filename(), Some("proxy.crt"));
    }

    #[test]
    fn cert_without_san_fails() {
        let (_data, reqs) = staged_base();
        fs::write(reqs.tls_dir().join("registry.crt"), cert_pem(None)).unwrap();
        let err = TlsValidator::new(&reqs).validate().unwrap_err();
        assert_eq!(err.check(), CheckKind::San);
        assert_eq!(err.filename(), Some("registry.crt"));
    }

    #[test]
    fn internal_ca_without_san_is_tolerated() {
        let (_data, reqs) = staged_base();
        fs::write(reqs.tls_dir().join(INTERNAL_CA_FILENAME), cert_pem(None)).unwrap();
        assert!(TlsValidator::new(&reqs).validate().unwrap());
    }

    #[test]
    fn validation_does_not_modify_files() {
        let (_data, reqs) = staged_base();
        let key = reqs.tls_dir().join("core.key");
        fs::set_permissions(&key, Permissions::from_mode(0o640)).unwrap();
        assert!(TlsValidator::new(&reqs).validate().is_err());
        assert_eq!(fs::metadata(&key).unwrap().permissions().mode() & 0o777, 0o640);
    }
}
