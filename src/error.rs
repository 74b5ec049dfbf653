//! Error types for internal TLS preparation

use std::io;

use thiserror::Error;

/// Result type alias for internal TLS preparation
pub type Result<T> = std::result::Result<T, Error>;

/// Internal TLS preparation errors
///
/// Every variant is fatal to the preparation run. The file-level variants
/// carry the offending filename so the operator can fix the source directory.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (missing directory, port out of range, bad input)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required certificate or key file is absent
    #[error("File {filename} does not exist")]
    FileMissing {
        /// Offending filename
        filename: String,
    },

    /// A required path exists but is not a regular file
    #[error("Invalid {filename}: not a regular file")]
    FileType {
        /// Offending filename
        filename: String,
    },

    /// Key file mode bits are not owner read/write only
    #[error("Key file {filename} permission is {actual:o}, expected {expected:o}")]
    Permission {
        /// Offending filename
        filename: String,
        /// Required mode (permission bits only)
        expected: u32,
        /// Observed mode (permission bits only)
        actual: u32,
    },

    /// Certificate file is not readable by its owner
    #[error("File {filename} should be readable by owner")]
    Readability {
        /// Offending filename
        filename: String,
    },

    /// Certificate carries no Subject Alternative Name entry
    #[error("Cert file {filename} should include SAN")]
    SanMissing {
        /// Offending filename
        filename: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// The check an [`Error`] reports a failure of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    /// Configuration or precondition
    Configuration,
    /// File existence
    Existence,
    /// Regular-file type
    FileType,
    /// Key mode bits
    Permission,
    /// Certificate owner readability
    Readability,
    /// Certificate SAN presence
    San,
    /// Underlying filesystem operation
    Io,
}

impl Error {
    /// Which check produced this error
    #[must_use]
    pub fn check(&self) -> CheckKind {
        match self {
            Self::Config(_) => CheckKind::Configuration,
            Self::FileMissing { .. } => CheckKind::Existence,
            Self::FileType { .. } => CheckKind::FileType,
            Self::Permission { .. } => CheckKind::Permission,
            Self::Readability { .. } => CheckKind::Readability,
            Self::SanMissing { .. } => CheckKind::San,
            Self::Io(_) => CheckKind::Io,
        }
    }

    /// The filename this error is about, if it is a per-file failure
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        match self {
            Self::FileMissing { filename }
            | Self::FileType { filename }
            | Self::Permission { filename, .. }
            | Self::Readability { filename }
            | Self::SanMissing { filename } => Some(filename),
            Self::Config(_) | Self::Io(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_error_formats_modes_in_octal() {
        let err = Error::Permission {
            filename: "core.key".to_string(),
            expected: 0o600,
            actual: 0o644,
        };
        assert_eq!(
            err.to_string(),
            "Key file core.key permission is 644, expected 600"
        );
    }

    #[test]
    fn file_errors_expose_filename_and_check() {
        let err = Error::SanMissing {
            filename: "proxy.crt".to_string(),
        };
        assert_eq!(err.filename(), Some("proxy.crt"));
        assert_eq!(err.check(), CheckKind::San);
    }

    #[test]
    fn config_error_has_no_filename() {
        let err = Error::Config("port".to_string());
        assert!(err.filename().is_none());
        assert_eq!(err.check(), CheckKind::Configuration);
    }
}
