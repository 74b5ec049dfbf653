//! Internal TLS preparation
//!
//! Decides which certificate/key files a deployment's internal mutual TLS
//! needs, stages them from an operator-supplied directory into the runtime
//! secret directory with the right modes and owners, and validates the staged
//! set before the services that consume it start.
//!
//! # Features
//!
//! - **Requirement model**: required filenames from component flags, with a
//!   logical identifier → path table for service launch configuration
//! - **Staging**: wholesale replace of `<data_volume>/secret/tls`, keys `0600`,
//!   certificates `0644`, database vs service ownership
//! - **Validation**: existence, file type, key mode, certificate readability,
//!   Subject Alternative Name presence
//! - **Metrics settings**: port range validation for the metrics endpoint

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod internal_tls;
pub mod metrics;

pub use error::{CheckKind, Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to install subscriber: {e}")))?;
        }
        _ => {
            subscriber
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to install subscriber: {e}")))?;
        }
    }

    Ok(())
}
