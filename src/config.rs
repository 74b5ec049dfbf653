//! Configuration management

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::internal_tls::{CertRequirements, ComponentFlags, InternalTls, Ownership};
use crate::metrics::MetricsConfig;
use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base directory for runtime data; staged material lands in
    /// `<data_volume>/secret/tls`
    pub data_volume: PathBuf,
    /// Internal TLS settings
    pub internal_tls: InternalTlsConfig,
    /// Optional components deployed alongside the core services
    pub components: ComponentFlags,
    /// Owners applied to staged files
    pub ownership: Ownership,
    /// Metrics endpoint
    pub metric: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_volume: PathBuf::from("/data"),
            internal_tls: InternalTlsConfig::default(),
            components: ComponentFlags::default(),
            ownership: Ownership::default(),
            metric: MetricsConfig::default(),
        }
    }
}

/// Internal TLS configuration block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InternalTlsConfig {
    /// Enable mutual TLS between internal services
    pub enabled: bool,
    /// Services require client certificates from their peers
    pub verify_client_cert: bool,
    /// Operator-supplied directory holding the certificates and keys
    pub dir: PathBuf,
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // INTERNAL_TLS_INTERNAL_TLS__ENABLED=true, INTERNAL_TLS_DATA_VOLUME=/data, ...
        figment = figment.merge(Env::prefixed("INTERNAL_TLS_").split("__"));

        figment.extract().map_err(|e| Error::Config(e.to_string()))
    }

    /// Check settings that can be verified without touching the filesystem
    pub fn validate(&self) -> Result<()> {
        self.metric.validate()?;

        if self.internal_tls.enabled && self.internal_tls.dir.as_os_str().is_empty() {
            return Err(Error::Config(
                "internal_tls.dir must be set when internal TLS is enabled".to_string(),
            ));
        }

        Ok(())
    }

    /// Requirement set for this configuration
    #[must_use]
    pub fn requirements(&self) -> CertRequirements {
        CertRequirements::new(
            self.internal_tls.enabled,
            self.internal_tls.verify_client_cert,
            &self.internal_tls.dir,
            &self.data_volume,
            self.components,
        )
    }

    /// Requirement set bundled with staging ownership
    #[must_use]
    pub fn internal_tls(&self) -> InternalTls {
        InternalTls::new(self.requirements(), self.ownership)
    }
}
