//! Metrics endpoint settings

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Optional metrics endpoint exposed by the deployed services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Expose metrics
    pub enabled: bool,
    /// TCP port; kept wider than `u16` so out-of-range input reaches `validate`
    pub port: u32,
    /// URL path segment
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 8080,
            path: "metrics".to_string(),
        }
    }
}

impl MetricsConfig {
    /// Reject ports outside 1..=65535
    pub fn validate(&self) -> Result<()> {
        self.listen_port().map(|_| ())
    }

    /// The validated port
    pub fn listen_port(&self) -> Result<u16> {
        u16::try_from(self.port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| {
                Error::Config(format!("Port number in metrics is not valid: {}", self.port))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_port(port: u32) -> MetricsConfig {
        MetricsConfig {
            port,
            ..MetricsConfig::default()
        }
    }

    #[test]
    fn port_zero_is_rejected() {
        assert!(with_port(0).validate().is_err());
    }

    #[test]
    fn port_above_range_is_rejected() {
        let err = with_port(65536).validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn common_ports_are_accepted() {
        assert!(with_port(8080).validate().is_ok());
        assert_eq!(with_port(1).listen_port().unwrap(), 1);
        assert_eq!(with_port(65535).listen_port().unwrap(), 65535);
    }

    #[test]
    fn defaults() {
        let cfg = MetricsConfig::default();
        assert!(!cfg.enabled);
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.path, "metrics");
    }

    #[test]
    fn deserialises_partial_yaml() {
        let cfg: MetricsConfig = serde_yaml::from_str("enabled: true\nport: 9090").unwrap();
        assert!(cfg.enabled);
        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.path, "metrics");
    }
}
