//! hostplan.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Lowest port handed out when no range is configured.
pub const DEFAULT_MIN_PORT: u16 = 3000;
/// Highest port handed out when no range is configured.
pub const DEFAULT_MAX_PORT: u16 = 65535;
/// Service property that selects the port mode (`shared` / `private`).
pub const DEFAULT_MODE_PROPERTY: &str = "portAssign";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanConfig {
    pub ports: Option<PortsConfig>,
    pub distribution: Option<DistributionConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortsConfig {
    pub min_port: Option<u16>,
    pub max_port: Option<u16>,
    pub mode_property: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DistributionConfig {
    pub strategy: Option<String>,
    pub service_property: Option<String>,
    pub target_property: Option<String>,
}

impl PlanConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PlanConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Configured port range, falling back to the defaults per bound.
    pub fn port_range(&self) -> (u16, u16) {
        let ports = self.ports.as_ref();
        (
            ports.and_then(|p| p.min_port).unwrap_or(DEFAULT_MIN_PORT),
            ports.and_then(|p| p.max_port).unwrap_or(DEFAULT_MAX_PORT),
        )
    }

    pub fn mode_property(&self) -> &str {
        self.ports
            .as_ref()
            .and_then(|p| p.mode_property.as_deref())
            .unwrap_or(DEFAULT_MODE_PROPERTY)
    }

    pub fn strategy(&self) -> Option<&str> {
        self.distribution.as_ref()?.strategy.as_deref()
    }

    pub fn service_property(&self) -> Option<&str> {
        self.distribution.as_ref()?.service_property.as_deref()
    }

    pub fn target_property(&self) -> Option<&str> {
        self.distribution.as_ref()?.target_property.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlanConfig::default();
        assert_eq!(config.port_range(), (DEFAULT_MIN_PORT, DEFAULT_MAX_PORT));
        assert_eq!(config.mode_property(), "portAssign");
        assert!(config.strategy().is_none());
    }

    #[test]
    fn test_parse_full() {
        let toml_str = r#"
[ports]
min_port = 9000
max_port = 9002
mode_property = "port"

[distribution]
strategy = "greedy"
service_property = "requireMem"
target_property = "mem"
"#;
        let config: PlanConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.port_range(), (9000, 9002));
        assert_eq!(config.mode_property(), "port");
        assert_eq!(config.strategy(), Some("greedy"));
        assert_eq!(config.service_property(), Some("requireMem"));
        assert_eq!(config.target_property(), Some("mem"));
    }

    #[test]
    fn test_partial_range_falls_back() {
        let config: PlanConfig = toml::from_str("[ports]\nmax_port = 4000\n").unwrap();
        assert_eq!(config.port_range(), (DEFAULT_MIN_PORT, 4000));
    }

    #[test]
    fn test_from_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hostplan.toml");
        let config = PlanConfig {
            ports: Some(PortsConfig {
                min_port: Some(8000),
                max_port: None,
                mode_property: None,
            }),
            distribution: None,
        };
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();

        let loaded = PlanConfig::from_file(&path).unwrap();
        assert_eq!(loaded.port_range(), (8000, DEFAULT_MAX_PORT));
    }
}
