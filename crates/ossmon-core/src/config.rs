//! Exporter config (`config.toml`) parser.
//!
//! ```toml
//! listen-address = "0.0.0.0:9101"
//! refresh-interval-second = 60
//!
//! [envs.prod]
//! region = "cn-hangzhou"
//! accessKeyId = "LTAI..."
//! accessKeySecret = "..."
//! ```

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Credentials, Environment};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExporterConfig {
    /// Address the `/metrics` endpoint binds to. A bare `:port` binds all
    /// interfaces.
    pub listen_address: String,
    /// Poll interval shared by every environment.
    pub refresh_interval_second: u64,
    /// Per-environment cap on outstanding fetch tasks. 0 means unbounded.
    #[serde(default)]
    pub max_in_flight: usize,
    /// How long shutdown waits for outstanding fetches. 0 means no wait.
    #[serde(default)]
    pub shutdown_drain_seconds: u64,
    #[serde(default)]
    pub envs: BTreeMap<String, EnvConfig>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct EnvConfig {
    pub region: String,
    #[serde(rename = "accessKeyId")]
    pub access_key_id: String,
    #[serde(rename = "accessKeySecret")]
    pub access_key_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl std::fmt::Debug for EnvConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvConfig")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl ExporterConfig {
    /// Read, parse, and validate a config file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate config from a TOML string.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: ExporterConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.refresh_interval_second == 0 {
            return Err(ConfigError::Invalid(
                "refresh-interval-second must be greater than zero".to_string(),
            ));
        }
        self.listen_addr()?;

        for (name, env) in &self.envs {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("environment name must not be empty".to_string()));
            }
            if env.region.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "environment {name}: region must not be empty"
                )));
            }
        }

        if self.envs.is_empty() {
            warn!("no environments configured, exporter will serve an empty gauge set");
        }
        Ok(())
    }

    /// The parsed listen address.
    pub fn listen_addr(&self) -> ConfigResult<SocketAddr> {
        parse_listen_address(&self.listen_address)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_second)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_drain_seconds)
    }

    /// The fan-out cap, if one is configured.
    pub fn max_in_flight(&self) -> Option<usize> {
        (self.max_in_flight > 0).then_some(self.max_in_flight)
    }

    /// Environments in name order.
    pub fn environments(&self) -> Vec<Environment> {
        self.envs
            .iter()
            .map(|(name, env)| Environment {
                name: name.clone(),
                region: env.region.clone(),
                credentials: Credentials {
                    access_key_id: env.access_key_id.clone(),
                    access_key_secret: env.access_key_secret.clone(),
                },
                endpoint: env.endpoint.clone(),
            })
            .collect()
    }
}

fn parse_listen_address(s: &str) -> ConfigResult<SocketAddr> {
    let s = s.trim();
    let full = if s.starts_with(':') {
        format!("0.0.0.0{s}")
    } else {
        s.to_string()
    };
    full.parse()
        .map_err(|e| ConfigError::Invalid(format!("listen-address {s:?}: {e}")))
}
