//! Startup configuration.
//!
//! The configuration file is YAML with one section per transport plus the HTTP
//! server settings. Setting `F1_TCS_SIMULATOR` to `true`, `1` or `yes` points the
//! line-protocol endpoint at the simulator instead of the real mount.

use crate::endpoint::{DeviceEndpoint, Endpoints};
use crate::{Error, Result};
use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable selecting the line-protocol simulator.
pub const SIMULATOR_ENV: &str = "F1_TCS_SIMULATOR";

/// Whole configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Alpaca property API.
    pub ascom: AscomConfig,
    /// ASCII line-protocol server.
    pub f1_ascii: AsciiConfig,
    /// HTTP frontend.
    #[serde(default)]
    pub server: ServerConfig,
}

/// `ascom` section.
#[derive(Debug, Clone, Deserialize)]
pub struct AscomConfig {
    /// Host of the Alpaca server.
    pub host: String,
    /// Port of the Alpaca server.
    pub port: u16,
    /// Telescope device number.
    #[serde(default)]
    pub device: u32,
    /// API version, with or without the leading `v`.
    #[serde(default = "default_api_version")]
    pub api_version: ApiVersion,
    /// Per-call timeout in seconds.
    #[serde(default = "default_ascom_timeout")]
    pub timeout: f64,
}

/// `f1_ascii` section.
#[derive(Debug, Clone, Deserialize)]
pub struct AsciiConfig {
    /// Host of the line-protocol server.
    pub host: String,
    /// Port of the line-protocol server.
    pub port: u16,
    /// Per-exchange timeout in seconds.
    #[serde(default = "default_ascii_timeout")]
    pub timeout: f64,
    /// Simulator address, used when [`SIMULATOR_ENV`] is set.
    #[serde(default)]
    pub simulator: Option<SimulatorConfig>,
}

/// `f1_ascii.simulator` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatorConfig {
    /// Simulator host.
    pub host: String,
    /// Simulator port.
    pub port: u16,
}

/// `server` section.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ServerConfig {
    /// Address for the HTTP API to listen on.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Serialise composite mount sequences behind an advisory lock.
    #[serde(default)]
    pub exclusive_sequences: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            exclusive_sequences: false,
        }
    }
}

/// Alpaca API version as written in the config; YAML may give it as `1` or `v1`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ApiVersion {
    /// Bare number.
    Number(u32),
    /// Verbatim path segment.
    Text(String),
}

impl ApiVersion {
    /// Path segment used in request URLs.
    pub fn segment(&self) -> String {
        match self {
            Self::Number(n) => format!("v{n}"),
            Self::Text(s) if s.starts_with('v') => s.clone(),
            Self::Text(s) => format!("v{s}"),
        }
    }
}

const fn default_api_version() -> ApiVersion {
    ApiVersion::Number(1)
}

const fn default_ascom_timeout() -> f64 {
    5.0
}

const fn default_ascii_timeout() -> f64 {
    1.0
}

fn default_listen() -> SocketAddr {
    (Ipv4Addr::LOCALHOST, 8000).into()
}

fn seconds(name: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|err| Error::Config(format!("{name} must be a non-negative number of seconds: {err}")))
}

/// Interpret the value of [`SIMULATOR_ENV`].
pub fn simulator_requested(value: Option<&str>) -> bool {
    value.is_some_and(|value| {
        matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
    })
}

/// Read [`SIMULATOR_ENV`] from the process environment.
pub fn simulator_enabled() -> bool {
    simulator_requested(std::env::var(SIMULATOR_ENV).ok().as_deref())
}

impl Config {
    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|err| Error::Config(err.to_string()))
    }

    /// Read and parse a YAML file.
    #[tracing::instrument(err)]
    pub fn from_path(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|err| Error::Config(format!("couldn't read {}: {err}", path.display())))?;
        Self::from_yaml_str(&yaml)
    }

    /// Build the immutable endpoint set handed to the HTTP server.
    pub fn endpoints(&self, simulator: bool) -> Result<Endpoints> {
        let ascii = if simulator {
            let sim = self.f1_ascii.simulator.as_ref().ok_or_else(|| {
                Error::Config(format!(
                    "{SIMULATOR_ENV} is set but f1_ascii.simulator is not configured"
                ))
            })?;
            tracing::info!(host = %sim.host, port = sim.port, "Using line-protocol simulator");
            DeviceEndpoint::new(&sim.host, sim.port)
        } else {
            DeviceEndpoint::new(&self.f1_ascii.host, self.f1_ascii.port)
        };

        Ok(Endpoints {
            ascom: Arc::new(
                DeviceEndpoint::new(&self.ascom.host, self.ascom.port)
                    .with_device(self.ascom.device),
            ),
            api_version: self.ascom.api_version.segment(),
            ascom_timeout: seconds("ascom.timeout", self.ascom.timeout)?,
            ascii: Arc::new(ascii),
            ascii_timeout: seconds("f1_ascii.timeout", self.f1_ascii.timeout)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiVersion, Config, simulator_requested};
    use std::time::Duration;

    const FULL: &str = r"
ascom:
  host: 10.1.1.5
  port: 11111
  device: 2
  api_version: v1
  timeout: 2.5
f1_ascii:
  host: 10.1.1.5
  port: 8080
  timeout: 0.5
  simulator:
    host: 127.0.0.1
    port: 9090
server:
  listen: 0.0.0.0:8100
  exclusive_sequences: true
";

    #[test]
    fn parses_full_document() -> eyre::Result<()> {
        let config = Config::from_yaml_str(FULL)?;
        let endpoints = config.endpoints(false)?;

        assert_eq!(endpoints.ascom.to_string(), "10.1.1.5:11111");
        assert_eq!(endpoints.ascom.device(), 2);
        assert_eq!(endpoints.api_version, "v1");
        assert_eq!(endpoints.ascom_timeout, Duration::from_millis(2500));
        assert_eq!(endpoints.ascii.to_string(), "10.1.1.5:8080");
        assert_eq!(endpoints.ascii_timeout, Duration::from_millis(500));
        assert_eq!(config.server.listen.port(), 8100);
        assert!(config.server.exclusive_sequences);
        Ok(())
    }

    #[test]
    fn simulator_toggle_swaps_line_endpoint() -> eyre::Result<()> {
        let endpoints = Config::from_yaml_str(FULL)?.endpoints(true)?;
        assert_eq!(endpoints.ascii.to_string(), "127.0.0.1:9090");
        assert_eq!(endpoints.ascom.to_string(), "10.1.1.5:11111");
        Ok(())
    }

    #[test]
    fn defaults_apply_to_minimal_document() -> eyre::Result<()> {
        let config = Config::from_yaml_str(
            "ascom: {host: mount, port: 11111}\nf1_ascii: {host: mount, port: 8080}\n",
        )?;
        assert_eq!(config.ascom.api_version, ApiVersion::Number(1));
        assert!(!config.server.exclusive_sequences);

        let endpoints = config.endpoints(false)?;
        assert_eq!(endpoints.api_version, "v1");
        assert_eq!(endpoints.ascom.device(), 0);
        assert_eq!(endpoints.ascii_timeout, Duration::from_secs(1));
        assert!(config.endpoints(true).is_err(), "no simulator block configured");
        Ok(())
    }

    #[test]
    fn rejects_negative_timeout() -> eyre::Result<()> {
        let config = Config::from_yaml_str(
            "ascom: {host: m, port: 1, timeout: -1}\nf1_ascii: {host: m, port: 2}\n",
        )?;
        assert!(config.endpoints(false).is_err());
        Ok(())
    }

    #[test]
    fn simulator_env_values() {
        for on in ["true", "TRUE", "1", "yes", " Yes "] {
            assert!(simulator_requested(Some(on)), "{on:?}");
        }
        for off in ["false", "0", "no", ""] {
            assert!(!simulator_requested(Some(off)), "{off:?}");
        }
        assert!(!simulator_requested(None));
    }
}
