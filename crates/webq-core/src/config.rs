use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::probe::TcpProbe;
use crate::request::Target;
use crate::retry::RetryPolicy;
use crate::scheduler::SchedulerOptions;

/// Connectivity probe parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Host that must accept a TCP connection for the network to count as reachable.
    pub host: String,
    pub port: u16,
    /// Connect timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            host: "www.google.com".to_string(),
            port: 443,
            timeout_ms: 3000,
        }
    }
}

impl ProbeConfig {
    pub fn to_probe(&self) -> TcpProbe {
        TcpProbe::new(self.host.clone(), self.port, Duration::from_millis(self.timeout_ms))
    }
}

/// Global configuration loaded from `~/.config/webq/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebqConfig {
    /// Timeout applied to requests that don't set their own.
    pub default_timeout_secs: u64,
    /// Fixed delay between offline retries.
    pub retry_delay_secs: u64,
    #[serde(default)]
    pub probe: ProbeConfig,
    /// Optional User-Agent sent with every request.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Named base URLs, so requests can say `weather` instead of the full base.
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,
}

impl Default for WebqConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: 3,
            retry_delay_secs: 2,
            probe: ProbeConfig::default(),
            user_agent: None,
            endpoints: BTreeMap::new(),
        }
    }
}

impl WebqConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            retry: RetryPolicy::new(Duration::from_secs(self.retry_delay_secs)),
        }
    }

    /// Build a target, resolving `base` through the `[endpoints]` aliases.
    pub fn target(&self, base: &str, endpoint: &str) -> Target {
        let base = self.endpoints.get(base).map(String::as_str).unwrap_or(base);
        Target::new(base, endpoint)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: Self = toml::from_str(&data)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// A zero request timeout would disable curl's timeout entirely.
    pub fn validate(&self) -> Result<()> {
        if self.default_timeout_secs == 0 {
            anyhow::bail!("default_timeout_secs must be at least 1");
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("webq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<WebqConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<WebqConfig> {
    if !path.exists() {
        let default_cfg = WebqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    WebqConfig::load_from_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = WebqConfig::default();
        assert_eq!(cfg.default_timeout(), Duration::from_secs(3));
        assert_eq!(cfg.scheduler_options().retry.delay, Duration::from_secs(2));
        assert_eq!(cfg.probe.port, 443);
        assert!(cfg.endpoints.is_empty());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = WebqConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: WebqConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.default_timeout_secs, cfg.default_timeout_secs);
        assert_eq!(parsed.retry_delay_secs, cfg.retry_delay_secs);
        assert_eq!(parsed.probe, cfg.probe);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            default_timeout_secs = 10
            retry_delay_secs = 5
            user_agent = "webq/0.1"

            [probe]
            host = "1.1.1.1"
            port = 53
            timeout_ms = 500

            [endpoints]
            weather = "https://api.openweathermap.org/data/2.5"
        "#;
        let cfg: WebqConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.default_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.scheduler_options().retry.delay, Duration::from_secs(5));
        assert_eq!(cfg.user_agent.as_deref(), Some("webq/0.1"));
        assert_eq!(cfg.probe.host, "1.1.1.1");
        assert_eq!(cfg.probe.timeout_ms, 500);
        assert_eq!(
            cfg.target("weather", "forecast").location(),
            "https://api.openweathermap.org/data/2.5/forecast"
        );
        assert_eq!(
            cfg.target("http://other", "x").location(),
            "http://other/x"
        );
    }

    #[test]
    fn optional_sections_default() {
        let toml = r#"
            default_timeout_secs = 3
            retry_delay_secs = 2
        "#;
        let cfg: WebqConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.probe, ProbeConfig::default());
        assert!(cfg.user_agent.is_none());
    }

    #[test]
    fn zero_default_timeout_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "default_timeout_secs = 0\nretry_delay_secs = 2\n").unwrap();
        let err = WebqConfig::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("default_timeout_secs"));
    }

    #[test]
    fn load_or_init_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = load_or_init_at(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.retry_delay_secs, 2);

        fs::write(&path, "default_timeout_secs = 7\nretry_delay_secs = 1\n").unwrap();
        let cfg = load_or_init_at(&path).unwrap();
        assert_eq!(cfg.default_timeout_secs, 7);
    }
}
