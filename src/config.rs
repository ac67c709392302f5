//! Configuration management for procwatch
//!
//! This module defines the file-facing `Config` struct, loaded with the
//! `figment` crate from defaults, an optional `procwatch.toml` file,
//! `PROCWATCH_` environment variables, and command-line arguments, in that
//! order of precedence. It also defines `SchedulerConfig`, the validated,
//! strongly typed settings a [`Scheduler`](crate::Scheduler) runs with.

use crate::category::MetricCategory;
use crate::cli::Cli;
use crate::error::ConfigError;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Sampling interval used when none is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Default upper bound on a single introspection request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Default window granted to in-flight work when stopping.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Port of the standalone profiling server.
pub const DEFAULT_PPROF_PORT: u16 = 61000;

/// Interval of a scheduler that only serves profiling routes. It samples
/// nothing, so the value only has to be non-zero.
const PROFILING_ONLY_INTERVAL: Duration = Duration::from_secs(3600);

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Sampling and introspection settings.
    pub monitor: MonitorConfig,
}

/// Sampling and introspection settings as they appear in a config file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Categories to sample, e.g. `"threads|memory"` or `"none"`.
    pub selector: MetricCategory,
    /// Milliseconds between samples.
    pub interval_ms: u64,
    /// Introspection server port; 0 disables the server.
    pub port: u16,
    /// Interface the introspection server binds to.
    pub bind_address: IpAddr,
    /// Emit lifecycle messages.
    #[serde(default)]
    pub verbose: bool,
    /// Introspection server tunables.
    pub server: ServerConfig,
}

/// Introspection server tunables.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// Upper bound on a single request, in seconds.
    pub request_timeout_seconds: u64,
    /// How long `stop` waits for in-flight work, in seconds.
    pub shutdown_grace_seconds: u64,
}

impl Config {
    /// Loads the configuration, layering defaults, the TOML file named by the
    /// CLI (if any), `PROCWATCH_*` environment variables, and CLI overrides.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(path) = &cli.config {
            figment = figment.merge(Toml::file(path));
        }
        let config = figment
            // e.g. PROCWATCH_MONITOR__INTERVAL_MS=500
            .merge(Env::prefixed("PROCWATCH_").split("__"))
            .merge(cli.clone())
            .extract()?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            selector: MetricCategory::DEFAULT,
            interval_ms: DEFAULT_INTERVAL.as_millis() as u64,
            port: 0,
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            verbose: false,
            server: ServerConfig {
                request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT.as_secs(),
                shutdown_grace_seconds: DEFAULT_SHUTDOWN_GRACE.as_secs(),
            },
        }
    }
}

impl MonitorConfig {
    /// Validates the file settings into a `SchedulerConfig`.
    pub fn to_scheduler_config(&self) -> Result<SchedulerConfig, ConfigError> {
        let mut config = SchedulerConfig::new(
            self.selector,
            Duration::from_millis(self.interval_ms),
            self.port,
        )?;
        if self.server.request_timeout_seconds == 0 {
            return Err(ConfigError::ZeroRequestTimeout);
        }
        config.verbose = self.verbose;
        config.bind_address = self.bind_address;
        config.request_timeout = Duration::from_secs(self.server.request_timeout_seconds);
        config.shutdown_grace = Duration::from_secs(self.server.shutdown_grace_seconds);
        Ok(config)
    }
}

/// Settings a scheduler runs with.
///
/// Build one with [`SchedulerConfig::new`] or take the defaults; either way
/// the interval is non-zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub(crate) selector: MetricCategory,
    pub(crate) interval: Duration,
    /// Introspection server port; 0 disables the server.
    pub port: u16,
    pub verbose: bool,
    /// Interface the introspection server binds to.
    pub bind_address: IpAddr,
    /// Upper bound on a single introspection request.
    pub request_timeout: Duration,
    /// How long `stop` waits for each background task before aborting it.
    pub shutdown_grace: Duration,
}

impl SchedulerConfig {
    /// Creates a config with the given selector, interval and port, and the
    /// default values for everything else.
    pub fn new(
        selector: MetricCategory,
        interval: Duration,
        port: u16,
    ) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(Self {
            selector,
            interval,
            port,
            ..Self::default()
        })
    }

    pub fn selector(&self) -> MetricCategory {
        self.selector
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The address the introspection server binds, or `None` when disabled.
    pub fn http_addr(&self) -> Option<SocketAddr> {
        (self.port > 0).then(|| SocketAddr::new(self.bind_address, self.port))
    }

    /// Settings for a server-only monitor: nothing selected, an hour between
    /// ticks, verbose on, serving on `port`.
    pub fn profiling_only(port: u16) -> Self {
        Self {
            selector: MetricCategory::NONE,
            interval: PROFILING_ONLY_INTERVAL,
            port,
            verbose: true,
            ..Self::default()
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            selector: MetricCategory::DEFAULT,
            interval: DEFAULT_INTERVAL,
            port: 0,
            verbose: false,
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_config_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.selector(), MetricCategory::THREADS | MetricCategory::MEMORY);
        assert_eq!(config.interval(), Duration::from_secs(10));
        assert_eq!(config.port, 0);
        assert!(!config.verbose);
        assert_eq!(config.http_addr(), None);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        assert!(matches!(
            SchedulerConfig::new(MetricCategory::DEFAULT, Duration::ZERO, 0),
            Err(ConfigError::ZeroInterval)
        ));
    }

    #[test]
    fn test_http_addr_uses_bind_address() {
        let config =
            SchedulerConfig::new(MetricCategory::NONE, Duration::from_millis(5), 6060).unwrap();
        assert_eq!(config.http_addr(), Some("127.0.0.1:6060".parse().unwrap()));
    }

    #[test]
    fn test_profiling_only_preset() {
        let config = SchedulerConfig::profiling_only(DEFAULT_PPROF_PORT);
        assert_eq!(config.selector(), MetricCategory::NONE);
        assert_eq!(config.interval(), Duration::from_secs(3600));
        assert!(config.verbose);
        assert_eq!(config.http_addr(), Some("127.0.0.1:61000".parse().unwrap()));
    }

    #[test]
    fn test_monitor_config_conversion() {
        let monitor = MonitorConfig {
            selector: MetricCategory::MEMORY,
            interval_ms: 250,
            port: 7070,
            bind_address: "0.0.0.0".parse().unwrap(),
            verbose: true,
            server: ServerConfig {
                request_timeout_seconds: 60,
                shutdown_grace_seconds: 2,
            },
        };
        let config = monitor.to_scheduler_config().unwrap();
        assert_eq!(config.selector(), MetricCategory::MEMORY);
        assert_eq!(config.interval(), Duration::from_millis(250));
        assert_eq!(config.http_addr(), Some("0.0.0.0:7070".parse().unwrap()));
        assert!(config.verbose);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.shutdown_grace, Duration::from_secs(2));
    }

    #[test]
    fn test_monitor_config_rejects_zero_timeouts() {
        let mut monitor = MonitorConfig::default();
        monitor.interval_ms = 0;
        assert!(matches!(monitor.to_scheduler_config(), Err(ConfigError::ZeroInterval)));

        let mut monitor = MonitorConfig::default();
        monitor.server.request_timeout_seconds = 0;
        assert!(matches!(
            monitor.to_scheduler_config(),
            Err(ConfigError::ZeroRequestTimeout)
        ));
    }
}
