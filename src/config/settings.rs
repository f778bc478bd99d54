//! Process settings.
//!
//! Loaded from a YAML file layered with `PLCWATCH_*` environment variables
//! (nested keys separated by `__`, e.g. `PLCWATCH_INFLUXDB__TOKEN`).
//!
//! ```yaml
//! influxdb:
//!   url: http://localhost:8086
//!   token: secret
//!   org: plant
//!   bucket: plc
//!   parameterized: false
//! server:
//!   hostname: 0.0.0.0
//!   port: 3000
//! chart:
//!   config_path: chart-config.yml
//!   probe_lookback: -30d
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::TimeDelta;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::chart::UnknownMeasurementPolicy;
use crate::config::defaults::DEFAULT_PROBE_CONCURRENCY;
use crate::error::Result;
use crate::query::flux::{DEFAULT_FIELD, DEFAULT_MEASUREMENT, DEFAULT_VARIABLE_TAG};
use crate::query::{QueryBuilder, RelativeOffset};

/// Top-level settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub influxdb: InfluxSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub chart: ChartSettings,
}

impl Settings {
    /// Load settings from a file plus environment overrides.
    pub fn load(path: &Path) -> std::result::Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix("PLCWATCH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}

/// Connection to the time-series store.
#[derive(Debug, Clone, Deserialize)]
pub struct InfluxSettings {
    #[serde(default = "default_influx_url")]
    pub url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub org: String,
    pub bucket: String,
    /// Send bound query parameters. Turn off for InfluxDB OSS, which only
    /// accepts inlined literals.
    #[serde(default = "default_parameterized")]
    pub parameterized: bool,
}

fn default_influx_url() -> String {
    "http://localhost:8086".to_string()
}

fn default_parameterized() -> bool {
    true
}

/// HTTP listener.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub hostname: String,
    pub port: u16,
    /// Directory served for paths no route matches.
    pub public_dir: PathBuf,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            hostname: "127.0.0.1".to_string(),
            port: 3000,
            public_dir: PathBuf::from("public"),
        }
    }
}

/// Query pipeline and chart configuration settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    /// Chart configuration file (measurements and variable groups).
    pub config_path: PathBuf,
    /// Points per series that historical and relative charts aim for.
    pub target_points: u32,
    pub measurement: String,
    /// Tag holding variable names.
    pub variable_tag: String,
    pub field: String,
    pub live_lookback_secs: u32,
    pub live_interval_ms: u64,
    /// How far back default-generation looks, as a relative token (`-30d`).
    pub probe_lookback: String,
    pub query_timeout_secs: u64,
    /// Min/max probes default-generation runs at once.
    pub probe_concurrency: usize,
    /// Reject charts containing variables without a measurement instead of
    /// drawing them on a default axis.
    pub strict_measurements: bool,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("chart-config.yml"),
            target_points: 200,
            measurement: DEFAULT_MEASUREMENT.to_string(),
            variable_tag: DEFAULT_VARIABLE_TAG.to_string(),
            field: DEFAULT_FIELD.to_string(),
            live_lookback_secs: 3,
            live_interval_ms: 1000,
            probe_lookback: "-30d".to_string(),
            query_timeout_secs: 10,
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
            strict_measurements: false,
        }
    }
}

impl ChartSettings {
    /// Query builder for `bucket` using the configured measurement, tag and field.
    pub fn query_builder(&self, bucket: &str) -> QueryBuilder {
        QueryBuilder::new(bucket)
            .measurement(&self.measurement)
            .variable_tag(&self.variable_tag)
            .field(&self.field)
    }

    pub fn probe_lookback(&self) -> Result<RelativeOffset> {
        RelativeOffset::parse(&self.probe_lookback)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs.max(1))
    }

    pub fn live_interval(&self) -> Duration {
        Duration::from_millis(self.live_interval_ms.max(1))
    }

    pub fn live_lookback(&self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.live_lookback_secs))
    }

    pub fn measurement_policy(&self) -> UnknownMeasurementPolicy {
        if self.strict_measurements {
            UnknownMeasurementPolicy::Reject
        } else {
            UnknownMeasurementPolicy::Fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn write_yaml(content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".yml").tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_load_minimal_uses_defaults() {
        let file = write_yaml("influxdb:\n  bucket: plc\n");
        let settings = Settings::load(file.path()).unwrap();

        assert_eq!(settings.influxdb.bucket, "plc");
        assert_eq!(settings.influxdb.url, "http://localhost:8086");
        assert!(settings.influxdb.parameterized);
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.chart.target_points, 200);
        assert_eq!(settings.chart.variable_tag, "VariableName");
        assert_eq!(settings.chart.live_interval(), Duration::from_secs(1));
        assert_eq!(settings.chart.live_lookback(), TimeDelta::seconds(3));
        assert_eq!(settings.chart.probe_concurrency, 8);
        assert_eq!(
            settings.chart.probe_lookback().unwrap().to_string(),
            "-30d"
        );
        assert_eq!(
            settings.chart.measurement_policy(),
            UnknownMeasurementPolicy::Fallback
        );
    }

    #[test]
    fn test_load_overrides() {
        let file = write_yaml(
            "influxdb:\n  url: http://influx:8086\n  token: abc\n  org: plant\n  bucket: plc\n  parameterized: false\n\
             server:\n  hostname: 0.0.0.0\n  port: 8080\n\
             chart:\n  probe_lookback: -1y\n  strict_measurements: true\n  target_points: 500\n",
        );
        let settings = Settings::load(file.path()).unwrap();

        assert_eq!(settings.influxdb.org, "plant");
        assert!(!settings.influxdb.parameterized);
        assert_eq!(settings.server.hostname, "0.0.0.0");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.chart.target_points, 500);
        assert!(settings.chart.probe_lookback().is_err());
        assert_eq!(
            settings.chart.measurement_policy(),
            UnknownMeasurementPolicy::Reject
        );
    }

    #[test]
    fn test_missing_bucket_is_an_error() {
        let file = write_yaml("influxdb:\n  url: http://influx:8086\n");
        assert!(Settings::load(file.path()).is_err());
    }

    #[test]
    fn test_query_builder_uses_settings() {
        let chart = ChartSettings {
            measurement: "line_2".to_string(),
            ..ChartSettings::default()
        };
        assert_eq!(chart.query_builder("plc").tag(), "VariableName");
    }
}
