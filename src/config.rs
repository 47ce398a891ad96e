// Configuration - Project Vigil
// "Orders are read before the watch begins"

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::alerting::AlertingConfig;
use crate::logging::LoggingConfig;
use crate::stats::StatsConfig;
use crate::store::StoreConfig;
use crate::tracker::TrackerConfig;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub stats: StatsSettings,
    pub alerting: AlertingSettings,
    pub logging: LoggingConfig,
    /// Stack frame markers identifying application code for fingerprinting
    pub app_path_markers: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreSettings {
    pub max_records: usize,
    pub max_occurrences: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        let defaults = StoreConfig::default();
        Self {
            max_records: defaults.max_records,
            max_occurrences: defaults.max_occurrences,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StatsSettings {
    pub refresh_interval_secs: u64,
    pub stop_timeout_secs: u64,
}

impl Default for StatsSettings {
    fn default() -> Self {
        let defaults = StatsConfig::default();
        Self {
            refresh_interval_secs: defaults.refresh_interval.as_secs(),
            stop_timeout_secs: defaults.stop_timeout.as_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AlertingSettings {
    pub aggregation_window_secs: u64,
    pub max_cache_size: usize,
    pub max_alerts: usize,
}

impl Default for AlertingSettings {
    fn default() -> Self {
        let defaults = AlertingConfig::default();
        Self {
            aggregation_window_secs: defaults.aggregation_window_secs,
            max_cache_size: defaults.max_cache_size,
            max_alerts: defaults.max_alerts,
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            // Optional config file alongside the binary
            .add_source(File::with_name("vigil").required(false))
            // Environment overrides, e.g. VIGIL_STORE__MAX_RECORDS=5000
            .add_source(Environment::with_prefix("vigil").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Materialize the tracker configuration from these settings
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            store: StoreConfig {
                max_records: self.store.max_records,
                max_occurrences: self.store.max_occurrences,
            },
            stats: StatsConfig {
                refresh_interval: std::time::Duration::from_secs(self.stats.refresh_interval_secs),
                stop_timeout: std::time::Duration::from_secs(self.stats.stop_timeout_secs),
            },
            alerting: AlertingConfig {
                aggregation_window_secs: self.alerting.aggregation_window_secs,
                max_cache_size: self.alerting.max_cache_size,
                max_alerts: self.alerting.max_alerts,
            },
            app_path_markers: self.app_path_markers.clone(),
        }
    }
}
