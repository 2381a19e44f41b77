//! Runtime configuration for a sweep.
//!
//! Loaded from an optional TOML file; every key has a default so an empty
//! file (or no file) is valid. The binary applies CLI overrides on top.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::StartupError;

/// Which places count as "already seen" when deduplicating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DedupScope {
    /// One identity set for the whole sweep; overlapping cells never repeat a place
    #[default]
    Sweep,
    /// A fresh identity set per cell; places in overlapping radii appear once per cell
    Cell,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Label for the run, used in the output filename
    pub query: String,
    /// Place type filter sent with every nearby search
    pub place_type: String,
    /// Optional free-text keyword sent with every nearby search
    pub keyword: Option<String>,
    /// Search radius around each cell center, in meters
    pub radius_m: u32,
    /// Approximate number of grid cells to tile the boundary with
    pub target_cells: u32,
    /// Region name, used in the output filename
    pub region: String,
    pub dedup_scope: DedupScope,
    /// Retries of a rate-limited request before the cell is failed
    pub max_rate_limit_retries: u32,
    pub quota: QuotaConfig,
    pub delays: DelayConfig,
}

/// Request thresholds. `0` disables a threshold.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    pub per_minute: u32,
    pub per_day: u32,
    pub cooldown_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DelayConfig {
    /// Wait before using a fresh page token
    pub page_settle_ms: u64,
    /// Wait between two cells
    pub between_cells_ms: u64,
    /// Wait before retrying a rate-limited request
    pub rate_limit_retry_ms: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            query: "hotel".to_string(),
            place_type: "lodging".to_string(),
            keyword: None,
            radius_m: 5000,
            target_cells: 10_000,
            region: "Spain".to_string(),
            dedup_scope: DedupScope::default(),
            max_rate_limit_retries: 10,
            quota: QuotaConfig::default(),
            delays: DelayConfig::default(),
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            per_minute: 2000,
            per_day: 500_000,
            cooldown_secs: 60,
        }
    }
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            page_settle_ms: 2000,
            between_cells_ms: 1000,
            rate_limit_retry_ms: 10_000,
        }
    }
}

impl DelayConfig {
    pub fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms)
    }

    pub fn between_cells(&self) -> Duration {
        Duration::from_millis(self.between_cells_ms)
    }

    pub fn rate_limit_retry(&self) -> Duration {
        Duration::from_millis(self.rate_limit_retry_ms)
    }

    #[cfg(test)]
    pub(crate) fn none() -> Self {
        Self {
            page_settle_ms: 0,
            between_cells_ms: 0,
            rate_limit_retry_ms: 0,
        }
    }
}

impl SweepConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, StartupError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| StartupError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, StartupError> {
        let config: SweepConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), StartupError> {
        if self.radius_m == 0 {
            return Err(StartupError::ConfigInvalid("radius_m must be positive".into()));
        }
        if self.target_cells == 0 {
            return Err(StartupError::ConfigInvalid(
                "target_cells must be positive".into(),
            ));
        }
        if self.query.trim().is_empty() {
            return Err(StartupError::ConfigInvalid("query must not be empty".into()));
        }
        Ok(())
    }

    /// Default export filename, e.g. `hotel_in_Spain.csv`
    pub fn output_filename(&self) -> String {
        let sanitize = |s: &str| -> String {
            s.trim()
                .chars()
                .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
                .collect()
        };
        format!("{}_in_{}.csv", sanitize(&self.query), sanitize(&self.region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = SweepConfig::from_toml_str("").unwrap();
        assert_eq!(config.query, "hotel");
        assert_eq!(config.place_type, "lodging");
        assert_eq!(config.radius_m, 5000);
        assert_eq!(config.target_cells, 10_000);
        assert_eq!(config.quota.per_minute, 2000);
        assert_eq!(config.quota.per_day, 500_000);
        assert_eq!(config.dedup_scope, DedupScope::Sweep);
    }

    #[test]
    fn test_partial_override() {
        let config = SweepConfig::from_toml_str(
            r#"
            query = "hostel"
            dedup_scope = "cell"

            [quota]
            per_minute = 0

            [delays]
            page_settle_ms = 2500
            "#,
        )
        .unwrap();
        assert_eq!(config.query, "hostel");
        assert_eq!(config.dedup_scope, DedupScope::Cell);
        assert_eq!(config.quota.per_minute, 0);
        assert_eq!(config.quota.per_day, 500_000);
        assert_eq!(config.delays.page_settle(), Duration::from_millis(2500));
        assert_eq!(config.delays.between_cells_ms, 1000);
    }

    #[test]
    fn test_zero_radius_rejected() {
        assert!(matches!(
            SweepConfig::from_toml_str("radius_m = 0"),
            Err(StartupError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_bad_toml_rejected() {
        assert!(matches!(
            SweepConfig::from_toml_str("radius_m = \"far\""),
            Err(StartupError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_output_filename() {
        let config = SweepConfig {
            query: "bed and breakfast".into(),
            region: "Spain".into(),
            ..SweepConfig::default()
        };
        assert_eq!(config.output_filename(), "bed_and_breakfast_in_Spain.csv");
    }
}
