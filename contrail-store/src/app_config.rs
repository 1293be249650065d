use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub ledger: LedgerRules,
    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Business rules of the ledger. Defaults match the published fare conditions.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LedgerRules {
    #[serde(default = "default_max_tickets")]
    pub max_tickets_per_flight: u32,
    #[serde(default = "default_full_refund_hours")]
    pub full_refund_hours: i64,
    #[serde(default = "default_partial_refund_hours")]
    pub partial_refund_hours: i64,
    #[serde(default = "default_partial_refund_percent")]
    pub partial_refund_percent: u8,
}

fn default_max_tickets() -> u32 { 4 }
fn default_full_refund_hours() -> i64 { 48 }
fn default_partial_refund_hours() -> i64 { 24 }
fn default_partial_refund_percent() -> u8 { 80 }

impl Default for LedgerRules {
    fn default() -> Self {
        Self {
            max_tickets_per_flight: default_max_tickets(),
            full_refund_hours: default_full_refund_hours(),
            partial_refund_hours: default_partial_refund_hours(),
            partial_refund_percent: default_partial_refund_percent(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RunnerConfig {
    /// Command script replayed by the runner binary.
    pub script_path: Option<String>,
    /// Starting time of the runner's clock. Wall-clock time when absent.
    pub start_time: Option<DateTime<Utc>>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `CONTRAIL__LEDGER__MAX_TICKETS_PER_FLIGHT=2`
            .add_source(config::Environment::with_prefix("CONTRAIL").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
