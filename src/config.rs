use chrono::NaiveTime;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::sync::Arc;

use crate::core::schedule::{FixedWindow, OpenNowPolicy, ScheduledHours, TimeWindow};
use crate::core::selector::SelectionMode;
use crate::models::{ModeDefaults, ScoringWeights};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub selection: SelectionSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub open_hours: OpenHoursSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSettings {
    /// JSON export with venues and ranking snapshots
    pub path: String,
    pub cache_ttl_secs: Option<u64>,
    pub cache_size: Option<u64>,
}

/// Per-mode defaults for omitted `radius` / `limit` parameters
#[derive(Debug, Clone, Deserialize)]
pub struct SelectionSettings {
    #[serde(default = "default_tonight")]
    pub tonight: ModeDefaults,
    #[serde(default = "default_nearby")]
    pub nearby: ModeDefaults,
    #[serde(default = "default_trending")]
    pub trending: ModeDefaults,
    #[serde(default = "default_monthly")]
    pub monthly: ModeDefaults,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl SelectionSettings {
    pub fn for_mode(&self, mode: SelectionMode) -> ModeDefaults {
        match mode {
            SelectionMode::Tonight => self.tonight,
            SelectionMode::Nearby => self.nearby,
            SelectionMode::Trending => self.trending,
            SelectionMode::Monthly => self.monthly,
        }
    }
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            tonight: default_tonight(),
            nearby: default_nearby(),
            trending: default_trending(),
            monthly: default_monthly(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_tonight() -> ModeDefaults { ModeDefaults { radius_miles: 10.0, limit: 10 } }
fn default_nearby() -> ModeDefaults { ModeDefaults { radius_miles: 10.0, limit: 20 } }
fn default_trending() -> ModeDefaults { ModeDefaults { radius_miles: 15.0, limit: 10 } }
fn default_monthly() -> ModeDefaults { ModeDefaults { radius_miles: 15.0, limit: 50 } }
fn default_max_limit() -> usize { 50 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_primary_rating_weight")]
    pub primary_rating: f64,
    #[serde(default = "default_secondary_rating_weight")]
    pub secondary_rating: f64,
    #[serde(default = "default_velocity_weight")]
    pub review_velocity: f64,
    #[serde(default = "default_deals_weight")]
    pub deals: f64,
    #[serde(default = "default_events_weight")]
    pub events: f64,
    #[serde(default = "default_buzz_weight")]
    pub social_buzz: f64,
    #[serde(default = "default_proximity_weight")]
    pub proximity: f64,
    #[serde(default = "default_open_now_weight")]
    pub open_now: f64,
    #[serde(default = "default_expert_pick_weight")]
    pub expert_pick: f64,
    #[serde(default = "default_trending_weight")]
    pub trending: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            primary_rating: default_primary_rating_weight(),
            secondary_rating: default_secondary_rating_weight(),
            review_velocity: default_velocity_weight(),
            deals: default_deals_weight(),
            events: default_events_weight(),
            social_buzz: default_buzz_weight(),
            proximity: default_proximity_weight(),
            open_now: default_open_now_weight(),
            expert_pick: default_expert_pick_weight(),
            trending: default_trending_weight(),
        }
    }
}

fn default_primary_rating_weight() -> f64 { 0.20 }
fn default_secondary_rating_weight() -> f64 { 0.15 }
fn default_velocity_weight() -> f64 { 0.05 }
fn default_deals_weight() -> f64 { 0.10 }
fn default_events_weight() -> f64 { 0.10 }
fn default_buzz_weight() -> f64 { 0.05 }
fn default_proximity_weight() -> f64 { 0.10 }
fn default_open_now_weight() -> f64 { 0.05 }
fn default_expert_pick_weight() -> f64 { 0.10 }
fn default_trending_weight() -> f64 { 0.10 }

impl WeightsConfig {
    /// Convert into engine weights, refusing a table that does not sum to 1.0
    pub fn to_weights(&self) -> Result<ScoringWeights, ConfigError> {
        let weights = ScoringWeights {
            primary_rating: self.primary_rating,
            secondary_rating: self.secondary_rating,
            review_velocity: self.review_velocity,
            deals: self.deals,
            events: self.events,
            social_buzz: self.social_buzz,
            proximity: self.proximity,
            open_now: self.open_now,
            expert_pick: self.expert_pick,
            trending: self.trending,
        };

        if !weights.is_valid() {
            return Err(ConfigError::Message(format!(
                "scoring weights must be non-negative and sum to 1.0, got {}",
                weights.sum()
            )));
        }
        Ok(weights)
    }
}

/// How "open now" is decided
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenHoursPolicy {
    /// Each venue's published opening hours
    #[default]
    Scheduled,
    /// One window for every venue
    Fixed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenHoursSettings {
    #[serde(default)]
    pub policy: OpenHoursPolicy,
    #[serde(default = "default_fixed_opens")]
    pub fixed_opens: NaiveTime,
    #[serde(default = "default_fixed_closes")]
    pub fixed_closes: NaiveTime,
}

impl Default for OpenHoursSettings {
    fn default() -> Self {
        Self {
            policy: OpenHoursPolicy::default(),
            fixed_opens: default_fixed_opens(),
            fixed_closes: default_fixed_closes(),
        }
    }
}

fn default_fixed_opens() -> NaiveTime {
    NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default()
}

fn default_fixed_closes() -> NaiveTime {
    NaiveTime::from_hms_opt(2, 0, 0).unwrap_or_default()
}

impl OpenHoursSettings {
    pub fn build_policy(&self) -> Arc<dyn OpenNowPolicy> {
        match self.policy {
            OpenHoursPolicy::Scheduled => Arc::new(ScheduledHours),
            OpenHoursPolicy::Fixed => Arc::new(FixedWindow(TimeWindow::new(
                Some(self.fixed_opens),
                Some(self.fixed_closes),
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "compact".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with NIGHTRANK_)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("catalog.path", "data/venues.json")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., NIGHTRANK__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("NIGHTRANK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}
