//! Configuration loader for the `moisture-analytics` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). The analytics core never reads the environment;
//! it receives an [`AnalysisSettings`] derived from the loaded [`Config`].
//!
use std::{env, net::SocketAddr};

use anyhow::{anyhow, Result};

use crate::analytics::{AnalysisSettings, TrendSelection};

/// Parse an optional environment variable of any `FromStr` type with a default value.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,

    /// Value a cluster maximum must exceed to become a hotspot.
    pub hotspot_threshold: f64,

    /// Proximity radius used when clustering spatial readings.
    pub hotspot_radius: f64,

    /// Change rates (units/hour) below this magnitude are `stable`.
    pub trend_stable_epsilon: f64,

    /// Which per-location trend becomes the headline trend.
    pub trend_selection: TrendSelection,

    /// Maximum number of memoized analysis results.
    pub cache_max_entries: usize,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
///
/// Optional:
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `BIND_ADDR` – listen address (default: 0.0.0.0:8080)
/// - `HOTSPOT_THRESHOLD` – severity threshold (default: 20.0)
/// - `HOTSPOT_RADIUS` – clustering radius (default: 1.0)
/// - `TREND_STABLE_EPSILON` – stable band in units/hour (default: 0.25)
/// - `TREND_SELECTION` – `most_readings` or `most_recent` (default: most_readings)
/// - `CACHE_MAX_ENTRIES` – memoized analyses kept (default: 256)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let defaults = AnalysisSettings::default();

    let db_url = require_env!("DATABASE_URL");
    let db_pool_max = parse_env!("DB_POOL_MAX", u32, 5);
    let bind_addr = parse_env!("BIND_ADDR", SocketAddr, SocketAddr::from(([0, 0, 0, 0], 8080)));
    let hotspot_threshold = parse_env!("HOTSPOT_THRESHOLD", f64, defaults.hotspot_threshold);
    let hotspot_radius = parse_env!("HOTSPOT_RADIUS", f64, defaults.hotspot_radius);
    let trend_stable_epsilon =
        parse_env!("TREND_STABLE_EPSILON", f64, defaults.trend_stable_epsilon);
    let trend_selection = parse_env!("TREND_SELECTION", TrendSelection, defaults.trend_selection);
    let cache_max_entries = parse_env!("CACHE_MAX_ENTRIES", usize, defaults.cache_max_entries);

    let cfg = Config {
        db_url,
        db_pool_max,
        bind_addr,
        hotspot_threshold,
        hotspot_radius,
        trend_stable_epsilon,
        trend_selection,
        cache_max_entries,
    };
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    /// Reject values that parse but would make the analytics meaningless.
    pub fn validate(&self) -> Result<()> {
        // ---
        if !self.hotspot_threshold.is_finite() {
            return Err(anyhow!("Invalid HOTSPOT_THRESHOLD: must be a finite number"));
        }
        if !self.hotspot_radius.is_finite() || self.hotspot_radius < 0.0 {
            return Err(anyhow!("Invalid HOTSPOT_RADIUS: must be a non-negative number"));
        }
        if !self.trend_stable_epsilon.is_finite() || self.trend_stable_epsilon < 0.0 {
            return Err(anyhow!("Invalid TREND_STABLE_EPSILON: must be a non-negative number"));
        }
        if self.cache_max_entries == 0 {
            return Err(anyhow!("Invalid CACHE_MAX_ENTRIES: must be at least 1"));
        }
        Ok(())
    }

    /// Settings handed to the analytics service.
    pub fn analysis_settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            hotspot_threshold: self.hotspot_threshold,
            hotspot_radius: self.hotspot_radius,
            trend_stable_epsilon: self.trend_stable_epsilon,
            trend_selection: self.trend_selection,
            cache_max_entries: self.cache_max_entries,
        }
    }

    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks sensitive information like database passwords while showing
    /// all configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL         : {}", masked_db_url(&self.db_url));
        tracing::info!("  DB_POOL_MAX          : {}", self.db_pool_max);
        tracing::info!("  BIND_ADDR            : {}", self.bind_addr);
        tracing::info!("  HOTSPOT_THRESHOLD    : {}", self.hotspot_threshold);
        tracing::info!("  HOTSPOT_RADIUS       : {}", self.hotspot_radius);
        tracing::info!("  TREND_STABLE_EPSILON : {}", self.trend_stable_epsilon);
        tracing::info!("  TREND_SELECTION      : {}", self.trend_selection);
        tracing::info!("  CACHE_MAX_ENTRIES    : {}", self.cache_max_entries);
    }
}

/// Replace the password portion of a connection URL with `****`.
pub fn masked_db_url(db_url: &str) -> String {
    // ---
    let scheme_end = db_url.find("://").map_or(0, |p| p + 3);
    let Some(at_pos) = db_url.rfind('@').filter(|&p| p > scheme_end) else {
        return db_url.to_string();
    };

    match db_url[scheme_end..at_pos].find(':') {
        Some(offset) => {
            let colon_pos = scheme_end + offset;
            format!("{}:****{}", &db_url[..colon_pos], &db_url[at_pos..])
        }
        None => db_url.to_string(),
    }
}
