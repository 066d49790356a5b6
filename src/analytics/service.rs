//! The analytics orchestrator.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use crate::analytics::{
    aggregate, calculate_trend, canonical_order, detect_hotspots, fingerprint, select_overall,
    AnalysisCache, AnalysisSettings,
};
use crate::error::AnalyticsError;
use crate::models::{AnalysisResult, Reading, TrendResult, Trends};

// ---

/// Result of [`AnalyticsService::analyze`] plus whether it came from cache.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub result: Arc<AnalysisResult>,
    pub cached: bool,
}

/// Explicitly constructed analytics service owning its cache.
///
/// Share one instance (behind an `Arc`) across request handlers; the cache
/// lives exactly as long as the service.
pub struct AnalyticsService {
    settings: AnalysisSettings,
    cache: AnalysisCache,
}

impl AnalyticsService {
    pub fn new(settings: AnalysisSettings) -> Self {
        let cache = AnalysisCache::new(settings.cache_max_entries);
        Self { settings, cache }
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    /// Analyze a reading set, serving repeats of identical content from cache.
    ///
    /// Never fails: statistics are always produced, hotspots come only from
    /// spatial readings, and locations with too few readings for a trend are
    /// listed under `insufficient_data` instead of aborting.
    pub fn analyze(&self, readings: &[Reading]) -> Analysis {
        // ---
        let key = fingerprint(readings);
        if let Some(result) = self.cache.get(&key) {
            tracing::debug!("Analysis cache hit for {} readings", readings.len());
            return Analysis {
                result,
                cached: true,
            };
        }

        let result = self.compute(readings);
        let result = self.cache.insert_if_absent(key, result);
        let (hits, misses) = self.cache.counters();
        tracing::debug!(
            "Analysis computed for {} readings (cache hits={}, misses={})",
            readings.len(),
            hits,
            misses
        );
        Analysis {
            result,
            cached: false,
        }
    }

    /// Trend for a single location's readings.
    ///
    /// Unlike [`analyze`](Self::analyze), too few readings is an error here.
    pub fn location_trend(&self, readings: &[Reading]) -> Result<TrendResult, AnalyticsError> {
        calculate_trend(readings, self.settings.trend_stable_epsilon)
    }

    fn compute(&self, readings: &[Reading]) -> AnalysisResult {
        // ---
        // NaN/inf values cannot be bucketed, clustered or fitted
        let mut ordered: Vec<Reading> = readings
            .iter()
            .filter(|r| r.value.is_finite())
            .cloned()
            .collect();
        ordered.sort_by(canonical_order);
        if ordered.len() < readings.len() {
            tracing::warn!(
                "Ignoring {} readings with non-finite values",
                readings.len() - ordered.len()
            );
        }

        let statistics = aggregate(&ordered);
        let hotspots = detect_hotspots(
            &ordered,
            self.settings.hotspot_radius,
            self.settings.hotspot_threshold,
        );
        let trends = self.trends(&ordered);

        AnalysisResult {
            trends,
            hotspots,
            statistics,
            reading_count: readings.len(),
            timestamp: Utc::now(),
        }
    }

    fn trends(&self, readings: &[Reading]) -> Trends {
        // ---
        let mut by_location: BTreeMap<&str, Vec<Reading>> = BTreeMap::new();
        for reading in readings {
            by_location
                .entry(reading.location.as_str())
                .or_default()
                .push(reading.clone());
        }

        let mut trends = Trends::default();
        for (location, group) in by_location {
            match self.location_trend(&group) {
                Ok(trend) => trends.locations.push(trend),
                Err(e) => {
                    tracing::debug!("Skipping trend: {}", e);
                    trends.insufficient_data.push(location.to_string());
                }
            }
        }
        trends.overall = select_overall(&trends.locations, self.settings.trend_selection).cloned();
        trends
    }
}
