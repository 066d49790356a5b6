//! Least-squares trend classification for a single location.

use std::cmp::Ordering;

use crate::analytics::TrendSelection;
use crate::error::AnalyticsError;
use crate::models::{Reading, TrendDirection, TrendResult};

/// Fewest readings a trend can be fitted to.
pub const MIN_TREND_READINGS: usize = 3;

/// Lowest confidence ever reported for a computed trend.
const CONFIDENCE_FLOOR: f64 = 0.01;

const SECONDS_PER_HOUR: f64 = 3600.0;

// ---

/// Fit value against elapsed hours and classify the slope.
///
/// Readings may arrive in any order; they are ordered by timestamp here.
/// Non-finite values are skipped and do not count towards the minimum.
/// All readings are attributed to the location of the earliest one.
pub fn calculate_trend(
    readings: &[Reading],
    stable_epsilon: f64,
) -> Result<TrendResult, AnalyticsError> {
    // ---
    let mut ordered: Vec<&Reading> = readings.iter().filter(|r| r.value.is_finite()).collect();
    ordered.sort_by_key(|r| r.timestamp);

    let (first, last) = match (ordered.first(), ordered.last()) {
        (Some(first), Some(last)) if ordered.len() >= MIN_TREND_READINGS => (*first, *last),
        _ => {
            return Err(AnalyticsError::InsufficientData {
                location: readings
                    .first()
                    .map(|r| r.location.clone())
                    .unwrap_or_default(),
                required: MIN_TREND_READINGS,
                actual: ordered.len(),
            })
        }
    };

    let points: Vec<(f64, f64)> = ordered
        .iter()
        .map(|r| {
            let elapsed = (r.timestamp - first.timestamp).num_milliseconds() as f64 / 1000.0;
            (elapsed / SECONDS_PER_HOUR, r.value)
        })
        .collect();

    let (change_rate, confidence) = fit(&points);

    let trend = if change_rate.abs() < stable_epsilon {
        TrendDirection::Stable
    } else if change_rate > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    };

    Ok(TrendResult {
        location: first.location.clone(),
        trend,
        confidence,
        change_rate,
        period_start: first.timestamp,
        period_end: last.timestamp,
        sample_count: ordered.len(),
    })
}

/// Slope and R² of the least-squares line through `points`.
fn fit(points: &[(f64, f64)]) -> (f64, f64) {
    // ---
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (x, y) in points {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    // All samples share one instant: no time axis to fit against.
    if sxx <= f64::EPSILON {
        return (0.0, CONFIDENCE_FLOOR);
    }

    let slope = sxy / sxx;

    // A flat series is fitted exactly by a flat line.
    if syy <= f64::EPSILON {
        return (slope, 1.0);
    }

    let r_squared = (sxy * sxy) / (sxx * syy);
    (slope, r_squared.clamp(CONFIDENCE_FLOOR, 1.0))
}

/// Pick the headline trend from per-location results.
pub fn select_overall(trends: &[TrendResult], policy: TrendSelection) -> Option<&TrendResult> {
    // ---
    trends.iter().max_by(|a, b| {
        let by_count = a.sample_count.cmp(&b.sample_count);
        let by_recency = a.period_end.cmp(&b.period_end);
        let primary = match policy {
            TrendSelection::MostReadings => by_count.then(by_recency),
            TrendSelection::MostRecent => by_recency.then(by_count),
        };
        // smaller location name wins the final tie
        match primary {
            Ordering::Equal => b.location.cmp(&a.location),
            other => other,
        }
    })
}
