//! Hourly and daily per-location summaries.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveTime, TimeDelta, Timelike, Utc};

use crate::models::{Reading, StatBucket, Statistics};

// ---

/// Running totals for one (bucket, location) pair.
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    fn new(value: f64) -> Self {
        Self {
            count: 1,
            sum: value,
            min: value,
            max: value,
        }
    }

    fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
}

type Buckets = BTreeMap<(DateTime<Utc>, String), Accumulator>;

/// Start of the UTC day containing `ts`.
pub fn day_start(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Start of the UTC hour containing `ts`.
pub fn hour_start(ts: DateTime<Utc>) -> DateTime<Utc> {
    day_start(ts) + TimeDelta::hours(i64::from(ts.hour()))
}

/// Bucket readings by hour and by day, per location.
///
/// Only occupied buckets are emitted, ordered by period start and then
/// location. Zero readings yield empty lists.
pub fn aggregate(readings: &[Reading]) -> Statistics {
    // ---
    let mut hourly = Buckets::new();
    let mut daily = Buckets::new();

    for reading in readings {
        record(&mut hourly, hour_start(reading.timestamp), reading);
        record(&mut daily, day_start(reading.timestamp), reading);
    }

    Statistics {
        hourly: into_buckets(hourly),
        daily: into_buckets(daily),
    }
}

fn record(buckets: &mut Buckets, period_start: DateTime<Utc>, reading: &Reading) {
    buckets
        .entry((period_start, reading.location.clone()))
        .and_modify(|acc| acc.push(reading.value))
        .or_insert_with(|| Accumulator::new(reading.value));
}

fn into_buckets(buckets: Buckets) -> Vec<StatBucket> {
    buckets
        .into_iter()
        .map(|((period_start, location), acc)| StatBucket {
            period_start,
            location,
            count: acc.count,
            average: acc.sum / acc.count as f64,
            min: acc.min,
            max: acc.max,
        })
        .collect()
}
