//! Time-bucketed aggregates over the consolidated reading table.
//!
//! Buckets are calendar based and use the wall-clock timestamp as stored, with
//! no timezone conversion. Daily buckets start at midnight. Weekly buckets run
//! Monday 00:00 to Sunday 23:59:59 and are labelled by that Sunday. Between a
//! building's first and last reading every bucket is emitted, including empty
//! ones: a daily sum of `0.0`, a weekly mean of `None`.

use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;

use crate::models::{BuildingSummary, DailyTotal, ReadingRow, WeeklyAverage};

pub fn daily_totals(table: &[ReadingRow]) -> Vec<DailyTotal> {
    let mut out = Vec::new();
    for (building, rows) in group_by_building(table) {
        let buckets = bucket(&rows, |r| Some(r.timestamp.date()));
        for_each_bucket(&buckets, Duration::days(1), |day, values| {
            out.push(DailyTotal {
                building: building.to_string(),
                day,
                kwh: values.map_or(0.0, |v| v.iter().sum()),
            });
        });
    }
    out
}

pub fn weekly_averages(table: &[ReadingRow]) -> Vec<WeeklyAverage> {
    let mut out = Vec::new();
    for (building, rows) in group_by_building(table) {
        let buckets = bucket(&rows, |r| week_ending(r.timestamp.date()));
        for_each_bucket(&buckets, Duration::weeks(1), |week_ending, values| {
            out.push(WeeklyAverage {
                building: building.to_string(),
                week_ending,
                kwh: values.and_then(mean),
            });
        });
    }
    out
}

pub fn building_summary(table: &[ReadingRow]) -> Vec<BuildingSummary> {
    group_by_building(table)
        .into_iter()
        .filter_map(|(building, rows)| {
            let values: Vec<f64> = rows.iter().map(|r| r.kwh).collect();
            Some(BuildingSummary {
                building: building.to_string(),
                mean: mean(&values)?,
                min: values.iter().copied().fold(f64::INFINITY, f64::min),
                max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                sum: values.iter().sum(),
            })
        })
        .collect()
}

/// The Sunday that closes the Monday-based week containing `day`, or `None`
/// when that Sunday is past the last representable date.
pub fn week_ending(day: NaiveDate) -> Option<NaiveDate> {
    let days_to_sunday = 6 - i64::from(day.weekday().num_days_from_monday());
    day.checked_add_signed(Duration::days(days_to_sunday))
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn group_by_building(table: &[ReadingRow]) -> BTreeMap<&str, Vec<&ReadingRow>> {
    let mut groups: BTreeMap<&str, Vec<&ReadingRow>> = BTreeMap::new();
    for row in table {
        groups.entry(row.building.as_str()).or_default().push(row);
    }
    groups
}

/// Rows whose key is `None` are left out.
fn bucket<F>(rows: &[&ReadingRow], key: F) -> BTreeMap<NaiveDate, Vec<f64>>
where
    F: Fn(&ReadingRow) -> Option<NaiveDate>,
{
    let mut buckets: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for &row in rows {
        if let Some(k) = key(row) {
            buckets.entry(k).or_default().push(row.kwh);
        }
    }
    buckets
}

/// Walks from the first to the last bucket key in `step` increments,
/// passing `None` for keys with no readings.
fn for_each_bucket<F>(buckets: &BTreeMap<NaiveDate, Vec<f64>>, step: Duration, mut f: F)
where
    F: FnMut(NaiveDate, Option<&[f64]>),
{
    let (Some(first), Some(last)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        return;
    };

    let mut current = *first;
    while current <= *last {
        f(current, buckets.get(&current).map(Vec::as_slice));
        match current.checked_add_signed(step) {
            Some(next) => current = next,
            None => break,
        }
    }
}
