use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One sampled kWh value. Identity comes from the owning building.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterReading {
    pub timestamp: NaiveDateTime,
    pub kwh: f64,
}

impl MeterReading {
    pub fn new(timestamp: NaiveDateTime, kwh: f64) -> Self {
        Self { timestamp, kwh }
    }
}

/// A named series of readings, one per source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    pub name: String,
    pub readings: Vec<MeterReading>,
}

impl Building {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            readings: Vec::new(),
        }
    }

    pub fn add_reading(&mut self, timestamp: NaiveDateTime, kwh: f64) {
        self.readings.push(MeterReading::new(timestamp, kwh));
    }

    pub fn total_consumption(&self) -> f64 {
        self.readings.iter().map(|r| r.kwh).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Rows of the unified table contributed by this building, in insertion order.
    pub fn rows(&self) -> impl Iterator<Item = ReadingRow> + '_ {
        self.readings.iter().map(move |r| ReadingRow {
            timestamp: r.timestamp,
            kwh: r.kwh,
            building: self.name.clone(),
        })
    }
}

/// Row of the consolidated table written to `cleaned_energy_data.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingRow {
    #[serde(serialize_with = "format::timestamp")]
    pub timestamp: NaiveDateTime,
    pub kwh: f64,
    pub building: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub building: String,
    #[serde(serialize_with = "format::date")]
    pub day: NaiveDate,
    pub kwh: f64,
}

/// Mean consumption of a Monday..Sunday week, labelled by the Sunday.
/// `kwh` is `None` for a week inside the building's range that has no readings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyAverage {
    pub building: String,
    #[serde(serialize_with = "format::date")]
    pub week_ending: NaiveDate,
    pub kwh: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingSummary {
    pub building: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
}

mod format {
    use chrono::{NaiveDate, NaiveDateTime};
    use serde::Serializer;

    pub fn timestamp<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&ts.format(super::TIMESTAMP_FORMAT))
    }

    pub fn date<S: Serializer>(day: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&day.format(super::DATE_FORMAT))
    }
}
