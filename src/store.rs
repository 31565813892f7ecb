use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use crate::models::{Building, ReadingRow};

/// Buildings keyed by name. Filled during ingestion, then consolidated once.
#[derive(Debug, Default)]
pub struct BuildingRegistry {
    buildings: BTreeMap<String, Building>,
}

impl BuildingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, name: &str) -> &mut Building {
        self.buildings
            .entry(name.to_string())
            .or_insert_with(|| Building::new(name))
    }

    /// Appends a reading without validating it; the loader is responsible for that.
    pub fn add_reading(&mut self, name: &str, timestamp: NaiveDateTime, kwh: f64) {
        self.get_or_create(name).add_reading(timestamp, kwh);
    }

    pub fn get(&self, name: &str) -> Option<&Building> {
        self.buildings.get(name)
    }

    /// Buildings in name order.
    pub fn buildings(&self) -> impl Iterator<Item = &Building> {
        self.buildings.values()
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    pub fn reading_count(&self) -> usize {
        self.buildings.values().map(|b| b.readings.len()).sum()
    }

    /// Flattens every non-empty building into one table sorted by
    /// (building, timestamp). Returns an empty table when nothing was loaded.
    pub fn consolidate(&self) -> Vec<ReadingRow> {
        let mut rows: Vec<ReadingRow> = self
            .buildings
            .values()
            .filter(|b| !b.is_empty())
            .flat_map(|b| b.rows())
            .collect();

        rows.sort_by(|a, b| {
            a.building
                .cmp(&b.building)
                .then_with(|| a.timestamp.cmp(&b.timestamp))
        });
        rows
    }
}
