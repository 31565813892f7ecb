use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{BuildingSummary, ReadingRow, TIMESTAMP_FORMAT};

pub const SUMMARY_FILE: &str = "summary.txt";
pub const CLEANED_DATA_FILE: &str = "cleaned_energy_data.csv";
pub const BUILDING_SUMMARY_FILE: &str = "building_summary.csv";

#[derive(Debug, Clone, PartialEq)]
pub struct PeakReading {
    pub timestamp: NaiveDateTime,
    pub building: String,
    pub kwh: f64,
}

/// Campus-wide headline numbers for the executive report.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutiveSummary {
    pub total_kwh: f64,
    pub top_consumer: BuildingSummary,
    pub peak: PeakReading,
}

impl ExecutiveSummary {
    /// `None` when there is nothing to summarize. Ties keep the first
    /// building / row in table order.
    pub fn from_tables(table: &[ReadingRow], summary: &[BuildingSummary]) -> Option<Self> {
        let top_consumer = summary
            .iter()
            .fold(None::<&BuildingSummary>, |best, s| match best {
                Some(b) if b.sum >= s.sum => Some(b),
                _ => Some(s),
            })?
            .clone();

        let peak_row = table.iter().fold(None::<&ReadingRow>, |best, r| match best {
            Some(b) if b.kwh >= r.kwh => Some(b),
            _ => Some(r),
        })?;

        Some(Self {
            total_kwh: table.iter().map(|r| r.kwh).sum(),
            top_consumer,
            peak: PeakReading {
                timestamp: peak_row.timestamp,
                building: peak_row.building.clone(),
                kwh: peak_row.kwh,
            },
        })
    }

    pub fn render(&self, summary: &[BuildingSummary], generated_at: NaiveDateTime) -> String {
        format!(
            "\nEXECUTIVE SUMMARY REPORT\n\
             ========================\n\
             Generated on: {generated}\n\
             \n\
             1. Total Campus Consumption: {total:.2} kWh\n\
             \n\
             2. Highest Consuming Building:\n   \
             - Name: {top}\n   \
             - Total Usage: {top_sum:.2} kWh\n   \
             - Average Usage: {top_mean:.2} kWh\n\
             \n\
             3. Peak Load Event:\n   \
             - Time: {peak_time}\n   \
             - Building: {peak_building}\n   \
             - Consumption: {peak_kwh:.2} kWh\n\
             \n\
             4. Building Summary Data:\n\
             {table}\n",
            generated = generated_at.format(TIMESTAMP_FORMAT),
            total = self.total_kwh,
            top = self.top_consumer.building,
            top_sum = self.top_consumer.sum,
            top_mean = self.top_consumer.mean,
            peak_time = self.peak.timestamp.format(TIMESTAMP_FORMAT),
            peak_building = self.peak.building,
            peak_kwh = self.peak.kwh,
            table = render_summary_table(summary),
        )
    }
}

/// Fixed-width text rendering of the per-building statistics.
pub fn render_summary_table(summary: &[BuildingSummary]) -> String {
    let name_width = summary
        .iter()
        .map(|s| s.building.len())
        .chain(std::iter::once("building".len()))
        .max()
        .unwrap_or(0);

    let cells: Vec<[String; 4]> = summary
        .iter()
        .map(|s| [s.mean, s.min, s.max, s.sum].map(|v| format!("{:.6}", v)))
        .collect();
    let headers = ["mean", "min", "max", "sum"];
    let widths: Vec<usize> = (0..headers.len())
        .map(|i| {
            cells
                .iter()
                .map(|c| c[i].len())
                .chain(std::iter::once(headers[i].len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::with_capacity(summary.len() + 1);
    let mut header = format!("{:<name_width$}", "building");
    for (h, w) in headers.iter().zip(&widths) {
        header.push_str(&format!("  {:>w$}", h, w = *w));
    }
    lines.push(header);

    for (s, row) in summary.iter().zip(&cells) {
        let mut line = format!("{:<name_width$}", s.building);
        for (cell, w) in row.iter().zip(&widths) {
            line.push_str(&format!("  {:>w$}", cell, w = *w));
        }
        lines.push(line);
    }

    lines.join("\n")
}

/// Paths of the text and CSV artifacts written for one run.
#[derive(Debug, Clone)]
pub struct ReportArtifacts {
    pub summary_text: PathBuf,
    pub cleaned_data: PathBuf,
    pub building_summary: PathBuf,
}

pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Writes the executive summary (also echoed to stdout) and both CSV tables.
    pub fn write_all(
        &self,
        table: &[ReadingRow],
        summary: &[BuildingSummary],
        executive: &ExecutiveSummary,
        generated_at: NaiveDateTime,
    ) -> Result<ReportArtifacts> {
        let text = executive.render(summary, generated_at);
        println!("{}", text);

        let summary_text = self.output_dir.join(SUMMARY_FILE);
        fs::write(&summary_text, &text)
            .with_context(|| format!("Failed to write summary report: {:?}", summary_text))?;

        let cleaned_data = self.output_dir.join(CLEANED_DATA_FILE);
        write_csv(&cleaned_data, table)?;

        let building_summary = self.output_dir.join(BUILDING_SUMMARY_FILE);
        write_csv(&building_summary, summary)?;

        Ok(ReportArtifacts {
            summary_text,
            cleaned_data,
            building_summary,
        })
    }
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;
    for row in rows {
        wtr.serialize(row)
            .with_context(|| format!("Failed to write row to {:?}", path))?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
    }

    fn row(building: &str, t: &str, kwh: f64) -> ReadingRow {
        ReadingRow { timestamp: ts(t), kwh, building: building.to_string() }
    }

    fn stats(building: &str, mean: f64, min: f64, max: f64, sum: f64) -> BuildingSummary {
        BuildingSummary { building: building.to_string(), mean, min, max, sum }
    }

    #[test]
    fn test_executive_summary_picks_top_and_peak() {
        let table = vec![
            row("Admin", "2024-01-01 00:00:00", 3.0),
            row("Admin", "2024-01-01 01:00:00", 3.0),
            row("Library", "2024-01-01 00:00:00", 5.0),
        ];
        let summary = vec![stats("Admin", 3.0, 3.0, 3.0, 6.0), stats("Library", 5.0, 5.0, 5.0, 5.0)];

        let exec = ExecutiveSummary::from_tables(&table, &summary).unwrap();
        assert_eq!(exec.total_kwh, 11.0);
        assert_eq!(exec.top_consumer.building, "Admin");
        assert_eq!(
            exec.peak,
            PeakReading { timestamp: ts("2024-01-01 00:00:00"), building: "Library".into(), kwh: 5.0 }
        );
    }

    #[test]
    fn test_ties_keep_first() {
        let table = vec![
            row("Admin", "2024-01-01 00:00:00", 4.0),
            row("Admin", "2024-01-01 01:00:00", 4.0),
        ];
        let summary = vec![stats("Admin", 4.0, 4.0, 4.0, 8.0), stats("Zoo", 8.0, 8.0, 8.0, 8.0)];

        let exec = ExecutiveSummary::from_tables(&table, &summary).unwrap();
        assert_eq!(exec.top_consumer.building, "Admin");
        assert_eq!(exec.peak.timestamp, ts("2024-01-01 00:00:00"));
    }

    #[test]
    fn test_empty_tables_have_no_summary() {
        assert!(ExecutiveSummary::from_tables(&[], &[]).is_none());
    }

    #[test]
    fn test_render_contains_sections() {
        let table = vec![row("Library", "2024-01-01 00:00:00", 5.0)];
        let summary = vec![stats("Library", 5.0, 5.0, 5.0, 5.0)];
        let exec = ExecutiveSummary::from_tables(&table, &summary).unwrap();

        let text = exec.render(&summary, ts("2024-02-01 08:30:00"));
        assert!(text.contains("Generated on: 2024-02-01 08:30:00"));
        assert!(text.contains("1. Total Campus Consumption: 5.00 kWh"));
        assert!(text.contains("   - Name: Library"));
        assert!(text.contains("   - Time: 2024-01-01 00:00:00"));
        assert!(text.contains("   - Consumption: 5.00 kWh"));
        assert!(text.contains("Library   5.000000  5.000000  5.000000  5.000000"));
    }

    #[test]
    fn test_summary_table_alignment() {
        let summary = vec![stats("A", 1.0, 0.5, 1.5, 12.0), stats("Engineering", 10.25, 1.0, 20.0, 100.0)];
        let rendered = render_summary_table(&summary);
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("building   "));
        assert!(lines.iter().all(|l| l.len() == lines[0].len()));
        assert!(lines[2].starts_with("Engineering"));
    }

    #[test]
    fn test_write_all_creates_artifacts() {
        let dir = TempDir::new().unwrap();
        let table = vec![row("Library", "2024-01-01 00:00:00", 5.0)];
        let summary = vec![stats("Library", 5.0, 5.0, 5.0, 5.0)];
        let exec = ExecutiveSummary::from_tables(&table, &summary).unwrap();

        let artifacts = ReportWriter::new(dir.path())
            .write_all(&table, &summary, &exec, ts("2024-02-01 00:00:00"))
            .unwrap();

        let cleaned = fs::read_to_string(&artifacts.cleaned_data).unwrap();
        assert_eq!(cleaned, "timestamp,kwh,building\n2024-01-01 00:00:00,5.0,Library\n");

        let stats_csv = fs::read_to_string(&artifacts.building_summary).unwrap();
        assert_eq!(stats_csv, "building,mean,min,max,sum\nLibrary,5.0,5.0,5.0,5.0\n");

        assert!(fs::read_to_string(&artifacts.summary_text).unwrap().contains("EXECUTIVE SUMMARY REPORT"));
    }
}
