use anyhow::Result;
use chrono::{Local, NaiveDateTime, Timelike};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::SampleDataConfig;
use crate::sample_data;
use crate::store::BuildingRegistry;
use crate::timestamp::parse_timestamp;

/// Header substrings that mark a timestamp column, checked after lowercasing.
pub const TIMESTAMP_TOKENS: &[&str] = &["time", "date"];
/// Header substrings that mark an energy column.
pub const KWH_TOKENS: &[&str] = &["kwh", "energy", "consum"];

/// Cell values treated as absent, matching what spreadsheet exports emit.
const NA_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Failures that make a whole file unusable. The loader skips the file and moves on.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("cannot open file: {0}")]
    Open(#[from] std::io::Error),
    #[error("cannot read header row: {0}")]
    Header(#[source] csv::Error),
    #[error("could not identify a {0} column")]
    MissingColumn(&'static str),
    #[error("cannot derive a building name from {0:?}")]
    BuildingName(PathBuf),
}

/// Why a single record was dropped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RowError {
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("missing {0} value")]
    Missing(&'static str),
    #[error("unparseable timestamp '{0}'")]
    Timestamp(String),
    #[error("invalid kwh value '{0}'")]
    Kwh(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMapping {
    pub timestamp: usize,
    pub kwh: usize,
}

/// Per-file outcome of a successful load.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FileStats {
    pub accepted: usize,
    pub malformed: usize,
    pub missing: usize,
    pub invalid: usize,
}

impl FileStats {
    pub fn rejected(&self) -> usize {
        self.malformed + self.missing + self.invalid
    }

    fn record(&mut self, err: &RowError) {
        match err {
            RowError::Malformed(_) => self.malformed += 1,
            RowError::Missing(_) => self.missing += 1,
            RowError::Timestamp(_) | RowError::Kwh(_) => self.invalid += 1,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub sample_data_generated: bool,
    pub files_found: usize,
    pub files_loaded: usize,
    pub files_skipped: Vec<PathBuf>,
    pub readings_accepted: usize,
    pub rows_rejected: usize,
}

pub struct ReadingLoader {
    data_dir: PathBuf,
    sample: SampleDataConfig,
}

impl ReadingLoader {
    pub fn new(data_dir: impl Into<PathBuf>, sample: SampleDataConfig) -> Self {
        Self {
            data_dir: data_dir.into(),
            sample,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// CSV files directly inside the data directory, sorted by name.
    /// A directory that does not exist yields an empty list.
    pub fn discover_files(&self) -> Result<Vec<PathBuf>> {
        let pattern = format!(
            "{}/*.csv",
            glob::Pattern::escape(&self.data_dir.to_string_lossy())
        );
        let mut files: Vec<PathBuf> = glob(&pattern)?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect();
        files.sort();
        Ok(files)
    }

    /// Loads every CSV in the data directory into `store`, generating sample
    /// data first when the directory has none. Bad files and bad rows are
    /// skipped; only a failure to produce sample data is returned as an error.
    pub fn load(&self, store: &mut BuildingRegistry) -> Result<LoadReport> {
        let mut report = LoadReport::default();

        let mut files = self.discover_files()?;
        if files.is_empty() {
            info!("No CSV files found in {:?}. Generating sample data...", self.data_dir);
            sample_data::generate(&self.data_dir, &self.sample, current_hour())?;
            report.sample_data_generated = true;
            files = self.discover_files()?;
        }
        report.files_found = files.len();

        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} - {msg}")?);

        for path in &files {
            pb.set_message(display_name(path));
            match self.load_file(path, store) {
                Ok(stats) => {
                    info!(
                        "Loaded {}: {} readings ({} rows dropped)",
                        display_name(path),
                        stats.accepted,
                        stats.rejected()
                    );
                    report.files_loaded += 1;
                    report.readings_accepted += stats.accepted;
                    report.rows_rejected += stats.rejected();
                }
                Err(IngestError::MissingColumn(role)) => {
                    warn!(
                        "Skipping {}: could not identify {} column",
                        display_name(path),
                        role
                    );
                    report.files_skipped.push(path.clone());
                }
                Err(e) => {
                    warn!("Error reading {}: {}", display_name(path), e);
                    report.files_skipped.push(path.clone());
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        Ok(report)
    }

    /// Loads one file under the building named after its stem.
    pub fn load_file(&self, path: &Path, store: &mut BuildingRegistry) -> Result<FileStats, IngestError> {
        let building = building_name(path).ok_or_else(|| IngestError::BuildingName(path.to_path_buf()))?;
        let file = File::open(path)?;
        load_reader(file, &building, store)
    }
}

/// Parses CSV from `reader` and registers every valid row under `building`.
pub fn load_reader<R: Read>(
    reader: R,
    building: &str,
    store: &mut BuildingRegistry,
) -> Result<FileStats, IngestError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = normalize_headers(rdr.headers().map_err(IngestError::Header)?);
    let columns = infer_columns(&headers)?;
    debug!(
        "{}: timestamp column '{}', kwh column '{}'",
        building, headers[columns.timestamp], headers[columns.kwh]
    );

    let mut stats = FileStats::default();
    for (idx, result) in rdr.records().enumerate() {
        let parsed = result
            .map_err(|e| RowError::Malformed(e.to_string()))
            .and_then(|record| parse_row(&record, headers.len(), columns));

        match parsed {
            Ok((timestamp, kwh)) => {
                store.add_reading(building, timestamp, kwh);
                stats.accepted += 1;
            }
            Err(e) => {
                // +2: one for the header, one for 1-based line numbers
                debug!("{} row {}: {}", building, idx + 2, e);
                stats.record(&e);
            }
        }
    }

    Ok(stats)
}

pub fn normalize_headers(headers: &csv::StringRecord) -> Vec<String> {
    headers.iter().map(|h| h.trim().to_lowercase()).collect()
}

/// First header containing a timestamp token, first header containing an
/// energy token. Declared column order decides ties.
pub fn infer_columns(headers: &[String]) -> Result<ColumnMapping, IngestError> {
    let find = |tokens: &[&str]| {
        headers
            .iter()
            .position(|h| tokens.iter().any(|t| h.contains(t)))
    };

    let timestamp = find(TIMESTAMP_TOKENS).ok_or(IngestError::MissingColumn("timestamp"))?;
    let kwh = find(KWH_TOKENS).ok_or(IngestError::MissingColumn("kwh"))?;
    Ok(ColumnMapping { timestamp, kwh })
}

pub fn building_name(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_row(
    record: &csv::StringRecord,
    header_len: usize,
    columns: ColumnMapping,
) -> Result<(NaiveDateTime, f64), RowError> {
    if record.len() > header_len {
        return Err(RowError::Malformed(format!(
            "expected {} fields, saw {}",
            header_len,
            record.len()
        )));
    }

    let ts_cell = record.get(columns.timestamp).unwrap_or("");
    let kwh_cell = record.get(columns.kwh).unwrap_or("");
    if is_missing(ts_cell) {
        return Err(RowError::Missing("timestamp"));
    }
    if is_missing(kwh_cell) {
        return Err(RowError::Missing("kwh"));
    }

    let timestamp = parse_timestamp(ts_cell).ok_or_else(|| RowError::Timestamp(ts_cell.to_string()))?;
    let kwh = parse_kwh(kwh_cell).ok_or_else(|| RowError::Kwh(kwh_cell.to_string()))?;
    Ok((timestamp, kwh))
}

fn is_missing(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty() || NA_MARKERS.contains(&cell)
}

fn parse_kwh(cell: &str) -> Option<f64> {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

fn current_hour() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.date().and_hms_opt(now.hour(), 0, 0).unwrap_or(now)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation;
    use std::fs;
    use tempfile::TempDir;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn load_str(csv: &str, building: &str, store: &mut BuildingRegistry) -> Result<FileStats, IngestError> {
        load_reader(csv.as_bytes(), building, store)
    }

    #[test]
    fn test_infer_columns_first_match_wins() {
        let cols = infer_columns(&headers(&["meter", "reading_date", "timestamp", "kwh", "energy_kwh"])).unwrap();
        assert_eq!(cols, ColumnMapping { timestamp: 1, kwh: 3 });

        let cols = infer_columns(&headers(&["consumption", "datetime"])).unwrap();
        assert_eq!(cols, ColumnMapping { timestamp: 1, kwh: 0 });
    }

    #[test]
    fn test_infer_columns_missing() {
        assert!(matches!(
            infer_columns(&headers(&["when", "kwh"])),
            Err(IngestError::MissingColumn("timestamp"))
        ));
        assert!(matches!(
            infer_columns(&headers(&["timestamp", "power"])),
            Err(IngestError::MissingColumn("kwh"))
        ));
    }

    #[test]
    fn test_headers_are_normalized() {
        let mut store = BuildingRegistry::new();
        let stats = load_str(" TimeStamp ,Energy_KWH\n2024-01-01 00:00,1.5\n", "Lab", &mut store).unwrap();
        assert_eq!(stats.accepted, 1);
        assert_eq!(store.get("Lab").unwrap().total_consumption(), 1.5);
    }

    #[test]
    fn test_bad_rows_are_dropped_individually() {
        let csv = "\
timestamp,kwh,note
2024-01-01T00:00,5.0,ok
2024-01-01T01:00,bad,non-numeric
not-a-date,4.0,bad time
2024-01-01T02:00,,empty kwh
,3.0,empty time
2024-01-01T03:00,NaN,na marker
2024-01-01T04:00,-1.0,negative
2024-01-01T05:00,2.0,x,extra field
2024-01-01T06:00,1.0
";
        let mut store = BuildingRegistry::new();
        let stats = load_str(csv, "Library", &mut store).unwrap();

        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.missing, 3);
        assert_eq!(stats.invalid, 3);
        assert_eq!(store.reading_count(), 2);
        assert_eq!(store.get("Library").unwrap().total_consumption(), 6.0);
    }

    #[test]
    fn test_out_of_range_timestamp_drops_only_that_row() {
        let mut store = BuildingRegistry::new();
        let stats = load_str("timestamp,kwh\n8210266876799,1.0\n2024-01-01 00:00,2.0\n", "Admin", &mut store).unwrap();

        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.invalid, 1);
        let weekly = aggregation::weekly_averages(&store.consolidate());
        assert_eq!(weekly.len(), 1);
        assert_eq!(weekly[0].kwh, Some(2.0));
    }

    #[test]
    fn test_out_of_range_dates_do_not_widen_daily_table() {
        let csv = "\
timestamp,kwh
2024-01-01 00:00,1.0
0001-01-01,5.0
2024-01-02 00:00,2.0
9999-12-31 00:00,5.0
";
        let mut store = BuildingRegistry::new();
        let stats = load_str(csv, "Library", &mut store).unwrap();

        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.invalid, 2);
        let daily = aggregation::daily_totals(&store.consolidate());
        assert_eq!(daily.len(), 2);
        assert_eq!(daily.iter().map(|d| d.kwh).sum::<f64>(), 3.0);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let mut store = BuildingRegistry::new();
        let stats = load_str("kwh,timestamp\n1.0\n", "Admin", &mut store).unwrap();
        assert_eq!(stats.accepted, 0);
        assert_eq!(stats.missing, 1);
        // The building is only created once a reading lands.
        assert!(store.get("Admin").is_none());
    }

    #[test]
    fn test_empty_file_has_no_columns() {
        let mut store = BuildingRegistry::new();
        assert!(matches!(
            load_str("", "Empty", &mut store),
            Err(IngestError::MissingColumn(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_building_name_is_case_preserving_stem() {
        assert_eq!(building_name(Path::new("data/Library.csv")).as_deref(), Some("Library"));
        assert_eq!(building_name(Path::new("data/main.hall.csv")).as_deref(), Some("main.hall"));
    }

    #[test]
    fn test_discover_sorted_csv_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.csv"), "").unwrap();
        fs::write(dir.path().join("a.csv"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let loader = ReadingLoader::new(dir.path(), SampleDataConfig::default());
        let names: Vec<_> = loader
            .discover_files()
            .unwrap()
            .iter()
            .map(|p| display_name(p))
            .collect();
        assert_eq!(names, vec!["a.csv", "b.csv"]);
    }

    #[test]
    fn test_discover_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let loader = ReadingLoader::new(dir.path().join("absent"), SampleDataConfig::default());
        assert!(loader.discover_files().unwrap().is_empty());
    }

    #[test]
    fn test_load_skips_file_without_time_column() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Admin.csv"), "timestamp,kwh\n2024-01-01T00:00,3.0\n").unwrap();
        fs::write(dir.path().join("Broken.csv"), "reading,kwh\nx,3.0\n").unwrap();

        let loader = ReadingLoader::new(dir.path(), SampleDataConfig::default());
        let mut store = BuildingRegistry::new();
        let report = loader.load(&mut store).unwrap();

        assert!(!report.sample_data_generated);
        assert_eq!(report.files_found, 2);
        assert_eq!(report.files_loaded, 1);
        assert_eq!(report.files_skipped, vec![dir.path().join("Broken.csv")]);
        assert_eq!(report.readings_accepted, 1);
        assert!(store.get("Broken").is_none());
        assert_eq!(store.reading_count(), 1);
    }

    #[test]
    fn test_load_generates_sample_data_when_empty() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("data");
        let sample = SampleDataConfig { seed: Some(3), ..Default::default() };

        let loader = ReadingLoader::new(&data_dir, sample);
        assert_eq!(loader.data_dir(), data_dir.as_path());
        let mut store = BuildingRegistry::new();
        let report = loader.load(&mut store).unwrap();

        assert!(report.sample_data_generated);
        assert_eq!(report.files_loaded, 3);
        assert_eq!(store.len(), 3);
        assert_eq!(store.reading_count(), 3 * 168);
        assert!(store
            .buildings()
            .flat_map(|b| b.readings.iter())
            .all(|r| r.kwh >= 0.1));
    }
}
