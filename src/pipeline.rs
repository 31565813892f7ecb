use anyhow::{Context, Result};
use chrono::Local;
use log::info;
use std::fs;
use std::path::PathBuf;

use crate::aggregation::{building_summary, daily_totals, weekly_averages};
use crate::config::PipelineConfig;
use crate::dashboard::DashboardRenderer;
use crate::ingestion::{LoadReport, ReadingLoader};
use crate::models::{BuildingSummary, DailyTotal, ReadingRow, WeeklyAverage};
use crate::report::{ExecutiveSummary, ReportArtifacts, ReportWriter};
use crate::store::BuildingRegistry;

/// Every table derived in one run.
#[derive(Debug, Clone)]
pub struct AnalysisTables {
    pub readings: Vec<ReadingRow>,
    pub daily: Vec<DailyTotal>,
    pub weekly: Vec<WeeklyAverage>,
    pub summary: Vec<BuildingSummary>,
}

impl AnalysisTables {
    pub fn from_readings(readings: Vec<ReadingRow>) -> Self {
        Self {
            daily: daily_totals(&readings),
            weekly: weekly_averages(&readings),
            summary: building_summary(&readings),
            readings,
        }
    }
}

#[derive(Debug)]
pub enum PipelineOutcome {
    /// Ingestion produced no readings; nothing was written.
    NoData(LoadReport),
    Completed(Box<PipelineRun>),
}

#[derive(Debug)]
pub struct PipelineRun {
    pub load: LoadReport,
    pub tables: AnalysisTables,
    pub executive: ExecutiveSummary,
    pub reports: ReportArtifacts,
    pub dashboard: Option<PathBuf>,
}

pub fn run(config: &PipelineConfig) -> Result<PipelineOutcome> {
    println!("\n⚡ Starting Energy Analysis Pipeline...");
    println!("{}", "=".repeat(60));

    let mut store = BuildingRegistry::new();
    let loader = ReadingLoader::new(&config.data_dir, config.sample.clone());
    info!("Loading meter readings from {:?}", loader.data_dir());
    let load = loader.load(&mut store)?;
    info!(
        "Ingested {} readings for {} buildings from {} files ({} skipped)",
        store.reading_count(),
        store.len(),
        load.files_loaded,
        load.files_skipped.len()
    );

    let readings = store.consolidate();
    let Some(tables) = analyze(readings) else {
        println!("No data available to process.");
        return Ok(PipelineOutcome::NoData(load));
    };
    let Some(executive) = ExecutiveSummary::from_tables(&tables.readings, &tables.summary) else {
        return Ok(PipelineOutcome::NoData(load));
    };

    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", config.output_dir))?;

    let dashboard = if config.render_dashboard {
        println!("\n📊 Rendering dashboard...");
        let path = DashboardRenderer::new(&config.output_dir)
            .render(&tables.readings, &tables.daily, &tables.weekly)?;
        Some(path)
    } else {
        None
    };

    println!("\n📝 Writing executive summary...");
    let reports = ReportWriter::new(&config.output_dir).write_all(
        &tables.readings,
        &tables.summary,
        &executive,
        Local::now().naive_local(),
    )?;

    println!("✅ Analysis complete. Check {:?}", config.output_dir);
    Ok(PipelineOutcome::Completed(Box::new(PipelineRun {
        load,
        tables,
        executive,
        reports,
        dashboard,
    })))
}

/// Derives the aggregate tables, or `None` when the unified table is empty.
pub fn analyze(readings: Vec<ReadingRow>) -> Option<AnalysisTables> {
    if readings.is_empty() {
        return None;
    }
    Some(AnalysisTables::from_readings(readings))
}
