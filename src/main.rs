use anyhow::Result;
use campus_energy_pipeline::pipeline::{self, PipelineOutcome};
use campus_energy_pipeline::PipelineConfig;
use clap::Parser;
use env_logger::{Env, Target};
use log::info;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "campus_energy_pipeline")]
#[command(about = "Aggregate per-building meter CSVs into a consumption dashboard and executive report")]
struct Args {
    /// Directory holding one `<building>.csv` per building
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Directory for the dashboard, summary and cleaned CSVs
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Seed for sample data, used only when the data directory has no CSVs
    #[arg(long)]
    seed: Option<u64>,

    /// Skip rendering dashboard.png
    #[arg(long)]
    no_dashboard: bool,
}

impl Args {
    fn into_config(self) -> PipelineConfig {
        let mut config = PipelineConfig::new(self.data_dir, self.output_dir);
        config.sample.seed = self.seed;
        config.render_dashboard = !self.no_dashboard;
        config
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stdout)
        .init();
    let config = Args::parse().into_config();

    match pipeline::run(&config)? {
        PipelineOutcome::NoData(report) => {
            info!(
                "Nothing to analyze: {} files found, {} skipped",
                report.files_found,
                report.files_skipped.len()
            );
        }
        PipelineOutcome::Completed(run) => {
            info!(
                "Processed {} readings across {} buildings",
                run.tables.readings.len(),
                run.tables.summary.len()
            );
        }
    }

    Ok(())
}
