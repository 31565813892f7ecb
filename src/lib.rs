pub mod aggregation;
pub mod config;
pub mod dashboard;
pub mod ingestion;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod sample_data;
pub mod store;
pub mod timestamp;

pub use config::{PipelineConfig, SampleDataConfig};
pub use ingestion::{LoadReport, ReadingLoader};
pub use models::{Building, BuildingSummary, DailyTotal, MeterReading, ReadingRow, WeeklyAverage};
pub use pipeline::{PipelineOutcome, PipelineRun};
pub use store::BuildingRegistry;
