use std::path::PathBuf;

/// Shape of the synthetic dataset written when the data directory has no CSV files.
#[derive(Debug, Clone)]
pub struct SampleDataConfig {
    pub buildings: Vec<String>,
    pub hours: u32,
    pub base_load_kwh: f64,
    pub daily_amplitude_kwh: f64,
    pub noise_sd_kwh: f64,
    pub floor_kwh: f64,
    pub seed: Option<u64>,
}

impl Default for SampleDataConfig {
    fn default() -> Self {
        Self {
            buildings: vec![
                "Library".to_string(),
                "Engineering".to_string(),
                "Admin".to_string(),
            ],
            hours: 168, // one week
            base_load_kwh: 10.0,
            daily_amplitude_kwh: 5.0,
            noise_sd_kwh: 2.0,
            floor_kwh: 0.1,
            seed: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub sample: SampleDataConfig,
    pub render_dashboard: bool,
}

impl PipelineConfig {
    pub fn new(data_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            output_dir: output_dir.into(),
            sample: SampleDataConfig::default(),
            render_dashboard: true,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.sample.seed = Some(seed);
        self
    }

    pub fn without_dashboard(mut self) -> Self {
        self.render_dashboard = false;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new("data", "output")
    }
}
