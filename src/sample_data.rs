use anyhow::{Context, Result};
use chrono::{Duration, NaiveDateTime, Timelike};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::SampleDataConfig;
use crate::models::TIMESTAMP_FORMAT;

/// Writes one hourly `<building>.csv` per configured building into `dir`,
/// the last row stamped at `end`. Returns the written paths.
pub fn generate(dir: &Path, config: &SampleDataConfig, end: NaiveDateTime) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create data directory: {:?}", dir))?;

    let mut rng = match config.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let start = end - Duration::hours(i64::from(config.hours.saturating_sub(1)));
    let mut written = Vec::with_capacity(config.buildings.len());

    for building in &config.buildings {
        let path = dir.join(format!("{}.csv", building));
        let mut wtr = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create sample file: {:?}", path))?;
        wtr.write_record(["timestamp", "kwh"])?;

        for step in 0..config.hours {
            let ts = start + Duration::hours(i64::from(step));
            let kwh = sample_kwh(config, ts.hour(), &mut rng);
            wtr.write_record([ts.format(TIMESTAMP_FORMAT).to_string(), kwh.to_string()])?;
        }
        wtr.flush()?;
        written.push(path);
    }

    println!("Sample data generated for {} buildings in {:?}", written.len(), dir);
    Ok(written)
}

/// Base load plus a daily sine swing and Gaussian noise, clipped at the floor.
fn sample_kwh(config: &SampleDataConfig, hour: u32, rng: &mut ChaCha8Rng) -> f64 {
    let phase = (f64::from(hour) / 24.0) * 2.0 * PI - PI / 2.0;
    let daily = config.daily_amplitude_kwh * phase.sin();
    let noise = standard_normal(rng) * config.noise_sd_kwh;
    (config.base_load_kwh + daily + noise).max(config.floor_kwh)
}

// Box-Muller transform. Drawing `1.0 - gen()` keeps the log argument in (0, 1].
fn standard_normal(rng: &mut ChaCha8Rng) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
