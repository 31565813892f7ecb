use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::models::{DailyTotal, ReadingRow, WeeklyAverage};

pub const DASHBOARD_FILE: &str = "dashboard.png";

type Panel<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Three stacked charts: daily trend, mean weekly usage, raw reading scatter.
pub struct DashboardRenderer {
    output_dir: PathBuf,
    size: (u32, u32),
}

impl DashboardRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            size: (1200, 1800),
        }
    }

    pub fn render(
        &self,
        table: &[ReadingRow],
        daily: &[DailyTotal],
        weekly: &[WeeklyAverage],
    ) -> Result<PathBuf> {
        let output_path = self.output_dir.join(DASHBOARD_FILE);
        self.draw(&output_path, table, daily, weekly)?;
        println!("  ✅ Saved dashboard to {:?}", output_path);
        Ok(output_path)
    }

    fn draw(
        &self,
        output_path: &Path,
        table: &[ReadingRow],
        daily: &[DailyTotal],
        weekly: &[WeeklyAverage],
    ) -> Result<()> {
        let root = BitMapBackend::new(output_path, self.size).into_drawing_area();
        root.fill(&WHITE)?;
        let root = root.titled(
            "Campus Energy Consumption Dashboard",
            ("sans-serif", 40).into_font(),
        )?;

        let panels = root.split_evenly((3, 1));
        draw_daily_trend(&panels[0], &daily_series(daily))?;
        draw_weekly_bars(&panels[1], &mean_weekly_by_building(weekly))?;
        draw_reading_scatter(&panels[2], table)?;

        root.present()?;
        Ok(())
    }
}

/// Daily totals split into one (day, kWh) series per building.
pub fn daily_series(daily: &[DailyTotal]) -> Vec<(String, Vec<(NaiveDate, f64)>)> {
    let mut series: BTreeMap<&str, Vec<(NaiveDate, f64)>> = BTreeMap::new();
    for d in daily {
        series.entry(d.building.as_str()).or_default().push((d.day, d.kwh));
    }
    series
        .into_iter()
        .map(|(name, mut points)| {
            points.sort_by_key(|(day, _)| *day);
            (name.to_string(), points)
        })
        .collect()
}

/// Mean of each building's weekly means, ignoring empty weeks.
pub fn mean_weekly_by_building(weekly: &[WeeklyAverage]) -> Vec<(String, f64)> {
    let mut acc: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for w in weekly {
        if let Some(kwh) = w.kwh {
            let entry = acc.entry(w.building.as_str()).or_insert((0.0, 0));
            entry.0 += kwh;
            entry.1 += 1;
        }
    }
    acc.into_iter()
        .map(|(name, (sum, n))| (name.to_string(), sum / n as f64))
        .collect()
}

fn upper_bound(values: impl Iterator<Item = f64>) -> f64 {
    let max = values.fold(0.0, f64::max);
    if max > 0.0 {
        max * 1.1
    } else {
        1.0
    }
}

fn draw_daily_trend(area: &Panel, series: &[(String, Vec<(NaiveDate, f64)>)]) -> Result<()> {
    let days = series.iter().flat_map(|(_, pts)| pts.iter().map(|(d, _)| *d));
    let (Some(first), Some(last)) = (days.clone().min(), days.max()) else {
        return Ok(());
    };
    let y_max = upper_bound(series.iter().flat_map(|(_, pts)| pts.iter().map(|(_, v)| *v)));

    let mut chart = ChartBuilder::on(area)
        .caption("Daily Energy Consumption Trend", ("sans-serif", 28).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(first..last + Duration::days(1), 0.0..y_max)?;

    chart.configure_mesh()
        .x_desc("Date")
        .y_desc("Total kWh")
        .draw()?;

    for (idx, (building, points)) in series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        chart.draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?
            .label(building.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        chart.draw_series(points.iter().map(|&(d, v)| Circle::new((d, v), 3, color.filled())))?;
    }

    chart.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    Ok(())
}

fn draw_weekly_bars(area: &Panel, bars: &[(String, f64)]) -> Result<()> {
    if bars.is_empty() {
        return Ok(());
    }
    let y_max = upper_bound(bars.iter().map(|(_, v)| *v));

    let mut chart = ChartBuilder::on(area)
        .caption("Average Weekly Consumption by Building", ("sans-serif", 28).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d((0..bars.len()).into_segmented(), 0.0..y_max)?;

    chart.configure_mesh()
        .disable_x_mesh()
        .x_desc("Building")
        .y_desc("Average kWh")
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => bars.get(*i).map(|(name, _)| name.clone()).unwrap_or_default(),
            _ => String::new(),
        })
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(RGBColor(135, 206, 235).filled())
            .margin(20)
            .data(bars.iter().enumerate().map(|(i, (_, v))| (i, *v))),
    )?;
    Ok(())
}

fn draw_reading_scatter(area: &Panel, table: &[ReadingRow]) -> Result<()> {
    let Some(origin) = table.iter().map(|r| r.timestamp).min() else {
        return Ok(());
    };
    let hours_since = |ts: NaiveDateTime| (ts - origin).num_seconds() as f64 / 3600.0;
    let x_max = table.iter().map(|r| hours_since(r.timestamp)).fold(1.0, f64::max);
    let y_max = upper_bound(table.iter().map(|r| r.kwh));

    let mut chart = ChartBuilder::on(area)
        .caption("Hourly Consumption Scatter Plot (Peak Analysis)", ("sans-serif", 28).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..x_max, 0.0..y_max)?;

    chart.configure_mesh()
        .x_desc("Time")
        .y_desc("kWh")
        .x_label_formatter(&|h| {
            (origin + Duration::seconds((h * 3600.0) as i64))
                .format("%m-%d %H:%M")
                .to_string()
        })
        .draw()?;

    let mut by_building: BTreeMap<&str, Vec<(f64, f64)>> = BTreeMap::new();
    for r in table {
        by_building
            .entry(r.building.as_str())
            .or_default()
            .push((hours_since(r.timestamp), r.kwh));
    }

    for (idx, (building, points)) in by_building.into_iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        chart.draw_series(points.into_iter().map(|p| Circle::new(p, 2, color.mix(0.5).filled())))?
            .label(building)
            .legend(move |(x, y)| Circle::new((x + 10, y), 3, color.filled()));
    }

    chart.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    Ok(())
}
