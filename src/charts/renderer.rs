//! Static Chart Renderer
//! Renders dashboard charts to PNG files with plotters.
//!
//! Layout per image:
//! 1. Caption with the chart title
//! 2. Bars (one per category, palette colors, Unknown in grey) or the age line
//! 3. Value axis labelled with the display unit

use crate::charts::{AgeChartData, ChartData};
use egui::Color32;
use plotters::coord::ranged1d::SegmentValue;
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Drawing failed: {0}")]
    Draw(String),
    #[error("Nothing to draw for '{0}'")]
    Empty(String),
}

fn draw_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Draw(e.to_string())
}

fn rgb(c: Color32) -> RGBColor {
    RGBColor(c.r(), c.g(), c.b())
}

/// Upper bound of the value axis with room for labels.
fn axis_max(max: f64) -> f64 {
    if max > 0.0 {
        max * 1.12
    } else {
        1.0
    }
}

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Render a category bar chart to `path`.
    pub fn render_bar_chart(
        data: &ChartData,
        path: &Path,
        size: (u32, u32),
    ) -> Result<(), RenderError> {
        if data.points.is_empty() {
            return Err(RenderError::Empty(data.title.clone()));
        }

        let root = BitMapBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let n = data.points.len();
        let labels = data.labels();
        let texts = data.texts();

        let mut chart = ChartBuilder::on(&root)
            .caption(&data.title, ("sans-serif", 24))
            .margin(15)
            .x_label_area_size(70)
            .y_label_area_size(80)
            .build_cartesian_2d((0..n).into_segmented(), 0f64..axis_max(data.max_value()))
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&|v| match v {
                SegmentValue::CenterOf(i) => labels.get(*i).cloned().unwrap_or_default(),
                _ => String::new(),
            })
            .x_label_style(("sans-serif", 11).into_font().transform(FontTransform::Rotate90))
            .y_desc(data.unit.label())
            .draw()
            .map_err(draw_err)?;

        chart
            .draw_series(data.points.iter().enumerate().map(|(i, p)| {
                let color = rgb(data.color(i));
                let mut bar = Rectangle::new(
                    [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), p.value)],
                    color.filled(),
                );
                bar.set_margin(0, 0, 6, 6);
                bar
            }))
            .map_err(draw_err)?;

        chart
            .draw_series(data.points.iter().zip(&texts).enumerate().map(|(i, (p, t))| {
                Text::new(
                    t.clone(),
                    (SegmentValue::CenterOf(i), p.value),
                    ("sans-serif", 11).into_font().color(&BLACK),
                )
            }))
            .map_err(draw_err)?;

        root.present().map_err(draw_err)?;
        info!(chart = %data.title, path = %path.display(), "rendered png");
        Ok(())
    }

    /// Render the single-year age line (and smoothed trace) to `path`.
    pub fn render_age_chart(
        data: &AgeChartData,
        path: &Path,
        size: (u32, u32),
    ) -> Result<(), RenderError> {
        let (Some(first), Some(last)) = (data.points.first(), data.points.last()) else {
            return Err(RenderError::Empty("Age".to_string()));
        };
        let x_range = first[0]..last[0].max(first[0] + 1.0);

        let root = BitMapBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Age by Single Year", ("sans-serif", 24))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(80)
            .build_cartesian_2d(x_range, 0f64..axis_max(data.max_value()))
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .x_desc("Age")
            .y_desc(data.unit.label())
            .draw()
            .map_err(draw_err)?;

        let main = rgb(super::plotter::PALETTE[0]);
        chart
            .draw_series(LineSeries::new(
                data.points.iter().map(|p| (p[0], p[1])),
                main.stroke_width(2),
            ))
            .map_err(draw_err)?
            .label(data.unit.label())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], main));

        chart
            .draw_series(
                data.points
                    .iter()
                    .map(|p| Circle::new((p[0], p[1]), 2, main.filled())),
            )
            .map_err(draw_err)?;

        if let Some((window, smoothed)) = &data.smoothed {
            let color = rgb(super::plotter::SMOOTHED_COLOR);
            chart
                .draw_series(LineSeries::new(
                    smoothed.iter().map(|p| (p[0], p[1])),
                    color.stroke_width(2),
                ))
                .map_err(draw_err)?
                .label(AgeChartData::smoothed_name(*window))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(draw_err)?;

        root.present().map_err(draw_err)?;
        info!(path = %path.display(), "rendered age png");
        Ok(())
    }

    /// Render every chart into `dir`, returning the written paths.
    pub fn render_all(
        bars: &[ChartData],
        age: &AgeChartData,
        dir: &Path,
        size: (u32, u32),
    ) -> Result<Vec<PathBuf>, RenderError> {
        std::fs::create_dir_all(dir).map_err(draw_err)?;
        let mut written = Vec::with_capacity(bars.len() + 1);

        for data in bars {
            let path = dir.join(format!("{}.png", file_slug(&data.title)));
            Self::render_bar_chart(data, &path, size)?;
            written.push(path);
        }

        let path = dir.join("age.png");
        Self::render_age_chart(age, &path, size)?;
        written.push(path);

        Ok(written)
    }
}

/// Lowercase, underscore-separated file stem for a chart title.
pub fn file_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('_') && !slug.is_empty() {
            slug.push('_');
        }
    }
    slug.trim_end_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Unit;

    #[test]
    fn test_file_slug() {
        assert_eq!(file_slug("Household Size Distribution"), "household_size_distribution");
        assert_eq!(file_slug("Income & Net Worth"), "income_net_worth");
        assert_eq!(file_slug("  Age (Smoothed) "), "age_smoothed");
    }

    #[test]
    fn test_axis_max() {
        assert_eq!(axis_max(0.0), 1.0);
        assert!(axis_max(50.0) > 50.0);
    }

    #[test]
    fn test_empty_inputs_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let empty = ChartData {
            title: "Empty".to_string(),
            unit: Unit::Percent,
            points: Vec::new(),
        };
        assert!(matches!(
            StaticChartRenderer::render_bar_chart(&empty, &dir.path().join("x.png"), (400, 300)),
            Err(RenderError::Empty(_))
        ));

        let age = AgeChartData {
            unit: Unit::Count,
            points: Vec::new(),
            smoothed: None,
        };
        assert!(matches!(
            StaticChartRenderer::render_age_chart(&age, &dir.path().join("a.png"), (400, 300)),
            Err(RenderError::Empty(_))
        ));
    }
}
