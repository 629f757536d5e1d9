//! Chart Plotter Module
//! Creates interactive visualizations using egui_plot: bars, donuts, funnels,
//! treemaps and the single-year age line.

use crate::data::{
    AgeTable, CategoryTable, DataProcessor, Dataset, SeriesPoint, TableKind, Unit, UNKNOWN_LABEL,
};
use crate::stats::StatsCalculator;
use egui::{Color32, RichText, Stroke};
use egui_plot::{
    Bar, BarChart, Legend, Line, Plot, PlotPoint, PlotPoints, Points, Polygon, Text, VLine,
};
use std::f64::consts::{FRAC_PI_2, TAU};

/// Color palette for categories
pub const PALETTE: [Color32; 10] = [
    Color32::from_rgb(52, 152, 219),  // Blue
    Color32::from_rgb(231, 76, 60),   // Red
    Color32::from_rgb(46, 204, 113),  // Green
    Color32::from_rgb(155, 89, 182),  // Purple
    Color32::from_rgb(243, 156, 18),  // Orange
    Color32::from_rgb(26, 188, 156),  // Teal
    Color32::from_rgb(233, 30, 99),   // Pink
    Color32::from_rgb(0, 188, 212),   // Cyan
    Color32::from_rgb(255, 87, 34),   // Deep Orange
    Color32::from_rgb(121, 85, 72),   // Brown
];

/// Unknown buckets are always drawn in grey
pub const UNKNOWN_COLOR: Color32 = Color32::from_rgb(149, 165, 166);

pub const SMOOTHED_COLOR: Color32 = Color32::from_rgb(231, 76, 60);

/// Donut hole as a fraction of the outer radius.
pub const DONUT_HOLE: f64 = 0.45;

const CHART_HEIGHT: f32 = 320.0;

/// Chart data for a single category table
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub title: String,
    pub unit: Unit,
    pub points: Vec<SeriesPoint>,
}

impl ChartData {
    pub fn from_table(
        title: impl Into<String>,
        table: &CategoryTable,
        unit: Unit,
        show_unknowns: bool,
    ) -> Self {
        Self {
            title: title.into(),
            unit,
            points: DataProcessor::series(table, unit, show_unknowns),
        }
    }

    pub fn labels(&self) -> Vec<String> {
        self.points.iter().map(|p| p.label.clone()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Value text drawn on each bar.
    pub fn texts(&self) -> Vec<String> {
        self.points.iter().map(|p| self.unit.format(p.value)).collect()
    }

    pub fn max_value(&self) -> f64 {
        self.points.iter().map(|p| p.value).fold(0.0, f64::max)
    }

    pub fn color(&self, idx: usize) -> Color32 {
        category_color(&self.points[idx].label, idx)
    }

    /// One bar chart per charted table, as written by the static export.
    pub fn dashboard_set(ds: &Dataset, unit: Unit, show_unknowns: bool) -> Vec<ChartData> {
        [
            (TableKind::HouseholdSize, "Household Size Distribution"),
            (TableKind::MaritalStatus, "Marital Status Distribution"),
            (TableKind::Gender, "Gender"),
            (TableKind::PresenceOfChildren, "Presence of Children"),
            (TableKind::Income, "Income Distribution (Ordered)"),
            (TableKind::NetWorth, "Net Worth Tiers"),
            (TableKind::HomeOwnership, "Home Ownership Categories"),
        ]
        .into_iter()
        .filter_map(|(kind, title)| {
            ds.category(kind)
                .map(|t| Self::from_table(title, t, unit, show_unknowns))
        })
        .collect()
    }
}

/// Age line data, with an optional smoothed trace.
#[derive(Debug, Clone, PartialEq)]
pub struct AgeChartData {
    pub unit: Unit,
    pub points: Vec<[f64; 2]>,
    pub smoothed: Option<(usize, Vec<[f64; 2]>)>,
}

impl AgeChartData {
    pub fn build(age: &AgeTable, unit: Unit, window: usize) -> Self {
        let series = DataProcessor::age_series(age, unit);
        let points: Vec<[f64; 2]> = series.iter().map(|&(x, y)| [x, y]).collect();

        let smoothed = (window > 1).then(|| {
            let ys: Vec<f64> = series.iter().map(|&(_, y)| y).collect();
            let smooth = StatsCalculator::rolling_mean(&ys, window);
            let line = series
                .iter()
                .zip(smooth)
                .map(|(&(x, _), y)| [x, y])
                .collect();
            (window, line)
        });

        Self {
            unit,
            points,
            smoothed,
        }
    }

    pub fn smoothed_name(window: usize) -> String {
        format!("Smoothed ({})", window)
    }

    pub fn max_value(&self) -> f64 {
        self.points.iter().map(|p| p[1]).fold(0.0, f64::max)
    }
}

/// Rectangle produced by the treemap layout, in layout units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cell {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Cell {
    pub fn area(&self) -> f64 {
        self.w * self.h
    }
}

pub fn category_color(label: &str, idx: usize) -> Color32 {
    if label == UNKNOWN_LABEL {
        UNKNOWN_COLOR
    } else {
        PALETTE[idx % PALETTE.len()]
    }
}

/// Worst aspect ratio of a treemap row laid along a side of length `side`.
fn worst_ratio(areas: &[f64], side: f64) -> f64 {
    let sum: f64 = areas.iter().sum();
    let max = areas.iter().copied().fold(f64::MIN, f64::max);
    let min = areas.iter().copied().fold(f64::MAX, f64::min);
    let s2 = side * side;
    let sum2 = sum * sum;
    (s2 * max / sum2).max(sum2 / (s2 * min))
}

/// Squarified treemap. Returns one cell per value, in input order;
/// non-positive values get an empty cell.
pub fn treemap_layout(values: &[f64], bounds: Cell) -> Vec<Cell> {
    let mut cells = vec![Cell::default(); values.len()];
    let total: f64 = values.iter().filter(|v| **v > 0.0).sum();
    if total <= 0.0 || bounds.area() <= 0.0 {
        return cells;
    }

    let scale = bounds.area() / total;
    let items: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v > 0.0)
        .map(|(i, v)| (i, v * scale))
        .collect();

    let mut free = bounds;
    let mut start = 0;
    while start < items.len() {
        let side = free.w.min(free.h);
        let mut end = start + 1;
        let mut row: Vec<f64> = vec![items[start].1];
        while end < items.len() {
            let mut candidate = row.clone();
            candidate.push(items[end].1);
            if worst_ratio(&candidate, side) > worst_ratio(&row, side) {
                break;
            }
            row = candidate;
            end += 1;
        }

        let row_sum: f64 = row.iter().sum();
        let thickness = row_sum / side;

        if free.w >= free.h {
            // Column on the left edge, stacked top to bottom
            let mut y = free.y;
            for &(idx, area) in &items[start..end] {
                let h = area / thickness;
                cells[idx] = Cell { x: free.x, y, w: thickness, h };
                y += h;
            }
            free.x += thickness;
            free.w -= thickness;
        } else {
            // Row along the top edge, left to right
            let mut x = free.x;
            for &(idx, area) in &items[start..end] {
                let w = area / thickness;
                cells[idx] = Cell { x, y: free.y, w, h: thickness };
                x += w;
            }
            free.y += thickness;
            free.h -= thickness;
        }
        start = end;
    }

    cells
}

/// Start/end angles (radians) for each donut slice, clockwise from 12 o'clock.
pub fn donut_slices(values: &[f64]) -> Vec<(f64, f64)> {
    let total: f64 = values.iter().filter(|v| **v > 0.0).sum();
    let mut angle = FRAC_PI_2;
    values
        .iter()
        .map(|&v| {
            let sweep = if total > 0.0 && v > 0.0 { v / total * TAU } else { 0.0 };
            let start = angle;
            angle -= sweep;
            (start, angle)
        })
        .collect()
}

fn ring_segment(start: f64, end: f64, inner: f64, outer: f64) -> Vec<[f64; 2]> {
    let steps = (((start - end).abs() / TAU) * 120.0).ceil().max(2.0) as usize;
    let mut pts = Vec::with_capacity(steps * 2 + 2);
    for i in 0..=steps {
        let a = start + (end - start) * i as f64 / steps as f64;
        pts.push([outer * a.cos(), outer * a.sin()]);
    }
    for i in (0..=steps).rev() {
        let a = start + (end - start) * i as f64 / steps as f64;
        pts.push([inner * a.cos(), inner * a.sin()]);
    }
    pts
}

/// Creates the dashboard charts using egui_plot.
pub struct ChartPlotter;

impl ChartPlotter {
    fn chart_title(ui: &mut egui::Ui, title: &str) {
        ui.label(RichText::new(title).size(15.0).strong());
    }

    fn no_data(ui: &mut egui::Ui, title: &str) {
        Self::chart_title(ui, title);
        ui.label(RichText::new("No data").color(Color32::GRAY));
    }

    /// Vertical bars, one per category, with value text above each bar.
    pub fn draw_bar_chart(ui: &mut egui::Ui, data: &ChartData) {
        if data.points.is_empty() {
            Self::no_data(ui, &data.title);
            return;
        }
        Self::chart_title(ui, &data.title);

        let labels = data.labels();
        let texts = data.texts();
        let bars: Vec<Bar> = data
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                Bar::new(i as f64, p.value)
                    .name(&p.label)
                    .fill(data.color(i))
                    .width(0.7)
            })
            .collect();
        let headroom = data.max_value() * 0.08;

        Plot::new(format!("bar_{}", data.title))
            .height(CHART_HEIGHT)
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .include_y(0.0)
            .include_y(data.max_value() + headroom * 2.0)
            .y_axis_label(data.unit.label())
            .x_grid_spacer(egui_plot::uniform_grid_spacer(|_| [1.0, 1.0, 1.0]))
            .x_axis_formatter(move |mark, _range| {
                let idx = mark.value.round();
                if (mark.value - idx).abs() < 1e-6 && idx >= 0.0 {
                    labels.get(idx as usize).cloned().unwrap_or_default()
                } else {
                    String::new()
                }
            })
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).name(data.unit.label()));
                for (i, (p, text)) in data.points.iter().zip(&texts).enumerate() {
                    plot_ui.text(Text::new(
                        PlotPoint::new(i as f64, p.value + headroom),
                        RichText::new(text).size(11.0),
                    ));
                }
            });
    }

    /// Horizontal bars with the first category at the top.
    pub fn draw_hbar_chart(ui: &mut egui::Ui, data: &ChartData) {
        if data.points.is_empty() {
            Self::no_data(ui, &data.title);
            return;
        }
        Self::chart_title(ui, &data.title);

        let n = data.points.len();
        let labels = data.labels();
        let texts = data.texts();
        let bars: Vec<Bar> = data
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                Bar::new((n - 1 - i) as f64, p.value)
                    .name(&p.label)
                    .fill(data.color(i))
                    .width(0.7)
            })
            .collect();
        let headroom = data.max_value() * 0.12;

        Plot::new(format!("hbar_{}", data.title))
            .height(CHART_HEIGHT)
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .include_x(0.0)
            .include_x(data.max_value() + headroom * 1.5)
            .x_axis_label(data.unit.label())
            .y_axis_min_width(140.0)
            .y_grid_spacer(egui_plot::uniform_grid_spacer(|_| [1.0, 1.0, 1.0]))
            .y_axis_formatter(move |mark, _range| {
                let pos = mark.value.round();
                if (mark.value - pos).abs() < 1e-6 && pos >= 0.0 && (pos as usize) < n {
                    labels[n - 1 - pos as usize].clone()
                } else {
                    String::new()
                }
            })
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).horizontal().name(data.unit.label()));
                for (i, (p, text)) in data.points.iter().zip(&texts).enumerate() {
                    plot_ui.text(Text::new(
                        PlotPoint::new(p.value + headroom * 0.6, (n - 1 - i) as f64),
                        RichText::new(text).size(11.0),
                    ));
                }
            });
    }

    /// Funnel: horizontal bars centered on zero.
    pub fn draw_funnel_chart(ui: &mut egui::Ui, data: &ChartData) {
        if data.points.is_empty() {
            Self::no_data(ui, &data.title);
            return;
        }
        Self::chart_title(ui, &data.title);

        let n = data.points.len();
        let labels = data.labels();
        let texts = data.texts();
        let half_max = data.max_value() / 2.0;
        let bars: Vec<Bar> = data
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                Bar::new((n - 1 - i) as f64, p.value)
                    .base_offset(-p.value / 2.0)
                    .name(&p.label)
                    .fill(data.color(i))
                    .width(0.8)
            })
            .collect();

        Plot::new(format!("funnel_{}", data.title))
            .height(CHART_HEIGHT * 0.7)
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .show_x(false)
            .include_x(-half_max * 1.1)
            .include_x(half_max * 1.1)
            .x_axis_formatter(|_, _| String::new())
            .y_axis_min_width(100.0)
            .y_grid_spacer(egui_plot::uniform_grid_spacer(|_| [1.0, 1.0, 1.0]))
            .y_axis_formatter(move |mark, _range| {
                let pos = mark.value.round();
                if (mark.value - pos).abs() < 1e-6 && pos >= 0.0 && (pos as usize) < n {
                    labels[n - 1 - pos as usize].clone()
                } else {
                    String::new()
                }
            })
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).horizontal());
                for (i, text) in texts.iter().enumerate() {
                    plot_ui.text(Text::new(
                        PlotPoint::new(0.0, (n - 1 - i) as f64),
                        RichText::new(text).size(12.0).color(Color32::WHITE).strong(),
                    ));
                }
            });
    }

    /// Donut chart with a legend and percentage share on each slice.
    pub fn draw_donut_chart(ui: &mut egui::Ui, data: &ChartData) {
        if data.points.is_empty() {
            Self::no_data(ui, &data.title);
            return;
        }
        Self::chart_title(ui, &data.title);

        let values = data.values();
        let total: f64 = values.iter().filter(|v| **v > 0.0).sum();
        let slices = donut_slices(&values);

        Plot::new(format!("donut_{}", data.title))
            .height(CHART_HEIGHT)
            .data_aspect(1.0)
            .show_axes(false)
            .show_grid(false)
            .show_x(false)
            .show_y(false)
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .allow_boxed_zoom(false)
            .include_x(-1.1)
            .include_x(1.1)
            .include_y(-1.1)
            .include_y(1.1)
            .legend(Legend::default())
            .show(ui, |plot_ui| {
                for (i, (p, &(start, end))) in data.points.iter().zip(&slices).enumerate() {
                    if start == end {
                        continue;
                    }
                    let color = data.color(i);
                    let share = p.value / total * 100.0;
                    plot_ui.polygon(
                        Polygon::new(PlotPoints::from(ring_segment(start, end, DONUT_HOLE, 1.0)))
                            .fill_color(color)
                            .stroke(Stroke::new(1.0, Color32::WHITE))
                            .name(format!("{} ({:.1}%)", p.label, share)),
                    );

                    // Skip labels on slivers
                    if share >= 4.0 {
                        let mid = (start + end) / 2.0;
                        let r = (1.0 + DONUT_HOLE) / 2.0;
                        plot_ui.text(Text::new(
                            PlotPoint::new(r * mid.cos(), r * mid.sin()),
                            RichText::new(format!("{:.1}%", share))
                                .size(11.0)
                                .color(Color32::WHITE),
                        ));
                    }
                }
            });
    }

    /// Treemap drawn directly with the painter; hovering a tile shows its value.
    pub fn draw_treemap(ui: &mut egui::Ui, data: &ChartData) {
        if data.points.is_empty() {
            Self::no_data(ui, &data.title);
            return;
        }
        Self::chart_title(ui, &data.title);

        let size = egui::vec2(ui.available_width(), CHART_HEIGHT);
        let (rect, response) = ui.allocate_exact_size(size, egui::Sense::hover());
        let bounds = Cell {
            x: rect.left() as f64,
            y: rect.top() as f64,
            w: rect.width() as f64,
            h: rect.height() as f64,
        };
        let cells = treemap_layout(&data.values(), bounds);
        let texts = data.texts();
        let painter = ui.painter_at(rect);
        let mut hovered: Option<usize> = None;

        for (i, cell) in cells.iter().enumerate() {
            if cell.area() <= 0.0 {
                continue;
            }
            let tile = egui::Rect::from_min_size(
                egui::pos2(cell.x as f32, cell.y as f32),
                egui::vec2(cell.w as f32, cell.h as f32),
            );
            painter.rect_filled(tile.shrink(1.0), 2.0, data.color(i));

            if tile.width() > 60.0 && tile.height() > 34.0 {
                painter.text(
                    tile.left_top() + egui::vec2(6.0, 4.0),
                    egui::Align2::LEFT_TOP,
                    format!("{}\n{}", data.points[i].label, texts[i]),
                    egui::FontId::proportional(12.0),
                    Color32::WHITE,
                );
            }

            if response
                .hover_pos()
                .is_some_and(|pos| tile.contains(pos))
            {
                hovered = Some(i);
            }
        }

        if let Some(i) = hovered {
            response.on_hover_text_at_pointer(format!("{}: {}", data.points[i].label, texts[i]));
        }
    }

    /// Single-year age line with markers, optional smoothed trace, and a
    /// marker at the senior threshold.
    pub fn draw_age_chart(ui: &mut egui::Ui, data: &AgeChartData, senior_age: u32) {
        Self::chart_title(ui, "Age by Single Year");

        Plot::new("age_by_year")
            .height(CHART_HEIGHT + 60.0)
            .x_axis_label("Age")
            .y_axis_label(data.unit.label())
            .include_y(0.0)
            .legend(Legend::default())
            .label_formatter(move |name, value| {
                format!("{}\nAge {:.0}: {:.2}", name, value.x, value.y)
            })
            .show(ui, |plot_ui| {
                let name = data.unit.label();
                plot_ui.line(
                    Line::new(PlotPoints::from(data.points.clone()))
                        .color(PALETTE[0])
                        .width(1.5)
                        .name(name),
                );
                plot_ui.points(
                    Points::new(PlotPoints::from(data.points.clone()))
                        .radius(2.5)
                        .color(PALETTE[0])
                        .name(name),
                );

                if let Some((window, smoothed)) = &data.smoothed {
                    plot_ui.line(
                        Line::new(PlotPoints::from(smoothed.clone()))
                            .color(SMOOTHED_COLOR)
                            .width(2.0)
                            .name(AgeChartData::smoothed_name(*window)),
                    );
                }

                plot_ui.vline(
                    VLine::new(senior_age as f64)
                        .color(Color32::GRAY)
                        .name(format!("{}+", senior_age)),
                );
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::bundled;

    fn bounds() -> Cell {
        Cell { x: 0.0, y: 0.0, w: 600.0, h: 400.0 }
    }

    #[test]
    fn test_treemap_areas_proportional() {
        let values = [6.0, 6.0, 4.0, 3.0, 2.0, 2.0, 1.0];
        let cells = treemap_layout(&values, bounds());
        let total: f64 = values.iter().sum();

        for (v, c) in values.iter().zip(&cells) {
            let expected = v / total * bounds().area();
            assert!((c.area() - expected).abs() < 1e-6, "{c:?} vs {expected}");
        }
    }

    #[test]
    fn test_treemap_cells_stay_in_bounds() {
        let ds = bundled::dataset();
        let values: Vec<f64> = ds.income.rows.iter().map(|r| r.count as f64).collect();
        let b = bounds();
        let cells = treemap_layout(&values, b);

        let covered: f64 = cells.iter().map(Cell::area).sum();
        assert!((covered - b.area()).abs() < 1e-3);
        for c in &cells {
            assert!(c.x >= -1e-9 && c.y >= -1e-9);
            assert!(c.x + c.w <= b.w + 1e-6 && c.y + c.h <= b.h + 1e-6, "{c:?}");
        }
    }

    #[test]
    fn test_treemap_skips_non_positive_values() {
        let cells = treemap_layout(&[0.0, 5.0, -1.0], bounds());
        assert_eq!(cells[0].area(), 0.0);
        assert_eq!(cells[2].area(), 0.0);
        assert!((cells[1].area() - bounds().area()).abs() < 1e-6);
        assert!(treemap_layout(&[0.0], bounds())[0].area() == 0.0);
    }

    #[test]
    fn test_donut_slices_cover_full_circle() {
        let slices = donut_slices(&[1.0, 1.0, 2.0]);
        assert_eq!(slices.len(), 3);
        assert!((slices[0].0 - FRAC_PI_2).abs() < 1e-12);
        assert!((slices[2].0 - slices[2].1 - TAU / 2.0).abs() < 1e-12);
        // Contiguous, clockwise
        assert_eq!(slices[0].1, slices[1].0);
        assert!((slices[0].0 - slices[2].1 - TAU).abs() < 1e-12);
    }

    #[test]
    fn test_chart_data_texts_follow_unit() {
        let ds = bundled::dataset();
        let pct = ChartData::from_table("Gender", &ds.gender, Unit::Percent, true);
        assert_eq!(pct.texts(), vec!["53.64%", "46.36%"]);
        let cnt = ChartData::from_table("Gender", &ds.gender, Unit::Count, true);
        assert_eq!(cnt.texts(), vec!["225,964", "195,290"]);
    }

    #[test]
    fn test_dashboard_set_respects_unknown_toggle() {
        let ds = bundled::dataset();
        let charts = ChartData::dashboard_set(&ds, Unit::Percent, false);
        assert_eq!(charts.len(), 7);
        assert!(charts
            .iter()
            .all(|c| c.points.iter().all(|p| p.label != UNKNOWN_LABEL)));

        let with_unknowns = ChartData::dashboard_set(&ds, Unit::Percent, true);
        let home = with_unknowns
            .iter()
            .find(|c| c.title == "Home Ownership Categories")
            .unwrap();
        assert_eq!(home.points.len(), 4);
    }

    #[test]
    fn test_unknown_gets_grey() {
        let ds = bundled::dataset();
        let data = ChartData::from_table("Marital", &ds.marital_status, Unit::Percent, true);
        assert_eq!(data.color(4), UNKNOWN_COLOR);
        assert_eq!(data.color(0), PALETTE[0]);
    }

    #[test]
    fn test_age_chart_smoothing() {
        let ds = bundled::dataset();
        let plain = AgeChartData::build(&ds.age, Unit::Percent, 1);
        assert!(plain.smoothed.is_none());
        assert_eq!(plain.points.len(), 98);

        let smooth = AgeChartData::build(&ds.age, Unit::Count, 5);
        let (window, line) = smooth.smoothed.as_ref().unwrap();
        assert_eq!(*window, 5);
        assert_eq!(line.len(), 98);
        // First point averages ages 17..=19
        assert!((line[0][1] - (7.0 + 20.0 + 152.0) / 3.0).abs() < 1e-9);
        assert_eq!(AgeChartData::smoothed_name(5), "Smoothed (5)");
    }
}
