//! Charts module - Interactive and static chart rendering

mod plotter;
mod renderer;

pub use plotter::{AgeChartData, ChartData, ChartPlotter};
pub use renderer::StaticChartRenderer;
