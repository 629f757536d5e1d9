//! Stats module - Scalar summaries over demographic tables

mod calculator;

pub use calculator::{format_count, tidy_percent, Kpis, StatsCalculator, SENIOR_AGE};
