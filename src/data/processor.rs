//! Data Processor Module
//! Selects the displayed value (percent or count) and filters Unknown buckets.

use super::table::{AgeKey, AgeTable, CategoryRow, CategoryTable};
use serde::{Deserialize, Serialize};

/// Display unit for chart values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Percent,
    Count,
}

impl Unit {
    pub fn label(self) -> &'static str {
        match self {
            Unit::Percent => "Percent",
            Unit::Count => "Count",
        }
    }

    /// Chart text for a value in this unit.
    pub fn format(self, value: f64) -> String {
        match self {
            Unit::Percent => format!("{:.2}%", value),
            Unit::Count => crate::stats::format_count(value.round().max(0.0) as u64),
        }
    }
}

/// Label/value pairs ready for charting, in category order.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
}

/// Handles value selection and filtering of demographic tables.
pub struct DataProcessor;

impl DataProcessor {
    pub fn value(row: &CategoryRow, unit: Unit) -> f64 {
        match unit {
            Unit::Percent => row.percent,
            Unit::Count => row.count as f64,
        }
    }

    /// Rows to display, dropping "Unknown" buckets when asked to.
    pub fn visible_rows(table: &CategoryTable, show_unknowns: bool) -> Vec<&CategoryRow> {
        if show_unknowns || !table.has_unknown() {
            return table.rows.iter().collect();
        }
        table
            .rows
            .iter()
            .filter(|r| !r.is_unknown())
            .collect()
    }

    /// Label/value series for a category table.
    pub fn series(table: &CategoryTable, unit: Unit, show_unknowns: bool) -> Vec<SeriesPoint> {
        Self::visible_rows(table, show_unknowns)
            .into_iter()
            .map(|r| SeriesPoint {
                label: r.label.clone(),
                value: Self::value(r, unit),
            })
            .collect()
    }

    /// (age, value) pairs over known ages, ascending by age.
    pub fn age_series(age: &AgeTable, unit: Unit) -> Vec<(f64, f64)> {
        age.known()
            .filter_map(|r| match r.age {
                AgeKey::Year(y) => {
                    let value = match unit {
                        Unit::Percent => r.percent,
                        Unit::Count => r.count as f64,
                    };
                    Some((y as f64, value))
                }
                AgeKey::Unknown => None,
            })
            .collect()
    }
}
