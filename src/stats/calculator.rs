//! Statistics Calculator Module
//! Scalar summaries over demographic tables: mode, median bucket, rolling mean,
//! share above an age threshold, and the header KPIs.

use crate::data::{AgeKey, AgeTable, CategoryRow, CategoryTable, Dataset, Unit};
use serde::Serialize;
use statrs::statistics::Statistics;

/// Default age at which the senior share starts.
pub const SENIOR_AGE: u32 = 65;

/// Share of known ages at or above a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdShare {
    pub threshold: u32,
    /// Sum of the selected unit over qualifying ages.
    pub value: f64,
    /// Percentage of the known-age total.
    pub share_percent: f64,
}

/// Header metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub total_households: u64,
    pub with_children_percent: Option<f64>,
    pub verified_home_owners_percent: Option<f64>,
    pub top_income_label: Option<String>,
    pub top_income_percent: Option<f64>,
    pub median_income_label: Option<String>,
    pub age_unknown_count: Option<u64>,
    pub age_unknown_percent: Option<f64>,
}

pub struct StatsCalculator;

impl StatsCalculator {
    /// Row with the largest count. Ties go to the earlier row.
    pub fn value_mode(table: &CategoryTable) -> Option<&CategoryRow> {
        table
            .rows
            .iter()
            .fold(None, |best: Option<&CategoryRow>, row| match best {
                Some(b) if b.count >= row.count => Some(b),
                _ => Some(row),
            })
    }

    /// Label of the bucket holding the median household, walking rows in
    /// category order.
    pub fn median_bucket(table: &CategoryTable) -> Option<&str> {
        let total = table.total_count();
        if total == 0 {
            return None;
        }
        let half = total as f64 / 2.0;

        let mut cum = 0u64;
        table
            .rows
            .iter()
            .find(|r| {
                cum += r.count;
                cum as f64 >= half
            })
            .map(|r| r.label.as_str())
    }

    /// Centered rolling mean with `min_periods = 1`.
    ///
    /// Edge windows are clipped to the available values. Even windows are
    /// widened to the next odd size so the window stays centered.
    pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
        if window <= 1 || values.is_empty() {
            return values.to_vec();
        }
        let half = window / 2;
        let n = values.len();

        (0..n)
            .map(|i| {
                let lo = i.saturating_sub(half);
                let hi = (i + half).min(n - 1);
                values[lo..=hi].iter().mean()
            })
            .collect()
    }

    /// Sum and share of the selected unit over known ages >= `threshold`.
    pub fn share_at_or_above(age: &AgeTable, threshold: u32, unit: Unit) -> Option<ThresholdShare> {
        let pick = |r: &crate::data::AgeRow| match unit {
            Unit::Percent => r.percent,
            Unit::Count => r.count as f64,
        };

        let mut total = 0.0;
        let mut above = 0.0;
        let mut any_above = false;
        for row in age.known() {
            let v = pick(row);
            total += v;
            if let AgeKey::Year(y) = row.age {
                if y >= threshold {
                    above += v;
                    any_above = true;
                }
            }
        }

        if !any_above || total <= 0.0 {
            return None;
        }

        Some(ThresholdShare {
            threshold,
            value: above,
            share_percent: above / total * 100.0,
        })
    }

    pub fn compute_kpis(ds: &Dataset) -> Kpis {
        let with_children_percent = ds.presence_of_children.find_code("Y").map(|r| r.percent);

        let verified_home_owners_percent = ds
            .home_ownership
            .find_code("V")
            .filter(|_| ds.total_households > 0)
            .map(|r| r.count as f64 / ds.total_households as f64 * 100.0);

        let top = Self::value_mode(&ds.income);

        Kpis {
            total_households: ds.total_households,
            with_children_percent,
            verified_home_owners_percent,
            top_income_label: top.map(|r| r.label.clone()),
            top_income_percent: top.map(|r| r.percent),
            median_income_label: Self::median_bucket(&ds.income).map(str::to_string),
            age_unknown_count: ds.age.unknown().map(|r| r.count),
            age_unknown_percent: ds.age.unknown().map(|r| r.percent),
        }
    }
}

/// Two-decimal percent text.
pub fn tidy_percent(x: f64) -> String {
    format!("{:.2}%", x)
}

/// Thousands-separated integer text (`421,254`).
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{bundled, AgeRow, TableKind};

    fn table(counts: &[u64]) -> CategoryTable {
        CategoryTable::new(
            TableKind::Income,
            counts
                .iter()
                .enumerate()
                .map(|(i, &c)| CategoryRow::new(i.to_string(), format!("B{i}"), c, 0.0))
                .collect(),
        )
    }

    #[test]
    fn test_value_mode() {
        let ds = bundled::dataset();
        let top = StatsCalculator::value_mode(&ds.income).map(|r| r.label.as_str());
        assert_eq!(top, Some("$100,000 - $149,999"));

        // Ties keep the first row
        let t = table(&[5, 9, 9, 1]);
        assert_eq!(StatsCalculator::value_mode(&t).map(|r| r.label.as_str()), Some("B1"));
        assert!(StatsCalculator::value_mode(&table(&[])).is_none());
    }

    #[test]
    fn test_median_bucket() {
        let ds = bundled::dataset();
        assert_eq!(
            StatsCalculator::median_bucket(&ds.income),
            Some("$75,000 - $99,999")
        );

        // Cumulative count hits exactly half on the second bucket
        assert_eq!(StatsCalculator::median_bucket(&table(&[2, 3, 5])), Some("B1"));
        assert_eq!(StatsCalculator::median_bucket(&table(&[0, 0])), None);
    }

    #[test]
    fn test_rolling_mean_identity() {
        let v = [1.0, 2.0, 3.0];
        assert_eq!(StatsCalculator::rolling_mean(&v, 1), v.to_vec());
        assert!(StatsCalculator::rolling_mean(&[], 3).is_empty());
    }

    #[test]
    fn test_rolling_mean_centered_with_clipped_edges() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        let out = StatsCalculator::rolling_mean(&v, 3);
        assert_eq!(out, vec![1.5, 2.0, 3.0, 4.0, 4.5]);

        let out = StatsCalculator::rolling_mean(&v, 5);
        assert_eq!(out, vec![2.0, 2.5, 3.0, 3.5, 4.0]);
    }

    #[test]
    fn test_rolling_mean_window_wider_than_input() {
        let out = StatsCalculator::rolling_mean(&[2.0, 4.0], 9);
        assert_eq!(out, vec![3.0, 3.0]);
    }

    #[test]
    fn test_share_at_or_above() {
        let ds = bundled::dataset();
        let share = StatsCalculator::share_at_or_above(&ds.age, SENIOR_AGE, Unit::Count)
            .expect("seniors present");
        assert_eq!(share.value, 155_841.0);
        assert!((share.share_percent - 38.28).abs() < 0.01, "{}", share.share_percent);

        assert!(StatsCalculator::share_at_or_above(&ds.age, 200, Unit::Percent).is_none());
    }

    #[test]
    fn test_share_ignores_unknown_bucket() {
        let age = AgeTable::new(vec![
            AgeRow { age: AgeKey::Year(40), count: 50, percent: 50.0 },
            AgeRow { age: AgeKey::Year(70), count: 50, percent: 50.0 },
            AgeRow { age: AgeKey::Unknown, count: 900, percent: 0.0 },
        ]);
        let share = StatsCalculator::share_at_or_above(&age, 65, Unit::Count);
        assert_eq!(share.map(|s| s.share_percent), Some(50.0));
    }

    #[test]
    fn test_kpis() {
        let kpis = StatsCalculator::compute_kpis(&bundled::dataset());
        assert_eq!(kpis.total_households, 421_254);
        assert_eq!(kpis.with_children_percent, Some(43.35));
        assert_eq!(
            kpis.verified_home_owners_percent.map(tidy_percent).as_deref(),
            Some("76.01%")
        );
        assert_eq!(kpis.top_income_percent, Some(20.09));
        assert_eq!(kpis.age_unknown_count, Some(14_160));
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(421_254), "421,254");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }

    #[test]
    fn test_tidy_percent() {
        assert_eq!(tidy_percent(43.35), "43.35%");
        assert_eq!(tidy_percent(0.0), "0.00%");
    }
}
