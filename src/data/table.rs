//! Demographic Table Types
//! Category tables, the single-year age table, and the dataset that holds them.

use serde::Serialize;
use std::fmt;

/// Label used by every table for its catch-all bucket.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// The nine tables shown by the dashboard, in export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TableKind {
    HouseholdSize,
    MaritalStatus,
    DwellingType,
    Gender,
    PresenceOfChildren,
    Income,
    NetWorth,
    Age,
    HomeOwnership,
}

impl TableKind {
    pub const ALL: [TableKind; 9] = [
        TableKind::HouseholdSize,
        TableKind::MaritalStatus,
        TableKind::DwellingType,
        TableKind::Gender,
        TableKind::PresenceOfChildren,
        TableKind::Income,
        TableKind::NetWorth,
        TableKind::Age,
        TableKind::HomeOwnership,
    ];

    /// File stem used for CSV export and for remote/directory sources.
    pub fn stem(self) -> &'static str {
        match self {
            TableKind::HouseholdSize => "household_size",
            TableKind::MaritalStatus => "marital_status",
            TableKind::DwellingType => "dwelling_type",
            TableKind::Gender => "gender",
            TableKind::PresenceOfChildren => "presence_children",
            TableKind::Income => "income",
            TableKind::NetWorth => "networth",
            TableKind::Age => "age",
            TableKind::HomeOwnership => "home_ownership",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.csv", self.stem())
    }

    pub fn title(self) -> &'static str {
        match self {
            TableKind::HouseholdSize => "Household Size",
            TableKind::MaritalStatus => "Marital Status",
            TableKind::DwellingType => "Dwelling Type",
            TableKind::Gender => "Gender",
            TableKind::PresenceOfChildren => "Presence of Children",
            TableKind::Income => "Estimated Household Income",
            TableKind::NetWorth => "Net Worth",
            TableKind::Age => "Age",
            TableKind::HomeOwnership => "Home Ownership",
        }
    }

    /// Buckets with an inherent order (income and net worth ranges).
    /// Rows of these tables always follow the bundled category order.
    pub fn is_ordered(self) -> bool {
        matches!(self, TableKind::Income | TableKind::NetWorth)
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// One category of a demographic table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRow {
    pub code: String,
    pub label: String,
    pub count: u64,
    pub percent: f64,
}

impl CategoryRow {
    pub fn new(code: impl Into<String>, label: impl Into<String>, count: u64, percent: f64) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
            count,
            percent,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.label == UNKNOWN_LABEL
    }
}

/// A Code/Label/Count/Percent table. Row order is category order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTable {
    pub kind: TableKind,
    pub rows: Vec<CategoryRow>,
}

impl CategoryTable {
    pub fn new(kind: TableKind, rows: Vec<CategoryRow>) -> Self {
        Self { kind, rows }
    }

    pub fn total_count(&self) -> u64 {
        self.rows.iter().map(|r| r.count).sum()
    }

    pub fn total_percent(&self) -> f64 {
        self.rows.iter().map(|r| r.percent).sum()
    }

    pub fn find_code(&self, code: &str) -> Option<&CategoryRow> {
        self.rows.iter().find(|r| r.code == code)
    }

    pub fn has_unknown(&self) -> bool {
        self.rows.iter().any(CategoryRow::is_unknown)
    }
}

/// Age key: a single year or the literal "Unknown".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AgeKey {
    Year(u32),
    Unknown,
}

impl AgeKey {
    pub fn parse(raw: &str) -> Option<AgeKey> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case(UNKNOWN_LABEL) {
            return Some(AgeKey::Unknown);
        }
        raw.parse::<u32>().ok().map(AgeKey::Year)
    }
}

impl fmt::Display for AgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgeKey::Year(y) => write!(f, "{y}"),
            AgeKey::Unknown => f.write_str(UNKNOWN_LABEL),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeRow {
    pub age: AgeKey,
    pub count: u64,
    pub percent: f64,
}

/// Single-year age distribution. Known years are kept sorted; the unknown
/// bucket is held apart so it never lands on the age axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeTable {
    known: Vec<(u32, AgeRow)>,
    unknown: Option<AgeRow>,
}

impl AgeTable {
    pub fn new(rows: Vec<AgeRow>) -> Self {
        let mut known = Vec::with_capacity(rows.len());
        let mut unknown: Option<AgeRow> = None;

        for row in rows {
            match row.age {
                AgeKey::Year(y) => known.push((y, row)),
                AgeKey::Unknown => {
                    // Several unknown rows collapse into one bucket
                    unknown = Some(match unknown {
                        Some(prev) => AgeRow {
                            age: AgeKey::Unknown,
                            count: prev.count + row.count,
                            percent: prev.percent + row.percent,
                        },
                        None => row,
                    });
                }
            }
        }

        known.sort_by_key(|(y, _)| *y);
        Self { known, unknown }
    }

    /// Known-age rows, sorted by year.
    pub fn known(&self) -> impl Iterator<Item = &AgeRow> + '_ {
        self.known.iter().map(|(_, r)| r)
    }

    pub fn known_len(&self) -> usize {
        self.known.len()
    }

    pub fn unknown(&self) -> Option<&AgeRow> {
        self.unknown.as_ref()
    }

    /// Known rows followed by the unknown bucket, as exported.
    pub fn all_rows(&self) -> Vec<AgeRow> {
        self.known()
            .cloned()
            .chain(self.unknown.iter().cloned())
            .collect()
    }

    pub fn total_count(&self) -> u64 {
        self.known().map(|r| r.count).sum::<u64>() + self.unknown.as_ref().map_or(0, |r| r.count)
    }
}

/// The full snapshot for a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub total_households: u64,
    pub household_size: CategoryTable,
    pub marital_status: CategoryTable,
    pub dwelling_type: CategoryTable,
    pub gender: CategoryTable,
    pub presence_of_children: CategoryTable,
    pub income: CategoryTable,
    pub net_worth: CategoryTable,
    pub age: AgeTable,
    pub home_ownership: CategoryTable,
}

impl Dataset {
    /// Category table for `kind`; `None` for the age table.
    pub fn category(&self, kind: TableKind) -> Option<&CategoryTable> {
        match kind {
            TableKind::HouseholdSize => Some(&self.household_size),
            TableKind::MaritalStatus => Some(&self.marital_status),
            TableKind::DwellingType => Some(&self.dwelling_type),
            TableKind::Gender => Some(&self.gender),
            TableKind::PresenceOfChildren => Some(&self.presence_of_children),
            TableKind::Income => Some(&self.income),
            TableKind::NetWorth => Some(&self.net_worth),
            TableKind::HomeOwnership => Some(&self.home_ownership),
            TableKind::Age => None,
        }
    }

    pub fn category_mut(&mut self, kind: TableKind) -> Option<&mut CategoryTable> {
        match kind {
            TableKind::HouseholdSize => Some(&mut self.household_size),
            TableKind::MaritalStatus => Some(&mut self.marital_status),
            TableKind::DwellingType => Some(&mut self.dwelling_type),
            TableKind::Gender => Some(&mut self.gender),
            TableKind::PresenceOfChildren => Some(&mut self.presence_of_children),
            TableKind::Income => Some(&mut self.income),
            TableKind::NetWorth => Some(&mut self.net_worth),
            TableKind::HomeOwnership => Some(&mut self.home_ownership),
            TableKind::Age => None,
        }
    }

    /// Household total implied by the dwelling-type table.
    pub fn derived_total(&self) -> u64 {
        self.dwelling_type.total_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_file_names_are_unique() {
        let mut names: Vec<String> = TableKind::ALL.iter().map(|k| k.file_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), TableKind::ALL.len());
        assert_eq!(TableKind::NetWorth.file_name(), "networth.csv");
        assert!(TableKind::Income.is_ordered());
        assert!(!TableKind::Gender.is_ordered());
    }

    #[test]
    fn test_age_key_parse() {
        assert_eq!(AgeKey::parse("42"), Some(AgeKey::Year(42)));
        assert_eq!(AgeKey::parse(" Unknown "), Some(AgeKey::Unknown));
        assert_eq!(AgeKey::parse("unknown"), Some(AgeKey::Unknown));
        assert_eq!(AgeKey::parse("-3"), None);
        assert_eq!(AgeKey::parse("forty"), None);
    }

    #[test]
    fn test_age_table_sorts_and_separates_unknown() {
        let table = AgeTable::new(vec![
            AgeRow { age: AgeKey::Year(30), count: 3, percent: 30.0 },
            AgeRow { age: AgeKey::Unknown, count: 1, percent: 10.0 },
            AgeRow { age: AgeKey::Year(20), count: 6, percent: 60.0 },
        ]);

        let years: Vec<AgeKey> = table.known().map(|r| r.age).collect();
        assert_eq!(years, vec![AgeKey::Year(20), AgeKey::Year(30)]);
        assert_eq!(table.unknown().map(|r| r.count), Some(1));
        assert_eq!(table.total_count(), 10);

        let exported = table.all_rows();
        assert_eq!(exported.last().map(|r| r.age), Some(AgeKey::Unknown));
    }

    #[test]
    fn test_category_table_helpers() {
        let table = CategoryTable::new(
            TableKind::PresenceOfChildren,
            vec![
                CategoryRow::new("Y", "Yes", 40, 40.0),
                CategoryRow::new("U", "Unknown", 60, 60.0),
            ],
        );
        assert!(table.has_unknown());
        assert_eq!(table.total_count(), 100);
        assert_eq!(table.find_code("Y").map(|r| r.label.as_str()), Some("Yes"));
        assert!(table.find_code("N").is_none());
    }
}
