//! Bundled Snapshot
//! Literal tables used when no external source is configured, and as the
//! per-table fallback when a fetch fails.

use super::table::{AgeKey, AgeRow, AgeTable, CategoryRow, CategoryTable, Dataset, TableKind};

type Row = (&'static str, &'static str, u64, f64);

const HOUSEHOLD_SIZE: [Row; 9] = [
    ("1", "1 Person", 112702, 26.75),
    ("2", "2 People", 94563, 22.45),
    ("3", "3 People", 73065, 17.34),
    ("4", "4 People", 61513, 14.60),
    ("5", "5 People", 43247, 10.27),
    ("6", "6 People", 22991, 5.46),
    ("7", "7 People", 9483, 2.25),
    ("8", "8 People", 3178, 0.75),
    ("9", "9 or more People", 512, 0.12),
];

const MARITAL_STATUS: [Row; 5] = [
    ("A", "Inferred Married", 1884, 0.45),
    ("B", "Inferred Single", 444, 0.11),
    ("M", "Married", 183131, 43.47),
    ("S", "Single", 208958, 49.60),
    ("U", "Unknown", 26837, 6.37),
];

const DWELLING_TYPE: [Row; 1] = [("S", "Single Family Dwelling Unit", 421254, 100.00)];

const GENDER: [Row; 2] = [
    ("F", "Female", 225964, 53.64),
    ("M", "Male", 195290, 46.36),
];

const PRESENCE_OF_CHILDREN: [Row; 2] = [
    ("Y", "Yes", 182598, 43.35),
    ("U", "Unknown", 238656, 56.65),
];

const INCOME: [Row; 19] = [
    ("A", "Under $10,000", 8355, 1.98),
    ("B", "$10,000 - $14,999", 22648, 5.38),
    ("C", "$15,000 - $19,999", 11623, 2.76),
    ("D", "$20,000 - $24,999", 7403, 1.76),
    ("E", "$25,000 - $29,999", 17893, 4.25),
    ("F", "$30,000 - $34,999", 9375, 2.23),
    ("G", "$35,000 - $39,999", 20246, 4.81),
    ("H", "$40,000 - $44,999", 11391, 2.70),
    ("I", "$45,000 - $49,999", 20876, 4.96),
    ("J", "$50,000 - $54,999", 12451, 2.96),
    ("K", "$55,000 - $59,999", 17267, 4.10),
    ("L", "$60,000 - $64,999", 18289, 4.34),
    ("M", "$65,000 - $74,999", 28233, 6.70),
    ("N", "$75,000 - $99,999", 69929, 16.60),
    ("O", "$100,000 - $149,999", 84627, 20.09),
    ("P", "$150,000 - $174,999", 10646, 2.53),
    ("Q", "$175,000 - $199,999", 15531, 3.69),
    ("R", "$200,000 - $249,999", 14741, 3.50),
    ("S", "$250,000+", 19730, 4.68),
];

const NET_WORTH: [Row; 10] = [
    ("A", "Least wealthy", 76659, 18.20),
    ("B", "Tier 2", 27793, 6.60),
    ("C", "Tier 3", 7547, 1.79),
    ("D", "Tier 4", 21996, 5.22),
    ("E", "Tier 5", 26268, 6.24),
    ("F", "Tier 6", 39978, 9.49),
    ("G", "Tier 7", 68801, 16.33),
    ("H", "Tier 8", 59490, 14.12),
    ("I", "Most Wealthy", 75556, 17.94),
    ("U", "Unknown", 17166, 4.07),
];

const HOME_OWNERSHIP: [Row; 4] = [
    ("H", "Highly Likely Home Owner", 1758, 0.42),
    ("P", "Probably Home Owner", 17992, 4.27),
    ("V", "Verified Home Owner", 320203, 76.01),
    ("U", "Unknown", 81301, 19.30),
];

/// (age, count, percent) by single year.
const AGE: [(u32, u64, f64); 98] = [
    (17, 7, 0.00), (18, 20, 0.00), (19, 152, 0.04), (20, 879, 0.21), (21, 1684, 0.40),
    (22, 1552, 0.37), (23, 2042, 0.48), (24, 1937, 0.46), (25, 2043, 0.48), (26, 2425, 0.58),
    (27, 3008, 0.71), (28, 3224, 0.77), (29, 4311, 1.02), (30, 5365, 1.27), (31, 6510, 1.55),
    (32, 5788, 1.37), (33, 6021, 1.43), (34, 6132, 1.46), (35, 5908, 1.40), (36, 5675, 1.35),
    (37, 5182, 1.23), (38, 5477, 1.30), (39, 5997, 1.42), (40, 6178, 1.47), (41, 6164, 1.46),
    (42, 6456, 1.53), (43, 6388, 1.52), (44, 6625, 1.57), (45, 6909, 1.64), (46, 6448, 1.53),
    (47, 6345, 1.51), (48, 6525, 1.55), (49, 6196, 1.47), (50, 6144, 1.46), (51, 6306, 1.50),
    (52, 6339, 1.50), (53, 6572, 1.56), (54, 7259, 1.72), (55, 7264, 1.72), (56, 6774, 1.61),
    (57, 6712, 1.59), (58, 6767, 1.61), (59, 6709, 1.59), (60, 7315, 1.74), (61, 7779, 1.85),
    (62, 7786, 1.85), (63, 7930, 1.88), (64, 8024, 1.90), (65, 8069, 1.92), (66, 8163, 1.94),
    (67, 7970, 1.89), (68, 8071, 1.92), (69, 7574, 1.80), (70, 7442, 1.77), (71, 7477, 1.77),
    (72, 7016, 1.67), (73, 6950, 1.65), (74, 6675, 1.58), (75, 6338, 1.50), (76, 6043, 1.43),
    (77, 6031, 1.43), (78, 6418, 1.52), (79, 4448, 1.06), (80, 4086, 0.97), (81, 4101, 0.97),
    (82, 4098, 0.97), (83, 3640, 0.86), (84, 3245, 0.77), (85, 2867, 0.68), (86, 2789, 0.66),
    (87, 2678, 0.64), (88, 2443, 0.58), (89, 2233, 0.53), (90, 2057, 0.49), (91, 1912, 0.45),
    (92, 1846, 0.44), (93, 1786, 0.42), (94, 1615, 0.38), (95, 1575, 0.37), (96, 1330, 0.32),
    (97, 1272, 0.30), (98, 1163, 0.28), (99, 1006, 0.24), (100, 942, 0.22), (101, 824, 0.20),
    (102, 692, 0.16), (103, 419, 0.10), (104, 35, 0.01), (105, 117, 0.03), (106, 314, 0.07),
    (107, 19, 0.00), (108, 12, 0.00), (109, 7, 0.00), (110, 9, 0.00), (111, 7, 0.00),
    (112, 4, 0.00), (113, 10, 0.00), (114, 3, 0.00),];

const AGE_UNKNOWN: (u64, f64) = (14160, 3.36);

fn category(kind: TableKind, rows: &[Row]) -> CategoryTable {
    CategoryTable::new(
        kind,
        rows.iter()
            .map(|&(code, label, count, percent)| CategoryRow::new(code, label, count, percent))
            .collect(),
    )
}

/// Bundled default for a single category table. `None` for the age table.
pub fn category_table(kind: TableKind) -> Option<CategoryTable> {
    let rows: &[Row] = match kind {
        TableKind::HouseholdSize => &HOUSEHOLD_SIZE,
        TableKind::MaritalStatus => &MARITAL_STATUS,
        TableKind::DwellingType => &DWELLING_TYPE,
        TableKind::Gender => &GENDER,
        TableKind::PresenceOfChildren => &PRESENCE_OF_CHILDREN,
        TableKind::Income => &INCOME,
        TableKind::NetWorth => &NET_WORTH,
        TableKind::HomeOwnership => &HOME_OWNERSHIP,
        TableKind::Age => return None,
    };
    Some(category(kind, rows))
}

pub fn age_table() -> AgeTable {
    let mut rows: Vec<AgeRow> = AGE
        .iter()
        .map(|&(age, count, percent)| AgeRow {
            age: AgeKey::Year(age),
            count,
            percent,
        })
        .collect();
    rows.push(AgeRow {
        age: AgeKey::Unknown,
        count: AGE_UNKNOWN.0,
        percent: AGE_UNKNOWN.1,
    });
    AgeTable::new(rows)
}

/// The complete bundled snapshot.
pub fn dataset() -> Dataset {
    let table = |kind| category_table(kind).unwrap_or_else(|| CategoryTable::new(kind, Vec::new()));

    let mut ds = Dataset {
        total_households: 0,
        household_size: table(TableKind::HouseholdSize),
        marital_status: table(TableKind::MaritalStatus),
        dwelling_type: table(TableKind::DwellingType),
        gender: table(TableKind::Gender),
        presence_of_children: table(TableKind::PresenceOfChildren),
        income: table(TableKind::Income),
        net_worth: table(TableKind::NetWorth),
        age: age_table(),
        home_ownership: table(TableKind::HomeOwnership),
    };
    ds.total_households = ds.derived_total();
    ds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_households() {
        let ds = dataset();
        assert_eq!(ds.total_households, 421_254);
        // Every full-population table accounts for every household
        assert_eq!(ds.gender.total_count(), 421_254);
        assert_eq!(ds.income.total_count(), 421_254);
        assert_eq!(ds.home_ownership.total_count(), 421_254);
        assert_eq!(ds.age.total_count(), 421_254);
    }

    #[test]
    fn test_percents_sum_to_roughly_100() {
        let ds = dataset();
        for kind in TableKind::ALL {
            if let Some(t) = ds.category(kind) {
                let sum = t.total_percent();
                assert!((sum - 100.0).abs() < 0.1, "{kind}: {sum}");
            }
        }
    }

    #[test]
    fn test_age_table_shape() {
        let age = age_table();
        assert_eq!(age.known_len(), 98);
        assert_eq!(age.known().next().map(|r| r.age), Some(AgeKey::Year(17)));
        assert_eq!(age.unknown().map(|r| r.count), Some(14_160));
    }

    #[test]
    fn test_age_has_no_category_table() {
        assert!(category_table(TableKind::Age).is_none());
    }
}
