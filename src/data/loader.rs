//! Table Loader Module
//! Reads demographic tables from the bundled snapshot, a CSV directory, or a
//! spreadsheet published as CSV. Failed tables fall back to the bundled copy.

use super::bundled;
use super::table::{AgeKey, AgeRow, AgeTable, CategoryRow, CategoryTable, Dataset, TableKind};
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to parse CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to fetch {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Missing column '{0}'")]
    MissingColumn(&'static str),
    #[error("Row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },
    #[error("Table is empty")]
    Empty,
    #[error("HTTP client unavailable: {0}")]
    Client(String),
}

/// Where tables come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DataSource {
    #[default]
    Bundled,
    /// One CSV per table, named by `TableKind::file_name`.
    Directory { path: PathBuf },
    /// Published spreadsheet; `{table}` is replaced by the table stem.
    Remote { url_template: String },
}

impl DataSource {
    pub fn describe(&self) -> String {
        match self {
            DataSource::Bundled => "bundled snapshot".to_string(),
            DataSource::Directory { path } => format!("directory {}", path.display()),
            DataSource::Remote { url_template } => format!("remote {}", url_template),
        }
    }

    pub fn table_url(url_template: &str, kind: TableKind) -> String {
        url_template.replace("{table}", kind.stem())
    }
}

/// A table that was replaced by its bundled default.
#[derive(Debug, Clone, PartialEq)]
pub struct Fallback {
    pub kind: TableKind,
    pub reason: String,
}

/// Result of a load: the dataset plus any per-table fallbacks.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub dataset: Arc<Dataset>,
    pub source: DataSource,
    pub fallbacks: Vec<Fallback>,
}

/// Parsed form of one fetched table.
enum Parsed {
    Category(CategoryTable),
    Age(AgeTable),
}

/// Loads a dataset from a configured source.
pub struct DataLoader {
    source: DataSource,
    total_override: Option<u64>,
    timeout: Duration,
}

impl DataLoader {
    pub fn new(source: DataSource) -> Self {
        Self {
            source,
            total_override: None,
            timeout: Duration::from_secs(20),
        }
    }

    pub fn with_total_override(mut self, total: Option<u64>) -> Self {
        self.total_override = total;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    /// Load every table. Never fails as a whole: any table that cannot be
    /// fetched or parsed is replaced by its bundled default.
    pub fn load(&self) -> LoadReport {
        info!(source = %self.source.describe(), "loading tables");

        let mut dataset = bundled::dataset();
        let mut fallbacks = Vec::new();

        if self.source != DataSource::Bundled {
            let client = match &self.source {
                DataSource::Remote { .. } => Some(
                    reqwest::blocking::Client::builder()
                        .timeout(self.timeout)
                        .build()
                        .map_err(|e| e.to_string()),
                ),
                _ => None,
            };
            if let Some(Err(e)) = &client {
                warn!("http client unavailable, every table uses bundled rows: {e}");
            }

            let results: Vec<(TableKind, Result<Parsed, LoaderError>)> = TableKind::ALL
                .par_iter()
                .map(|&kind| {
                    let parsed = self
                        .fetch_bytes(kind, client.as_ref())
                        .and_then(|bytes| parse_table(kind, bytes));
                    (kind, parsed)
                })
                .collect();

            for (kind, result) in results {
                match result {
                    Ok(Parsed::Category(table)) => {
                        debug!(table = kind.stem(), rows = table.rows.len(), "loaded");
                        if let Some(slot) = dataset.category_mut(kind) {
                            *slot = table;
                        }
                    }
                    Ok(Parsed::Age(age)) => {
                        debug!(table = kind.stem(), rows = age.known_len(), "loaded");
                        dataset.age = age;
                    }
                    Err(e) => {
                        warn!(table = kind.stem(), "falling back to bundled table: {e}");
                        fallbacks.push(Fallback {
                            kind,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        dataset.total_households = self.total_override.unwrap_or_else(|| dataset.derived_total());
        info!(
            total = dataset.total_households,
            fallbacks = fallbacks.len(),
            "tables ready"
        );

        LoadReport {
            dataset: Arc::new(dataset),
            source: self.source.clone(),
            fallbacks,
        }
    }

    fn fetch_bytes(
        &self,
        kind: TableKind,
        client: Option<&Result<reqwest::blocking::Client, String>>,
    ) -> Result<Vec<u8>, LoaderError> {
        match &self.source {
            DataSource::Bundled => Err(LoaderError::Empty),
            DataSource::Directory { path } => {
                let file = path.join(kind.file_name());
                std::fs::read(&file).map_err(|source| LoaderError::Io { path: file, source })
            }
            DataSource::Remote { url_template } => {
                let url = DataSource::table_url(url_template, kind);
                let http = |source| LoaderError::Http {
                    url: url.clone(),
                    source,
                };
                let client = match client {
                    Some(Ok(c)) => c,
                    Some(Err(e)) => return Err(LoaderError::Client(e.clone())),
                    None => return Err(LoaderError::Client("not built".to_string())),
                };
                let resp = client
                    .get(&url)
                    .send()
                    .and_then(|r| r.error_for_status())
                    .map_err(http)?;
                let bytes = resp.bytes().map_err(http)?;
                Ok(bytes.to_vec())
            }
        }
    }
}

fn parse_table(kind: TableKind, bytes: Vec<u8>) -> Result<Parsed, LoaderError> {
    let df = read_csv(bytes)?;
    if df.height() == 0 {
        return Err(LoaderError::Empty);
    }
    match kind {
        TableKind::Age => parse_age_table(&df).map(Parsed::Age),
        _ => parse_category_table(kind, &df).map(Parsed::Category),
    }
}

fn read_csv(bytes: Vec<u8>) -> Result<DataFrame, LoaderError> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(10000))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;
    Ok(df)
}

fn string_column(df: &DataFrame, name: &'static str) -> Result<Vec<Option<String>>, LoaderError> {
    let col = df.column(name).map_err(|_| LoaderError::MissingColumn(name))?;
    let col = col.cast(&DataType::String)?;
    Ok(col
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.trim().to_string()))
        .collect())
}

/// Parse a display-formatted number such as `112,702` or `26.75%`.
fn parse_display_number(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let raw = raw.strip_suffix('%').unwrap_or(raw).trim_end();
    let digits: String = raw.chars().filter(|&c| c != ',').collect();
    digits.parse().ok()
}

fn float_column(df: &DataFrame, name: &'static str) -> Result<Vec<Option<f64>>, LoaderError> {
    let col = df.column(name).map_err(|_| LoaderError::MissingColumn(name))?;
    if col.dtype() == &DataType::String {
        return Ok(col
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_display_number))
            .collect());
    }
    let col = col.cast(&DataType::Float64)?;
    Ok(col.f64()?.into_iter().collect())
}

fn check_count(row: usize, count: Option<f64>) -> Result<u64, LoaderError> {
    match count {
        Some(c) if c >= 0.0 && c.fract() == 0.0 => Ok(c as u64),
        other => Err(LoaderError::InvalidRow {
            row,
            reason: format!("Count must be a non-negative integer, got {other:?}"),
        }),
    }
}

fn check_percent(row: usize, percent: Option<f64>) -> Result<f64, LoaderError> {
    match percent {
        Some(p) if (0.0..=100.0).contains(&p) => Ok(p),
        other => Err(LoaderError::InvalidRow {
            row,
            reason: format!("Percent must be within 0..=100, got {other:?}"),
        }),
    }
}

fn parse_category_table(kind: TableKind, df: &DataFrame) -> Result<CategoryTable, LoaderError> {
    let codes = string_column(df, "Code")?;
    let labels = string_column(df, "Label")?;
    let counts = float_column(df, "Count")?;
    let percents = float_column(df, "Percent")?;

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let label = labels[i].clone().filter(|l| !l.is_empty()).ok_or_else(|| {
            LoaderError::InvalidRow {
                row: i,
                reason: "Label is empty".to_string(),
            }
        })?;
        rows.push(CategoryRow {
            code: codes[i].clone().unwrap_or_default(),
            label,
            count: check_count(i, counts[i])?,
            percent: check_percent(i, percents[i])?,
        });
    }

    if kind.is_ordered() {
        rows = in_category_order(kind, rows);
    }
    Ok(CategoryTable::new(kind, rows))
}

/// Arrange rows by the bundled category order, matching on code. Rows with
/// codes the snapshot does not know keep their file order at the end.
fn in_category_order(kind: TableKind, rows: Vec<CategoryRow>) -> Vec<CategoryRow> {
    let Some(reference) = bundled::category_table(kind) else {
        return rows;
    };
    let rank = |row: &CategoryRow| {
        reference
            .rows
            .iter()
            .position(|r| r.code == row.code)
            .unwrap_or(reference.rows.len())
    };
    let mut rows = rows;
    // Stable sort keeps unrecognised codes in file order
    rows.sort_by_key(rank);
    rows
}

fn parse_age_table(df: &DataFrame) -> Result<AgeTable, LoaderError> {
    let ages = string_column(df, "Age")?;
    let counts = float_column(df, "Count")?;
    let percents = float_column(df, "Percent")?;

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let age = ages[i]
            .as_deref()
            .and_then(AgeKey::parse)
            .ok_or_else(|| LoaderError::InvalidRow {
                row: i,
                reason: format!("Age must be a year or 'Unknown', got {:?}", ages[i]),
            })?;
        rows.push(AgeRow {
            age,
            count: check_count(i, counts[i])?,
            percent: check_percent(i, percents[i])?,
        });
    }

    Ok(AgeTable::new(rows))
}

/// Memoises the last load per source for a fixed time-to-live.
pub struct TableCache {
    ttl: Duration,
    entry: Option<CacheEntry>,
}

struct CacheEntry {
    source: DataSource,
    loaded_at: Instant,
    report: LoadReport,
}

impl TableCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    /// Cached report for `source` if still fresh.
    pub fn get(&self, source: &DataSource) -> Option<&LoadReport> {
        self.entry
            .as_ref()
            .filter(|e| &e.source == source && e.loaded_at.elapsed() < self.ttl)
            .map(|e| &e.report)
    }

    pub fn put(&mut self, report: LoadReport) {
        self.entry = Some(CacheEntry {
            source: report.source.clone(),
            loaded_at: Instant::now(),
            report,
        });
    }

    /// Fresh cached report, or the result of `load` (which is then cached).
    pub fn get_or_load<F>(&mut self, source: &DataSource, load: F) -> LoadReport
    where
        F: FnOnce() -> LoadReport,
    {
        if let Some(hit) = self.get(source) {
            debug!(source = %source.describe(), "cache hit");
            return hit.clone();
        }
        let report = load();
        self.put(report.clone());
        report
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    fn write(dir: &std::path::Path, kind: TableKind, body: &str) {
        fs::write(dir.join(kind.file_name()), body).unwrap();
    }

    #[test]
    fn test_parse_category_csv_with_integer_codes() {
        let csv = "Code,Label,Count,Percent\n1,1 Person,60,60.0\n2,2 People,40,40.0\n";
        let Parsed::Category(t) = parse_table(TableKind::HouseholdSize, csv.as_bytes().to_vec())
            .unwrap()
        else {
            panic!("expected category table");
        };
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.rows[0].code, "1");
        assert_eq!(t.rows[1].label, "2 People");
        assert_eq!(t.rows[1].count, 40);
    }

    #[test]
    fn test_parse_age_csv_with_unknown() {
        let csv = "Age,Count,Percent\n30,10,50.0\nUnknown,5,25.0\n20,5,25.0\n";
        let Parsed::Age(age) = parse_table(TableKind::Age, csv.as_bytes().to_vec()).unwrap() else {
            panic!("expected age table");
        };
        assert_eq!(age.known_len(), 2);
        assert_eq!(age.known().next().map(|r| r.age), Some(AgeKey::Year(20)));
        assert_eq!(age.unknown().map(|r| r.count), Some(5));
    }

    #[test]
    fn test_parse_rejects_bad_rows() {
        let missing = "Code,Label,Count\nA,Yes,1\n";
        assert!(matches!(
            parse_table(TableKind::Gender, missing.as_bytes().to_vec()),
            Err(LoaderError::MissingColumn("Percent"))
        ));

        let negative = "Code,Label,Count,Percent\nA,Yes,-1,10.0\n";
        assert!(matches!(
            parse_table(TableKind::Gender, negative.as_bytes().to_vec()),
            Err(LoaderError::InvalidRow { row: 0, .. })
        ));

        let over = "Code,Label,Count,Percent\nA,Yes,1,140.0\n";
        assert!(parse_table(TableKind::Gender, over.as_bytes().to_vec()).is_err());
    }

    #[test]
    fn test_bundled_source_has_no_fallbacks() {
        let report = DataLoader::new(DataSource::Bundled).load();
        assert!(report.fallbacks.is_empty());
        assert_eq!(report.dataset.total_households, 421_254);
    }

    #[test]
    fn test_directory_source_with_partial_fallback() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            TableKind::DwellingType,
            "Code,Label,Count,Percent\nS,Single Family Dwelling Unit,1000,100.0\n",
        );
        write(
            dir.path(),
            TableKind::Gender,
            "Code,Label,Count,Percent\nF,Female,600,60.0\nM,Male,400,40.0\n",
        );
        write(dir.path(), TableKind::Income, "not,a,table\n");

        let report = DataLoader::new(DataSource::Directory {
            path: dir.path().to_path_buf(),
        })
        .load();

        assert_eq!(report.dataset.gender.rows[0].count, 600);
        assert_eq!(report.dataset.total_households, 1000);
        // Missing and malformed tables keep their bundled rows
        assert_eq!(report.dataset.income.rows.len(), 19);
        let failed: Vec<TableKind> = report.fallbacks.iter().map(|f| f.kind).collect();
        assert!(failed.contains(&TableKind::Income));
        assert!(failed.contains(&TableKind::Age));
        assert!(!failed.contains(&TableKind::Gender));
        assert_eq!(failed.len(), 7);
    }

    #[test]
    fn test_total_override() {
        let report = DataLoader::new(DataSource::Bundled)
            .with_total_override(Some(5))
            .load();
        assert_eq!(report.dataset.total_households, 5);
    }

    #[test]
    fn test_table_url() {
        let url = DataSource::table_url("https://example.com/sheet?name={table}", TableKind::NetWorth);
        assert_eq!(url, "https://example.com/sheet?name=networth");
    }

    #[test]
    fn test_ordered_tables_follow_category_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut ds = bundled::dataset();
        ds.income.rows.sort_by(|a, b| b.count.cmp(&a.count));
        let csv = crate::data::CsvExporter::to_csv(&ds, TableKind::Income).unwrap();
        fs::write(dir.path().join(TableKind::Income.file_name()), csv).unwrap();

        let report = DataLoader::new(DataSource::Directory {
            path: dir.path().to_path_buf(),
        })
        .load();

        assert!(!report.fallbacks.iter().any(|f| f.kind == TableKind::Income));
        assert_eq!(report.dataset.income, bundled::dataset().income);
        assert_eq!(
            crate::stats::StatsCalculator::median_bucket(&report.dataset.income),
            Some("$75,000 - $99,999")
        );
    }

    #[test]
    fn test_unrecognised_codes_go_last() {
        let csv = "Code,Label,Count,Percent\nZ,Mystery,1,1.0\nB,Second,2,2.0\nA,First,3,3.0\n";
        let Parsed::Category(t) = parse_table(TableKind::NetWorth, csv.as_bytes().to_vec()).unwrap()
        else {
            panic!("expected category table");
        };
        let codes: Vec<&str> = t.rows.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, ["A", "B", "Z"]);

        // Unordered tables keep file order
        let csv = "Code,Label,Count,Percent\nM,Male,1,50.0\nF,Female,1,50.0\n";
        let Parsed::Category(t) = parse_table(TableKind::Gender, csv.as_bytes().to_vec()).unwrap()
        else {
            panic!("expected category table");
        };
        assert_eq!(t.rows[0].code, "M");
    }

    #[test]
    fn test_display_formatted_numbers() {
        let csv = "Code,Label,Count,Percent\nF,Female,\"112,702\",26.75%\nM,Male,\"1,000\",73.25%\n";
        let Parsed::Category(t) = parse_table(TableKind::Gender, csv.as_bytes().to_vec()).unwrap()
        else {
            panic!("expected category table");
        };
        assert_eq!(t.rows[0].count, 112_702);
        assert_eq!(t.rows[0].percent, 26.75);
        assert_eq!(t.rows[1].count, 1_000);

        assert_eq!(parse_display_number(" 3.5 % "), Some(3.5));
        assert_eq!(parse_display_number("n/a"), None);
    }

    /// Serves `gender` and answers 404 for every other table.
    fn serve_gender_only() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                let mut header = String::new();
                while reader.read_line(&mut header).unwrap_or(0) > 2 {
                    header.clear();
                }

                let response = if request_line.contains("/tables/gender.csv") {
                    let body = "Code,Label,Count,Percent\nF,Female,70,70.0\nM,Male,30,30.0\n";
                    format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: text/csv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    )
                } else {
                    "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                        .to_string()
                };
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{addr}/tables/{{table}}.csv")
    }

    #[test]
    fn test_remote_source_falls_back_on_http_errors() {
        let url_template = serve_gender_only();
        let report = DataLoader::new(DataSource::Remote { url_template })
            .with_timeout(Duration::from_secs(5))
            .load();

        assert_eq!(report.dataset.gender.rows[0].count, 70);
        let failed: Vec<TableKind> = report.fallbacks.iter().map(|f| f.kind).collect();
        assert_eq!(failed.len(), TableKind::ALL.len() - 1);
        assert!(!failed.contains(&TableKind::Gender));
        let income = report
            .fallbacks
            .iter()
            .find(|f| f.kind == TableKind::Income)
            .unwrap();
        assert!(income.reason.contains("404"), "{}", income.reason);
        assert!(income.reason.contains("/tables/income.csv"), "{}", income.reason);
        assert_eq!(report.dataset.income, bundled::dataset().income);
    }

    #[test]
    fn test_remote_timeout_falls_back() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and hold connections without ever answering
        thread::spawn(move || {
            let mut held = Vec::new();
            for stream in listener.incoming().flatten() {
                held.push(stream);
            }
        });

        let report = DataLoader::new(DataSource::Remote {
            url_template: format!("http://{addr}/{{table}}"),
        })
        .with_timeout(Duration::from_millis(300))
        .load();

        assert_eq!(report.fallbacks.len(), TableKind::ALL.len());
        assert_eq!(*report.dataset, bundled::dataset());
    }

    #[test]
    fn test_missing_client_is_a_fallback_not_a_panic() {
        let loader = DataLoader::new(DataSource::Remote {
            url_template: "http://127.0.0.1:9/{table}".to_string(),
        });
        let broken: Result<reqwest::blocking::Client, String> = Err("tls backend".to_string());
        assert!(matches!(
            loader.fetch_bytes(TableKind::Gender, Some(&broken)),
            Err(LoaderError::Client(reason)) if reason == "tls backend"
        ));
        assert!(matches!(
            loader.fetch_bytes(TableKind::Gender, None),
            Err(LoaderError::Client(_))
        ));
    }

    #[test]
    fn test_cache_hits_until_invalidated() {
        let calls = Cell::new(0);
        let load = || {
            calls.set(calls.get() + 1);
            DataLoader::new(DataSource::Bundled).load()
        };
        let mut cache = TableCache::new(Duration::from_secs(60));

        cache.get_or_load(&DataSource::Bundled, load);
        cache.get_or_load(&DataSource::Bundled, load);
        assert_eq!(calls.get(), 1);

        cache.invalidate();
        cache.get_or_load(&DataSource::Bundled, load);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_cache_keyed_by_source_and_ttl() {
        let mut cache = TableCache::new(Duration::from_secs(60));
        cache.put(DataLoader::new(DataSource::Bundled).load());
        let other = DataSource::Directory {
            path: PathBuf::from("/nonexistent"),
        };
        assert!(cache.get(&DataSource::Bundled).is_some());
        assert!(cache.get(&other).is_none());

        let mut expired = TableCache::new(Duration::ZERO);
        expired.put(DataLoader::new(DataSource::Bundled).load());
        assert!(expired.get(&DataSource::Bundled).is_none());
    }
}
