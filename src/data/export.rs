//! CSV Export Module
//! Serialises tables to CSV with Polars and bundles them into a zip archive.

use super::table::{AgeTable, CategoryTable, Dataset, TableKind};
use polars::prelude::*;
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use ::zip::write::FileOptions;
use ::zip::ZipWriter;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV encoding failed: {0}")]
    Polars(#[from] PolarsError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] ::zip::result::ZipError),
}

pub struct CsvExporter;

impl CsvExporter {
    fn category_frame(table: &CategoryTable) -> PolarsResult<DataFrame> {
        let codes: Vec<&str> = table.rows.iter().map(|r| r.code.as_str()).collect();
        let labels: Vec<&str> = table.rows.iter().map(|r| r.label.as_str()).collect();
        let counts: Vec<u64> = table.rows.iter().map(|r| r.count).collect();
        let percents: Vec<f64> = table.rows.iter().map(|r| r.percent).collect();

        DataFrame::new(vec![
            Column::new("Code".into(), codes),
            Column::new("Label".into(), labels),
            Column::new("Count".into(), counts),
            Column::new("Percent".into(), percents),
        ])
    }

    fn age_frame(age: &AgeTable) -> PolarsResult<DataFrame> {
        let rows = age.all_rows();
        let ages: Vec<String> = rows.iter().map(|r| r.age.to_string()).collect();
        let counts: Vec<u64> = rows.iter().map(|r| r.count).collect();
        let percents: Vec<f64> = rows.iter().map(|r| r.percent).collect();

        DataFrame::new(vec![
            Column::new("Age".into(), ages),
            Column::new("Count".into(), counts),
            Column::new("Percent".into(), percents),
        ])
    }

    /// CSV text for one table: header row, no index.
    pub fn to_csv(ds: &Dataset, kind: TableKind) -> Result<Vec<u8>, ExportError> {
        let mut df = match ds.category(kind) {
            Some(table) => Self::category_frame(table)?,
            None => Self::age_frame(&ds.age)?,
        };

        let mut buf = Vec::new();
        CsvWriter::new(&mut buf)
            .include_header(true)
            .with_float_precision(Some(2))
            .finish(&mut df)?;
        Ok(buf)
    }

    /// Write one table to `path`.
    pub fn write_table(ds: &Dataset, kind: TableKind, path: &Path) -> Result<(), ExportError> {
        let bytes = Self::to_csv(ds, kind)?;
        fs::write(path, bytes)?;
        info!(table = kind.stem(), path = %path.display(), "exported csv");
        Ok(())
    }

    /// Write every table into `dir` under its export file name.
    pub fn write_all(ds: &Dataset, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
        fs::create_dir_all(dir)?;
        TableKind::ALL
            .par_iter()
            .map(|&kind| {
                let path = dir.join(kind.file_name());
                Self::write_table(ds, kind, &path).map(|_| path)
            })
            .collect()
    }

    /// Zip every table's CSV into one archive written to `writer`.
    pub fn write_zip<W: Write + Seek>(ds: &Dataset, writer: W) -> Result<W, ExportError> {
        let encoded: Vec<(TableKind, Vec<u8>)> = TableKind::ALL
            .par_iter()
            .map(|&kind| Self::to_csv(ds, kind).map(|bytes| (kind, bytes)))
            .collect::<Result<_, _>>()?;

        let mut zip = ZipWriter::new(writer);
        let options = FileOptions::default();
        for (kind, bytes) in encoded {
            zip.start_file(kind.file_name(), options)?;
            zip.write_all(&bytes)?;
        }
        Ok(zip.finish()?)
    }

    pub fn write_zip_file(ds: &Dataset, path: &Path) -> Result<(), ExportError> {
        let file = File::create(path)?;
        Self::write_zip(ds, file)?;
        info!(path = %path.display(), "exported zip bundle");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{bundled, DataLoader, DataSource};
    use std::io::{Cursor, Read};

    fn csv_text(kind: TableKind) -> String {
        let ds = bundled::dataset();
        String::from_utf8(CsvExporter::to_csv(&ds, kind).unwrap()).unwrap()
    }

    #[test]
    fn test_category_csv_layout() {
        let text = csv_text(TableKind::Gender);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Code,Label,Count,Percent");
        assert_eq!(lines[1], "F,Female,225964,53.64");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_labels_with_commas_are_quoted() {
        let text = csv_text(TableKind::Income);
        assert!(text.contains("A,\"Under $10,000\",8355,1.98"), "{text}");
    }

    #[test]
    fn test_age_csv_ends_with_unknown() {
        let text = csv_text(TableKind::Age);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Age,Count,Percent");
        assert_eq!(lines[1], "17,7,0.00");
        assert_eq!(lines.last().copied(), Some("Unknown,14160,3.36"));
        assert_eq!(lines.len(), 1 + 98 + 1);
    }

    #[test]
    fn test_write_all_reloads_identically() {
        let dir = tempfile::tempdir().unwrap();
        let ds = bundled::dataset();
        let written = CsvExporter::write_all(&ds, dir.path()).unwrap();
        assert_eq!(written.len(), TableKind::ALL.len());

        let report = DataLoader::new(DataSource::Directory {
            path: dir.path().to_path_buf(),
        })
        .load();
        assert!(report.fallbacks.is_empty(), "{:?}", report.fallbacks);
        assert_eq!(*report.dataset, ds);
    }

    #[test]
    fn test_zip_bundle_contains_every_table() {
        let ds = bundled::dataset();
        let cursor = CsvExporter::write_zip(&ds, Cursor::new(Vec::new())).unwrap();

        let mut archive = ::zip::ZipArchive::new(Cursor::new(cursor.into_inner())).unwrap();
        assert_eq!(archive.len(), TableKind::ALL.len());

        let mut body = String::new();
        archive
            .by_name("home_ownership.csv")
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();
        assert!(body.contains("V,Verified Home Owner,320203,76.01"));
    }
}
