//! Data module - Demographic tables, loading, filtering and export

pub mod bundled;
mod export;
mod loader;
mod processor;
mod table;

pub use export::CsvExporter;
pub use loader::{DataLoader, DataSource, Fallback, LoadReport, TableCache};
pub use processor::{DataProcessor, SeriesPoint, Unit};
pub use table::{
    AgeKey, AgeRow, AgeTable, CategoryRow, CategoryTable, Dataset, TableKind, UNKNOWN_LABEL,
};
