//! Export error taxonomy.

use thiserror::Error;

/// Fatal export failures. Any of these aborts the whole export.
#[derive(Error, Debug)]
pub enum ExportError {
    /// A required collaborator or option is missing; raised before any row is read.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An input that must be a collection is not one.
    #[error("Data shape error: {0}")]
    DataShape(String),

    /// Row or column index outside spreadsheet limits.
    #[error("Index overflow: {0}")]
    IndexOverflow(String),

    /// Workbook serialization failed.
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Delimited text serialization failed.
    #[error("csv write error: {0}")]
    Csv(#[from] csv::Error),

    /// DataFrame access failed.
    #[error("DataFrame error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ExportError>;
