//! `gridkit_io_export` v1:
//! Grid-to-spreadsheet export kernel.
//!
//! Module map:
//! - `conf`      : constants, locale defaults and default presets
//! - `spec`      : models, options and run report
//! - `error`     : export error taxonomy
//! - `column`    : column descriptors and formatter/translator capabilities
//! - `source`    : row source contract and row classification
//! - `frame`     : DataFrame / Arrow IPC backed row source
//! - `util`      : pure helper functions
//! - `style`     : per-run style registry and field-type cell styling
//! - `formatter` : cell value resolution
//! - `pipeline`  : header, body, group and colspan walk producing the model
//! - `writer`    : xlsx byte writer
//! - `text`      : csv/txt rendering
//! - `service`   : export services with before/after events
pub mod column;
pub mod conf;
pub mod error;
pub mod formatter;
pub mod frame;
pub mod pipeline;
pub mod service;
pub mod source;
pub mod spec;
pub mod style;
pub mod text;
pub mod util;
pub mod writer;

pub use column::{
    EnumFormatterOutput, GroupTotalsFormatter, SpecColumn, SpecFormatterArgs, SpecFormatterResult,
    Translator, ValueFormatter,
};
pub use conf::{
    EnumFmtKey, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    TUP_EXCEL_ILLEGAL, derive_default_export_format, derive_default_export_formats,
};
pub use error::{ExportError, Result};
pub use formatter::{resolve_export_value, resolve_group_totals_value};
pub use frame::DataFrameRowSource;
pub use pipeline::{EnumColspanStep, GridExportPipeline, SpecColspanState};
pub use service::{ExcelExportService, ExportEventPublisher, TextExportService};
pub use source::{EnumRowKind, InMemoryRowSource, RowSource, classify_row};
pub use spec::{
    EnumCellValue, EnumColspan, EnumExportCell, EnumFieldType, EnumFileType, FnCustomExcelHeader,
    SpecCellFormat, SpecCellMetadata, SpecColumnMetadata, SpecCustomHeaderSheet,
    SpecExcelExportOptions, SpecExportFile, SpecExportReport, SpecExportResult, SpecGridOptions,
    SpecGrouping, SpecItemMetadata, SpecLocales, SpecMergeRange, SpecRegisteredStyle,
    SpecTabularExportModel, SpecTextExportOptions,
};
pub use style::{StyleRegistry, resolve_cell_by_field_type};
pub use text::{DelimitedTextRenderer, SpecTextExportResult};
pub use util::{derive_excel_column_name, parse_excel_column_index, sanitize_html_to_text};
pub use writer::XlsxModelWriter;
