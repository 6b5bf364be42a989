//! Export constants, locale defaults and default preset factories.

use std::collections::BTreeMap;

use crate::spec::SpecCellFormat;

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Default property used to tell regular items apart from group rows.
pub const C_DATASET_ID_PROPERTY_DEFAULT: &str = "id";
/// Marker property carried by group totals rows.
pub const C_GROUP_TOTALS_MARKER: &str = "__groupTotals";
/// Glyph prefixed to collapsed group titles.
pub const C_GROUP_COLLAPSED_SYMBOL: &str = "⮞";
/// Glyph prefixed to expanded group titles.
pub const C_GROUP_EXPANDED_SYMBOL: &str = "⮟";
/// Spaces added per grouping level when indenting group titles.
pub const N_GROUP_INDENT_SPACES_PER_LEVEL: usize = 5;

/// Translation key for the "Group By" column header.
pub const C_TRANSLATION_KEY_GROUP_BY: &str = "GROUP_BY";
/// Locale fallback for the "Group By" column header.
pub const C_LOCALE_TEXT_GROUP_BY: &str = "Group By";

/// Default export file name (without extension).
pub const C_FILENAME_DEFAULT: &str = "export";
/// Default worksheet name.
pub const C_SHEET_NAME_DEFAULT: &str = "Sheet1";
/// Number format shared by every numeric cell.
pub const C_NUM_FORMAT_NUMBER: &str = "0";

/// Event published right before an Excel export walks the rows.
pub const C_EVENT_BEFORE_EXPORT_EXCEL: &str = "onBeforeExportToExcel";
/// Event published once the Excel bytes exist.
pub const C_EVENT_AFTER_EXPORT_EXCEL: &str = "onAfterExportToExcel";
/// Event published right before a text export walks the rows.
pub const C_EVENT_BEFORE_EXPORT_TEXT: &str = "onBeforeExportToTextFile";
/// Event published once the text bytes exist.
pub const C_EVENT_AFTER_EXPORT_TEXT: &str = "onAfterExportToTextFile";

/// Canonical format preset keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumFmtKey {
    /// Column header cells.
    Header,
    /// Grouped pre-header cells.
    PreHeader,
    /// Numeric body cells.
    Number,
}

impl EnumFmtKey {
    /// Preset map key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::PreHeader => "pre_header",
            Self::Number => "number",
        }
    }
}

/// Build one default preset.
pub fn derive_default_export_format(key: EnumFmtKey) -> SpecCellFormat {
    match key {
        EnumFmtKey::Header => SpecCellFormat {
            bold: Some(true),
            ..Default::default()
        },
        EnumFmtKey::PreHeader => SpecCellFormat {
            bold: Some(true),
            align: Some("center".to_string()),
            ..Default::default()
        },
        EnumFmtKey::Number => SpecCellFormat {
            num_format: Some(C_NUM_FORMAT_NUMBER.to_string()),
            ..Default::default()
        },
    }
}

/// Build default named format presets used by the export pipeline.
pub fn derive_default_export_formats() -> BTreeMap<String, SpecCellFormat> {
    [EnumFmtKey::Header, EnumFmtKey::PreHeader, EnumFmtKey::Number]
        .into_iter()
        .map(|key| (key.as_str().to_string(), derive_default_export_format(key)))
        .collect()
}
