//! Shared export specification models, options and report.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::ser::SerializeTuple;
use serde::{Deserialize, Serialize, Serializer};

use crate::conf::{
    C_DATASET_ID_PROPERTY_DEFAULT, C_FILENAME_DEFAULT, C_GROUP_COLLAPSED_SYMBOL,
    C_GROUP_EXPANDED_SYMBOL, C_LOCALE_TEXT_GROUP_BY, C_SHEET_NAME_DEFAULT,
};
use crate::style::StyleRegistry;
use crate::util::derive_excel_column_name;

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Style descriptor registered in the per-run [`StyleRegistry`].
///
/// Equality is by value, so two descriptors built independently collapse
/// onto the same style id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpecCellFormat {
    /// Font family name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_name: Option<String>,
    /// Font size in points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<i64>,
    /// Bold style.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    /// Italic style.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,

    /// Horizontal alignment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<String>,
    /// Vertical alignment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valign: Option<String>,
    /// Border style for all sides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<i64>,
    /// Text wrap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_wrap: Option<bool>,

    /// Number, currency or date format code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_format: Option<String>,
    /// Background fill color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bg_color: Option<String>,
    /// Font color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            text_wrap: other.text_wrap.or(self.text_wrap),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }
}

/// One registered style: stable id plus its descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecRegisteredStyle {
    /// Integer id referenced by styled cells.
    pub id: u32,
    /// Style descriptor.
    pub format: SpecCellFormat,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellValueSpecification

/// Scalar cell value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumCellValue {
    /// Missing/blank value.
    #[default]
    None,
    /// Boolean value.
    Boolean(bool),
    /// Numeric value.
    Number(f64),
    /// Text value.
    String(String),
}

impl EnumCellValue {
    /// Convert a JSON value into a scalar; objects and arrays keep their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::None,
            serde_json::Value::Bool(val) => Self::Boolean(*val),
            serde_json::Value::Number(val) => val.as_f64().map_or(Self::None, Self::Number),
            serde_json::Value::String(val) => Self::String(val.clone()),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                Self::String(value.to_string())
            }
        }
    }

    /// Text shown for this value in a text export or a header.
    pub fn to_text(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::Boolean(val) => val.to_string(),
            Self::Number(val) => format_number_text(*val),
            Self::String(val) => val.clone(),
        }
    }

    /// Loose falsiness: blank, empty text, zero, NaN and `false`.
    pub fn is_falsy(&self) -> bool {
        match self {
            Self::None => true,
            Self::Boolean(val) => !val,
            Self::Number(val) => *val == 0.0 || val.is_nan(),
            Self::String(val) => val.is_empty(),
        }
    }
}

impl From<&str> for EnumCellValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for EnumCellValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for EnumCellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl Serialize for EnumCellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::None => serializer.serialize_none(),
            Self::Boolean(val) => serializer.serialize_bool(*val),
            Self::Number(val) => {
                if val.is_finite() && val.fract() == 0.0 && val.abs() < 9_007_199_254_740_992.0 {
                    serializer.serialize_i64(*val as i64)
                } else {
                    serializer.serialize_f64(*val)
                }
            }
            Self::String(val) => serializer.serialize_str(val),
        }
    }
}

fn format_number_text(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 9_007_199_254_740_992.0 {
        (x as i64).to_string()
    } else {
        x.to_string()
    }
}

/// Style reference attached to a styled cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpecCellMetadata {
    /// Registered style id.
    pub style: u32,
}

/// One exported cell: a plain scalar or a `{value, metadata: {style}}` tuple.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EnumExportCell {
    /// Plain scalar.
    Scalar(EnumCellValue),
    /// Scalar with a registered style.
    Styled {
        /// Cell value.
        value: EnumCellValue,
        /// Style reference.
        metadata: SpecCellMetadata,
    },
}

impl EnumExportCell {
    /// Empty placeholder cell (`""`).
    pub fn blank() -> Self {
        Self::Scalar(EnumCellValue::String(String::new()))
    }

    /// Plain text cell.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Scalar(EnumCellValue::String(value.into()))
    }

    /// Styled cell.
    pub fn styled(value: EnumCellValue, style_id: u32) -> Self {
        Self::Styled {
            value,
            metadata: SpecCellMetadata { style: style_id },
        }
    }

    /// Underlying scalar value.
    pub fn value(&self) -> &EnumCellValue {
        match self {
            Self::Scalar(value) => value,
            Self::Styled { value, .. } => value,
        }
    }

    /// Style id when the cell is styled.
    pub fn style_id(&self) -> Option<u32> {
        match self {
            Self::Scalar(_) => None,
            Self::Styled { metadata, .. } => Some(metadata.style),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FieldTypeSpecification

/// Column field type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EnumFieldType {
    Unknown,
    #[default]
    String,
    Text,
    Boolean,
    Integer,
    Float,
    Number,
    Object,
    Password,
    Readonly,
    Date,
    DateIso,
    DateUtc,
    DateTime,
    DateTimeIso,
    DateTimeIsoAmPm,
    DateTimeIsoAmPmUpper,
    DateTimeShortIso,
    DateEuro,
    DateEuroShort,
    DateTimeEuro,
    DateTimeShortEuro,
    DateTimeEuroAmPm,
    DateTimeEuroAmPmUpper,
    DateTimeEuroShort,
    DateTimeEuroShortAmPm,
    DateTimeEuroShortAmPmUpper,
    DateUs,
    DateUsShort,
    DateTimeUs,
    DateTimeShortUs,
    DateTimeUsAmPm,
    DateTimeUsAmPmUpper,
    DateTimeUsShort,
    DateTimeUsShortAmPm,
    DateTimeUsShortAmPmUpper,
}

const TUP_FIELD_TYPE_NAMES: [(EnumFieldType, &str); 36] = [
    (EnumFieldType::Unknown, "unknown"),
    (EnumFieldType::String, "string"),
    (EnumFieldType::Text, "text"),
    (EnumFieldType::Boolean, "boolean"),
    (EnumFieldType::Integer, "integer"),
    (EnumFieldType::Float, "float"),
    (EnumFieldType::Number, "number"),
    (EnumFieldType::Object, "object"),
    (EnumFieldType::Password, "password"),
    (EnumFieldType::Readonly, "readonly"),
    (EnumFieldType::Date, "date"),
    (EnumFieldType::DateIso, "dateIso"),
    (EnumFieldType::DateUtc, "dateUtc"),
    (EnumFieldType::DateTime, "dateTime"),
    (EnumFieldType::DateTimeIso, "dateTimeIso"),
    (EnumFieldType::DateTimeIsoAmPm, "dateTimeIsoAmPm"),
    (EnumFieldType::DateTimeIsoAmPmUpper, "dateTimeIsoAM_PM"),
    (EnumFieldType::DateTimeShortIso, "dateTimeShortIso"),
    (EnumFieldType::DateEuro, "dateEuro"),
    (EnumFieldType::DateEuroShort, "dateEuroShort"),
    (EnumFieldType::DateTimeEuro, "dateTimeEuro"),
    (EnumFieldType::DateTimeShortEuro, "dateTimeShortEuro"),
    (EnumFieldType::DateTimeEuroAmPm, "dateTimeEuroAmPm"),
    (EnumFieldType::DateTimeEuroAmPmUpper, "dateTimeEuroAM_PM"),
    (EnumFieldType::DateTimeEuroShort, "dateTimeEuroShort"),
    (EnumFieldType::DateTimeEuroShortAmPm, "dateTimeEuroShortAmPm"),
    (EnumFieldType::DateTimeEuroShortAmPmUpper, "dateTimeEuroShortAM_PM"),
    (EnumFieldType::DateUs, "dateUs"),
    (EnumFieldType::DateUsShort, "dateUsShort"),
    (EnumFieldType::DateTimeUs, "dateTimeUs"),
    (EnumFieldType::DateTimeShortUs, "dateTimeShortUs"),
    (EnumFieldType::DateTimeUsAmPm, "dateTimeUsAmPm"),
    (EnumFieldType::DateTimeUsAmPmUpper, "dateTimeUsAM_PM"),
    (EnumFieldType::DateTimeUsShort, "dateTimeUsShort"),
    (EnumFieldType::DateTimeUsShortAmPm, "dateTimeUsShortAmPm"),
    (EnumFieldType::DateTimeUsShortAmPmUpper, "dateTimeUsShortAM_PM"),
];

impl EnumFieldType {
    /// Canonical grid name of the field type.
    pub fn as_str(&self) -> &'static str {
        TUP_FIELD_TYPE_NAMES
            .iter()
            .find(|(field_type, _)| field_type == self)
            .map_or("unknown", |(_, name)| name)
    }

    /// Whether the type belongs to the numeric family.
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Number | Self::Integer | Self::Float)
    }

    /// Whether the type belongs to the date family.
    pub fn is_date(&self) -> bool {
        self.as_str().starts_with("date")
    }
}

impl FromStr for EnumFieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TUP_FIELD_TYPE_NAMES
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(field_type, _)| *field_type)
            .ok_or_else(|| format!("Unknown field type: {s:?}"))
    }
}

impl TryFrom<String> for EnumFieldType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EnumFieldType> for String {
    fn from(value: EnumFieldType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for EnumFieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Export file type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumFileType {
    /// Office Open XML workbook.
    #[default]
    Xlsx,
    /// Legacy Excel extension (same workbook bytes).
    Xls,
    /// Comma separated values.
    Csv,
    /// Plain delimited text.
    Txt,
}

impl EnumFileType {
    /// File extension without dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
            Self::Csv => "csv",
            Self::Txt => "txt",
        }
    }

    /// Mime type of the produced file.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Xls => "application/vnd.ms-excel",
            Self::Csv => "text/csv",
            Self::Txt => "text/plain",
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RowMetadataSpecification

/// Declared colspan of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumColspan {
    /// Span this many physical columns.
    Span(usize),
    /// Span to the last column (`'*'`).
    Wildcard,
}

impl<'de> Deserialize<'de> for EnumColspan {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match &value {
            serde_json::Value::String(s) if s == "*" => Ok(Self::Wildcard),
            serde_json::Value::String(s) => s
                .trim()
                .parse::<usize>()
                .map(Self::Span)
                .map_err(|_| serde::de::Error::custom(format!("invalid colspan: {s:?}"))),
            serde_json::Value::Number(n) => n
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .map(Self::Span)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid colspan: {n}"))),
            _ => Err(serde::de::Error::custom(format!("invalid colspan: {value}"))),
        }
    }
}

/// Per-cell metadata entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct SpecColumnMetadata {
    /// Declared colspan.
    #[serde(default)]
    pub colspan: Option<EnumColspan>,
}

/// Item metadata returned by a row source for one row.
///
/// `columns` is keyed by column id or by stringified grid column index.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct SpecItemMetadata {
    /// Per-column metadata.
    #[serde(default)]
    pub columns: BTreeMap<String, SpecColumnMetadata>,
}

impl SpecItemMetadata {
    /// Colspan declared for a column, looked up by id first then by index.
    pub fn colspan_for(&self, column_id: &str, column_index: usize) -> Option<EnumColspan> {
        self.columns
            .get(column_id)
            .or_else(|| self.columns.get(&column_index.to_string()))
            .and_then(|meta| meta.colspan)
    }
}

/// Grouping declared on the row source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpecGrouping {
    /// Field the rows are grouped by.
    pub getter: String,
    /// Whether groups start collapsed.
    pub collapsed: bool,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region OutputModelSpecification

/// Single-row merge range, 0-based and inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecMergeRange {
    /// Spreadsheet row index.
    pub row_idx: usize,
    /// Start column index (inclusive).
    pub col_idx_start: usize,
    /// End column index (inclusive).
    pub col_idx_end: usize,
}

impl SpecMergeRange {
    /// A1-style top-left coordinate.
    pub fn cell_top_left(&self) -> String {
        derive_a1_cell(self.row_idx, self.col_idx_start)
    }

    /// A1-style bottom-right coordinate.
    pub fn cell_bottom_right(&self) -> String {
        derive_a1_cell(self.row_idx, self.col_idx_end)
    }

    /// Number of physical columns covered.
    pub fn width(&self) -> usize {
        self.col_idx_end + 1 - self.col_idx_start
    }

    /// Whether the range covers one cell only.
    pub fn is_single_cell(&self) -> bool {
        self.col_idx_start == self.col_idx_end
    }

    /// Same range moved down by `n_rows`.
    pub fn shifted_down(&self, n_rows: usize) -> Self {
        Self {
            row_idx: self.row_idx + n_rows,
            ..self.clone()
        }
    }
}

fn derive_a1_cell(row_idx: usize, col_idx: usize) -> String {
    format!(
        "{}{}",
        derive_excel_column_name(col_idx + 1).unwrap_or_default(),
        row_idx + 1
    )
}

impl Serialize for SpecMergeRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&self.cell_top_left())?;
        tup.serialize_element(&self.cell_bottom_right())?;
        tup.end()
    }
}

/// Rows of cells ready for a byte writer.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SpecTabularExportModel {
    /// Ordered rows, each an ordered list of cells.
    pub rows: Vec<Vec<EnumExportCell>>,
    /// Width per physical column (`None` keeps the writer default).
    pub column_widths: Vec<Option<f64>>,
}

impl SpecTabularExportModel {
    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Widest row length.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecExportResult {
    /// Cell grid.
    pub model: SpecTabularExportModel,
    /// Merge ranges emitted alongside the grid.
    pub merges: Vec<SpecMergeRange>,
    /// Styles registered during the run, ordered by id.
    pub styles: Vec<SpecRegisteredStyle>,
    /// Run counters and soft anomalies.
    pub report: SpecExportReport,
}

/// Produced file handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecExportFile {
    /// File name including extension.
    pub filename: String,
    /// Mime type matching the file type.
    pub mime_type: String,
    /// File bytes.
    pub bytes: Vec<u8>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region OptionsSpecification

/// Locale texts used when no translation applies.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpecLocales {
    /// Header text of the "Group By" column.
    pub text_group_by: String,
}

impl Default for SpecLocales {
    fn default() -> Self {
        Self {
            text_group_by: C_LOCALE_TEXT_GROUP_BY.to_string(),
        }
    }
}

/// Grid-level options the export reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpecGridOptions {
    /// Property identifying regular items.
    pub dataset_id_property_name: String,
    /// Translate headers and group labels.
    pub enable_translate: bool,
    /// Grid owns a pre-header panel.
    pub create_pre_header_panel: bool,
    /// Pre-header panel is visible.
    pub show_pre_header_panel: bool,
    /// Pre-header panel is used by draggable grouping instead of column groups.
    pub enable_draggable_grouping: bool,
    /// Locale fallbacks.
    pub locales: SpecLocales,
}

impl Default for SpecGridOptions {
    fn default() -> Self {
        Self {
            dataset_id_property_name: C_DATASET_ID_PROPERTY_DEFAULT.to_string(),
            enable_translate: false,
            create_pre_header_panel: false,
            show_pre_header_panel: false,
            enable_draggable_grouping: false,
            locales: SpecLocales::default(),
        }
    }
}

impl SpecGridOptions {
    /// Whether the grouped pre-header row is exported.
    pub fn has_column_title_pre_header(&self) -> bool {
        self.create_pre_header_panel
            && self.show_pre_header_panel
            && !self.enable_draggable_grouping
    }
}

/// Sheet under construction handed to a custom header callback.
pub struct SpecCustomHeaderSheet<'a> {
    /// Target worksheet name.
    pub sheet_name: &'a str,
    /// Rows inserted above the exported header rows.
    pub rows: Vec<Vec<EnumExportCell>>,
    /// Merges over the inserted rows (row indices relative to the sheet top).
    pub merges: Vec<SpecMergeRange>,
    /// Style registry of the current run.
    pub styles: &'a mut StyleRegistry,
}

/// Callback injecting extra rows before the exported rows.
pub type FnCustomExcelHeader = Arc<dyn Fn(&mut SpecCustomHeaderSheet<'_>) + Send + Sync>;

/// Excel export options.
#[derive(Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpecExcelExportOptions {
    /// File name without extension.
    pub filename: String,
    /// Output file type.
    pub format: EnumFileType,
    /// Worksheet name.
    pub sheet_name: String,
    /// Strip HTML from every exported value.
    pub sanitize_data_export: bool,
    /// Evaluate display formatters for every column (column flag wins).
    pub export_with_formatter: Option<bool>,
    /// Patch merged into the bold header style.
    pub column_header_style: Option<SpecCellFormat>,
    /// Header text of the "Group By" column.
    pub grouping_column_header_title: Option<String>,
    /// First cell of every totals row.
    pub grouping_aggregator_row_text: String,
    /// Prefix group titles with a glyph and level indentation.
    pub add_group_indentation: bool,
    /// Glyph for collapsed groups.
    pub group_collapsed_symbol: String,
    /// Glyph for expanded groups.
    pub group_expanded_symbol: String,
    /// Width applied to every exported column without its own width.
    pub custom_column_width: Option<f64>,
    /// Callback injecting extra rows above the header.
    #[serde(skip)]
    pub custom_excel_header: Option<FnCustomExcelHeader>,
}

impl Default for SpecExcelExportOptions {
    fn default() -> Self {
        Self {
            filename: C_FILENAME_DEFAULT.to_string(),
            format: EnumFileType::Xlsx,
            sheet_name: C_SHEET_NAME_DEFAULT.to_string(),
            sanitize_data_export: false,
            export_with_formatter: None,
            column_header_style: None,
            grouping_column_header_title: None,
            grouping_aggregator_row_text: String::new(),
            add_group_indentation: false,
            group_collapsed_symbol: C_GROUP_COLLAPSED_SYMBOL.to_string(),
            group_expanded_symbol: C_GROUP_EXPANDED_SYMBOL.to_string(),
            custom_column_width: None,
            custom_excel_header: None,
        }
    }
}

impl fmt::Debug for SpecExcelExportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecExcelExportOptions")
            .field("filename", &self.filename)
            .field("format", &self.format)
            .field("sheet_name", &self.sheet_name)
            .field("sanitize_data_export", &self.sanitize_data_export)
            .field("export_with_formatter", &self.export_with_formatter)
            .field("column_header_style", &self.column_header_style)
            .field(
                "grouping_column_header_title",
                &self.grouping_column_header_title,
            )
            .field(
                "grouping_aggregator_row_text",
                &self.grouping_aggregator_row_text,
            )
            .field("add_group_indentation", &self.add_group_indentation)
            .field("group_collapsed_symbol", &self.group_collapsed_symbol)
            .field("group_expanded_symbol", &self.group_expanded_symbol)
            .field("custom_column_width", &self.custom_column_width)
            .field("custom_excel_header", &self.custom_excel_header.is_some())
            .finish()
    }
}

/// Delimited text export options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpecTextExportOptions {
    /// File name without extension.
    pub filename: String,
    /// `csv` or `txt`.
    pub format: EnumFileType,
    /// Field delimiter.
    pub delimiter: String,
    /// Delimiter overriding `delimiter` when set.
    pub delimiter_override: Option<String>,
    /// Strip HTML from every exported value.
    pub sanitize_data_export: bool,
    /// Evaluate display formatters for every column (column flag wins).
    pub export_with_formatter: Option<bool>,
    /// Header text of the "Group By" column.
    pub grouping_column_header_title: Option<String>,
    /// First field of every totals line.
    pub grouping_aggregator_row_text: String,
    /// Prefix the output with a UTF-8 byte order mark.
    pub use_utf8_with_bom: bool,
}

impl Default for SpecTextExportOptions {
    fn default() -> Self {
        Self {
            filename: C_FILENAME_DEFAULT.to_string(),
            format: EnumFileType::Csv,
            delimiter: ",".to_string(),
            delimiter_override: None,
            sanitize_data_export: false,
            export_with_formatter: None,
            grouping_column_header_title: None,
            grouping_aggregator_row_text: String::new(),
            use_utf8_with_bom: true,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Per-run counters and non-fatal warnings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SpecExportReport {
    /// Logical rows read from the row source.
    pub cnt_rows_scanned: u64,
    /// Regular item rows exported.
    pub cnt_rows_exported: u64,
    /// Group title rows exported.
    pub cnt_group_rows: u64,
    /// Group totals rows exported.
    pub cnt_totals_rows: u64,
    /// Placeholder or unclassifiable rows skipped.
    pub cnt_rows_skipped: u64,
    /// Soft data-quality anomalies.
    pub warnings: Vec<String>,
}

impl SpecExportReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} scanned={} exported={} groups={} totals={} skipped={} warnings={}",
            self.cnt_rows_scanned,
            self.cnt_rows_exported,
            self.cnt_group_rows,
            self.cnt_totals_rows,
            self.cnt_rows_skipped,
            self.warnings.len()
        )
    }
}

impl fmt::Display for SpecExportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[EXPORT]"))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_export_cell_serializes_to_grid_shape() {
        let cells = vec![
            EnumExportCell::text("1E06"),
            EnumExportCell::styled(EnumCellValue::Number(10.0), 3),
            EnumExportCell::styled(EnumCellValue::None, 3),
        ];
        assert_eq!(
            serde_json::to_value(&cells).unwrap(),
            json!([
                "1E06",
                {"value": 10, "metadata": {"style": 3}},
                {"value": null, "metadata": {"style": 3}}
            ])
        );
    }

    #[test]
    fn test_merge_range_serializes_as_a1_pair() {
        let merge = SpecMergeRange {
            row_idx: 0,
            col_idx_start: 1,
            col_idx_end: 3,
        };
        assert_eq!(serde_json::to_value(&merge).unwrap(), json!(["B1", "D1"]));
        assert_eq!(merge.width(), 3);
        assert_eq!(merge.shifted_down(2).cell_top_left(), "B3");
    }

    #[test]
    fn test_field_type_names_round_trip() {
        for (field_type, name) in TUP_FIELD_TYPE_NAMES {
            assert_eq!(field_type.as_str(), name);
            assert_eq!(name.parse::<EnumFieldType>(), Ok(field_type));
        }
        assert!("dateTimeUsAM_PM".parse::<EnumFieldType>().unwrap().is_date());
        assert!(EnumFieldType::Float.is_number());
        assert!(!EnumFieldType::String.is_date());
        assert!("nope".parse::<EnumFieldType>().is_err());
    }

    #[test]
    fn test_item_metadata_colspan_lookup() {
        let meta: SpecItemMetadata = serde_json::from_value(json!({
            "columns": {"lastName": {"colspan": 2}, "0": {"colspan": "*"}}
        }))
        .unwrap();
        assert_eq!(meta.colspan_for("lastName", 5), Some(EnumColspan::Span(2)));
        assert_eq!(meta.colspan_for("firstName", 0), Some(EnumColspan::Wildcard));
        assert_eq!(meta.colspan_for("firstName", 1), None);
    }

    #[test]
    fn test_options_deserialize_from_grid_keys() {
        let options: SpecExcelExportOptions = serde_json::from_value(json!({
            "filename": "orders",
            "format": "csv",
            "sanitizeDataExport": true,
            "addGroupIndentation": true,
            "columnHeaderStyle": {"fontColor": "FF0000"}
        }))
        .unwrap();
        assert_eq!(options.filename, "orders");
        assert_eq!(options.format, EnumFileType::Csv);
        assert!(options.sanitize_data_export);
        assert_eq!(options.sheet_name, "Sheet1");
        assert_eq!(options.group_expanded_symbol, "⮟");
        assert_eq!(
            options.column_header_style.unwrap().font_color,
            Some("FF0000".to_string())
        );

        let grid: SpecGridOptions = serde_json::from_value(json!({
            "createPreHeaderPanel": true,
            "showPreHeaderPanel": true
        }))
        .unwrap();
        assert_eq!(grid.dataset_id_property_name, "id");
        assert!(grid.has_column_title_pre_header());
    }

    #[test]
    fn test_report_format() {
        let mut report = SpecExportReport {
            cnt_rows_scanned: 4,
            cnt_rows_exported: 2,
            cnt_group_rows: 1,
            cnt_totals_rows: 0,
            cnt_rows_skipped: 1,
            warnings: vec![],
        };
        report.warn("w");
        assert_eq!(
            report.to_string(),
            "[EXPORT] scanned=4 exported=2 groups=1 totals=0 skipped=1 warnings=1"
        );
    }
}
