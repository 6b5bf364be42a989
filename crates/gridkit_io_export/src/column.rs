//! Column descriptors and the formatter/translator capabilities they bind.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::source::RowSource;
use crate::spec::EnumFieldType;

////////////////////////////////////////////////////////////////////////////////
// #region Capabilities

/// Arguments passed to a [`ValueFormatter`].
pub struct SpecFormatterArgs<'a> {
    /// Row index in the row source.
    pub row: usize,
    /// Column index in the grid column list.
    pub cell: usize,
    /// Raw cell value (first segment of a dot-notation field).
    pub value: &'a Value,
    /// Column being formatted.
    pub column: &'a SpecColumn,
    /// Whole row item.
    pub item: &'a Value,
    /// Row source the item comes from.
    pub grid: &'a dyn RowSource,
}

/// Rich formatter result; only `text` is exported.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecFormatterResult {
    /// Display text.
    pub text: String,
    /// CSS classes added to the cell on screen.
    pub add_classes: Option<String>,
    /// Tooltip shown on screen.
    pub tool_tip: Option<String>,
}

/// What a formatter returns.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumFormatterOutput {
    /// Plain value, used directly.
    Value(Value),
    /// Result object, its `text` is used.
    Result(SpecFormatterResult),
}

impl From<String> for EnumFormatterOutput {
    fn from(value: String) -> Self {
        Self::Value(Value::String(value))
    }
}

impl From<&str> for EnumFormatterOutput {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_string()))
    }
}

/// Cell formatter bound to a column.
pub trait ValueFormatter: Send + Sync {
    /// Format one cell.
    fn format(&self, args: &SpecFormatterArgs<'_>) -> EnumFormatterOutput;
}

impl<F> ValueFormatter for F
where
    F: Fn(&SpecFormatterArgs<'_>) -> EnumFormatterOutput + Send + Sync,
{
    fn format(&self, args: &SpecFormatterArgs<'_>) -> EnumFormatterOutput {
        self(args)
    }
}

/// Formatter rendering one column of a group totals row.
pub trait GroupTotalsFormatter: Send + Sync {
    /// Render the totals cell of `column`.
    fn format(&self, totals: &Value, column: &SpecColumn, grid: &dyn RowSource) -> String;
}

impl<F> GroupTotalsFormatter for F
where
    F: Fn(&Value, &SpecColumn, &dyn RowSource) -> String + Send + Sync,
{
    fn format(&self, totals: &Value, column: &SpecColumn, grid: &dyn RowSource) -> String {
        self(totals, column, grid)
    }
}

/// Translation lookup.
pub trait Translator {
    /// Translated text for `key`.
    fn translate(&self, key: &str) -> String;
}

impl<F> Translator for F
where
    F: Fn(&str) -> String,
{
    fn translate(&self, key: &str) -> String {
        self(key)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColumnDescriptor

/// Grid column definition as seen by the export.
#[derive(Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpecColumn {
    /// Column id.
    pub id: String,
    /// Item property, dot-notation allowed.
    pub field: String,
    /// Header text.
    pub name: Option<String>,
    /// Header translation key.
    pub name_key: Option<String>,
    /// Field type.
    #[serde(rename = "type")]
    pub field_type: Option<EnumFieldType>,
    /// Field type used for export, overriding `field_type`.
    pub output_type: Option<EnumFieldType>,
    /// On-screen width; `<= 0` marks a hidden column.
    pub width: Option<f64>,
    /// Never export this column.
    pub exclude_from_export: bool,
    /// Export the display formatter output instead of the raw value.
    pub export_with_formatter: Option<bool>,
    /// Strip HTML from this column's values.
    pub sanitize_data_export: bool,
    /// Keep text as text in csv (`="..."`).
    pub export_csv_force_to_keep_as_string: bool,
    /// Pre-header group label.
    pub column_group: Option<String>,
    /// Pre-header group translation key.
    pub column_group_key: Option<String>,
    /// Spreadsheet column width.
    pub export_column_width: Option<f64>,
    /// Backend query alias (unused by export).
    pub query_field: Option<String>,
    /// Backend sort alias (unused by export).
    pub sort_field: Option<String>,

    /// Display formatter.
    #[serde(skip)]
    pub formatter: Option<Arc<dyn ValueFormatter>>,
    /// Export-only formatter, wins over `formatter`.
    #[serde(skip)]
    pub export_custom_formatter: Option<Arc<dyn ValueFormatter>>,
    /// Display formatter of group totals.
    #[serde(skip)]
    pub group_totals_formatter: Option<Arc<dyn GroupTotalsFormatter>>,
    /// Export-only group totals formatter, wins over `group_totals_formatter`.
    #[serde(skip)]
    pub export_custom_group_totals_formatter: Option<Arc<dyn GroupTotalsFormatter>>,
}

impl SpecColumn {
    /// Column with the same `id` and `field`.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            field: id.clone(),
            id,
            ..Default::default()
        }
    }

    /// Set the field type.
    pub fn with_type(mut self, field_type: EnumFieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    /// Set the header text.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the display formatter.
    pub fn with_formatter(mut self, formatter: impl ValueFormatter + 'static) -> Self {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    /// Set the export-only formatter.
    pub fn with_export_custom_formatter(
        mut self,
        formatter: impl ValueFormatter + 'static,
    ) -> Self {
        self.export_custom_formatter = Some(Arc::new(formatter));
        self
    }

    /// Set the display group totals formatter.
    pub fn with_group_totals_formatter(
        mut self,
        formatter: impl GroupTotalsFormatter + 'static,
    ) -> Self {
        self.group_totals_formatter = Some(Arc::new(formatter));
        self
    }

    /// Set the export-only group totals formatter.
    pub fn with_export_custom_group_totals_formatter(
        mut self,
        formatter: impl GroupTotalsFormatter + 'static,
    ) -> Self {
        self.export_custom_group_totals_formatter = Some(Arc::new(formatter));
        self
    }

    /// Whether the column takes part in the export.
    pub fn is_exported(&self) -> bool {
        !self.exclude_from_export && self.width.is_none_or(|width| width > 0.0)
    }

    /// Item key of the column: `field`, else `id`, else empty.
    pub fn field_key(&self) -> &str {
        if !self.field.is_empty() {
            &self.field
        } else {
            &self.id
        }
    }

    /// `output_type`, else `field_type`, else string.
    pub fn effective_field_type(&self) -> EnumFieldType {
        self.output_type
            .or(self.field_type)
            .unwrap_or(EnumFieldType::String)
    }
}

impl fmt::Debug for SpecColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecColumn")
            .field("id", &self.id)
            .field("field", &self.field)
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("output_type", &self.output_type)
            .field("width", &self.width)
            .field("exclude_from_export", &self.exclude_from_export)
            .field("export_with_formatter", &self.export_with_formatter)
            .field("formatter", &self.formatter.is_some())
            .field("export_custom_formatter", &self.export_custom_formatter.is_some())
            .finish_non_exhaustive()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_column_deserializes_from_grid_definition() {
        let column: SpecColumn = serde_json::from_value(json!({
            "id": "start",
            "field": "dates.start",
            "name": "Start",
            "type": "dateIso",
            "width": 0,
            "columnGroup": "Period"
        }))
        .unwrap();

        assert_eq!(column.field_key(), "dates.start");
        assert_eq!(column.effective_field_type(), EnumFieldType::DateIso);
        assert_eq!(column.column_group.as_deref(), Some("Period"));
        assert!(!column.is_exported());
    }

    #[test]
    fn test_column_export_selection() {
        assert!(SpecColumn::new("a").is_exported());

        let mut column = SpecColumn::new("a");
        column.width = Some(80.0);
        assert!(column.is_exported());
        column.width = Some(-1.0);
        assert!(!column.is_exported());

        let mut column = SpecColumn::new("a");
        column.exclude_from_export = true;
        assert!(!column.is_exported());
    }

    #[test]
    fn test_column_field_key_falls_back_to_id_then_empty() {
        let mut column = SpecColumn::new("a");
        column.field.clear();
        assert_eq!(column.field_key(), "a");
        column.id.clear();
        assert_eq!(column.field_key(), "");
    }

    #[test]
    fn test_output_type_wins_over_type() {
        let mut column = SpecColumn::new("a").with_type(EnumFieldType::Number);
        assert_eq!(column.effective_field_type(), EnumFieldType::Number);
        column.output_type = Some(EnumFieldType::String);
        assert_eq!(column.effective_field_type(), EnumFieldType::String);
        assert_eq!(SpecColumn::new("b").effective_field_type(), EnumFieldType::String);
    }
}
