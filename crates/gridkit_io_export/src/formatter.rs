//! Cell value resolution: export formatter, display formatter or raw field.

use serde_json::Value;

use crate::column::{EnumFormatterOutput, SpecColumn, SpecFormatterArgs};
use crate::source::RowSource;
use crate::spec::EnumCellValue;
use crate::util::get_descendant_property;

/// Whether a column exports through its display formatter.
///
/// The column flag wins over the run-level flag.
pub fn is_evaluating_formatter(column: &SpecColumn, export_with_formatter: Option<bool>) -> bool {
    column
        .export_with_formatter
        .or(export_with_formatter)
        .unwrap_or(false)
}

fn convert_formatter_output(output: EnumFormatterOutput) -> EnumCellValue {
    match output {
        EnumFormatterOutput::Value(Value::Null) => EnumCellValue::from(""),
        EnumFormatterOutput::Value(value) => EnumCellValue::from_json(&value),
        EnumFormatterOutput::Result(result) => EnumCellValue::String(result.text),
    }
}

/// Resolve the exported value of one cell.
///
/// Order: `export_custom_formatter`, then `formatter` when formatter
/// evaluation is on, then the field value read through its dot-notation
/// path. Absent and null values become `""`.
///
/// Formatters receive the value of the first path segment and the whole item.
pub fn resolve_export_value(
    row: usize,
    cell: usize,
    item: &Value,
    column: &SpecColumn,
    grid: &dyn RowSource,
    export_with_formatter: Option<bool>,
) -> EnumCellValue {
    let c_field = column.field_key();

    let formatter = column.export_custom_formatter.as_ref().or_else(|| {
        column
            .formatter
            .as_ref()
            .filter(|_| is_evaluating_formatter(column, export_with_formatter))
    });

    if let Some(formatter) = formatter {
        let c_first = c_field.split('.').next().unwrap_or_default();
        let value = item.get(c_first).unwrap_or(&Value::Null);
        let args = SpecFormatterArgs {
            row,
            cell,
            value,
            column,
            item,
            grid,
        };
        return convert_formatter_output(formatter.format(&args));
    }

    match get_descendant_property(item, c_field) {
        None | Some(Value::Null) => EnumCellValue::from(""),
        Some(value) => EnumCellValue::from_json(value),
    }
}

/// Resolve the exported text of one group totals cell.
///
/// Order: `export_custom_group_totals_formatter`, then
/// `group_totals_formatter`, else `""`.
pub fn resolve_group_totals_value(
    totals: &Value,
    column: &SpecColumn,
    grid: &dyn RowSource,
) -> EnumCellValue {
    let formatter = column
        .export_custom_group_totals_formatter
        .as_ref()
        .or(column.group_totals_formatter.as_ref());

    match formatter {
        Some(formatter) => EnumCellValue::String(formatter.format(totals, column, grid)),
        None => EnumCellValue::from(""),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::column::SpecFormatterResult;
    use crate::source::InMemoryRowSource;

    fn upper(args: &SpecFormatterArgs<'_>) -> EnumFormatterOutput {
        EnumFormatterOutput::from(args.value.as_str().unwrap_or_default().to_uppercase())
    }

    #[test]
    fn test_raw_field_value_and_nested_path() {
        let grid = InMemoryRowSource::default();
        let item = json!({"id": 1, "name": "ann", "address": {"city": "Paris"}, "empty": null});

        let column = SpecColumn::new("name");
        assert_eq!(
            resolve_export_value(0, 0, &item, &column, &grid, None),
            EnumCellValue::from("ann")
        );

        let mut column = SpecColumn::new("city");
        column.field = "address.city".to_string();
        assert_eq!(
            resolve_export_value(0, 0, &item, &column, &grid, None),
            EnumCellValue::from("Paris")
        );

        for c_field in ["empty", "missing", "address.zip"] {
            let mut column = SpecColumn::new("x");
            column.field = c_field.to_string();
            assert_eq!(
                resolve_export_value(0, 0, &item, &column, &grid, None),
                EnumCellValue::from(""),
                "{c_field}"
            );
        }
    }

    #[test]
    fn test_display_formatter_needs_the_flag() {
        let grid = InMemoryRowSource::default();
        let item = json!({"id": 1, "name": "ann"});
        let column = SpecColumn::new("name").with_formatter(upper);

        assert_eq!(
            resolve_export_value(0, 0, &item, &column, &grid, None),
            EnumCellValue::from("ann")
        );
        assert_eq!(
            resolve_export_value(0, 0, &item, &column, &grid, Some(true)),
            EnumCellValue::from("ANN")
        );

        let mut column = column;
        column.export_with_formatter = Some(false);
        assert_eq!(
            resolve_export_value(0, 0, &item, &column, &grid, Some(true)),
            EnumCellValue::from("ann")
        );
    }

    #[test]
    fn test_export_custom_formatter_wins() {
        let grid = InMemoryRowSource::default();
        let item = json!({"id": 1, "name": "ann"});
        let column = SpecColumn::new("name")
            .with_formatter(upper)
            .with_export_custom_formatter(|args: &SpecFormatterArgs<'_>| {
                EnumFormatterOutput::Result(SpecFormatterResult {
                    text: format!("row {} / cell {}", args.row, args.cell),
                    ..Default::default()
                })
            });

        assert_eq!(
            resolve_export_value(3, 2, &item, &column, &grid, Some(true)),
            EnumCellValue::from("row 3 / cell 2")
        );
    }

    #[test]
    fn test_formatter_numeric_and_null_output() {
        let grid = InMemoryRowSource::default();
        let item = json!({"id": 1, "qty": 4});
        let column = SpecColumn::new("qty").with_export_custom_formatter(
            |args: &SpecFormatterArgs<'_>| {
                EnumFormatterOutput::Value(json!(args.value.as_f64().unwrap_or_default() * 2.0))
            },
        );
        assert_eq!(
            resolve_export_value(0, 0, &item, &column, &grid, None),
            EnumCellValue::Number(8.0)
        );

        let column = SpecColumn::new("qty").with_export_custom_formatter(
            |_: &SpecFormatterArgs<'_>| EnumFormatterOutput::Value(Value::Null),
        );
        assert_eq!(
            resolve_export_value(0, 0, &item, &column, &grid, None),
            EnumCellValue::from("")
        );
    }

    #[test]
    fn test_group_totals_resolution_order() {
        let grid = InMemoryRowSource::default();
        let totals = json!({"__groupTotals": true, "sum": {"cost": 30}});

        let column = SpecColumn::new("cost");
        assert_eq!(
            resolve_group_totals_value(&totals, &column, &grid),
            EnumCellValue::from("")
        );

        let column = column.with_group_totals_formatter(
            |totals: &Value, column: &SpecColumn, _: &dyn RowSource| {
                format!("Total: {}", totals["sum"][column.field.as_str()])
            },
        );
        assert_eq!(
            resolve_group_totals_value(&totals, &column, &grid),
            EnumCellValue::from("Total: 30")
        );

        let column = column.with_export_custom_group_totals_formatter(
            |_: &Value, _: &SpecColumn, _: &dyn RowSource| "custom".to_string(),
        );
        assert_eq!(
            resolve_group_totals_value(&totals, &column, &grid),
            EnumCellValue::from("custom")
        );
    }
}
