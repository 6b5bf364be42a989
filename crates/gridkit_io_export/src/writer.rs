//! XLSX writer that serializes an export model into workbook bytes.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use tracing::debug;

use crate::error::{ExportError, Result};
use crate::spec::{EnumCellValue, EnumExportCell, SpecCellFormat, SpecExportResult, SpecMergeRange};
use crate::util::sanitize_sheet_name;

/// Writes one [`SpecExportResult`] as a single worksheet.
#[derive(Debug, Clone)]
pub struct XlsxModelWriter {
    sheet_name: String,
}

impl XlsxModelWriter {
    /// Writer targeting a sheet named `sheet_name` (sanitized).
    pub fn new(sheet_name: &str) -> Self {
        Self {
            sheet_name: sanitize_sheet_name(sheet_name, "_"),
        }
    }

    /// Sanitized worksheet name.
    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Serialize the model into xlsx bytes.
    pub fn write_to_buffer(&self, result: &SpecExportResult) -> Result<Vec<u8>> {
        let mut workbook = self.build_workbook(result)?;
        Ok(workbook.save_to_buffer()?)
    }

    /// Serialize the model into an xlsx file at `path`.
    pub fn write_to_path(&self, result: &SpecExportResult, path: &Path) -> Result<()> {
        let mut workbook = self.build_workbook(result)?;
        workbook.save(path)?;
        Ok(())
    }

    fn build_workbook(&self, result: &SpecExportResult) -> Result<Workbook> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&self.sheet_name)?;

        let dict_formats: HashMap<u32, Format> = result
            .styles
            .iter()
            .map(|style| (style.id, derive_rust_xlsx_format(&style.format)))
            .collect();
        let fmt_default = Format::new();

        let mut dict_merge_anchors: BTreeMap<(usize, usize), &SpecMergeRange> = BTreeMap::new();
        let mut set_covered: BTreeSet<(usize, usize)> = BTreeSet::new();
        for merge in result.merges.iter().filter(|merge| !merge.is_single_cell()) {
            dict_merge_anchors.insert((merge.row_idx, merge.col_idx_start), merge);
            for col_idx in merge.col_idx_start + 1..=merge.col_idx_end {
                set_covered.insert((merge.row_idx, col_idx));
            }
        }

        for (row_idx, row) in result.model.rows.iter().enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                if set_covered.contains(&(row_idx, col_idx)) {
                    continue;
                }
                let format = cell
                    .style_id()
                    .and_then(|id| dict_formats.get(&id));

                if let Some(merge) = dict_merge_anchors.remove(&(row_idx, col_idx)) {
                    worksheet.merge_range(
                        cast_row_num(row_idx)?,
                        cast_col_num(merge.col_idx_start)?,
                        cast_row_num(row_idx)?,
                        cast_col_num(merge.col_idx_end)?,
                        "",
                        format.unwrap_or(&fmt_default),
                    )?;
                }
                write_export_cell(worksheet, row_idx, col_idx, cell, format)?;
            }
        }

        // Merges whose anchor cell is missing from the model.
        for merge in dict_merge_anchors.values() {
            worksheet.merge_range(
                cast_row_num(merge.row_idx)?,
                cast_col_num(merge.col_idx_start)?,
                cast_row_num(merge.row_idx)?,
                cast_col_num(merge.col_idx_end)?,
                "",
                &fmt_default,
            )?;
        }

        for (col_idx, width) in result.model.column_widths.iter().enumerate() {
            if let Some(width) = width {
                worksheet.set_column_width(cast_col_num(col_idx)?, *width)?;
            }
        }

        debug!(
            sheet = %self.sheet_name,
            n_rows = result.model.height(),
            n_merges = result.merges.len(),
            n_styles = result.styles.len(),
            "worksheet built"
        );
        Ok(workbook)
    }
}

fn write_export_cell(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    cell: &EnumExportCell,
    format: Option<&Format>,
) -> Result<()> {
    let n_row = cast_row_num(row_idx)?;
    let n_col = cast_col_num(col_idx)?;

    match (cell.value(), format) {
        (EnumCellValue::None, Some(format)) => {
            worksheet.write_blank(n_row, n_col, format)?;
        }
        (EnumCellValue::String(val), Some(format)) if val.is_empty() => {
            worksheet.write_blank(n_row, n_col, format)?;
        }
        (EnumCellValue::String(val), Some(format)) => {
            worksheet.write_string_with_format(n_row, n_col, val, format)?;
        }
        (EnumCellValue::Number(val), Some(format)) => {
            worksheet.write_number_with_format(n_row, n_col, *val, format)?;
        }
        (EnumCellValue::Boolean(val), Some(format)) => {
            worksheet.write_boolean_with_format(n_row, n_col, *val, format)?;
        }
        (EnumCellValue::None, None) => {}
        (EnumCellValue::String(val), None) if val.is_empty() => {}
        (EnumCellValue::String(val), None) => {
            worksheet.write_string(n_row, n_col, val)?;
        }
        (EnumCellValue::Number(val), None) => {
            worksheet.write_number(n_row, n_col, *val)?;
        }
        (EnumCellValue::Boolean(val), None) => {
            worksheet.write_boolean(n_row, n_col, *val)?;
        }
    }
    Ok(())
}

/// Convert a registered style descriptor into a `rust_xlsxwriter` format.
pub fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }

    if let Some(align) = spec.align.as_deref().and_then(derive_format_align) {
        format = format.set_align(align);
    }
    if let Some(align) = spec.valign.as_deref().and_then(derive_format_valign) {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = &spec.font_color {
        format = format.set_font_color(val.as_str());
    }
    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        8 => FormatBorder::MediumDashed,
        9 => FormatBorder::DashDot,
        10 => FormatBorder::MediumDashDot,
        11 => FormatBorder::DashDotDot,
        12 => FormatBorder::MediumDashDotDot,
        13 => FormatBorder::SlantDashDot,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    match align.trim().to_ascii_lowercase().as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "fill" => Some(FormatAlign::Fill),
        "justify" => Some(FormatAlign::Justify),
        "center_across" => Some(FormatAlign::CenterAcross),
        "distributed" => Some(FormatAlign::Distributed),
        _ => None,
    }
}

fn derive_format_valign(valign: &str) -> Option<FormatAlign> {
    match valign.trim().to_ascii_lowercase().as_str() {
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "center" | "vcenter" | "middle" => Some(FormatAlign::VerticalCenter),
        "justify" | "vjustify" => Some(FormatAlign::VerticalJustify),
        "distributed" | "vdistributed" => Some(FormatAlign::VerticalDistributed),
        _ => None,
    }
}

fn cast_row_num(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| ExportError::IndexOverflow(format!("row index: {value}")))
}

fn cast_col_num(value: usize) -> Result<u16> {
    u16::try_from(value).map_err(|_| ExportError::IndexOverflow(format!("column index: {value}")))
}
