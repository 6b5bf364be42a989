//! Delimited text (csv/txt) rendering of grid rows.

use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};
use tracing::{debug, trace};

use crate::column::SpecColumn;
use crate::conf::N_GROUP_INDENT_SPACES_PER_LEVEL;
use crate::error::{ExportError, Result};
use crate::formatter::{resolve_export_value, resolve_group_totals_value};
use crate::pipeline::{
    EnumColspanStep, GridExportPipeline, SpecColspanState, derive_group_by_title,
    derive_group_title_text, derive_header_title, derive_pre_header_title, select_columns,
};
use crate::source::{EnumRowKind, RowSource, classify_row};
use crate::spec::{EnumCellValue, EnumFileType, SpecExportReport, SpecTextExportOptions};
use crate::util::sanitize_cell_value;

const C_UTF8_BOM: &str = "\u{feff}";
const N_LINE_TERMINATOR: u8 = b'\n';

/// Rendered text file content plus run counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecTextExportResult {
    /// Full file content, BOM included when requested.
    pub content: String,
    /// Run counters and warnings.
    pub report: SpecExportReport,
}

fn derive_delimiter_byte(c_delimiter: &str) -> Result<u8> {
    match c_delimiter.as_bytes() {
        [n_byte] => Ok(*n_byte),
        _ => Err(ExportError::Configuration(format!(
            "text export delimiter must be a single byte, got: {c_delimiter:?}"
        ))),
    }
}

/// Renders grid rows as delimited text lines.
pub struct DelimitedTextRenderer<'a> {
    pipeline: &'a GridExportPipeline,
    options: &'a SpecTextExportOptions,
    n_delimiter: u8,
    if_quote: bool,
}

impl<'a> DelimitedTextRenderer<'a> {
    /// Renderer for `options`; only `csv` and `txt` formats are accepted.
    pub fn new(
        pipeline: &'a GridExportPipeline,
        options: &'a SpecTextExportOptions,
    ) -> Result<Self> {
        let if_quote = match options.format {
            EnumFileType::Csv => true,
            EnumFileType::Txt => false,
            other => {
                return Err(ExportError::Configuration(format!(
                    "text export supports csv and txt, got: {}",
                    other.extension()
                )));
            }
        };
        let n_delimiter = derive_delimiter_byte(
            options
                .delimiter_override
                .as_deref()
                .unwrap_or(options.delimiter.as_str()),
        )?;
        Ok(Self {
            pipeline,
            options,
            n_delimiter,
            if_quote,
        })
    }

    fn derive_writer(&self) -> Writer<Vec<u8>> {
        let quote_style = if self.if_quote {
            QuoteStyle::Always
        } else {
            QuoteStyle::Never
        };
        let mut wb = WriterBuilder::new();
        wb.delimiter(self.n_delimiter)
            .terminator(Terminator::Any(N_LINE_TERMINATOR))
            .quote_style(quote_style)
            .flexible(true);
        wb.from_writer(Vec::new())
    }

    fn sanitize(&self, column: &SpecColumn, value: EnumCellValue) -> EnumCellValue {
        if column.sanitize_data_export || self.options.sanitize_data_export {
            sanitize_cell_value(value)
        } else {
            value
        }
    }

    /// Render every row of `rows`.
    pub fn render(
        &self,
        columns: &[SpecColumn],
        rows: &dyn RowSource,
    ) -> Result<SpecTextExportResult> {
        let translator = self.pipeline.active_translator()?;
        let grid_options = self.pipeline.grid_options();
        let c_id_property = &grid_options.dataset_id_property_name;

        let l_columns = select_columns(columns);
        let n_len = rows.len();
        let has_grouped_items = !rows.groupings().is_empty();
        let l_kinds: Vec<EnumRowKind> = (0..n_len)
            .map(|i| classify_row(rows.item_at(i), c_id_property))
            .collect();
        let has_group_by_column = has_grouped_items
            && l_kinds
                .iter()
                .any(|kind| matches!(kind, EnumRowKind::GroupHeader { .. }));

        debug!(
            n_columns = l_columns.len(),
            n_rows = n_len,
            format = self.options.format.extension(),
            "text export started"
        );

        let mut report = SpecExportReport::default();
        let mut wtr = self.derive_writer();

        if grid_options.has_column_title_pre_header() {
            let mut l_pre_header = Vec::with_capacity(l_columns.len() + 1);
            if has_group_by_column {
                l_pre_header.push(String::new());
            }
            l_pre_header.extend(
                l_columns
                    .iter()
                    .map(|(_, column)| derive_pre_header_title(column, translator)),
            );
            wtr.write_record(&l_pre_header)?;
        }

        let mut l_header = Vec::with_capacity(l_columns.len() + 1);
        if has_group_by_column {
            l_header.push(derive_group_by_title(
                self.options.grouping_column_header_title.as_deref(),
                grid_options,
                translator,
            ));
        }
        l_header.extend(
            l_columns
                .iter()
                .map(|(_, column)| derive_header_title(column, translator)),
        );
        wtr.write_record(&l_header)?;

        for (i, kind) in l_kinds.iter().enumerate() {
            report.cnt_rows_scanned += 1;
            match (kind, rows.item_at(i)) {
                (EnumRowKind::Item, Some(item)) => {
                    let mut l_fields = Vec::with_capacity(l_columns.len() + 1);
                    if has_group_by_column {
                        l_fields.push(String::new());
                    }
                    let metadata = rows.item_metadata_at(i);
                    let mut colspan_state = SpecColspanState::default();
                    for (n_col_pos, (n_grid_idx, column)) in l_columns.iter().enumerate() {
                        let colspan =
                            metadata.and_then(|meta| meta.colspan_for(&column.id, *n_grid_idx));
                        if colspan_state.step(n_col_pos, l_columns.len(), colspan)
                            == EnumColspanStep::Covered
                        {
                            l_fields.push(String::new());
                            continue;
                        }
                        let value = resolve_export_value(
                            i,
                            *n_grid_idx,
                            item,
                            column,
                            rows,
                            self.options.export_with_formatter,
                        );
                        let c_text = self.sanitize(column, value).to_text();
                        if column.export_csv_force_to_keep_as_string {
                            l_fields.push(format!("=\"{c_text}\""));
                        } else {
                            l_fields.push(c_text);
                        }
                    }
                    wtr.write_record(&l_fields)?;
                    report.cnt_rows_exported += 1;
                }
                (EnumRowKind::GroupHeader { title, level, .. }, _) if has_grouped_items => {
                    let c_indent = " ".repeat(N_GROUP_INDENT_SPACES_PER_LEVEL * level);
                    let c_title = derive_group_title_text(title, 0, false, None);
                    wtr.write_record([format!("{c_indent}{c_title}")])?;
                    report.cnt_group_rows += 1;
                }
                (EnumRowKind::GroupTotals, Some(totals)) => {
                    let mut l_fields = vec![self.options.grouping_aggregator_row_text.clone()];
                    for (_, column) in &l_columns {
                        let value = resolve_group_totals_value(totals, column, rows);
                        l_fields.push(self.sanitize(column, value).to_text());
                    }
                    wtr.write_record(&l_fields)?;
                    report.cnt_totals_rows += 1;
                }
                _ => {
                    trace!(row = i, "skipped row");
                    report.cnt_rows_skipped += 1;
                }
            }
        }

        let mut v_bytes = wtr
            .into_inner()
            .map_err(|err| ExportError::Csv(err.into_error().into()))?;
        // lines are separated, not terminated
        if v_bytes.last() == Some(&N_LINE_TERMINATOR) {
            v_bytes.pop();
        }
        let c_lines = String::from_utf8(v_bytes)
            .map_err(|err| ExportError::DataShape(format!("text export is not UTF-8: {err}")))?;

        let mut content = String::with_capacity(c_lines.len() + C_UTF8_BOM.len());
        if self.options.use_utf8_with_bom {
            content.push_str(C_UTF8_BOM);
        }
        content.push_str(&c_lines);

        debug!(report = %report, "text export finished");
        Ok(SpecTextExportResult { content, report })
    }
}
