//! Grid export pipeline: header rows, body rows, group rows and colspans.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::column::{SpecColumn, Translator};
use crate::conf::{
    C_TRANSLATION_KEY_GROUP_BY, EnumFmtKey, N_GROUP_INDENT_SPACES_PER_LEVEL, N_NCOLS_EXCEL_MAX,
    N_NROWS_EXCEL_MAX, derive_default_export_format,
};
use crate::error::{ExportError, Result};
use crate::formatter::{resolve_export_value, resolve_group_totals_value};
use crate::source::{EnumRowKind, RowSource, classify_row};
use crate::spec::{
    EnumCellValue, EnumColspan, EnumExportCell, SpecCustomHeaderSheet, SpecExcelExportOptions,
    SpecExportReport, SpecExportResult, SpecGridOptions, SpecMergeRange, SpecTabularExportModel,
};
use crate::style::{StyleRegistry, resolve_cell_by_field_type};
use crate::util::{
    convert_to_title_case, plan_horizontal_merges, sanitize_cell_value, sanitize_html_to_text,
};

////////////////////////////////////////////////////////////////////////////////
// #region SharedRowHelpers

/// Columns taking part in the export, paired with their grid column index.
pub fn select_columns(columns: &[SpecColumn]) -> Vec<(usize, &SpecColumn)> {
    columns
        .iter()
        .enumerate()
        .filter(|(_, column)| column.is_exported())
        .collect()
}

/// Header text of a column, HTML stripped.
///
/// `translator` is only passed when translation is enabled.
pub fn derive_header_title(column: &SpecColumn, translator: Option<&dyn Translator>) -> String {
    let c_title = match (translator, column.name_key.as_deref()) {
        (Some(translator), Some(key)) => translator.translate(key),
        _ => match column.name.as_deref().filter(|name| !name.is_empty()) {
            Some(name) => name.to_string(),
            None => convert_to_title_case(column.field_key()),
        },
    };
    sanitize_html_to_text(&c_title)
}

/// Pre-header label of a column (empty when the column has no group).
pub fn derive_pre_header_title(column: &SpecColumn, translator: Option<&dyn Translator>) -> String {
    let c_title = match (translator, column.column_group_key.as_deref()) {
        (Some(translator), Some(key)) => translator.translate(key),
        _ => column.column_group.clone().unwrap_or_default(),
    };
    sanitize_html_to_text(&c_title)
}

/// Header text of the leading "Group By" column.
pub fn derive_group_by_title(
    header_title: Option<&str>,
    grid_options: &SpecGridOptions,
    translator: Option<&dyn Translator>,
) -> String {
    match (header_title, translator) {
        (Some(title), _) => title.to_string(),
        (None, Some(translator)) => translator.translate(C_TRANSLATION_KEY_GROUP_BY),
        (None, None) => grid_options.locales.text_group_by.clone(),
    }
}

/// Text of a group title row.
///
/// With `symbols = Some((collapsed, expanded))` the title is prefixed by the
/// glyph and `5 * level` spaces of indentation.
pub fn derive_group_title_text(
    title: &str,
    level: usize,
    collapsed: bool,
    symbols: Option<(&str, &str)>,
) -> String {
    let c_title = sanitize_html_to_text(title);
    match symbols {
        Some((c_collapsed, c_expanded)) => {
            let c_glyph = if collapsed { c_collapsed } else { c_expanded };
            let c_indent = " ".repeat(N_GROUP_INDENT_SPACES_PER_LEVEL * level);
            format!("{c_glyph} {c_indent}{c_title}")
        }
        None => c_title,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColspanState

/// Span tracking threaded through the cells of one row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecColspanState {
    /// Columns still owned by the running span, the anchor included.
    pub pending_span: usize,
    /// Column position where the running span started.
    pub span_start_column: usize,
}

/// What to emit at one column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumColspanStep {
    /// Emit the real cell; `span` columns are covered, 1 means no merge.
    Anchor {
        /// Covered column count.
        span: usize,
    },
    /// Emit an empty placeholder covered by the running span.
    Covered,
}

impl SpecColspanState {
    /// Advance to column position `col_pos` of `n_cols` with the colspan
    /// declared for that cell.
    pub fn step(
        &mut self,
        col_pos: usize,
        n_cols: usize,
        colspan: Option<EnumColspan>,
    ) -> EnumColspanStep {
        if self.pending_span > 1 {
            self.pending_span -= 1;
            return EnumColspanStep::Covered;
        }

        let n_remaining = n_cols.saturating_sub(col_pos).max(1);
        let n_span = match colspan {
            Some(EnumColspan::Wildcard) => n_remaining,
            Some(EnumColspan::Span(n)) if n > 1 => n.min(n_remaining),
            _ => 1,
        };
        *self = Self {
            pending_span: n_span,
            span_start_column: col_pos,
        };
        EnumColspanStep::Anchor { span: n_span }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region GridExportPipeline

/// Builds a [`SpecTabularExportModel`] out of grid columns and rows.
#[derive(Clone, Default)]
pub struct GridExportPipeline {
    grid_options: SpecGridOptions,
    translator: Option<Arc<dyn Translator>>,
}

/// Mutable state of one run.
struct RunState {
    registry: StyleRegistry,
    l_rows: Vec<Vec<EnumExportCell>>,
    l_merges: Vec<SpecMergeRange>,
    report: SpecExportReport,
}

impl GridExportPipeline {
    /// Pipeline over the given grid options, without translator.
    pub fn new(grid_options: SpecGridOptions) -> Self {
        Self {
            grid_options,
            translator: None,
        }
    }

    /// Attach the translator used when `enable_translate` is set.
    pub fn with_translator(mut self, translator: impl Translator + 'static) -> Self {
        self.translator = Some(Arc::new(translator));
        self
    }

    /// Grid options of this pipeline.
    pub fn grid_options(&self) -> &SpecGridOptions {
        &self.grid_options
    }

    /// Translator to use for this run; `None` when translation is off.
    pub fn active_translator(&self) -> Result<Option<&dyn Translator>> {
        if !self.grid_options.enable_translate {
            return Ok(None);
        }
        match self.translator.as_deref() {
            Some(translator) => Ok(Some(translator)),
            None => Err(ExportError::Configuration(
                "enable_translate is set but no Translator was provided".to_string(),
            )),
        }
    }

    /// Walk `rows` and build the export model.
    pub fn run(
        &self,
        columns: &[SpecColumn],
        rows: &dyn RowSource,
        options: &SpecExcelExportOptions,
    ) -> Result<SpecExportResult> {
        let translator = self.active_translator()?;

        let l_columns = select_columns(columns);
        let n_len = rows.len();
        let has_grouped_items = !rows.groupings().is_empty();
        let l_kinds: Vec<EnumRowKind> = (0..n_len)
            .map(|i| classify_row(rows.item_at(i), &self.grid_options.dataset_id_property_name))
            .collect();
        let has_group_by_column = has_grouped_items
            && l_kinds
                .iter()
                .any(|kind| matches!(kind, EnumRowKind::GroupHeader { .. }));
        let n_col_offset = usize::from(has_group_by_column);

        if n_col_offset + l_columns.len() > N_NCOLS_EXCEL_MAX {
            return Err(ExportError::IndexOverflow(format!(
                "{} exported columns exceed the worksheet limit {N_NCOLS_EXCEL_MAX}",
                n_col_offset + l_columns.len()
            )));
        }

        debug!(
            n_columns = l_columns.len(),
            n_rows = n_len,
            has_grouped_items,
            "grid export started"
        );

        let mut state = RunState {
            registry: StyleRegistry::new(),
            l_rows: Vec::new(),
            l_merges: Vec::new(),
            report: SpecExportReport::default(),
        };

        if let Some(fn_header) = &options.custom_excel_header {
            let mut sheet = SpecCustomHeaderSheet {
                sheet_name: &options.sheet_name,
                rows: Vec::new(),
                merges: Vec::new(),
                styles: &mut state.registry,
            };
            fn_header(&mut sheet);
            let SpecCustomHeaderSheet { rows, merges, .. } = sheet;
            state.l_rows.extend(rows);
            state.l_merges.extend(merges);
        }

        if self.grid_options.has_column_title_pre_header() {
            self.push_pre_header_row(&mut state, &l_columns, has_group_by_column, translator);
        }
        self.push_header_row(&mut state, &l_columns, has_group_by_column, options, translator);

        for (i, kind) in l_kinds.iter().enumerate() {
            state.report.cnt_rows_scanned += 1;
            match kind {
                EnumRowKind::Item => {
                    let Some(item) = rows.item_at(i) else {
                        continue;
                    };
                    let row = self.read_item_row(
                        &mut state,
                        i,
                        item,
                        rows,
                        &l_columns,
                        n_col_offset,
                        options,
                    );
                    state.l_rows.push(row);
                    state.report.cnt_rows_exported += 1;
                }
                EnumRowKind::GroupHeader {
                    title,
                    level,
                    collapsed,
                } if has_grouped_items => {
                    let symbols = options.add_group_indentation.then_some((
                        options.group_collapsed_symbol.as_str(),
                        options.group_expanded_symbol.as_str(),
                    ));
                    let c_title = derive_group_title_text(title, *level, *collapsed, symbols);
                    state.l_rows.push(vec![EnumExportCell::text(c_title)]);
                    state.report.cnt_group_rows += 1;
                }
                EnumRowKind::GroupTotals => {
                    let Some(totals) = rows.item_at(i) else {
                        continue;
                    };
                    let mut row = vec![EnumExportCell::text(
                        options.grouping_aggregator_row_text.clone(),
                    )];
                    for (_, column) in &l_columns {
                        let mut value = resolve_group_totals_value(totals, column, rows);
                        if column.sanitize_data_export || options.sanitize_data_export {
                            value = sanitize_cell_value(value);
                        }
                        row.push(EnumExportCell::Scalar(value));
                    }
                    state.l_rows.push(row);
                    state.report.cnt_totals_rows += 1;
                }
                EnumRowKind::GroupHeader { .. } | EnumRowKind::Skip => {
                    trace!(row = i, "skipped row");
                    state.report.cnt_rows_skipped += 1;
                }
            }
        }

        if state.l_rows.len() > N_NROWS_EXCEL_MAX {
            return Err(ExportError::IndexOverflow(format!(
                "{} exported rows exceed the worksheet limit {N_NROWS_EXCEL_MAX}",
                state.l_rows.len()
            )));
        }

        let mut column_widths = Vec::with_capacity(n_col_offset + l_columns.len());
        if has_group_by_column {
            column_widths.push(options.custom_column_width);
        }
        column_widths.extend(
            l_columns
                .iter()
                .map(|(_, column)| column.export_column_width.or(options.custom_column_width)),
        );

        debug!(report = %state.report, "grid export finished");

        Ok(SpecExportResult {
            model: SpecTabularExportModel {
                rows: state.l_rows,
                column_widths,
            },
            merges: state.l_merges,
            styles: state.registry.into_styles(),
            report: state.report,
        })
    }

    fn push_pre_header_row(
        &self,
        state: &mut RunState,
        l_columns: &[(usize, &SpecColumn)],
        has_group_by_column: bool,
        translator: Option<&dyn Translator>,
    ) {
        let n_style_id = state
            .registry
            .register(&derive_default_export_format(EnumFmtKey::PreHeader));
        let l_labels: Vec<String> = l_columns
            .iter()
            .map(|(_, column)| derive_pre_header_title(column, translator))
            .collect();

        let n_row_idx = state.l_rows.len();
        let n_col_offset = usize::from(has_group_by_column);
        let mut row = Vec::with_capacity(n_col_offset + l_labels.len());
        if has_group_by_column {
            row.push(EnumExportCell::styled(EnumCellValue::from(""), n_style_id));
        }
        row.extend(l_labels.iter().map(|label| {
            EnumExportCell::styled(EnumCellValue::from(label.as_str()), n_style_id)
        }));

        state
            .l_merges
            .extend(plan_horizontal_merges(&l_labels, n_row_idx, n_col_offset));
        state.l_rows.push(row);
    }

    fn push_header_row(
        &self,
        state: &mut RunState,
        l_columns: &[(usize, &SpecColumn)],
        has_group_by_column: bool,
        options: &SpecExcelExportOptions,
        translator: Option<&dyn Translator>,
    ) {
        let mut fmt_header = derive_default_export_format(EnumFmtKey::Header);
        if let Some(fmt_patch) = &options.column_header_style {
            fmt_header = fmt_header.merge(fmt_patch);
        }
        let n_style_id = state.registry.register(&fmt_header);

        let mut row = Vec::with_capacity(usize::from(has_group_by_column) + l_columns.len());
        if has_group_by_column {
            let c_title = derive_group_by_title(
                options.grouping_column_header_title.as_deref(),
                &self.grid_options,
                translator,
            );
            row.push(EnumExportCell::styled(EnumCellValue::String(c_title), n_style_id));
        }
        for (_, column) in l_columns {
            let c_title = derive_header_title(column, translator);
            row.push(EnumExportCell::styled(EnumCellValue::String(c_title), n_style_id));
        }
        state.l_rows.push(row);
    }

    #[allow(clippy::too_many_arguments)]
    fn read_item_row(
        &self,
        state: &mut RunState,
        row_idx: usize,
        item: &serde_json::Value,
        rows: &dyn RowSource,
        l_columns: &[(usize, &SpecColumn)],
        n_col_offset: usize,
        options: &SpecExcelExportOptions,
    ) -> Vec<EnumExportCell> {
        let n_sheet_row_idx = state.l_rows.len();
        let n_cols = l_columns.len();
        let metadata = rows.item_metadata_at(row_idx);

        let mut row = Vec::with_capacity(n_col_offset + n_cols);
        if n_col_offset > 0 {
            row.push(EnumExportCell::blank());
        }

        let mut colspan_state = SpecColspanState::default();
        for (n_col_pos, (n_grid_idx, column)) in l_columns.iter().enumerate() {
            let colspan = metadata.and_then(|meta| meta.colspan_for(&column.id, *n_grid_idx));
            let n_span = match colspan_state.step(n_col_pos, n_cols, colspan) {
                EnumColspanStep::Covered => {
                    row.push(EnumExportCell::blank());
                    continue;
                }
                EnumColspanStep::Anchor { span } => span,
            };
            if n_span > 1 {
                state.l_merges.push(SpecMergeRange {
                    row_idx: n_sheet_row_idx,
                    col_idx_start: n_col_offset + n_col_pos,
                    col_idx_end: n_col_offset + n_col_pos + n_span - 1,
                });
            }

            let mut value = resolve_export_value(
                row_idx,
                *n_grid_idx,
                item,
                column,
                rows,
                options.export_with_formatter,
            );
            if column.sanitize_data_export || options.sanitize_data_export {
                value = sanitize_cell_value(value);
            }

            if column.export_with_formatter == Some(true) {
                row.push(EnumExportCell::Scalar(value));
                continue;
            }

            let field_type = column.effective_field_type();
            let if_date_candidate = field_type.is_date() && !value.is_falsy();
            let cell = resolve_cell_by_field_type(value, field_type, &mut state.registry);
            if if_date_candidate && cell.style_id().is_none() {
                let c_msg = format!(
                    "row {row_idx}, column {:?}: value {:?} is not a valid {field_type} date",
                    column.id,
                    cell.value().to_text()
                );
                warn!("{c_msg}");
                state.report.warn(c_msg);
            }
            row.push(cell);
        }
        row
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
