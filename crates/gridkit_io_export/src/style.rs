//! Per-run style registry and field-type driven cell styling.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::conf::{EnumFmtKey, derive_default_export_format};
use crate::spec::{
    EnumCellValue, EnumExportCell, EnumFieldType, SpecCellFormat, SpecRegisteredStyle,
};
use crate::util::parse_float_value;

////////////////////////////////////////////////////////////////////////////////
// #region StyleRegistry

/// Maps style descriptors to stable integer ids for one export run.
///
/// Id `0` stays reserved for the workbook default style; the first
/// registered descriptor gets `1`. Registering an equal descriptor again
/// returns the id it already has.
#[derive(Debug, Clone, Default)]
pub struct StyleRegistry {
    dict_style_ids: HashMap<SpecCellFormat, u32>,
    l_styles: Vec<SpecRegisteredStyle>,
}

impl StyleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id of `format`, registering it on first use.
    pub fn register(&mut self, format: &SpecCellFormat) -> u32 {
        if let Some(n_id) = self.dict_style_ids.get(format) {
            return *n_id;
        }
        let n_id = self.l_styles.len() as u32 + 1;
        self.dict_style_ids.insert(format.clone(), n_id);
        self.l_styles.push(SpecRegisteredStyle {
            id: n_id,
            format: format.clone(),
        });
        n_id
    }

    /// Descriptor registered under `id`.
    pub fn get(&self, id: u32) -> Option<&SpecCellFormat> {
        let n_idx = usize::try_from(id).ok()?.checked_sub(1)?;
        self.l_styles.get(n_idx).map(|style| &style.format)
    }

    /// Registered styles ordered by id.
    pub fn styles(&self) -> &[SpecRegisteredStyle] {
        &self.l_styles
    }

    /// Consume the registry into its ordered style table.
    pub fn into_styles(self) -> Vec<SpecRegisteredStyle> {
        self.l_styles
    }

    /// Number of registered styles.
    pub fn len(&self) -> usize {
        self.l_styles.len()
    }

    /// Whether nothing was registered yet.
    pub fn is_empty(&self) -> bool {
        self.l_styles.is_empty()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DateFormats

/// Display format of a date field type: the grid literal (also used as the
/// spreadsheet number format) and the equivalent chrono pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecDateFormat {
    /// Grid/spreadsheet format literal, e.g. `YYYY-MM-DD`.
    pub literal: &'static str,
    /// chrono strftime pattern producing the same text.
    pub pattern: &'static str,
}

const fn date_format(literal: &'static str, pattern: &'static str) -> SpecDateFormat {
    SpecDateFormat { literal, pattern }
}

/// Date format implied by a date-family field type; `None` for other types.
pub fn derive_date_format(field_type: EnumFieldType) -> Option<SpecDateFormat> {
    use EnumFieldType as F;

    let fmt = match field_type {
        F::Date | F::DateIso => date_format("YYYY-MM-DD", "%Y-%m-%d"),
        F::DateUtc => date_format("YYYY-MM-DDTHH:mm:ss.SSSZ", "%Y-%m-%dT%H:%M:%S%.3f%:z"),
        F::DateTime | F::DateTimeIso => date_format("YYYY-MM-DD HH:mm:ss", "%Y-%m-%d %H:%M:%S"),
        F::DateTimeShortIso => date_format("YYYY-MM-DD HH:mm", "%Y-%m-%d %H:%M"),
        F::DateTimeIsoAmPm => date_format("YYYY-MM-DD hh:mm:ss a", "%Y-%m-%d %I:%M:%S %P"),
        F::DateTimeIsoAmPmUpper => date_format("YYYY-MM-DD hh:mm:ss A", "%Y-%m-%d %I:%M:%S %p"),
        F::DateEuro => date_format("DD/MM/YYYY", "%d/%m/%Y"),
        F::DateEuroShort => date_format("D/M/YY", "%-d/%-m/%y"),
        F::DateTimeEuro => date_format("DD/MM/YYYY HH:mm:ss", "%d/%m/%Y %H:%M:%S"),
        F::DateTimeShortEuro => date_format("DD/MM/YYYY HH:mm", "%d/%m/%Y %H:%M"),
        F::DateTimeEuroAmPm => date_format("DD/MM/YYYY hh:mm:ss a", "%d/%m/%Y %I:%M:%S %P"),
        F::DateTimeEuroAmPmUpper => date_format("DD/MM/YYYY hh:mm:ss A", "%d/%m/%Y %I:%M:%S %p"),
        F::DateTimeEuroShort => date_format("D/M/YY H:m:s", "%-d/%-m/%y %-H:%-M:%-S"),
        F::DateTimeEuroShortAmPm => date_format("D/M/YY h:m:s a", "%-d/%-m/%y %-I:%-M:%-S %P"),
        F::DateTimeEuroShortAmPmUpper => {
            date_format("D/M/YY h:m:s A", "%-d/%-m/%y %-I:%-M:%-S %p")
        }
        F::DateUs => date_format("MM/DD/YYYY", "%m/%d/%Y"),
        F::DateUsShort => date_format("M/D/YY", "%-m/%-d/%y"),
        F::DateTimeUs => date_format("MM/DD/YYYY HH:mm:ss", "%m/%d/%Y %H:%M:%S"),
        F::DateTimeShortUs => date_format("MM/DD/YYYY HH:mm", "%m/%d/%Y %H:%M"),
        F::DateTimeUsAmPm => date_format("MM/DD/YYYY hh:mm:ss a", "%m/%d/%Y %I:%M:%S %P"),
        F::DateTimeUsAmPmUpper => date_format("MM/DD/YYYY hh:mm:ss A", "%m/%d/%Y %I:%M:%S %p"),
        F::DateTimeUsShort => date_format("M/D/YY H:m:s", "%-m/%-d/%y %-H:%-M:%-S"),
        F::DateTimeUsShortAmPm => date_format("M/D/YY h:m:s a", "%-m/%-d/%y %-I:%-M:%-S %P"),
        F::DateTimeUsShortAmPmUpper => date_format("M/D/YY h:m:s A", "%-m/%-d/%y %-I:%-M:%-S %p"),
        _ => return None,
    };
    Some(fmt)
}

const TUP_ISO_DATETIME_PATTERNS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a date value as UTC wall-clock time.
///
/// Accepts RFC 3339 text (offsets are normalized to UTC), ISO-8601 date or
/// date-time text, text already in `fmt`, and numbers as epoch milliseconds.
pub fn parse_date_value(value: &EnumCellValue, fmt: &SpecDateFormat) -> Option<NaiveDateTime> {
    match value {
        EnumCellValue::Number(n_millis) if n_millis.is_finite() => {
            DateTime::from_timestamp_millis(*n_millis as i64).map(|dt| dt.naive_utc())
        }
        EnumCellValue::String(text) => parse_date_text(text.trim(), fmt),
        _ => None,
    }
}

fn parse_date_text(text: &str, fmt: &SpecDateFormat) -> Option<NaiveDateTime> {
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    for pattern in TUP_ISO_DATETIME_PATTERNS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, pattern) {
            return Some(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(dt) = DateTime::parse_from_str(text, fmt.pattern) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt.pattern) {
        return Some(dt);
    }
    NaiveDate::parse_from_str(text, fmt.pattern)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Render a UTC wall-clock time with a date format.
pub fn format_date_value(dt: &NaiveDateTime, fmt: &SpecDateFormat) -> String {
    dt.and_utc().format(fmt.pattern).to_string()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FieldTypeResolver

/// Map one exported scalar to its cell according to the column field type.
///
/// - Date types: falsy values pass through; parseable values are reformatted
///   to the type's format and styled with that format; unparseable values
///   pass through unchanged.
/// - Numeric types: lenient float parse, `NaN` becomes `null`, styled with
///   the shared `"0"` number format.
/// - Any other type: the scalar is returned unstyled.
pub fn resolve_cell_by_field_type(
    value: EnumCellValue,
    field_type: EnumFieldType,
    registry: &mut StyleRegistry,
) -> EnumExportCell {
    if let Some(fmt) = derive_date_format(field_type) {
        if value.is_falsy() {
            return EnumExportCell::Scalar(value);
        }
        let Some(dt) = parse_date_value(&value, &fmt) else {
            return EnumExportCell::Scalar(value);
        };
        let n_style_id = registry.register(&SpecCellFormat {
            num_format: Some(fmt.literal.to_string()),
            ..Default::default()
        });
        return EnumExportCell::styled(
            EnumCellValue::String(format_date_value(&dt, &fmt)),
            n_style_id,
        );
    }

    if field_type.is_number() {
        let n_value = parse_float_value(&value);
        let value_out = if n_value.is_nan() {
            EnumCellValue::None
        } else {
            EnumCellValue::Number(n_value)
        };
        let n_style_id = registry.register(&derive_default_export_format(EnumFmtKey::Number));
        return EnumExportCell::styled(value_out, n_style_id);
    }

    EnumExportCell::Scalar(value)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
