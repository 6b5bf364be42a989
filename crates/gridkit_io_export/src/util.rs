//! Stateless helper utilities used by the export pipeline and writers.

use std::sync::OnceLock;

use regex::Regex;

use crate::conf::{N_LEN_EXCEL_SHEET_NAME_MAX, TUP_EXCEL_ILLEGAL};
use crate::spec::{EnumCellValue, SpecMergeRange};

////////////////////////////////////////////////////////////////////////////////
// #region ColumnLetters

const C_COLUMN_ALPHABET: &[u8; 26] = b"ZABCDEFGHIJKLMNOPQRSTUVWXY";

/// Excel column name for a 1-based column index (bijective base-26).
///
/// `1 -> "A"`, `26 -> "Z"`, `27 -> "AA"`. Index `0` has no name.
pub fn derive_excel_column_name(index: usize) -> Option<String> {
    if index == 0 {
        return None;
    }

    let n_rem = index % 26;
    let mut n_next = index / 26;
    if n_rem == 0 {
        n_next -= 1;
    }
    let c_letter = char::from(C_COLUMN_ALPHABET[n_rem]);

    if index > 26 {
        let c_prefix = derive_excel_column_name(n_next)?;
        return Some(format!("{c_prefix}{c_letter}"));
    }
    Some(c_letter.to_string())
}

/// Inverse of [`derive_excel_column_name`]: `"AA" -> 27`.
pub fn parse_excel_column_index(name: &str) -> Option<usize> {
    if name.is_empty() {
        return None;
    }

    let mut n_index = 0usize;
    for chr in name.chars() {
        if !chr.is_ascii_alphabetic() {
            return None;
        }
        let n_digit = (chr.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        n_index = n_index.checked_mul(26)?.checked_add(n_digit)?;
    }
    Some(n_index)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TextNormalization

fn html_tag_re() -> &'static Regex {
    static HTML_TAG_RE: OnceLock<Regex> = OnceLock::new();
    HTML_TAG_RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("html tag regex must compile"))
}

fn title_word_re() -> &'static Regex {
    static TITLE_WORD_RE: OnceLock<Regex> = OnceLock::new();
    TITLE_WORD_RE.get_or_init(|| Regex::new(r"\w\S*").expect("title word regex must compile"))
}

fn float_prefix_re() -> &'static Regex {
    static FLOAT_PREFIX_RE: OnceLock<Regex> = OnceLock::new();
    FLOAT_PREFIX_RE.get_or_init(|| {
        Regex::new(r"^\s*([+-]?(?:Infinity|\d+\.?\d*(?:[eE][+-]?\d+)?|\.\d+(?:[eE][+-]?\d+)?))")
            .expect("float prefix regex must compile")
    })
}

/// Remove HTML tags, keeping the text between them.
pub fn sanitize_html_to_text(html: &str) -> String {
    html_tag_re().replace_all(html, "").into_owned()
}

/// Strip HTML from a scalar; non-text scalars are returned unchanged.
pub fn sanitize_cell_value(value: EnumCellValue) -> EnumCellValue {
    match value {
        EnumCellValue::String(val) => EnumCellValue::String(sanitize_html_to_text(&val)),
        other => other,
    }
}

/// Upper-case the first char of every word and lower-case the rest.
pub fn convert_to_title_case(text: &str) -> String {
    title_word_re()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let mut chars = caps[0].chars();
            match chars.next() {
                Some(first) => {
                    let mut word: String = first.to_uppercase().collect();
                    word.push_str(&chars.as_str().to_lowercase());
                    word
                }
                None => String::new(),
            }
        })
        .into_owned()
}

/// Parse the leading numeric prefix of `text` (`"12px" -> 12`); `NaN` when none.
pub fn parse_float_prefix(text: &str) -> f64 {
    let Some(caps) = float_prefix_re().captures(text) else {
        return f64::NAN;
    };
    let c_number = &caps[1];
    match c_number.trim_start_matches(['+', '-']) {
        "Infinity" if c_number.starts_with('-') => f64::NEG_INFINITY,
        "Infinity" => f64::INFINITY,
        _ => c_number.parse::<f64>().unwrap_or(f64::NAN),
    }
}

/// Numeric reading of a scalar with the same leniency as [`parse_float_prefix`].
pub fn parse_float_value(value: &EnumCellValue) -> f64 {
    match value {
        EnumCellValue::Number(val) => *val,
        EnumCellValue::String(val) => parse_float_prefix(val),
        EnumCellValue::Boolean(_) | EnumCellValue::None => f64::NAN,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ObjectAccess

/// Follow a dot-notation path (`"address.city"`) into a JSON object.
pub fn get_descendant_property<'a>(
    item: &'a serde_json::Value,
    path: &str,
) -> Option<&'a serde_json::Value> {
    path.split('.')
        .try_fold(item, |current, key| current.as_object()?.get(key))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region HeaderMergeUtils

/// Plan merges for one header row: every maximal run of equal, non-empty
/// labels becomes one range (single-column runs included).
///
/// Empty labels are never merged and break runs. `col_offset` shifts the
/// planned ranges right, e.g. past a leading "Group By" column.
pub fn plan_horizontal_merges(
    header_row: &[String],
    row_idx: usize,
    col_offset: usize,
) -> Vec<SpecMergeRange> {
    let mut l_merges = Vec::new();
    let n_cols = header_row.len();
    let mut n_col_idx = 0;

    while n_col_idx < n_cols {
        let c_cell_val = &header_row[n_col_idx];
        if c_cell_val.is_empty() {
            n_col_idx += 1;
            continue;
        }

        let mut n_col_idx_end = n_col_idx + 1;
        while n_col_idx_end < n_cols && header_row[n_col_idx_end] == *c_cell_val {
            n_col_idx_end += 1;
        }

        l_merges.push(SpecMergeRange {
            row_idx,
            col_idx_start: col_offset + n_col_idx,
            col_idx_end: col_offset + n_col_idx_end - 1,
        });
        n_col_idx = n_col_idx_end;
    }

    l_merges
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
