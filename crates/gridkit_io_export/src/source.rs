//! Row source contract and structural row classification.

use serde_json::Value;

use crate::conf::C_GROUP_TOTALS_MARKER;
use crate::error::{ExportError, Result};
use crate::spec::{SpecGrouping, SpecItemMetadata};

////////////////////////////////////////////////////////////////////////////////
// #region RowSourceContract

/// Read-only view over the grid rows being exported.
///
/// Implementations must not change while an export reads them.
pub trait RowSource {
    /// Number of logical rows.
    fn len(&self) -> usize;

    /// Whether the source has no rows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row item at `index`; `None` for placeholders or out of range.
    fn item_at(&self, index: usize) -> Option<&Value>;

    /// Per-row cell metadata (colspans).
    fn item_metadata_at(&self, index: usize) -> Option<&SpecItemMetadata>;

    /// Active groupings; empty when the grid is not grouped.
    fn groupings(&self) -> &[SpecGrouping];
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RowClassification

/// Structural kind of one logical row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumRowKind {
    /// Regular data row.
    Item,
    /// Group title row.
    GroupHeader {
        /// Raw group title (may carry HTML).
        title: String,
        /// Nesting level, 0 for top-level groups.
        level: usize,
        /// Whether the group is collapsed.
        collapsed: bool,
    },
    /// Aggregates of one group.
    GroupTotals,
    /// Placeholder or unrecognized row.
    Skip,
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(val) => *val,
        Value::Number(val) => val.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(val) => !val.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Classify a row item.
///
/// An item is a regular row when its id property is present and not null
/// (`0` counts as present) and it carries no truthy totals marker. Totals
/// are recognized by the marker alone. Any other object with a `title` is a
/// group header. Everything else is skipped.
pub fn classify_row(item: Option<&Value>, id_property: &str) -> EnumRowKind {
    let Some(obj) = item.and_then(Value::as_object) else {
        return EnumRowKind::Skip;
    };

    if obj.get(C_GROUP_TOTALS_MARKER).is_some_and(is_truthy) {
        return EnumRowKind::GroupTotals;
    }
    if obj.get(id_property).is_some_and(|id| !id.is_null()) {
        return EnumRowKind::Item;
    }

    match obj.get("title") {
        Some(Value::Null) | None => EnumRowKind::Skip,
        Some(title) => EnumRowKind::GroupHeader {
            title: match title {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            },
            level: obj
                .get("level")
                .and_then(Value::as_u64)
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(0),
            collapsed: obj.get("collapsed").is_some_and(is_truthy),
        },
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region InMemoryRowSource

/// Row source backed by JSON values held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRowSource {
    l_items: Vec<Option<Value>>,
    l_metadata: Vec<Option<SpecItemMetadata>>,
    l_groupings: Vec<SpecGrouping>,
}

impl InMemoryRowSource {
    /// Source over `items`; `Value::Null` entries are placeholders.
    pub fn new(items: Vec<Value>) -> Self {
        let l_items: Vec<Option<Value>> = items
            .into_iter()
            .map(|item| (!item.is_null()).then_some(item))
            .collect();
        let l_metadata = vec![None; l_items.len()];
        Self {
            l_items,
            l_metadata,
            l_groupings: Vec::new(),
        }
    }

    /// Source over a JSON array.
    pub fn from_json(items: Value) -> Result<Self> {
        match items {
            Value::Array(l_items) => Ok(Self::new(l_items)),
            other => Err(ExportError::DataShape(format!(
                "Row items must be an array, got: {}",
                json_kind(&other)
            ))),
        }
    }

    /// Attach metadata (`{"columns": {...}}`) to the row at `index`.
    pub fn with_item_metadata(mut self, index: usize, metadata: Value) -> Result<Self> {
        if index >= self.l_items.len() {
            return Err(ExportError::IndexOverflow(format!(
                "Metadata row index {index} out of range (rows={})",
                self.l_items.len()
            )));
        }
        match metadata.get("columns") {
            Some(columns) if !columns.is_object() => {
                return Err(ExportError::DataShape(format!(
                    "Item metadata `columns` must be an object, got: {}",
                    json_kind(columns)
                )));
            }
            _ => {}
        }
        let meta: SpecItemMetadata = serde_json::from_value(metadata)
            .map_err(|e| ExportError::DataShape(format!("Invalid item metadata: {e}")))?;
        self.l_metadata[index] = Some(meta);
        Ok(self)
    }

    /// Declare the active groupings.
    pub fn with_groupings(mut self, groupings: Vec<SpecGrouping>) -> Self {
        self.l_groupings = groupings;
        self
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl RowSource for InMemoryRowSource {
    fn len(&self) -> usize {
        self.l_items.len()
    }

    fn item_at(&self, index: usize) -> Option<&Value> {
        self.l_items.get(index)?.as_ref()
    }

    fn item_metadata_at(&self, index: usize) -> Option<&SpecItemMetadata> {
        self.l_metadata.get(index)?.as_ref()
    }

    fn groupings(&self) -> &[SpecGrouping] {
        &self.l_groupings
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
