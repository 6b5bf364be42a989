//! Row source backed by a polars `DataFrame` or Arrow IPC bytes.

use std::io::Cursor;

use polars::prelude::{AnyValue, DataFrame, IpcReader, SerReader};
use serde_json::{Map, Number, Value};

use crate::error::Result;
use crate::source::RowSource;
use crate::spec::{SpecGrouping, SpecItemMetadata};

/// Row source whose items are the rows of a DataFrame, one JSON object per row.
///
/// When the frame has no column named like the id property, the row index
/// is used as id so every row exports as a regular item.
#[derive(Debug, Clone, Default)]
pub struct DataFrameRowSource {
    l_items: Vec<Value>,
    l_groupings: Vec<SpecGrouping>,
}

impl DataFrameRowSource {
    /// Materialize every row of `df`.
    pub fn from_dataframe(df: &DataFrame, id_property: &str) -> Result<Self> {
        let l_cols = df.get_columns();
        let if_synthesize_id = !l_cols
            .iter()
            .any(|col| col.name().as_str() == id_property);

        let mut l_items = Vec::with_capacity(df.height());
        for idx_row in 0..df.height() {
            let mut dict_item = Map::with_capacity(l_cols.len() + 1);
            if if_synthesize_id {
                dict_item.insert(id_property.to_string(), Value::from(idx_row));
            }
            for col in l_cols {
                let value = col.get(idx_row)?;
                dict_item.insert(
                    col.name().to_string(),
                    derive_json_value_from_any_value(value),
                );
            }
            l_items.push(Value::Object(dict_item));
        }

        Ok(Self {
            l_items,
            l_groupings: Vec::new(),
        })
    }

    /// Decode Arrow IPC bytes and materialize every row.
    pub fn from_ipc_bytes(v_ipc_df: &[u8], id_property: &str) -> Result<Self> {
        let df = derive_dataframe_from_ipc_bytes(v_ipc_df)?;
        Self::from_dataframe(&df, id_property)
    }

    /// Declare the active groupings.
    pub fn with_groupings(mut self, groupings: Vec<SpecGrouping>) -> Self {
        self.l_groupings = groupings;
        self
    }
}

impl RowSource for DataFrameRowSource {
    fn len(&self) -> usize {
        self.l_items.len()
    }

    fn item_at(&self, index: usize) -> Option<&Value> {
        self.l_items.get(index)
    }

    fn item_metadata_at(&self, _index: usize) -> Option<&SpecItemMetadata> {
        None
    }

    fn groupings(&self) -> &[SpecGrouping] {
        &self.l_groupings
    }
}

fn derive_dataframe_from_ipc_bytes(v_ipc_df: &[u8]) -> Result<DataFrame> {
    Ok(IpcReader::new(Cursor::new(v_ipc_df)).finish()?)
}

fn derive_json_number(val: f64) -> Value {
    Number::from_f64(val).map_or(Value::Null, Value::Number)
}

fn derive_json_value_from_any_value(value: AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(val) => Value::Bool(val),
        AnyValue::String(val) => Value::String(val.to_string()),
        AnyValue::StringOwned(val) => Value::String(val.to_string()),
        AnyValue::UInt8(val) => Value::from(val),
        AnyValue::UInt16(val) => Value::from(val),
        AnyValue::UInt32(val) => Value::from(val),
        AnyValue::UInt64(val) => Value::from(val),
        AnyValue::Int8(val) => Value::from(val),
        AnyValue::Int16(val) => Value::from(val),
        AnyValue::Int32(val) => Value::from(val),
        AnyValue::Int64(val) => Value::from(val),
        AnyValue::Int128(val) => derive_json_number(val as f64),
        AnyValue::Float32(val) => derive_json_number(val as f64),
        AnyValue::Float64(val) => derive_json_number(val),
        _ => Value::String(value.to_string()),
    }
}
