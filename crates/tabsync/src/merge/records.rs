//! Conversion of loosely shaped JSON into record sequences.

use serde_json::{Map, Value};

use crate::data::{Cell, Record};
use crate::error::{Result, TabsyncError};

/// Turn a JSON value into records.
///
/// Accepts a snapshot envelope (`{"metadata": .., "data": [..]}`), an array of
/// objects, or a single object. Anything else is not a record sequence.
pub fn records_from_value(value: Value) -> Result<Vec<Record>> {
    match value {
        Value::Object(mut obj) if obj.contains_key("data") => {
            let data = obj.remove("data").unwrap_or(Value::Null);
            match data {
                Value::Array(_) => records_from_value(data),
                other => Err(TabsyncError::InvalidMergeInput(format!(
                    "envelope 'data' must be a list of records, got {}",
                    type_name(&other)
                ))),
            }
        }
        Value::Object(obj) => Ok(vec![record_from_object(&obj)]),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(obj) => Ok(record_from_object(obj)),
                other => Err(TabsyncError::InvalidMergeInput(format!(
                    "element {} is {}, not a record",
                    i,
                    type_name(other)
                ))),
            })
            .collect(),
        other => Err(TabsyncError::InvalidMergeInput(format!(
            "expected a list of records, got {}",
            type_name(&other)
        ))),
    }
}

/// Convert one JSON object into a record, keeping key order.
pub fn record_from_object(obj: &Map<String, Value>) -> Record {
    obj.iter()
        .map(|(k, v)| (k.clone(), Cell::from_json(v)))
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
