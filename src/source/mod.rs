//! The record collection: one JSON array per session, no retry.

use std::{fs, path::Path};

use log::info;
use serde_json::Value;

use crate::errors::SourceLoadError;
use crate::models::Record;

pub fn parse_records(json: &str) -> Result<Vec<Record>, SourceLoadError> {
    let value: Value = serde_json::from_str(json)?;
    let found = match &value {
        Value::Array(_) => None,
        Value::Null => Some("null"),
        Value::Bool(_) => Some("a boolean"),
        Value::Number(_) => Some("a number"),
        Value::String(_) => Some("a string"),
        Value::Object(_) => Some("an object"),
    };
    if let Some(found) = found {
        return Err(SourceLoadError::NotAnArray { found });
    }
    Ok(serde_json::from_value(value)?)
}

pub fn load_records(path: &Path) -> Result<Vec<Record>, SourceLoadError> {
    let contents = fs::read_to_string(path).map_err(|source| SourceLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let records = parse_records(&contents)?;
    info!("Loaded {} update records from {}", records.len(), path.display());
    Ok(records)
}
