//! Result artifact produced by the remote validation service
//!
//! Accepted product rows arrive as loosely-typed JSON objects. They are
//! converted into [`ProductRow`]s whose attributes are checked against the
//! accepted headers of the same artifact.

use crate::error::{PimError, Result};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Fallback diagnostic for a failed job that carries no error details.
const UNKNOWN_FAILURE: &str = "Processing failed. Check server logs.";

/// A single attribute value of an accepted product row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    Number(f64),
    TextList(Vec<String>),
}

impl AttributeValue {
    /// Convert a JSON value into an attribute value.
    ///
    /// Returns `Ok(None)` for `null`, which is treated as an absent attribute.
    pub fn from_json(attribute: &str, value: &Value) -> Result<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::String(text) => Ok(Some(AttributeValue::Text(text.clone()))),
            Value::Number(number) => number
                .as_f64()
                .map(|n| Some(AttributeValue::Number(n)))
                .ok_or_else(|| PimError::invalid_value(attribute, "number out of range")),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(text) => Ok(text.clone()),
                    other => Err(PimError::invalid_value(
                        attribute,
                        format!("list entries must be text, found {}", other),
                    )),
                })
                .collect::<Result<Vec<_>>>()
                .map(|list| Some(AttributeValue::TextList(list))),
            Value::Bool(_) | Value::Object(_) => Err(PimError::invalid_value(
                attribute,
                format!("expected text, number, or list of text, found {}", value),
            )),
        }
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::Text(text) => f.write_str(text),
            AttributeValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            AttributeValue::Number(n) => write!(f, "{}", n),
            AttributeValue::TextList(list) => f.write_str(&list.join("; ")),
        }
    }
}

/// An accepted product row: attribute name to value, in accepted-header order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductRow {
    cells: Vec<(String, AttributeValue)>,
}

impl ProductRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from a JSON object, validating every present attribute
    /// against `accepted_headers`.
    ///
    /// Cells are ordered by their position in `accepted_headers`.
    pub fn from_json_object(object: &Map<String, Value>, accepted_headers: &[String]) -> Result<Self> {
        if let Some(unknown) = object
            .keys()
            .find(|key| !accepted_headers.iter().any(|header| header == *key))
        {
            return Err(PimError::UnknownAttribute(unknown.clone()));
        }

        let mut row = Self::new();
        for header in accepted_headers {
            if let Some(raw) = object.get(header) {
                if let Some(value) = AttributeValue::from_json(header, raw)? {
                    row.insert(header.clone(), value);
                }
            }
        }

        Ok(row)
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn insert(&mut self, attribute: impl Into<String>, value: AttributeValue) {
        let attribute = attribute.into();
        match self.cells.iter_mut().find(|(name, _)| *name == attribute) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((attribute, value)),
        }
    }

    pub fn get(&self, attribute: &str) -> Option<&AttributeValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == attribute)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for ProductRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Normalized outcome of a processing job.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultArtifact {
    pub file_name: String,
    /// Column names in upload order
    pub original_headers: Vec<String>,
    /// Column names recognized as attributes, in display order
    pub accepted_headers: Vec<String>,
    /// Column names present in the file but not recognized
    pub ignored_headers: Vec<String>,
    pub accepted_rows: Vec<ProductRow>,
    pub validation_errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rows_in_preview: Option<u64>,
}

impl ResultArtifact {
    /// Synthesize the artifact shown for a job the service reported as failed.
    ///
    /// `error_details` is rendered as-is when it is a string, as JSON otherwise.
    pub fn failed(file_name: impl Into<String>, message: impl Into<String>, error_details: Option<&Value>) -> Self {
        let diagnostic = match error_details {
            Some(Value::String(detail)) if !detail.trim().is_empty() => detail.clone(),
            Some(Value::Null) | None => UNKNOWN_FAILURE.to_string(),
            Some(Value::String(_)) => UNKNOWN_FAILURE.to_string(),
            Some(other) => other.to_string(),
        };

        Self {
            file_name: file_name.into(),
            validation_errors: vec![diagnostic],
            message: Some(message.into()),
            total_rows_in_preview: Some(0),
            ..Self::default()
        }
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted_rows.len()
    }

    /// Validation errors plus ignored columns, the count shown on the issues view.
    pub fn issue_count(&self) -> usize {
        self.validation_errors.len() + self.ignored_headers.len()
    }

    pub fn has_issues(&self) -> bool {
        self.issue_count() > 0
    }
}
