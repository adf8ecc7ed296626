//! Record normalization
//!
//! This module converts the loosely typed output of the scraping agent into
//! [`CanonicalRecord`]s. Raw maps never travel past this module.

pub mod fields;
pub mod normalizer;
pub mod record;

pub use fields::FieldReader;
pub use normalizer::{NormalizedBatch, Normalizer};
pub use record::CanonicalRecord;

use serde_json::Value;
use thiserror::Error;

/// A raw field whose value has the wrong shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field '{field}' must be {expected}, found {found}")]
pub struct ValidationError {
    /// Raw key of the offending field
    pub field: &'static str,
    pub expected: &'static str,
    /// JSON type of the value that was found
    pub found: &'static str,
}

impl ValidationError {
    pub fn new(field: &'static str, expected: &'static str, found: &Value) -> Self {
        Self {
            field,
            expected,
            found: json_type(found),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
