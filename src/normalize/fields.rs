//! Typed field readers over a raw output record
//!
//! Every reader returns `Ok(None)` for an absent or `null` field and a
//! [`ValidationError`] naming the raw key when the value has the wrong shape.

use crate::normalize::ValidationError;
use crate::platform::RawRecord;
use chrono::{DateTime, NaiveDateTime};
use serde_json::Value;

const NAIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Borrowed view of one raw record
pub struct FieldReader<'a> {
    raw: &'a RawRecord,
}

impl<'a> FieldReader<'a> {
    pub fn new(raw: &'a RawRecord) -> Self {
        Self { raw }
    }

    fn value(&self, key: &str) -> Option<&'a Value> {
        match self.raw.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value),
        }
    }

    /// Reads a field that must be a string
    pub fn text(&self, key: &'static str) -> Result<Option<String>, ValidationError> {
        match self.value(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(ValidationError::new(key, "a string", other)),
        }
    }

    /// Reads an identifier-like field that may arrive as a string or a number
    pub fn text_or_number(&self, key: &'static str) -> Result<Option<String>, ValidationError> {
        match self.value(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(ValidationError::new(key, "a string or number", other)),
        }
    }

    /// Reads a field that may be a string or a list of strings, joined with `", "`
    pub fn text_list(&self, key: &'static str) -> Result<Option<String>, ValidationError> {
        match self.value(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Array(items)) => {
                let parts = items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => Ok(s.as_str()),
                        other => Err(ValidationError::new(key, "a list of strings", other)),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Some(parts.join(", ")))
            }
            Some(other) => Err(ValidationError::new(key, "a string or list of strings", other)),
        }
    }

    /// Reads a non-negative count given as an integer or a digit string
    ///
    /// An empty string counts as absent.
    pub fn count(&self, key: &'static str) -> Result<Option<u64>, ValidationError> {
        match self.value(key) {
            None => Ok(None),
            Some(value @ Value::Number(n)) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| ValidationError::new(key, "a non-negative integer", value)),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(value @ Value::String(s)) => parse_digits(s.trim())
                .map(Some)
                .ok_or_else(|| ValidationError::new(key, "a non-negative integer", value)),
            Some(other) => Err(ValidationError::new(key, "a non-negative integer", other)),
        }
    }

    /// Reads a signed identifier given as an integer or a digit string
    pub fn signed(&self, key: &'static str) -> Result<Option<i64>, ValidationError> {
        match self.value(key) {
            None => Ok(None),
            Some(value @ Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| ValidationError::new(key, "an integer", value)),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(value @ Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| ValidationError::new(key, "an integer", value)),
            Some(other) => Err(ValidationError::new(key, "an integer", other)),
        }
    }

    /// Reads a timestamp in naive ISO 8601 or RFC 3339 form
    ///
    /// RFC 3339 values are converted to UTC before the offset is dropped.
    pub fn timestamp(&self, key: &'static str) -> Result<Option<NaiveDateTime>, ValidationError> {
        match self.value(key) {
            None => Ok(None),
            Some(value @ Value::String(s)) => parse_timestamp(s)
                .map(Some)
                .ok_or_else(|| ValidationError::new(key, "an ISO 8601 timestamp", value)),
            Some(other) => Err(ValidationError::new(key, "an ISO 8601 timestamp", other)),
        }
    }
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = NaiveDateTime::parse_from_str(s, NAIVE_TIMESTAMP_FORMAT) {
        return Some(ts);
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|ts| ts.naive_utc())
}
