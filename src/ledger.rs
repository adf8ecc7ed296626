//! Per-run error ledger
//!
//! The ledger collects one error per failing entity without aborting the work on
//! other entities. Errors that cannot be attributed to a single entity (launch,
//! poll and fetch failures) are stored under the reserved [`GENERAL_SCOPE`] key.
//!
//! A ledger is created for each run and handed back with its result; it is never
//! shared between runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ledger key reserved for errors not tied to one entity
pub const GENERAL_SCOPE: &str = "GENERAL";

/// Classification of a ledger entry as reported downstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Our side failed to make sense of the data (validation, cardinality, panics)
    CrawlingError,
    /// The automation platform failed (transport, status codes, timeouts)
    CrawlingExternalError,
    /// The inbound request did not contain a usable target for the entity
    UnsupportedInputError,
    /// The analytics service rejected or failed to receive a record
    AnalyticsError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CrawlingError => "CrawlingError",
            Self::CrawlingExternalError => "CrawlingExternalError",
            Self::UnsupportedInputError => "UnsupportedInputError",
            Self::AnalyticsError => "AnalyticsError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recorded failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub error_type: ErrorKind,
    pub error_description: String,
}

impl ErrorEntry {
    pub fn new(error_type: ErrorKind, description: impl Into<String>) -> Self {
        Self {
            error_type,
            error_description: description.into(),
        }
    }

    /// Shorthand for a [`ErrorKind::CrawlingError`] entry
    pub fn crawling(description: impl Into<String>) -> Self {
        Self::new(ErrorKind::CrawlingError, description)
    }

    /// Shorthand for a [`ErrorKind::CrawlingExternalError`] entry
    pub fn external(description: impl Into<String>) -> Self {
        Self::new(ErrorKind::CrawlingExternalError, description)
    }
}

/// Errors of one run, keyed by entity id
///
/// Recording twice for the same key overwrites the earlier entry, so the ledger
/// never holds more than one entry per entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorLedger {
    entries: BTreeMap<String, ErrorEntry>,
}

impl ErrorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error for an entity, replacing any earlier entry
    ///
    /// Returns the replaced entry, if there was one.
    pub fn record(&mut self, entity_id: impl Into<String>, entry: ErrorEntry) -> Option<ErrorEntry> {
        let entity_id = entity_id.into();
        tracing::debug!(
            "Recording {} for {}: {}",
            entry.error_type,
            entity_id,
            entry.error_description
        );
        self.entries.insert(entity_id, entry)
    }

    /// Records an error under the general scope
    pub fn record_general(&mut self, entry: ErrorEntry) -> Option<ErrorEntry> {
        self.record(GENERAL_SCOPE, entry)
    }

    pub fn get(&self, entity_id: &str) -> Option<&ErrorEntry> {
        self.entries.get(entity_id)
    }

    /// Returns the general-scope entry, if one was recorded
    pub fn general(&self) -> Option<&ErrorEntry> {
        self.entries.get(GENERAL_SCOPE)
    }

    pub fn has_general(&self) -> bool {
        self.entries.contains_key(GENERAL_SCOPE)
    }

    /// Number of entries tied to a specific entity
    pub fn entity_failures(&self) -> usize {
        self.entries
            .keys()
            .filter(|key| key.as_str() != GENERAL_SCOPE)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ErrorEntry)> {
        self.entries.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, ErrorEntry> {
        self.entries
    }
}

impl Extend<(String, ErrorEntry)> for ErrorLedger {
    fn extend<T: IntoIterator<Item = (String, ErrorEntry)>>(&mut self, iter: T) {
        for (entity_id, entry) in iter {
            self.record(entity_id, entry);
        }
    }
}
