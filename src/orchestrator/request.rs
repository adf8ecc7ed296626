//! Inbound request interpretation
//!
//! A companies request maps each entity id to the handles known for it, grouped
//! by field type. Only field types configured as URL channels are considered,
//! and only values containing the source's domain marker are usable targets.

use crate::config::SourceConfig;
use crate::ledger::{ErrorEntry, ErrorKind, ErrorLedger, GENERAL_SCOPE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Identifier of the task a request belongs to, as chosen by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskId {
    Number(i64),
    Text(String),
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Companies to scrape, keyed by entity id, then by field type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompaniesRequest {
    pub task_id: TaskId,
    pub companies: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

/// One entity and the target submitted for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestItem {
    pub entity_id: String,
    /// Profile URL for scraping, or a free-text query for discovery
    pub target: String,
}

impl RequestItem {
    pub fn new(entity_id: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            target: target.into(),
        }
    }
}

/// An entity that cannot be scraped as requested
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnsupportedInputError {
    #[error("No {domain_marker} URL found for company {entity_id} in field types [{channels}]")]
    NoTarget {
        entity_id: String,
        domain_marker: String,
        /// Configured URL channels, comma separated
        channels: String,
    },

    #[error("Company id '{entity_id}' is reserved for run-level errors")]
    ReservedId { entity_id: String },
}

impl UnsupportedInputError {
    pub fn entity_id(&self) -> &str {
        match self {
            Self::NoTarget { entity_id, .. } | Self::ReservedId { entity_id } => entity_id,
        }
    }

    pub fn ledger_entry(&self) -> ErrorEntry {
        ErrorEntry::new(ErrorKind::UnsupportedInputError, self.to_string())
    }
}

/// Request items plus the entities that had to be rejected
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedItems {
    pub items: Vec<RequestItem>,
    pub rejected: Vec<UnsupportedInputError>,
}

impl ExtractedItems {
    /// Records every rejected entity in `ledger`
    ///
    /// A reserved id has no key of its own in the ledger, so it is only logged;
    /// writing it would overwrite the run-level slot.
    pub fn record_rejections(&self, ledger: &mut ErrorLedger) {
        for rejection in &self.rejected {
            match rejection {
                UnsupportedInputError::ReservedId { .. } => {
                    tracing::error!("{}, not recorded in the error ledger", rejection);
                }
                UnsupportedInputError::NoTarget { entity_id, .. } => {
                    ledger.record(entity_id.clone(), rejection.ledger_entry());
                }
            }
        }
    }
}

/// Picks one target per entity from `request`
///
/// Channels are tried in configured order and values in request order; the first
/// value containing the domain marker wins. Items come out ordered by entity id.
pub fn extract_request_items(request: &CompaniesRequest, source: &SourceConfig) -> ExtractedItems {
    let mut extracted = ExtractedItems::default();

    for (entity_id, handles) in &request.companies {
        if entity_id == GENERAL_SCOPE {
            let rejection = UnsupportedInputError::ReservedId {
                entity_id: entity_id.clone(),
            };
            tracing::warn!("{}", rejection);
            extracted.rejected.push(rejection);
            continue;
        }

        let target = source
            .url_channels
            .iter()
            .filter_map(|channel| handles.get(channel))
            .flatten()
            .find(|value| value.contains(&source.domain_marker));

        match target {
            Some(target) => extracted
                .items
                .push(RequestItem::new(entity_id.clone(), target.clone())),
            None => {
                let rejection = UnsupportedInputError::NoTarget {
                    entity_id: entity_id.clone(),
                    domain_marker: source.domain_marker.clone(),
                    channels: source.url_channels.join(", "),
                };
                tracing::warn!("{}", rejection);
                extracted.rejected.push(rejection);
            }
        }
    }

    tracing::debug!(
        "Extracted {} request items, rejected {} companies",
        extracted.items.len(),
        extracted.rejected.len()
    );
    extracted
}
