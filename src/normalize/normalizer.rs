//! Positional normalization of agent output
//!
//! Output record N belongs to requested entity N. The platform gives no
//! correlation key, so pairing relies on the agent preserving request order.
//! Batches whose lengths differ are refused outright.

use crate::ledger::{ErrorEntry, GENERAL_SCOPE};
use crate::normalize::fields::FieldReader;
use crate::normalize::record::CanonicalRecord;
use crate::normalize::ValidationError;
use crate::platform::{FetchError, RawRecord};

/// Outcome of normalizing one batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    /// Records that passed validation, in input order
    pub records: Vec<CanonicalRecord>,
    /// One entry per failed record, keyed by entity id
    pub errors: Vec<(String, ErrorEntry)>,
}

/// Converts raw output into canonical records for one source
#[derive(Debug, Clone)]
pub struct Normalizer {
    data_source: String,
}

impl Normalizer {
    pub fn new(data_source: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
        }
    }

    /// Normalizes `raw` against `entity_ids` by position
    ///
    /// # Arguments
    ///
    /// * `raw` - Agent output in the order the agent produced it
    /// * `entity_ids` - Entity ids in the order their targets were submitted
    ///
    /// # Returns
    ///
    /// The valid records plus one error per invalid record. A record that fails
    /// validation never affects its siblings. When the lengths differ no record is
    /// produced and a single general-scope error is returned instead.
    pub fn normalize(&self, raw: &[RawRecord], entity_ids: &[String]) -> NormalizedBatch {
        if raw.len() != entity_ids.len() {
            let mismatch = FetchError::Cardinality {
                expected: entity_ids.len(),
                actual: raw.len(),
            };
            tracing::error!("{}", mismatch);
            return NormalizedBatch {
                records: Vec::new(),
                errors: vec![(GENERAL_SCOPE.to_string(), mismatch.ledger_entry())],
            };
        }

        let mut batch = NormalizedBatch::default();
        for (item, entity_id) in raw.iter().zip(entity_ids) {
            match self.normalize_record(item, entity_id) {
                Ok(record) => batch.records.push(record),
                Err(e) => {
                    let label = item
                        .get("name")
                        .and_then(|name| name.as_str())
                        .unwrap_or(entity_id.as_str());
                    let description = format!("Validation error for company {}: {}", label, e);
                    tracing::error!("{}", description);
                    batch
                        .errors
                        .push((entity_id.clone(), ErrorEntry::crawling(description)));
                }
            }
        }

        tracing::debug!(
            "Normalized {} of {} records",
            batch.records.len(),
            raw.len()
        );
        batch
    }

    /// Validates a single raw record and attributes it to `entity_id`
    pub fn normalize_record(
        &self,
        raw: &RawRecord,
        entity_id: &str,
    ) -> Result<CanonicalRecord, ValidationError> {
        let fields = FieldReader::new(raw);

        Ok(CanonicalRecord {
            id: entity_id.to_string(),
            data_source: self.data_source.clone(),
            name: fields.text("name")?,
            link: fields.text("companyUrl")?,
            location: fields.text("location")?,
            industry: fields.text("industry")?,
            industry_code: fields.text_or_number("industryCode")?,
            description: fields.text("description")?,
            website: fields.text("website")?,
            phone: fields.text("phone")?,
            specialities: fields.text_list("specialties")?,
            size: fields.text("companySize")?,
            logo: fields.text("logo")?,
            banner: fields.text("banner")?,
            domain: fields.text("domain")?,
            address: fields.text("companyAddress")?,
            headquarters: fields.text("headquarters")?,
            founded: fields.text_or_number("founded")?,
            follower_count: fields.count("followerCount")?,
            employee_count: fields.count("employeesOnLinkedIn")?,
            company_id: fields.signed("mainCompanyID")?,
            linkedin_id: fields.text_or_number("linkedinID")?,
            sales_navigator_link: fields.text("salesNavigatorLink")?,
            query: fields.text("query")?,
            timestamp: fields.timestamp("timestamp")?,
        })
    }
}
