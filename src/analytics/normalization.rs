//! Normalization map and measurement registration
//!
//! The normalization map tells analytics which measurement each canonical field
//! feeds. Registering the map creates one measurement per mapping; nested
//! mappings are registered under the measurement of their parent.

use crate::analytics::{AnalyticsError, AnalyticsSink, MeasurementDescriptor};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

/// Measurements one source contributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationMap {
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Mappings")]
    pub mappings: Vec<FieldMapping>,
}

/// Mapping of one canonical field onto a measurement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(rename = "SourceField")]
    pub source_field: String,
    #[serde(rename = "DataType")]
    pub data_type: String,
    #[serde(rename = "MeasurementName")]
    pub measurement_name: String,
    #[serde(
        rename = "NestedMappings",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub nested_mappings: Vec<FieldMapping>,
    /// Id analytics assigned when the mapping was registered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_measurement_id: Option<String>,
}

impl FieldMapping {
    pub fn new(source_field: &str, data_type: &str, measurement_name: &str) -> Self {
        Self {
            source_field: source_field.to_string(),
            data_type: data_type.to_string(),
            measurement_name: measurement_name.to_string(),
            nested_mappings: Vec::new(),
            source_measurement_id: None,
        }
    }
}

const COMPANY_FIELDS: &[(&str, &str, &str)] = &[
    ("name", "text", "company name"),
    ("link", "link", "linkedin profile url"),
    ("location", "text", "location of company"),
    ("industry", "text", "industry of company"),
    ("industry_code", "text", "industry code of company"),
    ("description", "text", "description of company"),
    ("website", "link", "website of company"),
    ("phone", "text", "phone number of company"),
    ("specialities", "text", "specialities of company"),
    ("size", "text", "size of company"),
    ("logo", "link", "logo url of company"),
    ("banner", "link", "banner url of company"),
    ("domain", "text", "domain of company"),
    ("address", "text", "address of company"),
    ("headquarters", "text", "headquarters of company"),
    ("founded", "text", "founding year of company"),
    ("follower_count", "int", "number of followers of company"),
    ("employee_count", "int", "number of employees in company"),
    ("company_id", "int", "linkedin company id"),
    ("linkedin_id", "text", "linkedin id of company"),
    ("sales_navigator_link", "link", "sales navigator url of company"),
];

impl NormalizationMap {
    /// The map for canonical company records of `source`
    pub fn company(source: &str) -> Self {
        Self {
            source: source.to_string(),
            mappings: COMPANY_FIELDS
                .iter()
                .map(|(field, data_type, name)| FieldMapping::new(field, data_type, name))
                .collect(),
        }
    }
}

/// Registers every mapping of `map` with analytics
///
/// Assigned ids are written back into `map` so the caller can hand the annotated
/// map to the module registry.
///
/// # Arguments
///
/// * `sink` - The analytics service
/// * `token` - Bearer token, passed through untouched
/// * `map` - The map to register; updated in place
/// * `source_module_id` - Id of the source module the measurements belong to
///
/// # Returns
///
/// * `Ok(Vec<MeasurementDescriptor>)` - Every registered measurement, parents before children
/// * `Err(AnalyticsError)` - The first registration that failed
pub async fn register_measurements(
    sink: &dyn AnalyticsSink,
    token: &str,
    map: &mut NormalizationMap,
    source_module_id: &str,
) -> Result<Vec<MeasurementDescriptor>, AnalyticsError> {
    let registered =
        register_mappings(sink, token, &mut map.mappings, None, source_module_id).await?;
    tracing::info!(
        "Registered {} measurements for source {}",
        registered.len(),
        map.source
    );
    Ok(registered)
}

fn register_mappings<'a>(
    sink: &'a dyn AnalyticsSink,
    token: &'a str,
    mappings: &'a mut [FieldMapping],
    parent_id: Option<String>,
    source_module_id: &'a str,
) -> BoxFuture<'a, Result<Vec<MeasurementDescriptor>, AnalyticsError>> {
    async move {
        let mut registered = Vec::new();
        for mapping in mappings.iter_mut() {
            let descriptor = MeasurementDescriptor {
                source_module_id: Some(source_module_id.to_string()),
                data_type: mapping.data_type.clone(),
                measurement_name: mapping.measurement_name.clone(),
                parent_measurement_id: parent_id.clone(),
            };

            let id = sink.submit_measurement(token, &descriptor).await?;
            tracing::debug!("Measurement '{}' registered as {}", mapping.measurement_name, id);
            mapping.source_measurement_id = Some(id.clone());
            registered.push(descriptor);

            if !mapping.nested_mappings.is_empty() {
                let nested = register_mappings(
                    sink,
                    token,
                    &mut mapping.nested_mappings,
                    Some(id),
                    source_module_id,
                )
                .await?;
                registered.extend(nested);
            }
        }
        Ok(registered)
    }
    .boxed()
}
