//! Result fetcher
//!
//! The final output of a finished agent is reached through two indirections:
//! the agent's output metadata names the storage folders, and the configured
//! storage template turns those folders and the output filename into a URL.

use crate::platform::client::{AutomationPlatform, RawRecord};
use crate::platform::error::FetchError;
use crate::platform::launcher::Agent;
use std::sync::Arc;
use url::Url;

/// Substitutes the storage folders and filename into `template`
pub fn render_storage_location(
    template: &str,
    org_s3_folder: &str,
    s3_folder: &str,
    filename: &str,
) -> String {
    template
        .replace("{orgS3Folder}", org_s3_folder)
        .replace("{s3Folder}", s3_folder)
        .replace("{filename}", filename)
}

/// Rejects output whose length differs from the number of requested targets
///
/// Records are paired with their entities by position, so a length mismatch
/// makes every pairing unreliable.
pub fn check_cardinality(expected: usize, records: &[RawRecord]) -> Result<(), FetchError> {
    if records.len() != expected {
        return Err(FetchError::Cardinality {
            expected,
            actual: records.len(),
        });
    }
    Ok(())
}

/// Locates and downloads agent output
pub struct ResultFetcher {
    platform: Arc<dyn AutomationPlatform>,
    storage_template: String,
}

impl ResultFetcher {
    pub fn new(platform: Arc<dyn AutomationPlatform>, storage_template: impl Into<String>) -> Self {
        Self {
            platform,
            storage_template: storage_template.into(),
        }
    }

    /// Resolves where `agent_id` wrote its latest output
    ///
    /// # Arguments
    ///
    /// * `agent_id` - The agent whose output to locate
    /// * `filename` - Output filename without extension
    ///
    /// # Returns
    ///
    /// * `Ok(Url)` - The resolved output location
    /// * `Err(FetchError)` - Metadata unavailable or incomplete, or the rendered
    ///   location is not a valid URL
    pub async fn resolve_output_location(
        &self,
        agent_id: &str,
        filename: &str,
    ) -> Result<Url, FetchError> {
        let metadata = self
            .platform
            .fetch_metadata(agent_id)
            .await
            .map_err(|source| FetchError::Metadata {
                agent_id: agent_id.to_string(),
                source,
            })?;

        let org_s3_folder = metadata
            .org_s3_folder
            .filter(|folder| !folder.is_empty())
            .ok_or_else(|| FetchError::MissingMetadata {
                agent_id: agent_id.to_string(),
                field: "orgS3Folder",
            })?;
        let s3_folder = metadata
            .s3_folder
            .filter(|folder| !folder.is_empty())
            .ok_or_else(|| FetchError::MissingMetadata {
                agent_id: agent_id.to_string(),
                field: "s3Folder",
            })?;

        let location =
            render_storage_location(&self.storage_template, &org_s3_folder, &s3_folder, filename);
        tracing::debug!("Output of agent {} resolved to {}", agent_id, location);

        Url::parse(&location).map_err(|source| FetchError::InvalidLocation { location, source })
    }

    /// Downloads the output at `location`
    pub async fn fetch(&self, location: &Url) -> Result<Vec<RawRecord>, FetchError> {
        let records = self
            .platform
            .fetch_raw(location)
            .await
            .map_err(|source| FetchError::Retrieval { source })?;

        tracing::info!("Retrieved {} records from {}", records.len(), location);
        Ok(records)
    }

    /// Resolves, downloads and optionally checks the output of `agent`
    ///
    /// # Arguments
    ///
    /// * `agent` - The agent whose output to fetch
    /// * `expected` - Number of records the output must contain, if known
    pub async fn fetch_for(
        &self,
        agent: &Agent,
        expected: Option<usize>,
    ) -> Result<Vec<RawRecord>, FetchError> {
        let location = self
            .resolve_output_location(&agent.id, &agent.output_filename)
            .await?;
        let records = self.fetch(&location).await?;

        if let Some(expected) = expected {
            check_cardinality(expected, &records)?;
        }
        Ok(records)
    }
}
