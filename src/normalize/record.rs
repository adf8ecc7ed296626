use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A validated company profile
///
/// Only `id` and `data_source` are guaranteed; every scraped attribute is
/// optional because the agent omits whatever the profile page does not show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Entity id of the request item this record answers
    pub id: String,
    /// Source tag, e.g. `linkedin`
    pub data_source: String,
    pub name: Option<String>,
    /// Profile URL as scraped
    pub link: Option<String>,
    pub location: Option<String>,
    pub industry: Option<String>,
    pub industry_code: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub specialities: Option<String>,
    /// Headcount band, e.g. `51-200 employees`
    pub size: Option<String>,
    pub logo: Option<String>,
    pub banner: Option<String>,
    pub domain: Option<String>,
    pub address: Option<String>,
    pub headquarters: Option<String>,
    pub founded: Option<String>,
    pub follower_count: Option<u64>,
    pub employee_count: Option<u64>,
    /// Numeric company id assigned by the source
    pub company_id: Option<i64>,
    pub linkedin_id: Option<String>,
    pub sales_navigator_link: Option<String>,
    /// Query the agent was given for this profile
    pub query: Option<String>,
    /// When the agent scraped the profile
    pub timestamp: Option<NaiveDateTime>,
}

impl CanonicalRecord {
    /// Creates a record with no scraped attributes
    pub fn empty(id: impl Into<String>, data_source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data_source: data_source.into(),
            name: None,
            link: None,
            location: None,
            industry: None,
            industry_code: None,
            description: None,
            website: None,
            phone: None,
            specialities: None,
            size: None,
            logo: None,
            banner: None,
            domain: None,
            address: None,
            headquarters: None,
            founded: None,
            follower_count: None,
            employee_count: None,
            company_id: None,
            linkedin_id: None,
            sales_navigator_link: None,
            query: None,
            timestamp: None,
        }
    }
}
