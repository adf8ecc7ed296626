use crate::normalize::{FieldReader, ValidationError};
use crate::platform::RawRecord;
use serde::{Deserialize, Serialize};

/// A company found by the discovery agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredCompany {
    pub name: Option<String>,
    /// Profile URL of the company
    pub url: Option<String>,
}

impl DiscoveredCompany {
    /// Reads the `title` and `linkedinUrl` of one discovery result
    pub fn from_raw(raw: &RawRecord) -> Result<Self, ValidationError> {
        let fields = FieldReader::new(raw);
        Ok(Self {
            name: fields.text("title")?,
            url: fields.text("linkedinUrl")?,
        })
    }
}
