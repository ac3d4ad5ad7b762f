//! Change-notification payload posted by the server to a subscription target.
//!
//! Hosting the receiving endpoint is up to the caller; this only parses the
//! body it receives.

use serde::Deserialize;

use crate::error::ApiError;
use crate::response::decode_value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeNotification {
    /// Resource types with created or updated entities.
    #[serde(default)]
    pub modified_entities: Vec<String>,
    /// Resource types with deleted entities; fetch them via `deletedEntities`.
    #[serde(default)]
    pub deleted_entities: Vec<String>,
}

impl ChangeNotification {
    pub fn from_body(body: &str) -> Result<Self, ApiError> {
        let value: serde_json::Value = serde_json::from_str(body).map_err(|e| ApiError::decode(e, body))?;
        decode_value(value)
    }

    pub fn is_empty(&self) -> bool {
        self.modified_entities.is_empty() && self.deleted_entities.is_empty()
    }
}
