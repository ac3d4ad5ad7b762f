//! Webhook subscription management.
//!
//! A subscription asks the server to call `target` whenever entities of the
//! listed resource types change. The server assigns the id and the expiry.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::SchoolDataClient;
use crate::error::ApiError;
use crate::pagination::{Page, PageRequest};
use crate::query::{format_timestamp, Filters};
use crate::resources::{Endpoint, Resource};
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTypeRef {
    pub resource: String,
}

impl ResourceTypeRef {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscription {
    pub name: String,
    pub target: String,
    pub resource_types: Vec<ResourceTypeRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub target: String,
    #[serde(default)]
    pub expires: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub resource_types: Vec<ResourceTypeRef>,
}

impl<T: Transport> SchoolDataClient<T> {
    pub async fn list_subscriptions(&self, page: &PageRequest) -> Result<Page<Subscription>, ApiError> {
        self.list(Resource::Subscriptions, &Filters::new(), page)
            .await?
            .decode()
    }

    pub async fn create_subscription(&self, input: &CreateSubscription) -> Result<Subscription, ApiError> {
        let body = serde_json::to_value(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
        self.call(&Endpoint::create(Resource::Subscriptions), &Filters::new(), Some(&body))
            .await?
            .decode_body()
    }

    pub async fn get_subscription(&self, id: &str) -> Result<Option<Subscription>, ApiError> {
        self.call(
            &Endpoint::by_id(Resource::Subscriptions, id)?,
            &Filters::new(),
            None,
        )
        .await?
        .decode()
    }

    /// Move the expiry of an existing subscription.
    pub async fn update_subscription_expiry(
        &self,
        id: &str,
        expires: DateTime<FixedOffset>,
    ) -> Result<Option<Subscription>, ApiError> {
        let body: Value = json!({ "expires": format_timestamp(&expires) });
        self.call(
            &Endpoint::patch(Resource::Subscriptions, id),
            &Filters::new(),
            Some(&body),
        )
        .await?
        .decode()
    }

    pub async fn delete_subscription(&self, id: &str) -> Result<(), ApiError> {
        self.call(
            &Endpoint::delete(Resource::Subscriptions, id),
            &Filters::new(),
            None,
        )
        .await?;
        Ok(())
    }
}
