//! Operational endpoints: `/health`, `/stats`, `/webhooks`, plus lead capture.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::client::ApiClient;
use super::error::ApiResult;
use crate::models::{Lead, NewLead, Page, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(
            self.status.to_ascii_lowercase().as_str(),
            "healthy" | "ok" | "up"
        )
    }
}

/// Aggregate listing statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteStats {
    #[serde(default)]
    pub total_properties: u64,
    #[serde(default)]
    pub active_properties: u64,
    #[serde(default)]
    pub sold_properties: u64,
    #[serde(default)]
    pub total_owners: u64,
    #[serde(default)]
    pub average_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default = "enabled")]
    pub active: bool,
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewWebhook {
    pub url: String,
    pub events: Vec<String>,
}

impl NewWebhook {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.url.starts_with("https://") || self.url.starts_with("http://")) {
            return Err(ValidationError::Invalid {
                field: "url",
                reason: format!("'{}' is not an http(s) URL", self.url),
            });
        }
        if self.events.is_empty() {
            return Err(ValidationError::Missing("events"));
        }
        Ok(())
    }
}

impl ApiClient {
    pub async fn health(&self) -> ApiResult<HealthStatus> {
        self.get(&["health"], &[]).await
    }

    pub async fn stats(&self) -> ApiResult<SiteStats> {
        self.get(&["stats"], &[]).await
    }

    pub async fn list_webhooks(&self) -> ApiResult<Vec<Webhook>> {
        self.get(&["webhooks"], &[]).await
    }

    pub async fn create_webhook(&self, input: &NewWebhook) -> ApiResult<Webhook> {
        input.validate()?;
        self.post(&["webhooks"], input).await
    }

    pub async fn delete_webhook(&self, id: &str) -> ApiResult<()> {
        self.delete(&["webhooks", id]).await
    }

    pub async fn submit_lead(&self, input: &NewLead) -> ApiResult<Lead> {
        input.validate()?;
        self.post(&["leads"], input).await
    }

    pub async fn list_leads(&self, page: u32, page_size: u32) -> ApiResult<Page<Lead>> {
        let params = [
            ("page", page.max(1).to_string()),
            ("pageSize", page_size.to_string()),
        ];
        let page: Page<Lead> = self.get(&["leads"], &params).await?;
        Ok(page.normalized())
    }
}
