use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OwnerRole {
    #[default]
    #[serde(alias = "owner")]
    Owner,
    #[serde(alias = "agent")]
    Agent,
    #[serde(alias = "admin")]
    Admin,
}

impl fmt::Display for OwnerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OwnerRole::Owner => "Owner",
            OwnerRole::Agent => "Agent",
            OwnerRole::Admin => "Admin",
        };
        f.write_str(label)
    }
}

/// A property owner or listing agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    #[serde(alias = "idOwner")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub role: OwnerRole,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default, alias = "properties")]
    pub property_ids: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Owner {
    pub fn listing_count(&self) -> usize {
        self.property_ids.len()
    }
}

/// Payload for registering an owner or agent
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewOwner {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub role: OwnerRole,
    pub specialties: Vec<String>,
}

impl NewOwner {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::Missing("name"));
        }
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err(ValidationError::Invalid {
                    field: "email",
                    reason: format!("'{}' is not an email address", email),
                });
            }
        }
        Ok(())
    }
}
