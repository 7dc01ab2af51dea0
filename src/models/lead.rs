use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ValidationError;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Converted,
    Lost,
}

impl LeadStatus {
    /// Converted and lost leads are closed
    pub fn is_closed(&self) -> bool {
        matches!(self, LeadStatus::Converted | LeadStatus::Lost)
    }
}

/// A contact request captured from a listing or agent page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub property_id: Option<String>,
    #[serde(default, alias = "agentId")]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub status: LeadStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Contact form payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

impl NewLead {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::Missing("name"));
        }
        if self.email.trim().is_empty() {
            return Err(ValidationError::Missing("email"));
        }
        if !self.email.contains('@') {
            return Err(ValidationError::Invalid {
                field: "email",
                reason: format!("'{}' is not an email address", self.email),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_form_requires_a_real_email() {
        let mut lead = NewLead {
            name: "Ana".into(),
            email: "ana.example.com".into(),
            message: "Is the villa still available?".into(),
            ..Default::default()
        };
        assert!(lead.validate().is_err());

        lead.email = "ana@example.com".into();
        assert!(lead.validate().is_ok());
    }

    #[test]
    fn closed_statuses() {
        assert!(LeadStatus::Lost.is_closed());
        assert!(!LeadStatus::Qualified.is_closed());
    }
}
