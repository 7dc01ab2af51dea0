use std::sync::Arc;

use super::record_failure;
use crate::api::PropertyRepository;
use crate::models::PropertyDetail;

/// Detail page state: one property with its owner and sale timeline
pub struct PropertyDetailState {
    repo: Arc<dyn PropertyRepository>,
    detail: Option<PropertyDetail>,
    loading: bool,
    error: Option<String>,
}

impl PropertyDetailState {
    pub fn new(repo: Arc<dyn PropertyRepository>) -> Self {
        Self {
            repo,
            detail: None,
            loading: false,
            error: None,
        }
    }

    pub fn detail(&self) -> Option<&PropertyDetail> {
        self.detail.as_ref()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// A failed load clears the previous property so a stale page is never shown
    pub async fn load(&mut self, id: &str) {
        self.loading = true;
        self.error = None;
        let result = self.repo.get_property(id).await;
        self.loading = false;

        match result {
            Ok(mut detail) => {
                detail.traces.sort_by_key(|t| t.date_sale);
                self.detail = Some(detail);
            }
            Err(e) => {
                self.detail = None;
                record_failure(&mut self.error, "load property", &e);
            }
        }
    }
}
