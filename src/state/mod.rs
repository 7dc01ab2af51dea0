//! Per-resource state holders.
//!
//! Each holder owns the data it fetched plus a loading flag and the last error
//! message, and exposes async actions against a repository. Failures never
//! escape a fetch: they are logged and stored as a display string. Mutating
//! actions also hand the error back so a form can react to it. Local data is
//! only touched after the backend call succeeds.
//!
//! Actions take `&mut self`, so a holder never has two requests in flight.

mod agents;
mod notifications;
mod properties;
mod property_detail;

pub use agents::AgentsState;
pub use notifications::NotificationsState;
pub use properties::PropertiesState;
pub use property_detail::PropertyDetailState;

use tracing::warn;

use crate::api::{ApiError, ApiResult};
use crate::models::{Page, ValidationError};

/// Page bookkeeping shared by the paginated holders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    pub page_size: u32,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: u64,
}

impl Pager {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
            current_page: 0,
            total_pages: 0,
            total_count: 0,
        }
    }

    pub fn has_more(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn next_page(&self) -> u32 {
        self.current_page + 1
    }

    /// Take over the position and totals of a loaded page. A response
    /// without `pageSize` is counted in pages of the requested size.
    fn record<T>(&mut self, page: Page<T>) -> Vec<T> {
        let page = page.normalized_with(self.page_size);
        self.current_page = page.page.max(1);
        self.total_pages = page.total_pages;
        self.total_count = page.total_count;
        page.items
    }

    fn reset(&mut self) {
        *self = Pager::new(self.page_size);
    }
}

fn record_failure(slot: &mut Option<String>, action: &str, err: &ApiError) {
    warn!(
        status = err.status(),
        correlation_id = err.correlation_id().unwrap_or("-"),
        "Failed to {}: {}",
        action,
        err
    );
    *slot = Some(err.message());
}

/// Local validation failures land in the error slot like backend ones
fn check_input(
    slot: &mut Option<String>,
    action: &str,
    checked: Result<(), ValidationError>,
) -> ApiResult<()> {
    checked.map_err(|e| {
        let err = ApiError::from(e);
        record_failure(slot, action, &err);
        err
    })
}
