use std::sync::Arc;
use tracing::{debug, info};

use super::{check_input, record_failure, Pager};
use crate::api::{ApiResult, PropertyQuery, PropertyRepository, DEFAULT_PAGE_SIZE};
use crate::filter::{apply_filters, PropertyFilter};
use crate::models::{NewProperty, Property, PropertyUpdate};

/// Listing page state: the loaded properties and the query that produced them
pub struct PropertiesState {
    repo: Arc<dyn PropertyRepository>,
    filter: PropertyFilter,
    items: Vec<Property>,
    pager: Pager,
    loading: bool,
    error: Option<String>,
}

impl PropertiesState {
    pub fn new(repo: Arc<dyn PropertyRepository>) -> Self {
        Self::with_page_size(repo, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(repo: Arc<dyn PropertyRepository>, page_size: u32) -> Self {
        Self {
            repo,
            filter: PropertyFilter::default(),
            items: Vec::new(),
            pager: Pager::new(page_size),
            loading: false,
            error: None,
        }
    }

    pub fn items(&self) -> &[Property] {
        &self.items
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn filter(&self) -> &PropertyFilter {
        &self.filter
    }

    pub fn pager(&self) -> Pager {
        self.pager
    }

    pub fn has_more(&self) -> bool {
        self.pager.has_more()
    }

    /// Load the first page for the current filter, replacing what is loaded
    pub async fn fetch(&mut self) {
        self.load_page(1, false).await;
    }

    /// Same as `fetch`; the retry action of a failed list
    pub async fn refresh(&mut self) {
        self.fetch().await;
    }

    /// Filter server-side: store the filter and reload from page 1
    pub async fn set_filter(&mut self, filter: PropertyFilter) {
        self.filter = filter;
        self.pager.reset();
        self.fetch().await;
    }

    /// Append the next page. Returns false when every page is already loaded.
    pub async fn load_more(&mut self) -> bool {
        if !self.pager.has_more() {
            return false;
        }
        let next = self.pager.next_page();
        self.load_page(next, true).await
    }

    async fn load_page(&mut self, page: u32, append: bool) -> bool {
        let query = PropertyQuery {
            page,
            page_size: self.pager.page_size,
            filter: self.filter.clone(),
        };
        debug!(source = self.repo.source_name(), page, append, "Loading properties");

        self.loading = true;
        self.error = None;
        let result = self.repo.list_properties(&query).await;
        self.loading = false;

        match result {
            Ok(page) => {
                let items = self.pager.record(page);
                if append {
                    self.items.extend(items);
                } else {
                    self.items = items;
                }
                true
            }
            Err(e) => {
                record_failure(&mut self.error, "load properties", &e);
                false
            }
        }
    }

    /// Loaded properties narrowed by a local filter
    pub fn visible(&self, filter: &PropertyFilter) -> Vec<Property> {
        apply_filters(&self.items, filter)
    }

    pub async fn create(&mut self, input: &NewProperty) -> ApiResult<Property> {
        check_input(&mut self.error, "create property", input.validate())?;
        self.loading = true;
        let result = self.repo.create_property(input).await;
        self.loading = false;

        match result {
            Ok(property) => {
                info!(id = %property.id, "Property created");
                self.items.insert(0, property.clone());
                self.pager.total_count += 1;
                self.error = None;
                Ok(property)
            }
            Err(e) => {
                record_failure(&mut self.error, "create property", &e);
                Err(e)
            }
        }
    }

    pub async fn update(&mut self, id: &str, changes: &PropertyUpdate) -> ApiResult<Property> {
        check_input(&mut self.error, "update property", changes.validate())?;
        self.loading = true;
        let result = self.repo.update_property(id, changes).await;
        self.loading = false;

        match result {
            Ok(updated) => {
                if let Some(slot) = self.items.iter_mut().find(|p| p.id == updated.id) {
                    *slot = updated.clone();
                }
                self.error = None;
                Ok(updated)
            }
            Err(e) => {
                record_failure(&mut self.error, "update property", &e);
                Err(e)
            }
        }
    }

    pub async fn delete(&mut self, id: &str) -> ApiResult<()> {
        self.loading = true;
        let result = self.repo.delete_property(id).await;
        self.loading = false;

        match result {
            Ok(()) => {
                let before = self.items.len();
                self.items.retain(|p| p.id != id);
                if self.items.len() < before {
                    self.pager.total_count = self.pager.total_count.saturating_sub(1);
                }
                self.error = None;
                Ok(())
            }
            Err(e) => {
                record_failure(&mut self.error, "delete property", &e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, ProblemDetails};
    use crate::fixtures::MockBackend;
    use crate::models::{PropertyStatus, PropertyType};

    fn state(page_size: u32) -> (PropertiesState, Arc<MockBackend>) {
        let backend = Arc::new(MockBackend::new());
        (PropertiesState::with_page_size(backend.clone(), page_size), backend)
    }

    #[tokio::test]
    async fn load_more_appends_until_last_page() {
        let (mut state, _) = state(4);
        state.fetch().await;
        assert_eq!(state.items().len(), 4);
        assert_eq!(state.pager().total_pages, 2);

        assert!(state.load_more().await);
        assert_eq!(state.items().len(), 6);
        assert!(!state.has_more());

        assert!(!state.load_more().await);
        assert_eq!(state.items().len(), 6);
        let ids: Vec<&str> = state.items().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5", "6"]);
    }

    #[tokio::test]
    async fn set_filter_resets_to_first_page() {
        let (mut state, _) = state(2);
        state.fetch().await;
        state.load_more().await;
        assert_eq!(state.pager().current_page, 2);

        state
            .set_filter(PropertyFilter::default().with_property_types([PropertyType::Penthouse]))
            .await;
        assert_eq!(state.pager().current_page, 1);
        assert_eq!(state.pager().total_count, 1);
        assert_eq!(state.items()[0].id, "1");
    }

    #[tokio::test]
    async fn failures_become_messages_and_keep_data() {
        let (mut state, backend) = state(12);
        state.fetch().await;
        assert_eq!(state.items().len(), 6);

        backend
            .set_failure(Some(ApiError::Problem(
                ProblemDetails::new(503, "Service Unavailable").with_detail("Listings are offline"),
            )))
            .await;
        state.refresh().await;
        assert_eq!(state.error(), Some("Listings are offline"));
        assert_eq!(state.items().len(), 6);
        assert!(!state.loading());

        backend.set_failure(None).await;
        state.refresh().await;
        assert_eq!(state.error(), None);
    }

    #[tokio::test]
    async fn create_update_delete_apply_after_success() {
        let (mut state, backend) = state(12);
        state.fetch().await;

        let created = state
            .create(&NewProperty {
                name: "Fisher Island Residence".into(),
                address: "7000 Fisher Island Dr".into(),
                city: "Miami Beach".into(),
                price: 6_300_000,
                property_type: Some(PropertyType::Condo),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.id, "7");
        assert_eq!(state.items()[0].id, "7");
        assert_eq!(state.pager().total_count, 7);

        let updated = state
            .update(
                "7",
                &PropertyUpdate {
                    status: Some(PropertyStatus::Pending),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, PropertyStatus::Pending);
        assert_eq!(state.items()[0].status, PropertyStatus::Pending);

        backend
            .set_failure(Some(ApiError::network("connection reset", "cid")))
            .await;
        assert!(state.delete("7").await.is_err());
        assert!(state.items().iter().any(|p| p.id == "7"));

        backend.set_failure(None).await;
        state.delete("7").await.unwrap();
        assert!(state.items().iter().all(|p| p.id != "7"));
        assert_eq!(state.pager().total_count, 6);
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_backend() {
        let (mut state, _) = state(12);
        let err = state.create(&NewProperty::default()).await.unwrap_err();
        assert_eq!(err.status(), 422);
        assert_eq!(err.message(), "name is required");
        assert_eq!(state.error(), Some("name is required"));
        assert_eq!(state.pager().total_count, 0);
    }

    #[tokio::test]
    async fn visible_filters_loaded_items_only() {
        let (mut state, _) = state(3);
        state.fetch().await;
        let condos = state.visible(&PropertyFilter::default().with_property_types([PropertyType::Condo]));
        // The condo sits on page 2, which is not loaded yet
        assert!(condos.is_empty());
    }
}
