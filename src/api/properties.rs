use async_trait::async_trait;
use tracing::info;

use super::client::ApiClient;
use super::error::ApiResult;
use super::traits::PropertyRepository;
use crate::filter::PropertyFilter;
use crate::models::{NewProperty, Page, Property, PropertyDetail, PropertyUpdate};

pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Server-side listing query: a page window plus the filters to apply
/// across the whole collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyQuery {
    pub page: u32,
    pub page_size: u32,
    pub filter: PropertyFilter,
}

impl Default for PropertyQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            filter: PropertyFilter::default(),
        }
    }
}

impl PropertyQuery {
    pub fn with_filter(filter: PropertyFilter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// Query-string pairs; unset dimensions are omitted
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.max(1).to_string()),
            ("pageSize", self.page_size.to_string()),
        ];
        let filter = &self.filter;

        let (min, max) = filter.normalized_price_range();
        if let Some(min) = min {
            params.push(("minPrice", min.to_string()));
        }
        if let Some(max) = max {
            params.push(("maxPrice", max.to_string()));
        }
        if !filter.bedrooms.is_empty() {
            params.push(("bedrooms", join(&filter.bedrooms)));
        }
        if !filter.bathrooms.is_empty() {
            params.push(("bathrooms", join(&filter.bathrooms)));
        }
        if !filter.property_types.is_empty() {
            params.push(("propertyType", join(&filter.property_types)));
        }
        for location in filter.locations.iter().filter(|l| !l.trim().is_empty()) {
            params.push(("location", location.trim().to_string()));
        }
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(("search", term.to_string()));
        }
        params
    }
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl PropertyRepository for ApiClient {
    async fn list_properties(&self, query: &PropertyQuery) -> ApiResult<Page<Property>> {
        let params = query.to_params();
        let page: Page<Property> = self.get(&["properties"], &params).await?;
        Ok(page.normalized())
    }

    async fn get_property(&self, id: &str) -> ApiResult<PropertyDetail> {
        self.get(&["properties", id], &[]).await
    }

    async fn create_property(&self, input: &NewProperty) -> ApiResult<Property> {
        let created: Property = self.post(&["properties"], input).await?;
        info!(id = %created.id, "Created property");
        Ok(created)
    }

    async fn update_property(&self, id: &str, changes: &PropertyUpdate) -> ApiResult<Property> {
        self.patch(&["properties", id], changes).await
    }

    async fn delete_property(&self, id: &str) -> ApiResult<()> {
        self.delete::<()>(&["properties", id]).await?;
        info!(id, "Deleted property");
        Ok(())
    }

    fn source_name(&self) -> &'static str {
        "api"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PropertyType;

    #[test]
    fn default_query_sends_only_the_page_window() {
        let params = PropertyQuery::default().to_params();
        assert_eq!(
            params,
            vec![("page", "1".to_string()), ("pageSize", "12".to_string())]
        );
    }

    #[test]
    fn filters_become_query_parameters() {
        let filter = PropertyFilter {
            min_price: Some(900),
            max_price: Some(100),
            bedrooms: vec![2, 3],
            property_types: vec![PropertyType::Villa, PropertyType::Condo],
            locations: vec!["Miami".into(), " ".into()],
            search: Some(" pool ".into()),
            ..Default::default()
        };
        let params = PropertyQuery::with_filter(filter).page(3).to_params();

        assert!(params.contains(&("page", "3".to_string())));
        assert!(params.contains(&("minPrice", "100".to_string())));
        assert!(params.contains(&("maxPrice", "900".to_string())));
        assert!(params.contains(&("bedrooms", "2,3".to_string())));
        assert!(params.contains(&("propertyType", "villa,condo".to_string())));
        assert!(params.contains(&("search", "pool".to_string())));
        assert_eq!(params.iter().filter(|(k, _)| *k == "location").count(), 1);
    }

    #[test]
    fn open_ended_price_filter_sends_one_bound() {
        let params = PropertyQuery::with_filter(PropertyFilter::default().with_min_price(2_000_000))
            .to_params();
        assert!(params.contains(&("minPrice", "2000000".to_string())));
        assert!(params.iter().all(|(k, _)| *k != "maxPrice"));
    }
}
