use async_trait::async_trait;

use super::error::ApiResult;
use super::properties::PropertyQuery;
use crate::models::{
    NewOwner, NewProperty, Notification, Owner, Page, Property, PropertyDetail, PropertyUpdate,
};

/// Source of property listings.
/// Implemented by the HTTP client and by the in-memory mock backend.
#[async_trait]
pub trait PropertyRepository: Send + Sync {
    async fn list_properties(&self, query: &PropertyQuery) -> ApiResult<Page<Property>>;

    async fn get_property(&self, id: &str) -> ApiResult<PropertyDetail>;

    async fn create_property(&self, input: &NewProperty) -> ApiResult<Property>;

    async fn update_property(&self, id: &str, changes: &PropertyUpdate) -> ApiResult<Property>;

    async fn delete_property(&self, id: &str) -> ApiResult<()>;

    /// Name of the backing source, for logs
    fn source_name(&self) -> &'static str;
}

#[async_trait]
pub trait OwnerRepository: Send + Sync {
    async fn list_owners(&self, page: u32, page_size: u32) -> ApiResult<Page<Owner>>;

    async fn get_owner(&self, id: &str) -> ApiResult<Owner>;

    async fn create_owner(&self, input: &NewOwner) -> ApiResult<Owner>;

    async fn update_owner(&self, id: &str, input: &NewOwner) -> ApiResult<Owner>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn list_notifications(&self, page: u32, page_size: u32)
        -> ApiResult<Page<Notification>>;

    async fn mark_read(&self, id: &str) -> ApiResult<Notification>;

    async fn mark_all_read(&self) -> ApiResult<()>;
}
