use async_trait::async_trait;

use super::client::ApiClient;
use super::error::ApiResult;
use super::traits::OwnerRepository;
use crate::models::{NewOwner, Owner, Page};

#[async_trait]
impl OwnerRepository for ApiClient {
    async fn list_owners(&self, page: u32, page_size: u32) -> ApiResult<Page<Owner>> {
        let params = [
            ("page", page.max(1).to_string()),
            ("pageSize", page_size.to_string()),
        ];
        let page: Page<Owner> = self.get(&["owners"], &params).await?;
        Ok(page.normalized())
    }

    async fn get_owner(&self, id: &str) -> ApiResult<Owner> {
        self.get(&["owners", id], &[]).await
    }

    async fn create_owner(&self, input: &NewOwner) -> ApiResult<Owner> {
        self.post(&["owners"], input).await
    }

    async fn update_owner(&self, id: &str, input: &NewOwner) -> ApiResult<Owner> {
        self.put(&["owners", id], input).await
    }
}
