use async_trait::async_trait;
use serde_json::json;

use super::client::ApiClient;
use super::error::ApiResult;
use super::traits::NotificationRepository;
use crate::models::{Notification, Page};

#[async_trait]
impl NotificationRepository for ApiClient {
    async fn list_notifications(
        &self,
        page: u32,
        page_size: u32,
    ) -> ApiResult<Page<Notification>> {
        let params = [
            ("page", page.max(1).to_string()),
            ("pageSize", page_size.to_string()),
        ];
        let page: Page<Notification> = self.get(&["notifications"], &params).await?;
        Ok(page.normalized())
    }

    async fn mark_read(&self, id: &str) -> ApiResult<Notification> {
        self.patch(&["notifications", id, "read"], &json!({ "read": true }))
            .await
    }

    async fn mark_all_read(&self) -> ApiResult<()> {
        self.post(&["notifications", "read-all"], &json!({})).await
    }
}
