use std::sync::Arc;

use super::{record_failure, Pager};
use crate::api::{ApiResult, NotificationRepository};
use crate::models::Notification;

const NOTIFICATIONS_PAGE_SIZE: u32 = 20;

pub struct NotificationsState {
    repo: Arc<dyn NotificationRepository>,
    notifications: Vec<Notification>,
    pager: Pager,
    loading: bool,
    error: Option<String>,
}

impl NotificationsState {
    pub fn new(repo: Arc<dyn NotificationRepository>) -> Self {
        Self {
            repo,
            notifications: Vec::new(),
            pager: Pager::new(NOTIFICATIONS_PAGE_SIZE),
            loading: false,
            error: None,
        }
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }

    pub async fn fetch(&mut self) {
        self.pager.reset();
        self.load_page(1, false).await;
    }

    pub async fn load_more(&mut self) -> bool {
        if !self.pager.has_more() {
            return false;
        }
        let next = self.pager.next_page();
        self.load_page(next, true).await
    }

    async fn load_page(&mut self, page: u32, append: bool) -> bool {
        self.loading = true;
        self.error = None;
        let result = self
            .repo
            .list_notifications(page, self.pager.page_size)
            .await;
        self.loading = false;

        match result {
            Ok(page) => {
                let items = self.pager.record(page);
                if append {
                    self.notifications.extend(items);
                } else {
                    self.notifications = items;
                }
                true
            }
            Err(e) => {
                record_failure(&mut self.error, "load notifications", &e);
                false
            }
        }
    }

    pub async fn mark_read(&mut self, id: &str) -> ApiResult<()> {
        self.loading = true;
        let result = self.repo.mark_read(id).await;
        self.loading = false;

        match result {
            Ok(updated) => {
                if let Some(slot) = self.notifications.iter_mut().find(|n| n.id == updated.id) {
                    *slot = updated;
                }
                self.error = None;
                Ok(())
            }
            Err(e) => {
                record_failure(&mut self.error, "mark notification read", &e);
                Err(e)
            }
        }
    }

    pub async fn mark_all_read(&mut self) -> ApiResult<()> {
        self.loading = true;
        let result = self.repo.mark_all_read().await;
        self.loading = false;

        match result {
            Ok(()) => {
                self.notifications.iter_mut().for_each(|n| n.read = true);
                self.error = None;
                Ok(())
            }
            Err(e) => {
                record_failure(&mut self.error, "mark notifications read", &e);
                Err(e)
            }
        }
    }
}
