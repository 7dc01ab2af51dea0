use std::sync::Arc;

use super::{check_input, record_failure, Pager};
use crate::api::{ApiResult, OwnerRepository};
use crate::models::{NewOwner, Owner};

const AGENTS_PAGE_SIZE: u32 = 12;

/// Owners and agents directory state
pub struct AgentsState {
    repo: Arc<dyn OwnerRepository>,
    agents: Vec<Owner>,
    pager: Pager,
    loading: bool,
    error: Option<String>,
}

impl AgentsState {
    pub fn new(repo: Arc<dyn OwnerRepository>) -> Self {
        Self {
            repo,
            agents: Vec::new(),
            pager: Pager::new(AGENTS_PAGE_SIZE),
            loading: false,
            error: None,
        }
    }

    pub fn agents(&self) -> &[Owner] {
        &self.agents
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn pager(&self) -> Pager {
        self.pager
    }

    pub async fn fetch(&mut self) {
        self.pager.reset();
        self.load_page(1, false).await;
    }

    pub async fn refresh(&mut self) {
        self.fetch().await;
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
        let result = self.repo.list_owners(page, self.pager.page_size).await;
        self.loading = false;

        match result {
            Ok(page) => {
                let items = self.pager.record(page);
                if append {
                    self.agents.extend(items);
                } else {
                    self.agents = items;
                }
                true
            }
            Err(e) => {
                record_failure(&mut self.error, "load agents", &e);
                false
            }
        }
    }

    /// Fetch one agent and refresh its entry if it is already listed
    pub async fn get(&mut self, id: &str) -> Option<Owner> {
        self.loading = true;
        let result = self.repo.get_owner(id).await;
        self.loading = false;

        match result {
            Ok(owner) => {
                if let Some(slot) = self.agents.iter_mut().find(|a| a.id == owner.id) {
                    *slot = owner.clone();
                }
                Some(owner)
            }
            Err(e) => {
                record_failure(&mut self.error, "load agent", &e);
                None
            }
        }
    }

    pub async fn create(&mut self, input: &NewOwner) -> ApiResult<Owner> {
        check_input(&mut self.error, "create agent", input.validate())?;
        self.loading = true;
        let result = self.repo.create_owner(input).await;
        self.loading = false;

        match result {
            Ok(owner) => {
                self.agents.push(owner.clone());
                self.pager.total_count += 1;
                self.error = None;
                Ok(owner)
            }
            Err(e) => {
                record_failure(&mut self.error, "create agent", &e);
                Err(e)
            }
        }
    }

    pub async fn update(&mut self, id: &str, input: &NewOwner) -> ApiResult<Owner> {
        check_input(&mut self.error, "update agent", input.validate())?;
        self.loading = true;
        let result = self.repo.update_owner(id, input).await;
        self.loading = false;

        match result {
            Ok(owner) => {
                if let Some(slot) = self.agents.iter_mut().find(|a| a.id == owner.id) {
                    *slot = owner.clone();
                }
                self.error = None;
                Ok(owner)
            }
            Err(e) => {
                record_failure(&mut self.error, "update agent", &e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::MockBackend;
    use crate::models::OwnerRole;

    #[tokio::test]
    async fn fetch_then_update_in_place() {
        let mut state = AgentsState::new(Arc::new(MockBackend::new()));
        state.fetch().await;
        assert_eq!(state.agents().len(), 3);
        assert!(!state.pager().has_more());

        let updated = state
            .update(
                "2",
                &NewOwner {
                    name: "James Whitaker".into(),
                    role: OwnerRole::Agent,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.role, OwnerRole::Agent);
        assert_eq!(state.agents()[1].role, OwnerRole::Agent);
    }

    #[tokio::test]
    async fn invalid_agent_is_rejected_into_error_state() {
        let mut state = AgentsState::new(Arc::new(MockBackend::new()));
        state.fetch().await;

        let err = state.create(&NewOwner::default()).await.unwrap_err();
        assert_eq!(err.status(), 422);
        assert_eq!(state.error(), Some("name is required"));
        assert_eq!(state.agents().len(), 3);

        state
            .create(&NewOwner {
                name: "Lucia Ferrer".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(state.error(), None);
        assert_eq!(state.agents().len(), 4);
    }

    #[tokio::test]
    async fn unknown_agent_sets_error() {
        let mut state = AgentsState::new(Arc::new(MockBackend::new()));
        assert!(state.get("99").await.is_none());
        assert_eq!(state.error(), Some("Owner 99 not found"));
    }
}
