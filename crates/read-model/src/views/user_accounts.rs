//! User accounts read model, keyed by username.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::AggregateId;
use domain::{DomainError, RoleId, UserAccount, UserAccountRepository, UserEvent, Username};
use event_store::EventEnvelope;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// Internal state for the user accounts view.
struct UserAccountsState {
    /// Accounts keyed by username. Deactivated accounts stay in the map with
    /// `active` cleared, so their usernames remain taken.
    by_username: HashMap<String, UserAccount>,
    /// Maps user_id to username for events that only carry the stream id.
    id_to_username: HashMap<AggregateId, String>,
    position: ProjectionPosition,
}

/// Read model view mapping usernames to user accounts.
///
/// This is the view the command handler consults for username uniqueness and
/// authentication lookups. It never sees credentials: events carry only the
/// hash and the view does not keep it.
#[derive(Clone)]
pub struct UserAccountsView {
    state: Arc<RwLock<UserAccountsState>>,
}

impl UserAccountsView {
    /// Creates a new empty user accounts view.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(UserAccountsState {
                by_username: HashMap::new(),
                id_to_username: HashMap::new(),
                position: ProjectionPosition::zero(),
            })),
        }
    }

    /// Gets an account by username.
    pub async fn get_by_username(&self, username: &str) -> Option<UserAccount> {
        self.state.read().await.by_username.get(username).cloned()
    }

    /// Gets an account by user identifier.
    pub async fn get_by_user_id(&self, user_id: &AggregateId) -> Option<UserAccount> {
        let state = self.state.read().await;
        let username = state.id_to_username.get(user_id)?;
        state.by_username.get(username).cloned()
    }

    /// Gets all accounts.
    pub async fn get_all(&self) -> Vec<UserAccount> {
        self.state
            .read()
            .await
            .by_username
            .values()
            .cloned()
            .collect()
    }

    /// Gets all accounts granted the given role.
    pub async fn get_by_role(&self, role: &RoleId) -> Vec<UserAccount> {
        self.state
            .read()
            .await
            .by_username
            .values()
            .filter(|account| account.roles.contains(role))
            .cloned()
            .collect()
    }

    /// Counts currently active accounts.
    pub async fn active_count(&self) -> usize {
        self.state
            .read()
            .await
            .by_username
            .values()
            .filter(|account| account.active)
            .count()
    }
}

impl Default for UserAccountsView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for UserAccountsView {
    fn name(&self) -> &'static str {
        "UserAccountsView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        if event.aggregate_type != "User" {
            let mut state = self.state.write().await;
            state.position = state.position.advance();
            return Ok(());
        }

        let user_event: UserEvent = serde_json::from_value(event.payload.clone())?;
        let user_id = event.aggregate_id.clone();

        let mut state = self.state.write().await;

        match user_event {
            UserEvent::UserRegistered(data) => {
                upsert_account(
                    &mut state,
                    UserAccount {
                        user_id: data.user_id,
                        username: data.username,
                        email: data.email,
                        first_name: data.first_name,
                        last_name: data.last_name,
                        roles: data.roles,
                        active: true,
                    },
                );
            }
            UserEvent::UserCreated(data) => {
                upsert_account(
                    &mut state,
                    UserAccount {
                        user_id: data.user_id,
                        username: data.username,
                        email: data.email,
                        first_name: data.first_name,
                        last_name: data.last_name,
                        roles: data.roles,
                        active: true,
                    },
                );
            }
            UserEvent::UserDeactivated(_) => {
                if let Some(username) = state.id_to_username.get(&user_id).cloned()
                    && let Some(account) = state.by_username.get_mut(&username)
                {
                    account.active = false;
                }
            }
        }

        state.position = state.position.advance();
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        self.state.read().await.position
    }

    async fn reset(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.by_username.clear();
        state.id_to_username.clear();
        state.position = ProjectionPosition::zero();
        Ok(())
    }
}

fn upsert_account(state: &mut UserAccountsState, account: UserAccount) {
    state
        .id_to_username
        .insert(account.user_id.clone(), account.username.as_str().to_string());
    state
        .by_username
        .insert(account.username.as_str().to_string(), account);
}

impl ReadModel for UserAccountsView {
    fn name(&self) -> &'static str {
        "UserAccountsView"
    }

    // Best effort: reports 0 while a writer holds the lock. `get_all` and
    // `active_count` are the exact, awaitable counterparts.
    fn count(&self) -> usize {
        self.state
            .try_read()
            .map(|s| s.by_username.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl UserAccountRepository for UserAccountsView {
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> std::result::Result<Option<UserAccount>, DomainError> {
        Ok(self.get_by_username(username.as_str()).await)
    }
}
