//! Read-side account view consumed by the command handler.

use async_trait::async_trait;
use common::AggregateId;
use serde::{Deserialize, Serialize};

use super::{RoleId, Username};
use crate::error::DomainError;

/// A user account as seen by the read side.
///
/// This is a projection row, not the aggregate: it carries no credential and
/// may lag behind the event stream until the projection catches up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    /// Identifier of the backing aggregate.
    pub user_id: AggregateId,

    /// Login name.
    pub username: Username,

    /// Contact email.
    pub email: String,

    /// Given name.
    pub first_name: String,

    /// Family name.
    pub last_name: String,

    /// Granted roles.
    pub roles: Vec<RoleId>,

    /// Whether the user is currently active.
    pub active: bool,
}

/// Lookup of user accounts by username.
///
/// Implemented by the read model; the command handler depends on this trait
/// for username uniqueness checks and authentication lookups.
#[async_trait]
pub trait UserAccountRepository: Send + Sync {
    /// Finds an account by its login name.
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<UserAccount>, DomainError>;
}
