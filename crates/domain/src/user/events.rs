//! User domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{Credential, RoleId, Username};

/// Events that can occur on a user aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum UserEvent {
    /// A user registered themselves (default role list).
    UserRegistered(UserRegisteredData),

    /// A user was created on someone's behalf with an explicit role list.
    UserCreated(UserCreatedData),

    /// The user was deactivated. Tombstone: the stream is preserved.
    UserDeactivated(UserDeactivatedData),
}

impl DomainEvent for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::UserRegistered(_) => "UserRegistered",
            UserEvent::UserCreated(_) => "UserCreated",
            UserEvent::UserDeactivated(_) => "UserDeactivated",
        }
    }
}

/// Data for the UserRegistered event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRegisteredData {
    /// The identifier of the new user aggregate.
    pub user_id: AggregateId,

    /// Login name.
    pub username: Username,

    /// Hashed password credential. The plaintext never reaches the stream.
    pub credential: Credential,

    /// Contact email.
    pub email: String,

    /// Given name.
    pub first_name: String,

    /// Family name.
    pub last_name: String,

    /// Granted roles; never empty.
    pub roles: Vec<RoleId>,

    /// When the registration was recorded.
    pub registered_at: DateTime<Utc>,
}

/// Data for the UserCreated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreatedData {
    /// The identifier of the new user aggregate.
    pub user_id: AggregateId,

    /// Login name.
    pub username: Username,

    /// Hashed password credential.
    pub credential: Credential,

    /// Contact email.
    pub email: String,

    /// Given name.
    pub first_name: String,

    /// Family name.
    pub last_name: String,

    /// Granted roles, exactly as supplied by the caller; never empty.
    pub roles: Vec<RoleId>,

    /// When the creation was recorded.
    pub created_at: DateTime<Utc>,
}

/// Data for the UserDeactivated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDeactivatedData {
    /// When the user was deactivated.
    pub deactivated_at: DateTime<Utc>,
}

// Convenience constructors for events
impl UserEvent {
    /// Creates a UserRegistered event.
    #[allow(clippy::too_many_arguments)]
    pub fn user_registered(
        user_id: AggregateId,
        username: Username,
        credential: Credential,
        email: String,
        first_name: String,
        last_name: String,
        roles: Vec<RoleId>,
    ) -> Self {
        UserEvent::UserRegistered(UserRegisteredData {
            user_id,
            username,
            credential,
            email,
            first_name,
            last_name,
            roles,
            registered_at: Utc::now(),
        })
    }

    /// Creates a UserCreated event.
    #[allow(clippy::too_many_arguments)]
    pub fn user_created(
        user_id: AggregateId,
        username: Username,
        credential: Credential,
        email: String,
        first_name: String,
        last_name: String,
        roles: Vec<RoleId>,
    ) -> Self {
        UserEvent::UserCreated(UserCreatedData {
            user_id,
            username,
            credential,
            email,
            first_name,
            last_name,
            roles,
            created_at: Utc::now(),
        })
    }

    /// Creates a UserDeactivated event.
    pub fn user_deactivated() -> Self {
        UserEvent::UserDeactivated(UserDeactivatedData {
            deactivated_at: Utc::now(),
        })
    }
}
