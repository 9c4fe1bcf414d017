//! Commands for the user aggregate.

use common::AggregateId;
use serde::{Deserialize, Serialize};

use super::{RoleId, UserAccount, Username};

/// Commands that can be dispatched to the user command handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", content = "data")]
pub enum UserCommand {
    /// Self-service registration. Empty roles default to the platform role.
    RegisterUser(RegisterUser),

    /// Administrative creation with an explicit, non-empty role list.
    CreateUser(CreateUser),

    /// Credential check against an existing user.
    AuthenticateUser(AuthenticateUser),

    /// Deactivate an existing user.
    DeactivateUser(DeactivateUser),
}

/// Register a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUser {
    /// Caller-assigned identifier for the new aggregate.
    pub user_id: AggregateId,

    /// Requested login name; must not already be taken.
    pub username: Username,

    /// Plaintext password; hashed before anything is persisted.
    pub password: String,

    /// Contact email.
    pub email: String,

    /// Given name.
    pub first_name: String,

    /// Family name.
    pub last_name: String,

    /// Requested roles; may be empty.
    #[serde(default)]
    pub roles: Vec<RoleId>,
}

impl RegisterUser {
    /// Creates a registration command with a fresh aggregate identifier and
    /// no explicit roles.
    pub fn new(
        username: impl Into<Username>,
        password: impl Into<String>,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: AggregateId::new(),
            username: username.into(),
            password: password.into(),
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            roles: Vec::new(),
        }
    }

    /// Sets explicit roles on the registration.
    pub fn with_roles(mut self, roles: Vec<RoleId>) -> Self {
        self.roles = roles;
        self
    }
}

/// Create a new user with an explicit role list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Caller-assigned identifier for the new aggregate.
    pub user_id: AggregateId,

    /// Requested login name; must not already be taken.
    pub username: Username,

    /// Plaintext password; hashed before anything is persisted.
    pub password: String,

    /// Contact email.
    pub email: String,

    /// Given name.
    pub first_name: String,

    /// Family name.
    pub last_name: String,

    /// Granted roles; must be non-empty.
    pub roles: Vec<RoleId>,
}

impl CreateUser {
    /// Creates a creation command with a fresh aggregate identifier.
    pub fn new(
        username: impl Into<Username>,
        password: impl Into<String>,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        roles: Vec<RoleId>,
    ) -> Self {
        Self {
            user_id: AggregateId::new(),
            username: username.into(),
            password: password.into(),
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            roles,
        }
    }
}

/// Verify a username/password pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticateUser {
    /// Login name to look up.
    pub username: Username,

    /// Plaintext password to verify.
    pub password: String,
}

impl AuthenticateUser {
    /// Creates an authentication command.
    pub fn new(username: impl Into<Username>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Deactivate an existing user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeactivateUser {
    /// Identifier of the user to deactivate.
    pub user_id: AggregateId,
}

impl DeactivateUser {
    /// Creates a deactivation command.
    pub fn new(user_id: AggregateId) -> Self {
        Self { user_id }
    }
}

/// Result of dispatching a [`UserCommand`].
#[derive(Debug, Clone)]
pub enum UserCommandOutcome {
    /// The user was registered under the returned identifier.
    Registered(AggregateId),

    /// The user was created under the returned identifier.
    Created(AggregateId),

    /// Authentication result. `None` means the credentials were rejected;
    /// the variant does not distinguish why.
    Authenticated(Option<UserAccount>),

    /// The user was deactivated.
    Deactivated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_command_assigns_fresh_id() {
        let a = RegisterUser::new("alice", "p@ss", "a@example.com", "Alice", "Smith");
        let b = RegisterUser::new("alice", "p@ss", "a@example.com", "Alice", "Smith");
        assert_ne!(a.user_id, b.user_id);
        assert!(a.roles.is_empty());
    }

    #[test]
    fn register_command_with_roles() {
        let cmd = RegisterUser::new("alice", "p@ss", "a@example.com", "Alice", "Smith")
            .with_roles(vec![RoleId::new("ROLE_ADMIN")]);
        assert_eq!(cmd.roles, vec![RoleId::new("ROLE_ADMIN")]);
    }

    #[test]
    fn command_serialization_is_tagged() {
        let cmd = UserCommand::AuthenticateUser(AuthenticateUser::new("alice", "p@ss"));
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"command\":\"AuthenticateUser\""));

        let back: UserCommand = serde_json::from_str(&json).unwrap();
        let UserCommand::AuthenticateUser(auth) = back else {
            panic!("expected AuthenticateUser");
        };
        assert_eq!(auth.username.as_str(), "alice");
    }

    #[test]
    fn register_command_roles_default_when_absent() {
        let json = r#"{
            "user_id": "user-1",
            "username": "alice",
            "password": "p@ss",
            "email": "a@example.com",
            "first_name": "Alice",
            "last_name": "Smith"
        }"#;
        let cmd: RegisterUser = serde_json::from_str(json).unwrap();
        assert!(cmd.roles.is_empty());
    }
}
