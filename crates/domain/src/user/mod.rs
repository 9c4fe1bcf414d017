//! User aggregate and related types.

mod account;
mod aggregate;
mod commands;
mod events;
mod handler;
mod state;
mod value_objects;

pub use account::{UserAccount, UserAccountRepository};
pub use aggregate::User;
pub use commands::{
    AuthenticateUser, CreateUser, DeactivateUser, RegisterUser, UserCommand, UserCommandOutcome,
};
pub use events::{UserCreatedData, UserDeactivatedData, UserEvent, UserRegisteredData};
pub use handler::UserCommandHandler;
pub use state::UserState;
pub use value_objects::{Credential, DEFAULT_USER_ROLE, RoleId, Username};

use thiserror::Error;

/// Errors produced by the user aggregate's behavior methods.
#[derive(Debug, Error)]
pub enum UserError {
    /// Registration or creation was attempted on an initialized aggregate.
    #[error("User is already registered")]
    AlreadyRegistered,

    /// The requested behavior requires an active user.
    #[error("User is not active")]
    NotActive,

    /// Explicit creation requires at least one role.
    #[error("At least one role is required")]
    RolesRequired,

    /// The supplied password could not be hashed.
    #[error("Failed to hash credential: {0}")]
    CredentialHash(String),
}
