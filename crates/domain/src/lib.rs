//! Domain layer for the user-management core.
//!
//! This crate provides the command side of the system:
//! - Aggregate and DomainEvent traits for event-sourced entities
//! - AggregateRepository for load-by-replay and append-on-save persistence
//! - The User aggregate state machine with registration and authentication
//! - UserCommandHandler routing commands to aggregate behavior

pub mod aggregate;
pub mod error;
pub mod repository;
pub mod user;

pub use aggregate::{Aggregate, DomainEvent};
pub use error::DomainError;
pub use repository::AggregateRepository;
pub use user::{
    AuthenticateUser, CreateUser, Credential, DEFAULT_USER_ROLE, DeactivateUser, RegisterUser,
    RoleId, User, UserAccount, UserAccountRepository, UserCommand, UserCommandHandler,
    UserCommandOutcome, UserError, UserEvent, UserState, Username,
};
