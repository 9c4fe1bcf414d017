//! Shared types for the user-management core.

pub mod types;

pub use types::AggregateId;
