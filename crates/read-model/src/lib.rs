//! Read models and projections for the query side.
//!
//! This crate provides the query side of the system:
//! - [`Projection`] trait for processing events into read models
//! - [`ReadModel`] trait for query access to denormalized data
//! - [`ProjectionProcessor`] for feeding events from the store to projections
//! - [`UserAccountsView`], the account-by-username view the command handler
//!   consults for uniqueness checks and authentication lookups
//!
//! Views are eventually consistent: they lag the event stream until the
//! processor catches them up.

pub mod error;
pub mod processor;
pub mod projection;
pub mod read_model;
pub mod views;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition};
pub use read_model::ReadModel;
pub use views::UserAccountsView;
