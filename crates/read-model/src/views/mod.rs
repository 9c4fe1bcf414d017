//! Read model views for the query side.

pub mod user_accounts;

pub use user_accounts::UserAccountsView;
