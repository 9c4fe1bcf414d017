//! User lifecycle state machine.

use serde::{Deserialize, Serialize};

/// The lifecycle state of a user aggregate.
///
/// State transitions:
/// ```text
/// Uninitialized ──► Active ──► Inactive
/// ```
/// Initialization happens by applying a registration or creation event;
/// deactivation is a tombstone, the aggregate is never physically deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UserState {
    /// No events applied yet; the aggregate does not exist in the store.
    #[default]
    Uninitialized,

    /// The user is registered and may authenticate.
    Active,

    /// The user has been deactivated (terminal state).
    Inactive,
}

impl UserState {
    /// Returns true if a registration/creation event may be applied.
    pub fn can_initialize(&self) -> bool {
        matches!(self, UserState::Uninitialized)
    }

    /// Returns true if the user may authenticate.
    pub fn can_authenticate(&self) -> bool {
        matches!(self, UserState::Active)
    }

    /// Returns true if the user may be deactivated.
    pub fn can_deactivate(&self) -> bool {
        matches!(self, UserState::Active)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserState::Uninitialized => "Uninitialized",
            UserState::Active => "Active",
            UserState::Inactive => "Inactive",
        }
    }
}

impl std::fmt::Display for UserState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
