//! User aggregate implementation.

use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;

use super::{
    Credential, RoleId, UserError, UserEvent, UserState, Username,
    events::{UserCreatedData, UserRegisteredData},
};

/// User aggregate root.
///
/// The authoritative, event-sourced representation of a single user. All
/// state is derived by replaying the aggregate's stream; behavior methods
/// validate against current state and record new events, except
/// [`User::authenticate`] which is a pure read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier. Immutable once set by the initializing event.
    id: Option<AggregateId>,

    /// Current version for optimistic concurrency; equals the count of
    /// applied events.
    #[serde(default)]
    version: Version,

    /// Lifecycle state.
    state: UserState,

    /// Login name.
    username: Option<Username>,

    /// Hashed password credential.
    credential: Option<Credential>,

    /// Contact email.
    email: Option<String>,

    /// Given name.
    first_name: Option<String>,

    /// Family name.
    last_name: Option<String>,

    /// Granted roles; non-empty while the user is active.
    roles: Vec<RoleId>,

    /// Events recorded since the last save.
    #[serde(skip)]
    uncommitted: Vec<UserEvent>,
}

impl Aggregate for User {
    type Event = UserEvent;
    type Error = UserError;

    fn aggregate_type() -> &'static str {
        "User"
    }

    fn id(&self) -> Option<&AggregateId> {
        self.id.as_ref()
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            UserEvent::UserRegistered(data) => self.apply_registered(data),
            UserEvent::UserCreated(data) => self.apply_created(data),
            UserEvent::UserDeactivated(_) => {
                self.state = UserState::Inactive;
            }
        }
    }

    fn record(&mut self, event: Self::Event) {
        self.apply(event.clone());
        self.version = self.version.next();
        self.uncommitted.push(event);
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted
    }

    fn take_uncommitted_events(&mut self) -> Vec<Self::Event> {
        std::mem::take(&mut self.uncommitted)
    }
}

// Query methods
impl User {
    /// Returns the lifecycle state.
    pub fn state(&self) -> UserState {
        self.state
    }

    /// Returns the login name.
    pub fn username(&self) -> Option<&Username> {
        self.username.as_ref()
    }

    /// Returns the contact email.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the given name.
    pub fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref()
    }

    /// Returns the family name.
    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    /// Returns the granted roles.
    pub fn roles(&self) -> &[RoleId] {
        &self.roles
    }

    /// Returns true if the user is active.
    pub fn is_active(&self) -> bool {
        self.state.can_authenticate()
    }
}

// Behavior methods (validate state, record events)
impl User {
    /// Registers a new user.
    ///
    /// Only valid from `Uninitialized`. The password is hashed here; the
    /// recorded event carries the hash only. An empty role list is defaulted
    /// to the single platform default role.
    #[allow(clippy::too_many_arguments)]
    pub fn register(
        &mut self,
        user_id: AggregateId,
        username: Username,
        password: &str,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        roles: Vec<RoleId>,
    ) -> Result<(), UserError> {
        if !self.state.can_initialize() {
            return Err(UserError::AlreadyRegistered);
        }

        let credential = Credential::from_plaintext(password)?;
        let roles = if roles.is_empty() {
            vec![RoleId::platform_default()]
        } else {
            roles
        };

        self.record(UserEvent::user_registered(
            user_id,
            username,
            credential,
            email.into(),
            first_name.into(),
            last_name.into(),
            roles,
        ));
        Ok(())
    }

    /// Creates a new user with an explicit role list.
    ///
    /// Only valid from `Uninitialized`. Roles are taken verbatim and must be
    /// non-empty: an active user always carries at least one role.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &mut self,
        user_id: AggregateId,
        username: Username,
        password: &str,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        roles: Vec<RoleId>,
    ) -> Result<(), UserError> {
        if !self.state.can_initialize() {
            return Err(UserError::AlreadyRegistered);
        }
        if roles.is_empty() {
            return Err(UserError::RolesRequired);
        }

        let credential = Credential::from_plaintext(password)?;

        self.record(UserEvent::user_created(
            user_id,
            username,
            credential,
            email.into(),
            first_name.into(),
            last_name.into(),
            roles,
        ));
        Ok(())
    }

    /// Verifies a supplied password against the stored credential.
    ///
    /// Only valid from `Active`. This is a pure read: no event is recorded
    /// and the version does not change, so authentication attempts never
    /// contend with genuine writers.
    pub fn authenticate(&self, password: &str) -> Result<bool, UserError> {
        if !self.state.can_authenticate() {
            return Err(UserError::NotActive);
        }

        match &self.credential {
            Some(credential) => Ok(credential.verify(password)),
            None => Ok(false),
        }
    }

    /// Deactivates the user. Only valid from `Active`.
    pub fn deactivate(&mut self) -> Result<(), UserError> {
        if !self.state.can_deactivate() {
            return Err(UserError::NotActive);
        }

        self.record(UserEvent::user_deactivated());
        Ok(())
    }
}

// Apply event helpers
impl User {
    fn apply_registered(&mut self, data: UserRegisteredData) {
        self.id = Some(data.user_id);
        self.username = Some(data.username);
        self.credential = Some(data.credential);
        self.email = Some(data.email);
        self.first_name = Some(data.first_name);
        self.last_name = Some(data.last_name);
        self.roles = data.roles;
        self.state = UserState::Active;
    }

    fn apply_created(&mut self, data: UserCreatedData) {
        self.id = Some(data.user_id);
        self.username = Some(data.username);
        self.credential = Some(data.credential);
        self.email = Some(data.email);
        self.first_name = Some(data.first_name);
        self.last_name = Some(data.last_name);
        self.roles = data.roles;
        self.state = UserState::Active;
    }
}
