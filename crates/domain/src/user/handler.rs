//! Command handler for the user aggregate.

use common::AggregateId;
use event_store::EventStore;

use crate::error::DomainError;
use crate::repository::AggregateRepository;

use super::{
    AuthenticateUser, CreateUser, DeactivateUser, RegisterUser, User, UserAccount,
    UserAccountRepository, UserCommand, UserCommandOutcome, UserError, Username,
};

/// Handles commands against user aggregates.
///
/// Each command is a load-decide-save cycle against the event store, with
/// username lookups delegated to the read-side account repository. Username
/// uniqueness is checked against the read model before the aggregate is
/// touched; identifier uniqueness is guaranteed by the store's expected
/// version check on the first append.
pub struct UserCommandHandler<S, R>
where
    S: EventStore,
    R: UserAccountRepository,
{
    users: AggregateRepository<S, User>,
    accounts: R,
}

impl<S, R> UserCommandHandler<S, R>
where
    S: EventStore,
    R: UserAccountRepository,
{
    /// Creates a handler over the given event store and account repository.
    pub fn new(store: S, accounts: R) -> Self {
        Self {
            users: AggregateRepository::new(store),
            accounts,
        }
    }

    /// Returns the underlying aggregate repository.
    pub fn users(&self) -> &AggregateRepository<S, User> {
        &self.users
    }

    /// Dispatches a command to the matching operation.
    pub async fn handle(&self, command: UserCommand) -> Result<UserCommandOutcome, DomainError> {
        metrics::counter!("user_commands_received").increment(1);

        match command {
            UserCommand::RegisterUser(cmd) => {
                let user_id = self.register(cmd).await?;
                Ok(UserCommandOutcome::Registered(user_id))
            }
            UserCommand::CreateUser(cmd) => {
                let user_id = self.create(cmd).await?;
                Ok(UserCommandOutcome::Created(user_id))
            }
            UserCommand::AuthenticateUser(cmd) => {
                let account = self.authenticate(cmd).await?;
                Ok(UserCommandOutcome::Authenticated(account))
            }
            UserCommand::DeactivateUser(cmd) => {
                self.deactivate(cmd).await?;
                Ok(UserCommandOutcome::Deactivated)
            }
        }
    }

    /// Registers a new user, returning the identifier of the new aggregate.
    ///
    /// An empty role list is defaulted to the platform role inside the
    /// aggregate. The username check reads the eventually consistent account
    /// view, so two racing registrations of the same username can both pass
    /// it; the winner is then decided by the store's first-append check when
    /// the identifiers collide, and otherwise by downstream reconciliation.
    #[tracing::instrument(skip(self, command), fields(username = %command.username))]
    pub async fn register(&self, command: RegisterUser) -> Result<AggregateId, DomainError> {
        self.ensure_username_free(&command.username).await?;

        let mut user = User::default();
        user.register(
            command.user_id.clone(),
            command.username,
            &command.password,
            command.email,
            command.first_name,
            command.last_name,
            command.roles,
        )?;

        self.persist_new(&mut user, command.user_id).await
    }

    /// Creates a new user with an explicit role list.
    #[tracing::instrument(skip(self, command), fields(username = %command.username))]
    pub async fn create(&self, command: CreateUser) -> Result<AggregateId, DomainError> {
        self.ensure_username_free(&command.username).await?;

        let mut user = User::default();
        user.create(
            command.user_id.clone(),
            command.username,
            &command.password,
            command.email,
            command.first_name,
            command.last_name,
            command.roles,
        )?;

        self.persist_new(&mut user, command.user_id).await
    }

    /// Verifies a username/password pair.
    ///
    /// Returns the matching account on success and `None` on any credential
    /// failure. Unknown username, missing aggregate, inactive user and wrong
    /// password are indistinguishable to the caller.
    #[tracing::instrument(skip(self, command), fields(username = %command.username))]
    pub async fn authenticate(
        &self,
        command: AuthenticateUser,
    ) -> Result<Option<UserAccount>, DomainError> {
        let Some(account) = self.accounts.find_by_username(&command.username).await? else {
            return Ok(self.auth_rejected("unknown username"));
        };

        let user = match self.users.try_load(&account.user_id).await? {
            Some(user) => user,
            // The view can reference a stream the store no longer serves.
            None => return Ok(self.auth_rejected("account without stream")),
        };

        match user.authenticate(&command.password) {
            Ok(true) => Ok(Some(account)),
            Ok(false) => Ok(self.auth_rejected("wrong password")),
            Err(UserError::NotActive) => Ok(self.auth_rejected("user not active")),
            Err(e) => Err(e.into()),
        }
    }

    /// Deactivates an existing user.
    #[tracing::instrument(skip(self))]
    pub async fn deactivate(&self, command: DeactivateUser) -> Result<(), DomainError> {
        let mut user = self.users.load(&command.user_id).await?;
        user.deactivate()?;
        self.users.save(&mut user).await?;
        Ok(())
    }

    async fn ensure_username_free(&self, username: &Username) -> Result<(), DomainError> {
        if self.accounts.find_by_username(username).await?.is_some() {
            return Err(DomainError::DuplicateUsername {
                username: username.as_str().to_string(),
            });
        }
        Ok(())
    }

    /// Persists a freshly initialized aggregate. A concurrency conflict on
    /// the first append means the identifier is already taken.
    async fn persist_new(
        &self,
        user: &mut User,
        user_id: AggregateId,
    ) -> Result<AggregateId, DomainError> {
        match self.users.save(user).await {
            Ok(_) => Ok(user_id),
            Err(e) if e.is_concurrency_conflict() => {
                Err(DomainError::DuplicateIdentifier {
                    aggregate_id: user_id,
                })
            }
            Err(e) => Err(e),
        }
    }

    fn auth_rejected(&self, reason: &'static str) -> Option<UserAccount> {
        metrics::counter!("user_auth_failures").increment(1);
        tracing::debug!(reason, "authentication rejected");
        None
    }
}
