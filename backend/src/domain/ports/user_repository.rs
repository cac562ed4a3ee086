//! Port abstraction for account persistence adapters and their errors.
use async_trait::async_trait;
use tracing::warn;

use crate::domain::{Account, AccountSummary, Error, RoleSet, SecretDigest, UserName};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user repository adapters.
    pub enum UserPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
        /// A uniqueness constraint rejected the write.
        Duplicate { key: String } => "user repository already holds {key}",
    }
}

/// Map a store failure onto the error reported to callers.
///
/// Connection details are logged and never copied into the returned error.
pub(crate) fn map_user_error(error: UserPersistenceError) -> Error {
    warn!(kind = error.kind(), %error, "user repository failure");
    match error {
        UserPersistenceError::Connection { .. } => {
            Error::service_unavailable("account store unavailable")
        }
        UserPersistenceError::Query { message } => {
            Error::internal(format!("user repository error: {message}"))
        }
        UserPersistenceError::Duplicate { key } => {
            Error::internal(format!("unexpected uniqueness conflict on {key}"))
        }
    }
}

/// Outcome of a role replacement guarded by the last-admin rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleReplacement {
    Applied,
    /// The account is the only admin and the new set lacks admin.
    Rejected,
    Missing,
}

/// Outcome of an account deletion guarded by admin protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountRemoval {
    Removed,
    /// The account holds admin and was left untouched.
    Protected,
    Missing,
}

/// Driven port over the `users` store.
///
/// Methods returning `bool` report whether a row matched. Guarded methods
/// must evaluate their rule and apply the mutation atomically.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account; fails with `Duplicate` when the name is taken.
    async fn insert(&self, account: &Account) -> Result<(), UserPersistenceError>;

    /// Insert `account` only while the store holds no accounts.
    async fn insert_if_empty(&self, account: &Account) -> Result<bool, UserPersistenceError>;

    async fn find(&self, user_name: &UserName) -> Result<Option<Account>, UserPersistenceError>;

    async fn count(&self) -> Result<u64, UserPersistenceError>;

    /// Summaries of every account ordered by user name.
    async fn list(&self) -> Result<Vec<AccountSummary>, UserPersistenceError>;

    async fn update_password(
        &self,
        user_name: &UserName,
        digest: &SecretDigest,
    ) -> Result<bool, UserPersistenceError>;

    /// Overwrite any outstanding one-time password.
    async fn set_one_time_password(
        &self,
        user_name: &UserName,
        digest: &SecretDigest,
    ) -> Result<bool, UserPersistenceError>;

    /// Clear the one-time password only if it still equals `observed`.
    async fn consume_one_time_password(
        &self,
        user_name: &UserName,
        observed: &SecretDigest,
    ) -> Result<bool, UserPersistenceError>;

    async fn clear_one_time_password(
        &self,
        user_name: &UserName,
    ) -> Result<bool, UserPersistenceError>;

    /// Overwrite the role set without the last-admin guard.
    async fn replace_roles(
        &self,
        user_name: &UserName,
        roles: &RoleSet,
    ) -> Result<bool, UserPersistenceError>;

    /// Overwrite the role set unless it would remove the last admin.
    async fn replace_roles_keeping_admin(
        &self,
        user_name: &UserName,
        roles: &RoleSet,
    ) -> Result<RoleReplacement, UserPersistenceError>;

    /// Delete the account unless it holds admin.
    async fn delete_unless_admin(
        &self,
        user_name: &UserName,
    ) -> Result<AccountRemoval, UserPersistenceError>;
}
