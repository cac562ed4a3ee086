//! Driving port for account lifecycle use-cases.
//!
//! Inbound adapters (HTTP handlers, the operator CLI) call this port without
//! knowing which store backs it.

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::domain::{
    AccountSummary, Error, LoginCredentials, Password, Registration, RoleSet, UserName,
};

/// Result of a role change request.
///
/// A rejection is an ordinary outcome, not an error: the account is the
/// only admin and the requested set drops admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
    Applied,
    Rejected,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountManager: Send + Sync {
    /// Create an account; fails with `duplicate_user` when the name is taken.
    async fn register(&self, registration: &Registration) -> Result<(), Error>;

    /// Create the first account as an admin; fails with `forbidden` once any
    /// account exists.
    async fn register_initial_admin(
        &self,
        user_name: &UserName,
        password: &Password,
    ) -> Result<(), Error>;

    /// `true` iff name, password, and role set all match a stored account.
    async fn login(&self, credentials: &LoginCredentials) -> Result<bool, Error>;

    async fn user_exists(&self, user_name: &UserName) -> Result<bool, Error>;

    async fn get_user_roles(&self, user_name: &UserName) -> Result<Option<RoleSet>, Error>;

    /// Issue a fresh one-time password, replacing any outstanding one.
    ///
    /// The plaintext is returned once for out-of-band delivery.
    async fn request_one_time_password(
        &self,
        user_name: &UserName,
    ) -> Result<Zeroizing<String>, Error>;

    /// Consume the outstanding one-time password if `candidate` matches.
    async fn redeem_one_time_password(
        &self,
        user_name: &UserName,
        candidate: &Password,
    ) -> Result<bool, Error>;

    async fn remove_one_time_password(&self, user_name: &UserName) -> Result<(), Error>;

    async fn update_password(&self, user_name: &UserName, password: &Password)
    -> Result<(), Error>;

    /// Remove a non-admin account.
    async fn delete_user(&self, user_name: &UserName) -> Result<(), Error>;

    async fn list_users(&self) -> Result<Vec<AccountSummary>, Error>;

    async fn change_roles(&self, user_name: &UserName, roles: &RoleSet)
    -> Result<RoleChange, Error>;

    async fn is_empty(&self) -> Result<bool, Error>;
}
