//! Account lifecycle service.
//!
//! Implements [`AccountManager`] over any [`UserRepository`]. Secrets are
//! hashed here so adapters only ever see digests. Argon2 work runs on the
//! blocking pool to keep request workers responsive.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::domain::ports::{
    AccountManager, AccountRemoval, RoleChange, RoleReplacement, UserPersistenceError,
    UserRepository, map_user_error,
};
use crate::domain::secret::{ONE_TIME_PASSWORD_LEN, random_token};
use crate::domain::{
    Account, AccountSummary, Error, LoginCredentials, Password, Registration, Role, RoleSet,
    SecretDigest, SecretHasher, UserName,
};

/// Account service implementing the [`AccountManager`] driving port.
#[derive(Clone)]
pub struct AccountService<U> {
    users: Arc<U>,
    hasher: SecretHasher,
}

impl<U> AccountService<U> {
    /// Create a service with the default Argon2id parameters.
    pub fn new(users: Arc<U>) -> Self {
        Self::with_hasher(users, SecretHasher::new())
    }

    /// Create a service with an explicit hasher.
    pub fn with_hasher(users: Arc<U>, hasher: SecretHasher) -> Self {
        Self { users, hasher }
    }
}

impl<U> AccountService<U>
where
    U: UserRepository,
{
    async fn hash(&self, secret: &str) -> Result<SecretDigest, Error> {
        let hasher = self.hasher.clone();
        let secret = Zeroizing::new(secret.to_owned());
        tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|err| Error::internal(format!("hashing task failed: {err}")))?
            .map_err(|err| Error::internal(err.to_string()))
    }

    async fn verify(&self, candidate: &str, digest: &SecretDigest) -> Result<bool, Error> {
        let hasher = self.hasher.clone();
        let candidate = Zeroizing::new(candidate.to_owned());
        let digest = digest.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&candidate, &digest))
            .await
            .map_err(|err| Error::internal(format!("verification task failed: {err}")))
    }

    async fn find(&self, user_name: &UserName) -> Result<Option<Account>, Error> {
        self.users.find(user_name).await.map_err(map_user_error)
    }
}

#[async_trait]
impl<U> AccountManager for AccountService<U>
where
    U: UserRepository,
{
    async fn register(&self, registration: &Registration) -> Result<(), Error> {
        let digest = self.hash(registration.password().expose()).await?;
        let account = Account::new(
            registration.user_name().clone(),
            digest,
            registration.roles().clone(),
        );
        match self.users.insert(&account).await {
            Ok(()) => {
                info!(user_name = %account.user_name(), roles = %account.roles(), "account registered");
                Ok(())
            }
            Err(UserPersistenceError::Duplicate { .. }) => {
                Err(Error::duplicate_user(registration.user_name()))
            }
            Err(other) => Err(map_user_error(other)),
        }
    }

    async fn register_initial_admin(
        &self,
        user_name: &UserName,
        password: &Password,
    ) -> Result<(), Error> {
        let digest = self.hash(password.expose()).await?;
        let account = Account::new(user_name.clone(), digest, RoleSet::only(Role::Admin));
        let inserted = self
            .users
            .insert_if_empty(&account)
            .await
            .map_err(map_user_error)?;
        if !inserted {
            warn!(user_name = %user_name, "initial admin refused: accounts already exist");
            return Err(Error::forbidden(
                "an initial admin can only be registered while no accounts exist",
            ));
        }
        info!(user_name = %user_name, "initial admin registered");
        Ok(())
    }

    async fn login(&self, credentials: &LoginCredentials) -> Result<bool, Error> {
        let Some(account) = self.find(credentials.user_name()).await? else {
            return Ok(false);
        };
        let password_ok = self
            .verify(credentials.password().expose(), account.password())
            .await?;
        Ok(password_ok && account.roles() == credentials.roles())
    }

    async fn user_exists(&self, user_name: &UserName) -> Result<bool, Error> {
        Ok(self.find(user_name).await?.is_some())
    }

    async fn get_user_roles(&self, user_name: &UserName) -> Result<Option<RoleSet>, Error> {
        Ok(self
            .find(user_name)
            .await?
            .map(|account| account.roles().clone()))
    }

    async fn request_one_time_password(
        &self,
        user_name: &UserName,
    ) -> Result<Zeroizing<String>, Error> {
        let token = random_token(ONE_TIME_PASSWORD_LEN);
        let digest = self.hash(&token).await?;
        let updated = self
            .users
            .set_one_time_password(user_name, &digest)
            .await
            .map_err(map_user_error)?;
        if !updated {
            return Err(Error::user_not_found(user_name));
        }
        info!(user_name = %user_name, "one-time password issued");
        Ok(token)
    }

    async fn redeem_one_time_password(
        &self,
        user_name: &UserName,
        candidate: &Password,
    ) -> Result<bool, Error> {
        let Some(account) = self.find(user_name).await? else {
            return Ok(false);
        };
        let Some(observed) = account.one_time_password() else {
            return Ok(false);
        };
        if !self.verify(candidate.expose(), observed).await? {
            return Ok(false);
        }
        let consumed = self
            .users
            .consume_one_time_password(user_name, observed)
            .await
            .map_err(map_user_error)?;
        if consumed {
            info!(user_name = %user_name, "one-time password redeemed");
        }
        Ok(consumed)
    }

    async fn remove_one_time_password(&self, user_name: &UserName) -> Result<(), Error> {
        self.users
            .clear_one_time_password(user_name)
            .await
            .map_err(map_user_error)?;
        Ok(())
    }

    async fn update_password(
        &self,
        user_name: &UserName,
        password: &Password,
    ) -> Result<(), Error> {
        let digest = self.hash(password.expose()).await?;
        let updated = self
            .users
            .update_password(user_name, &digest)
            .await
            .map_err(map_user_error)?;
        if !updated {
            return Err(Error::user_not_found(user_name));
        }
        info!(user_name = %user_name, "password updated");
        Ok(())
    }

    async fn delete_user(&self, user_name: &UserName) -> Result<(), Error> {
        match self
            .users
            .delete_unless_admin(user_name)
            .await
            .map_err(map_user_error)?
        {
            AccountRemoval::Removed => {
                info!(user_name = %user_name, "account deleted");
                Ok(())
            }
            AccountRemoval::Protected => {
                warn!(user_name = %user_name, "refused to delete admin account");
                Err(Error::protected_account(user_name))
            }
            AccountRemoval::Missing => Err(Error::user_not_found(user_name)),
        }
    }

    async fn list_users(&self) -> Result<Vec<AccountSummary>, Error> {
        self.users.list().await.map_err(map_user_error)
    }

    async fn change_roles(
        &self,
        user_name: &UserName,
        roles: &RoleSet,
    ) -> Result<RoleChange, Error> {
        if roles.is_empty() {
            return Err(Error::invalid_request("at least one role is required")
                .with_details(json!({ "field": "roles", "code": "empty_roles" })));
        }
        match self
            .users
            .replace_roles_keeping_admin(user_name, roles)
            .await
            .map_err(map_user_error)?
        {
            RoleReplacement::Applied => {
                info!(user_name = %user_name, roles = %roles, "roles changed");
                Ok(RoleChange::Applied)
            }
            RoleReplacement::Rejected => {
                warn!(
                    user_name = %user_name,
                    requested = %roles,
                    "role change rejected: would remove the last admin"
                );
                Ok(RoleChange::Rejected)
            }
            RoleReplacement::Missing => Err(Error::user_not_found(user_name)),
        }
    }

    async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.users.count().await.map_err(map_user_error)? == 0)
    }
}

#[cfg(test)]
#[path = "account_service_tests.rs"]
mod tests;
