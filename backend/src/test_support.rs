//! In-memory port implementations for tests.
//!
//! Compiled for unit tests and, behind the `test-support` feature, for the
//! integration suites under `tests/`. Each store keeps its rows behind a
//! synchronous mutex that is never held across an await point, so guarded
//! operations are atomic in the same way the Diesel transactions are.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, Utc};
use mockable::Clock;

use crate::domain::ports::{
    AccountRemoval, InvitationCodePersistenceError, InvitationCodeRepository, RoleReplacement,
    UserPersistenceError, UserRepository,
};
use crate::domain::{
    Account, AccountSummary, Invitation, InvitationCode, RoleSet, SecretDigest, UserName,
    role_change_permitted,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Account store keyed by user name.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    rows: Mutex<BTreeMap<UserName, Account>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a stored row, including secrets.
    pub fn snapshot(&self, user_name: &UserName) -> Option<Account> {
        lock(&self.rows).get(user_name).cloned()
    }

    fn update<F>(&self, user_name: &UserName, apply: F) -> bool
    where
        F: FnOnce(Account) -> Account,
    {
        let mut rows = lock(&self.rows);
        match rows.remove(user_name) {
            Some(account) => {
                rows.insert(user_name.clone(), apply(account));
                true
            }
            None => false,
        }
    }
}

fn rebuild(account: &Account, password: SecretDigest, roles: RoleSet) -> Account {
    Account::new(account.user_name().clone(), password, roles)
        .with_one_time_password(account.one_time_password().cloned())
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, account: &Account) -> Result<(), UserPersistenceError> {
        let mut rows = lock(&self.rows);
        if rows.contains_key(account.user_name()) {
            return Err(UserPersistenceError::duplicate(account.user_name().as_ref()));
        }
        rows.insert(account.user_name().clone(), account.clone());
        Ok(())
    }

    async fn insert_if_empty(&self, account: &Account) -> Result<bool, UserPersistenceError> {
        let mut rows = lock(&self.rows);
        if !rows.is_empty() {
            return Ok(false);
        }
        rows.insert(account.user_name().clone(), account.clone());
        Ok(true)
    }

    async fn find(&self, user_name: &UserName) -> Result<Option<Account>, UserPersistenceError> {
        Ok(self.snapshot(user_name))
    }

    async fn count(&self) -> Result<u64, UserPersistenceError> {
        Ok(lock(&self.rows).len() as u64)
    }

    async fn list(&self) -> Result<Vec<AccountSummary>, UserPersistenceError> {
        Ok(lock(&self.rows).values().map(Account::summary).collect())
    }

    async fn update_password(
        &self,
        user_name: &UserName,
        digest: &SecretDigest,
    ) -> Result<bool, UserPersistenceError> {
        Ok(self.update(user_name, |account| {
            rebuild(&account, digest.clone(), account.roles().clone())
        }))
    }

    async fn set_one_time_password(
        &self,
        user_name: &UserName,
        digest: &SecretDigest,
    ) -> Result<bool, UserPersistenceError> {
        Ok(self.update(user_name, |account| {
            account.with_one_time_password(Some(digest.clone()))
        }))
    }

    async fn consume_one_time_password(
        &self,
        user_name: &UserName,
        observed: &SecretDigest,
    ) -> Result<bool, UserPersistenceError> {
        let mut rows = lock(&self.rows);
        let Some(account) = rows.get_mut(user_name) else {
            return Ok(false);
        };
        if account.one_time_password() != Some(observed) {
            return Ok(false);
        }
        *account = account.clone().with_one_time_password(None);
        Ok(true)
    }

    async fn clear_one_time_password(
        &self,
        user_name: &UserName,
    ) -> Result<bool, UserPersistenceError> {
        Ok(self.update(user_name, |account| account.with_one_time_password(None)))
    }

    async fn replace_roles(
        &self,
        user_name: &UserName,
        roles: &RoleSet,
    ) -> Result<bool, UserPersistenceError> {
        Ok(self.update(user_name, |account| {
            rebuild(&account, account.password().clone(), roles.clone())
        }))
    }

    async fn replace_roles_keeping_admin(
        &self,
        user_name: &UserName,
        roles: &RoleSet,
    ) -> Result<RoleReplacement, UserPersistenceError> {
        let mut rows = lock(&self.rows);
        let other_admins = rows
            .values()
            .filter(|account| account.user_name() != user_name && account.roles().is_admin())
            .count() as u64;
        let Some(account) = rows.get_mut(user_name) else {
            return Ok(RoleReplacement::Missing);
        };
        if !role_change_permitted(account.roles(), other_admins, roles) {
            return Ok(RoleReplacement::Rejected);
        }
        *account = rebuild(account, account.password().clone(), roles.clone());
        Ok(RoleReplacement::Applied)
    }

    async fn delete_unless_admin(
        &self,
        user_name: &UserName,
    ) -> Result<AccountRemoval, UserPersistenceError> {
        let mut rows = lock(&self.rows);
        match rows.get(user_name) {
            None => Ok(AccountRemoval::Missing),
            Some(account) if account.roles().is_admin() => Ok(AccountRemoval::Protected),
            Some(_) => {
                rows.remove(user_name);
                Ok(AccountRemoval::Removed)
            }
        }
    }
}

/// Invitation store keyed by code.
#[derive(Debug, Default)]
pub struct InMemoryInvitationCodeRepository {
    rows: Mutex<BTreeMap<InvitationCode, Invitation>>,
}

impl InMemoryInvitationCodeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row directly, bypassing the service rules.
    pub fn seed(&self, invitation: Invitation) {
        lock(&self.rows).insert(invitation.code.clone(), invitation);
    }

    pub fn snapshot(&self, code: &InvitationCode) -> Option<Invitation> {
        lock(&self.rows).get(code).cloned()
    }
}

#[async_trait]
impl InvitationCodeRepository for InMemoryInvitationCodeRepository {
    async fn insert(&self, invitation: &Invitation) -> Result<(), InvitationCodePersistenceError> {
        let mut rows = lock(&self.rows);
        if rows.contains_key(&invitation.code) {
            return Err(InvitationCodePersistenceError::duplicate(
                invitation.code.as_ref(),
            ));
        }
        rows.insert(invitation.code.clone(), invitation.clone());
        Ok(())
    }

    async fn find(
        &self,
        code: &InvitationCode,
    ) -> Result<Option<Invitation>, InvitationCodePersistenceError> {
        Ok(self.snapshot(code))
    }

    async fn mark_used(
        &self,
        code: &InvitationCode,
    ) -> Result<Option<DateTime<Utc>>, InvitationCodePersistenceError> {
        let mut rows = lock(&self.rows);
        Ok(rows
            .get_mut(code)
            .filter(|invitation| !invitation.used)
            .map(|invitation| {
                invitation.used = true;
                invitation.generated_at
            }))
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct FixtureClock {
    utc_now: Mutex<DateTime<Utc>>,
}

impl FixtureClock {
    pub fn new(utc_now: DateTime<Utc>) -> Self {
        Self {
            utc_now: Mutex::new(utc_now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = lock(&self.utc_now);
        *now += by;
    }
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.utc_now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use rstest::rstest;

    fn account(name: &str, roles: RoleSet) -> Account {
        Account::new(
            UserName::new(name).expect("valid name"),
            SecretDigest::from_stored("digest"),
            roles,
        )
    }

    #[rstest]
    #[tokio::test]
    async fn guarded_role_change_counts_other_admins() {
        let repo = InMemoryUserRepository::new();
        repo.insert(&account("A", RoleSet::only(Role::Admin)))
            .await
            .expect("insert A");
        let a = UserName::new("A").expect("valid name");
        let outcome = repo
            .replace_roles_keeping_admin(&a, &RoleSet::only(Role::Student))
            .await
            .expect("change");
        assert_eq!(outcome, RoleReplacement::Rejected);

        repo.insert(&account("C", RoleSet::only(Role::Admin)))
            .await
            .expect("insert C");
        let outcome = repo
            .replace_roles_keeping_admin(&a, &RoleSet::only(Role::Student))
            .await
            .expect("change");
        assert_eq!(outcome, RoleReplacement::Applied);
    }

    #[rstest]
    #[tokio::test]
    async fn mark_used_flips_once() {
        let repo = InMemoryInvitationCodeRepository::new();
        let code = InvitationCode::new("Ab12Cd34").expect("valid code");
        repo.seed(Invitation::new(
            code.clone(),
            RoleSet::only(Role::Student),
            Utc::now(),
        ));
        assert!(repo.mark_used(&code).await.expect("mark").is_some());
        assert!(repo.mark_used(&code).await.expect("mark").is_none());
    }
}
