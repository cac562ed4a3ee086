//! PostgreSQL-backed `UserRepository` adapter.
//!
//! Guarded mutations lock the rows they depend on with `SELECT ... FOR
//! UPDATE` inside one transaction, then apply the domain rule before writing.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::AsyncConnection as _;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::domain::ports::{AccountRemoval, RoleReplacement, UserPersistenceError, UserRepository};
use crate::domain::{
    Account, AccountSummary, Role, RoleSet, SecretDigest, UserName, role_change_permitted,
};

use super::diesel_error_mapping::{StoreFailure, classify_diesel_error, classify_pool_error};
use super::models::{NewUserRow, UserRow};
use super::pool::{DbPool, PoolError};
use super::schema::users;

/// Diesel-backed implementation of the user repository port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn into_port_error(failure: StoreFailure) -> UserPersistenceError {
    match failure {
        StoreFailure::Connection(message) => UserPersistenceError::connection(message),
        StoreFailure::Duplicate(key) => UserPersistenceError::duplicate(key),
        StoreFailure::Query(message) => UserPersistenceError::query(message),
    }
}

fn map_pool_error(error: PoolError) -> UserPersistenceError {
    into_port_error(classify_pool_error(error))
}

fn map_diesel_error(operation: &'static str) -> impl Fn(DieselError) -> UserPersistenceError {
    move |error| into_port_error(classify_diesel_error(error, operation))
}

fn parse_roles(names: &[String]) -> Result<RoleSet, DieselError> {
    RoleSet::try_from_names(names).map_err(|err| DieselError::DeserializationError(Box::new(err)))
}

fn row_to_account(row: UserRow) -> Result<Account, UserPersistenceError> {
    let user_name = UserName::new(&row.user_name)
        .map_err(|err| UserPersistenceError::query(format!("stored user name invalid: {err}")))?;
    let roles = RoleSet::try_from_names(&row.roles)
        .map_err(|err| UserPersistenceError::query(format!("stored roles invalid: {err}")))?;
    Ok(Account::new(
        user_name,
        SecretDigest::from_stored(row.password_hash),
        roles,
    )
    .with_one_time_password(row.one_time_password_hash.map(SecretDigest::from_stored)))
}

fn admin_names() -> Vec<String> {
    vec![Role::Admin.as_str().to_owned()]
}

impl DieselUserRepository {
    async fn insert_row(
        conn: &mut AsyncPgConnection,
        account: &Account,
    ) -> Result<usize, DieselError> {
        let row = NewUserRow {
            user_name: account.user_name().as_ref(),
            password_hash: account.password().as_str(),
            roles: account.roles().to_names(),
            one_time_password_hash: account.one_time_password().map(SecretDigest::as_str),
        };
        diesel::insert_into(users::table)
            .values(&row)
            .execute(conn)
            .await
    }
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn insert(&self, account: &Account) -> Result<(), UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        Self::insert_row(&mut conn, account)
            .await
            .map(|_| ())
            .map_err(map_diesel_error("insert user"))
    }

    async fn insert_if_empty(&self, account: &Account) -> Result<bool, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction(|conn| {
            async move {
                // Blocks concurrent inserts until this transaction ends.
                diesel::sql_query("LOCK TABLE users IN SHARE ROW EXCLUSIVE MODE")
                    .execute(conn)
                    .await?;
                let existing: i64 = users::table.count().get_result(conn).await?;
                if existing > 0 {
                    return Ok(false);
                }
                Self::insert_row(conn, account).await?;
                Ok(true)
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error("insert initial user"))
    }

    async fn find(&self, user_name: &UserName) -> Result<Option<Account>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UserRow> = users::table
            .filter(users::user_name.eq(user_name.as_ref()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error("find user"))?;
        row.map(row_to_account).transpose()
    }

    async fn count(&self) -> Result<u64, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let total: i64 = users::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error("count users"))?;
        u64::try_from(total).map_err(|err| UserPersistenceError::query(err.to_string()))
    }

    async fn list(&self) -> Result<Vec<AccountSummary>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<(String, Vec<String>)> = users::table
            .select((users::user_name, users::roles))
            .order_by(users::user_name)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error("list users"))?;
        rows.into_iter()
            .map(|(name, roles)| {
                let user_name = UserName::new(&name).map_err(|err| {
                    UserPersistenceError::query(format!("stored user name invalid: {err}"))
                })?;
                let roles = RoleSet::try_from_names(&roles).map_err(|err| {
                    UserPersistenceError::query(format!("stored roles invalid: {err}"))
                })?;
                Ok(AccountSummary { user_name, roles })
            })
            .collect()
    }

    async fn update_password(
        &self,
        user_name: &UserName,
        digest: &SecretDigest,
    ) -> Result<bool, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(users::table.find(user_name.as_ref()))
            .set(users::password_hash.eq(digest.as_str()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error("update password"))?;
        Ok(updated > 0)
    }

    async fn set_one_time_password(
        &self,
        user_name: &UserName,
        digest: &SecretDigest,
    ) -> Result<bool, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(users::table.find(user_name.as_ref()))
            .set(users::one_time_password_hash.eq(Some(digest.as_str())))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error("set one-time password"))?;
        Ok(updated > 0)
    }

    async fn consume_one_time_password(
        &self,
        user_name: &UserName,
        observed: &SecretDigest,
    ) -> Result<bool, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(
            users::table
                .filter(users::user_name.eq(user_name.as_ref()))
                .filter(users::one_time_password_hash.eq(observed.as_str())),
        )
        .set(users::one_time_password_hash.eq(None::<String>))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error("consume one-time password"))?;
        Ok(updated > 0)
    }

    async fn clear_one_time_password(
        &self,
        user_name: &UserName,
    ) -> Result<bool, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(users::table.find(user_name.as_ref()))
            .set(users::one_time_password_hash.eq(None::<String>))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error("clear one-time password"))?;
        Ok(updated > 0)
    }

    async fn replace_roles(
        &self,
        user_name: &UserName,
        roles: &RoleSet,
    ) -> Result<bool, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(users::table.find(user_name.as_ref()))
            .set(users::roles.eq(roles.to_names()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error("replace roles"))?;
        Ok(updated > 0)
    }

    async fn replace_roles_keeping_admin(
        &self,
        user_name: &UserName,
        roles: &RoleSet,
    ) -> Result<RoleReplacement, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let target = user_name.as_ref().to_owned();
        let next = roles.clone();
        conn.transaction(|conn| {
            async move {
                // Lock the target and every admin row in one ordered sweep.
                let locked: Vec<(String, Vec<String>)> = users::table
                    .filter(
                        users::user_name
                            .eq(target.as_str())
                            .or(users::roles.contains(admin_names())),
                    )
                    .order_by(users::user_name)
                    .select((users::user_name, users::roles))
                    .for_update()
                    .load(conn)
                    .await?;

                let Some((_, current)) = locked.iter().find(|(name, _)| *name == target) else {
                    return Ok(RoleReplacement::Missing);
                };
                let current = parse_roles(current)?;
                let other_admins = locked.iter().filter(|(name, _)| *name != target).count();
                let other_admins = u64::try_from(other_admins).unwrap_or(u64::MAX);
                if !role_change_permitted(&current, other_admins, &next) {
                    return Ok(RoleReplacement::Rejected);
                }

                diesel::update(users::table.find(target.as_str()))
                    .set(users::roles.eq(next.to_names()))
                    .execute(conn)
                    .await?;
                Ok(RoleReplacement::Applied)
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error("change roles"))
    }

    async fn delete_unless_admin(
        &self,
        user_name: &UserName,
    ) -> Result<AccountRemoval, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let target = user_name.as_ref().to_owned();
        conn.transaction(|conn| {
            async move {
                let roles: Option<Vec<String>> = users::table
                    .find(target.as_str())
                    .select(users::roles)
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?;
                let Some(roles) = roles else {
                    return Ok(AccountRemoval::Missing);
                };
                if parse_roles(&roles)?.is_admin() {
                    return Ok(AccountRemoval::Protected);
                }
                diesel::delete(users::table.find(target.as_str()))
                    .execute(conn)
                    .await?;
                Ok(AccountRemoval::Removed)
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error("delete user"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn row(name: &str, roles: &[&str], otp: Option<&str>) -> UserRow {
        UserRow {
            user_name: name.to_owned(),
            password_hash: "$argon2id$stored".to_owned(),
            roles: roles.iter().map(|role| (*role).to_owned()).collect(),
            one_time_password_hash: otp.map(str::to_owned),
        }
    }

    #[rstest]
    fn rows_convert_to_accounts() {
        let account = row_to_account(row("AdminUser", &["staff", "admin"], Some("$otp")))
            .expect("valid row");
        assert_eq!(account.user_name().as_ref(), "AdminUser");
        assert_eq!(account.roles().to_string(), "admin, staff");
        assert_eq!(
            account.one_time_password().map(SecretDigest::as_str),
            Some("$otp")
        );
    }

    #[rstest]
    fn rows_with_unknown_roles_are_query_errors() {
        let err = row_to_account(row("bob", &["administrator"], None)).expect_err("bad role");
        assert!(matches!(err, UserPersistenceError::Query { .. }));
    }

    #[rstest]
    #[case(StoreFailure::Connection("down".to_owned()), "connection")]
    #[case(StoreFailure::Duplicate("users_pkey".to_owned()), "duplicate")]
    #[case(StoreFailure::Query("bad".to_owned()), "query")]
    fn store_failures_map_to_port_errors(#[case] failure: StoreFailure, #[case] kind: &str) {
        assert_eq!(into_port_error(failure).kind(), kind);
    }
}
