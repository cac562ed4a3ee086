//! PostgreSQL-backed `InvitationCodeRepository` adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{InvitationCodePersistenceError, InvitationCodeRepository};
use crate::domain::{Invitation, InvitationCode};

use super::diesel_error_mapping::{StoreFailure, classify_diesel_error, classify_pool_error};
use super::models::{InvitationRow, NewInvitationRow};
use super::pool::{DbPool, PoolError};
use super::schema::invitation_codes;

/// Diesel-backed implementation of the invitation code port.
#[derive(Clone)]
pub struct DieselInvitationCodeRepository {
    pool: DbPool,
}

impl DieselInvitationCodeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn into_port_error(failure: StoreFailure) -> InvitationCodePersistenceError {
    match failure {
        StoreFailure::Connection(message) => InvitationCodePersistenceError::connection(message),
        StoreFailure::Duplicate(key) => InvitationCodePersistenceError::duplicate(key),
        StoreFailure::Query(message) => InvitationCodePersistenceError::query(message),
    }
}

fn map_pool_error(error: PoolError) -> InvitationCodePersistenceError {
    into_port_error(classify_pool_error(error))
}

fn map_diesel_error(
    operation: &'static str,
) -> impl Fn(DieselError) -> InvitationCodePersistenceError {
    move |error| into_port_error(classify_diesel_error(error, operation))
}

fn row_to_invitation(row: InvitationRow) -> Result<Invitation, InvitationCodePersistenceError> {
    let grants = row.grants();
    let code = InvitationCode::new(&row.code).map_err(|err| {
        InvitationCodePersistenceError::query(format!("stored invitation code invalid: {err}"))
    })?;
    Ok(Invitation {
        code,
        grants,
        used: row.is_used,
        generated_at: row.generated_at,
    })
}

#[async_trait]
impl InvitationCodeRepository for DieselInvitationCodeRepository {
    async fn insert(&self, invitation: &Invitation) -> Result<(), InvitationCodePersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(invitation_codes::table)
            .values(NewInvitationRow::from(invitation))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error("insert invitation code"))
    }

    async fn find(
        &self,
        code: &InvitationCode,
    ) -> Result<Option<Invitation>, InvitationCodePersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<InvitationRow> = invitation_codes::table
            .find(code.as_ref())
            .select(InvitationRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error("find invitation code"))?;
        row.map(row_to_invitation).transpose()
    }

    async fn mark_used(
        &self,
        code: &InvitationCode,
    ) -> Result<Option<DateTime<Utc>>, InvitationCodePersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        // Single statement: concurrent redeemers race on the row lock and only
        // one sees `is_used = false`.
        diesel::update(
            invitation_codes::table
                .filter(invitation_codes::code.eq(code.as_ref()))
                .filter(invitation_codes::is_used.eq(false)),
        )
        .set(invitation_codes::is_used.eq(true))
        .returning(invitation_codes::generated_at)
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(map_diesel_error("redeem invitation code"))
    }
}
