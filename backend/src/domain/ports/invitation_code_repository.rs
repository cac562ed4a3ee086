//! Port abstraction for invitation code persistence.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::domain::{Error, Invitation, InvitationCode};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by invitation code adapters.
    pub enum InvitationCodePersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "invitation repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "invitation repository query failed: {message}",
        /// The generated code already exists.
        Duplicate { key: String } => "invitation code {key} already exists",
    }
}

/// Map a store failure onto the error reported to callers.
///
/// Connection details are logged and never copied into the returned error.
pub(crate) fn map_code_error(error: InvitationCodePersistenceError) -> Error {
    warn!(kind = error.kind(), %error, "invitation repository failure");
    match error {
        InvitationCodePersistenceError::Connection { .. } => {
            Error::service_unavailable("invitation store unavailable")
        }
        InvitationCodePersistenceError::Query { message } => {
            Error::internal(format!("invitation repository error: {message}"))
        }
        InvitationCodePersistenceError::Duplicate { key } => {
            Error::internal(format!("unexpected invitation code conflict on {key}"))
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InvitationCodeRepository: Send + Sync {
    /// Persist a new invitation; fails with `Duplicate` on a code collision.
    async fn insert(&self, invitation: &Invitation) -> Result<(), InvitationCodePersistenceError>;

    /// Fetch an invitation regardless of its used or expiry state.
    async fn find(
        &self,
        code: &InvitationCode,
    ) -> Result<Option<Invitation>, InvitationCodePersistenceError>;

    /// Atomically flip an unused code to used.
    ///
    /// Returns the generation time, or `None` when the code is absent or
    /// already used.
    async fn mark_used(
        &self,
        code: &InvitationCode,
    ) -> Result<Option<DateTime<Utc>>, InvitationCodePersistenceError>;
}
