//! Driving port for invitation code use-cases.

use async_trait::async_trait;

use crate::domain::{Error, InvitationCode, RoleSet, UserName};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InvitationCodes: Send + Sync {
    /// Issue a new unused code granting `grants`.
    async fn generate_code(&self, grants: &RoleSet) -> Result<InvitationCode, Error>;

    /// Consume `code`.
    ///
    /// Fails with `code_not_found_or_used` when the code cannot be consumed
    /// and `code_expired` when it was consumed past its time-to-live.
    async fn redeem(&self, code: &InvitationCode) -> Result<(), Error>;

    /// Boolean form of [`InvitationCodes::redeem`]; only persistence
    /// failures surface as errors.
    async fn validate_and_redeem(&self, code: &InvitationCode) -> Result<bool, Error>;

    /// Roles granted by `code`, whatever its used or expiry state.
    async fn get_role_grants(&self, code: &InvitationCode) -> Result<RoleSet, Error>;

    /// Overwrite the roles of `user_name` with the grants of `code`.
    async fn assign_roles_from_code(
        &self,
        user_name: &UserName,
        code: &InvitationCode,
    ) -> Result<RoleSet, Error>;
}
