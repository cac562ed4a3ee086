//! Invitation code service.
//!
//! Redemption marks the code used before checking its age, so a code that
//! is redeemed too late is still consumed.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::ports::{
    AccountManager, InvitationCodePersistenceError, InvitationCodeRepository, InvitationCodes,
    UserRepository, map_code_error, map_user_error,
};
use crate::domain::{
    Error, ErrorCode, Invitation, InvitationCode, Password, Registration, RoleSet, UserName,
    within_ttl,
};

/// Attempts made to find an unused random code before giving up.
pub const MAX_GENERATION_ATTEMPTS: usize = 5;

/// Invitation service implementing the [`InvitationCodes`] driving port.
#[derive(Clone)]
pub struct InvitationService<C, U> {
    codes: Arc<C>,
    users: Arc<U>,
    clock: Arc<dyn Clock>,
}

impl<C, U> InvitationService<C, U> {
    pub fn new(codes: Arc<C>, users: Arc<U>, clock: Arc<dyn Clock>) -> Self {
        Self {
            codes,
            users,
            clock,
        }
    }
}

impl<C, U> InvitationService<C, U>
where
    C: InvitationCodeRepository,
    U: UserRepository,
{
    async fn find(&self, code: &InvitationCode) -> Result<Invitation, Error> {
        self.codes
            .find(code)
            .await
            .map_err(map_code_error)?
            .ok_or_else(|| Error::code_not_found(code))
    }
}

#[async_trait]
impl<C, U> InvitationCodes for InvitationService<C, U>
where
    C: InvitationCodeRepository,
    U: UserRepository,
{
    async fn generate_code(&self, grants: &RoleSet) -> Result<InvitationCode, Error> {
        if grants.is_empty() {
            return Err(Error::invalid_request("an invitation must grant at least one role")
                .with_details(json!({ "field": "roles", "code": "empty_roles" })));
        }
        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let invitation =
                Invitation::new(InvitationCode::generate(), grants.clone(), self.clock.utc());
            match self.codes.insert(&invitation).await {
                Ok(()) => {
                    info!(code = %invitation.code, grants = %grants, "invitation code generated");
                    return Ok(invitation.code);
                }
                Err(InvitationCodePersistenceError::Duplicate { .. }) => {
                    warn!(attempt, "invitation code collision; retrying");
                }
                Err(other) => return Err(map_code_error(other)),
            }
        }
        Err(Error::internal(format!(
            "could not allocate a unique invitation code after {MAX_GENERATION_ATTEMPTS} attempts"
        )))
    }

    async fn redeem(&self, code: &InvitationCode) -> Result<(), Error> {
        let generated_at = self
            .codes
            .mark_used(code)
            .await
            .map_err(map_code_error)?
            .ok_or_else(|| Error::code_not_found_or_used(code))?;
        let now = self.clock.utc();
        if !within_ttl(generated_at, now) {
            warn!(code = %code, %generated_at, %now, "expired invitation code consumed");
            return Err(Error::code_expired(code));
        }
        info!(code = %code, "invitation code redeemed");
        Ok(())
    }

    async fn validate_and_redeem(&self, code: &InvitationCode) -> Result<bool, Error> {
        match self.redeem(code).await {
            Ok(()) => Ok(true),
            Err(err)
                if matches!(
                    err.code(),
                    ErrorCode::CodeNotFoundOrUsed | ErrorCode::CodeExpired
                ) =>
            {
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    async fn get_role_grants(&self, code: &InvitationCode) -> Result<RoleSet, Error> {
        let invitation = self.find(code).await?;
        if invitation.grants.is_empty() {
            return Err(Error::code_grants_no_roles(code));
        }
        Ok(invitation.grants)
    }

    async fn assign_roles_from_code(
        &self,
        user_name: &UserName,
        code: &InvitationCode,
    ) -> Result<RoleSet, Error> {
        let grants = self.get_role_grants(code).await?;
        let updated = self
            .users
            .replace_roles(user_name, &grants)
            .await
            .map_err(map_user_error)?;
        if !updated {
            return Err(Error::user_not_found(user_name));
        }
        info!(user_name = %user_name, code = %code, roles = %grants, "roles assigned from invitation");
        Ok(grants)
    }
}

/// Register an account whose roles come from an invitation code.
///
/// The name is checked before the code is consumed, so registering a name
/// that is already taken leaves the invitation unused. The check is not
/// atomic with the insert: when a concurrent registration claims the name in
/// between, the uniqueness constraint still rejects this one with
/// `duplicate_user`, but the code has already been redeemed.
pub async fn register_with_invitation<A, I>(
    accounts: &A,
    invitations: &I,
    user_name: &UserName,
    password: &Password,
    code: &InvitationCode,
) -> Result<RoleSet, Error>
where
    A: AccountManager + ?Sized,
    I: InvitationCodes + ?Sized,
{
    if accounts.user_exists(user_name).await? {
        return Err(Error::duplicate_user(user_name));
    }
    let grants = invitations.get_role_grants(code).await?;
    invitations.redeem(code).await?;
    let registration = Registration::new(user_name.clone(), password.clone(), grants.clone())
        .map_err(|err| Error::invalid_request(err.to_string()))?;
    accounts.register(&registration).await?;
    Ok(grants)
}

#[cfg(test)]
#[path = "invitation_service_tests.rs"]
mod tests;
