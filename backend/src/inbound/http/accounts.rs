//! Account lifecycle endpoints.
//!
//! ```text
//! POST   /api/v1/accounts                          {"userName","password","invitationCode"}
//! POST   /api/v1/accounts/bootstrap                {"userName","password"}
//! GET    /api/v1/accounts
//! GET    /api/v1/accounts/{userName}
//! DELETE /api/v1/accounts/{userName}
//! PUT    /api/v1/accounts/{userName}/roles         {"roles":["student"]}
//! PUT    /api/v1/accounts/{userName}/password      {"password"}
//! POST   /api/v1/accounts/{userName}/one-time-password
//! POST   /api/v1/accounts/{userName}/password-reset {"oneTimePassword","newPassword"}
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::domain::invitation_service::register_with_invitation;
use crate::domain::ports::RoleChange;
use crate::domain::{
    AccountSummary, ApiResult, Error, InvitationCode, Password, Registration, Role, RoleSet,
    UserName,
};
use crate::inbound::http::auth::{require_admin, require_caller, require_self_or_admin};
use crate::inbound::http::error::{code_field_error, role_field_error, user_field_error};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Body for `POST /api/v1/accounts`.
///
/// Supply `invitationCode` to self-register with the code's grants, or
/// `roles` as an administrator.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub user_name: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invitation_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

/// Body for `POST /api/v1/accounts/bootstrap`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapRequest {
    pub user_name: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RolesRequest {
    pub roles: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleChangeResponse {
    /// `false` when the change would have removed the last administrator.
    pub applied: bool,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PasswordUpdateRequest {
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetRequest {
    pub one_time_password: String,
    pub new_password: String,
}

/// Freshly issued one-time password for out-of-band delivery.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OneTimePasswordResponse {
    pub one_time_password: String,
}

pub(crate) fn parse_user_name(raw: &str) -> Result<UserName, Error> {
    UserName::new(raw).map_err(|err| user_field_error("userName", &err))
}

pub(crate) fn parse_password(field: &'static str, raw: String) -> Result<Password, Error> {
    Password::new(raw).map_err(|err| user_field_error(field, &err))
}

pub(crate) fn parse_roles(names: &[String]) -> Result<RoleSet, Error> {
    RoleSet::try_from_names(names).map_err(|err| role_field_error(&err))
}

/// Register an account.
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AccountSummary),
        (status = 400, description = "Invalid request", body = Error),
        (status = 403, description = "Roles supplied without administrator session", body = Error),
        (status = 404, description = "Unknown invitation code", body = Error),
        (status = 409, description = "User exists or code already used", body = Error),
        (status = 410, description = "Invitation code expired", body = Error),
        (status = 422, description = "Invitation code grants no roles", body = Error)
    ),
    tags = ["accounts"],
    operation_id = "register",
    security([])
)]
#[post("/accounts")]
pub async fn register(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let RegisterRequest {
        user_name,
        password,
        invitation_code,
        roles,
    } = payload.into_inner();
    let user_name = parse_user_name(&user_name)?;
    let password = parse_password("password", password)?;

    let roles = match (invitation_code, roles) {
        (Some(code), None) => {
            let code = InvitationCode::new(&code).map_err(|err| code_field_error(&err))?;
            register_with_invitation(
                state.accounts.as_ref(),
                state.invitations.as_ref(),
                &user_name,
                &password,
                &code,
            )
            .await?
        }
        (None, Some(names)) => {
            require_admin(&state, &session).await?;
            let roles = parse_roles(&names)?;
            let registration = Registration::new(user_name.clone(), password, roles.clone())
                .map_err(|err| user_field_error("roles", &err))?;
            state.accounts.register(&registration).await?;
            roles
        }
        _ => {
            return Err(Error::invalid_request(
                "supply exactly one of invitationCode or roles",
            ));
        }
    };

    info!(user_name = %user_name, roles = %roles, "account registered");
    Ok(HttpResponse::Created().json(AccountSummary { user_name, roles }))
}

/// Create the first administrator on an empty store.
#[utoipa::path(
    post,
    path = "/api/v1/accounts/bootstrap",
    request_body = BootstrapRequest,
    responses(
        (status = 201, description = "Administrator created", body = AccountSummary),
        (status = 400, description = "Invalid request", body = Error),
        (status = 403, description = "Accounts already exist", body = Error)
    ),
    tags = ["accounts"],
    operation_id = "bootstrapAdmin",
    security([])
)]
#[post("/accounts/bootstrap")]
pub async fn bootstrap(
    state: web::Data<HttpState>,
    payload: web::Json<BootstrapRequest>,
) -> ApiResult<HttpResponse> {
    let BootstrapRequest {
        user_name,
        password,
    } = payload.into_inner();
    let user_name = parse_user_name(&user_name)?;
    let password = parse_password("password", password)?;
    state
        .accounts
        .register_initial_admin(&user_name, &password)
        .await?;
    Ok(HttpResponse::Created().json(AccountSummary {
        user_name,
        roles: RoleSet::only(Role::Admin),
    }))
}

/// List every account ordered by user name.
#[utoipa::path(
    get,
    path = "/api/v1/accounts",
    responses(
        (status = 200, description = "Accounts", body = [AccountSummary]),
        (status = 401, description = "Login required", body = Error),
        (status = 403, description = "Administrator role required", body = Error)
    ),
    tags = ["accounts"],
    operation_id = "listAccounts"
)]
#[get("/accounts")]
pub async fn list_accounts(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<AccountSummary>>> {
    require_admin(&state, &session).await?;
    Ok(web::Json(state.accounts.list_users().await?))
}

/// Fetch one account's roles.
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{userName}",
    params(("userName" = String, Path, description = "Account user name")),
    responses(
        (status = 200, description = "Account", body = AccountSummary),
        (status = 401, description = "Login required", body = Error),
        (status = 403, description = "Not permitted", body = Error),
        (status = 404, description = "Unknown user", body = Error)
    ),
    tags = ["accounts"],
    operation_id = "getAccount"
)]
#[get("/accounts/{user_name}")]
pub async fn get_account(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<AccountSummary>> {
    let user_name = parse_user_name(&path)?;
    require_self_or_admin(&state, &session, &user_name).await?;
    let roles = state
        .accounts
        .get_user_roles(&user_name)
        .await?
        .ok_or_else(|| Error::user_not_found(&user_name))?;
    Ok(web::Json(AccountSummary { user_name, roles }))
}

/// Delete a non-administrator account.
#[utoipa::path(
    delete,
    path = "/api/v1/accounts/{userName}",
    params(("userName" = String, Path, description = "Account user name")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 401, description = "Login required", body = Error),
        (status = 403, description = "Not permitted or account is an administrator", body = Error),
        (status = 404, description = "Unknown user", body = Error)
    ),
    tags = ["accounts"],
    operation_id = "deleteAccount"
)]
#[delete("/accounts/{user_name}")]
pub async fn delete_account(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user_name = parse_user_name(&path)?;
    let caller = require_admin(&state, &session).await?;
    state.accounts.delete_user(&user_name).await?;
    info!(user_name = %user_name, by = %caller.user_name, "account deleted");
    Ok(HttpResponse::NoContent().finish())
}

/// Replace an account's roles.
///
/// A change that would leave no administrator is reported with
/// `applied: false` and leaves the account untouched.
#[utoipa::path(
    put,
    path = "/api/v1/accounts/{userName}/roles",
    params(("userName" = String, Path, description = "Account user name")),
    request_body = RolesRequest,
    responses(
        (status = 200, description = "Outcome of the change", body = RoleChangeResponse),
        (status = 400, description = "Invalid roles", body = Error),
        (status = 401, description = "Login required", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown user", body = Error)
    ),
    tags = ["accounts"],
    operation_id = "changeRoles"
)]
#[put("/accounts/{user_name}/roles")]
pub async fn change_roles(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<RolesRequest>,
) -> ApiResult<web::Json<RoleChangeResponse>> {
    let user_name = parse_user_name(&path)?;
    require_admin(&state, &session).await?;
    let roles = parse_roles(&payload.roles)?;
    let outcome = state.accounts.change_roles(&user_name, &roles).await?;
    Ok(web::Json(RoleChangeResponse {
        applied: outcome == RoleChange::Applied,
    }))
}

/// Overwrite the caller's own password.
#[utoipa::path(
    put,
    path = "/api/v1/accounts/{userName}/password",
    params(("userName" = String, Path, description = "Account user name")),
    request_body = PasswordUpdateRequest,
    responses(
        (status = 204, description = "Password updated"),
        (status = 400, description = "Invalid password", body = Error),
        (status = 401, description = "Login required", body = Error),
        (status = 403, description = "Not the session user", body = Error)
    ),
    tags = ["accounts"],
    operation_id = "updatePassword"
)]
#[put("/accounts/{user_name}/password")]
pub async fn update_password(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<PasswordUpdateRequest>,
) -> ApiResult<HttpResponse> {
    let user_name = parse_user_name(&path)?;
    let caller = require_caller(&state, &session).await?;
    if !caller.is(&user_name) {
        return Err(Error::forbidden("passwords can only be changed by their owner"));
    }
    let password = parse_password("password", payload.into_inner().password)?;
    state.accounts.update_password(&user_name, &password).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Issue a one-time password for a reset.
#[utoipa::path(
    post,
    path = "/api/v1/accounts/{userName}/one-time-password",
    params(("userName" = String, Path, description = "Account user name")),
    responses(
        (status = 200, description = "One-time password issued", body = OneTimePasswordResponse),
        (status = 401, description = "Login required", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown user", body = Error)
    ),
    tags = ["accounts"],
    operation_id = "requestOneTimePassword"
)]
#[post("/accounts/{user_name}/one-time-password")]
pub async fn request_one_time_password(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<OneTimePasswordResponse>> {
    let user_name = parse_user_name(&path)?;
    require_admin(&state, &session).await?;
    let token = state.accounts.request_one_time_password(&user_name).await?;
    Ok(web::Json(OneTimePasswordResponse {
        one_time_password: token.as_str().to_owned(),
    }))
}

/// Withdraw an outstanding one-time password.
///
/// Succeeds whether or not a password was outstanding.
#[utoipa::path(
    delete,
    path = "/api/v1/accounts/{userName}/one-time-password",
    params(("userName" = String, Path, description = "Account user name")),
    responses(
        (status = 204, description = "No one-time password outstanding"),
        (status = 401, description = "Login required", body = Error),
        (status = 403, description = "Administrator role required", body = Error)
    ),
    tags = ["accounts"],
    operation_id = "removeOneTimePassword"
)]
#[delete("/accounts/{user_name}/one-time-password")]
pub async fn remove_one_time_password(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user_name = parse_user_name(&path)?;
    require_admin(&state, &session).await?;
    state.accounts.remove_one_time_password(&user_name).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Redeem a one-time password and set a new password.
#[utoipa::path(
    post,
    path = "/api/v1/accounts/{userName}/password-reset",
    params(("userName" = String, Path, description = "Account user name")),
    request_body = PasswordResetRequest,
    responses(
        (status = 204, description = "Password reset"),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "One-time password did not match", body = Error)
    ),
    tags = ["accounts"],
    operation_id = "resetPassword",
    security([])
)]
#[post("/accounts/{user_name}/password-reset")]
pub async fn reset_password(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<PasswordResetRequest>,
) -> ApiResult<HttpResponse> {
    let user_name = parse_user_name(&path)?;
    let PasswordResetRequest {
        one_time_password,
        new_password,
    } = payload.into_inner();
    let one_time_password = parse_password("oneTimePassword", one_time_password)?;
    let new_password = parse_password("newPassword", new_password)?;
    if !state
        .accounts
        .redeem_one_time_password(&user_name, &one_time_password)
        .await?
    {
        return Err(Error::invalid_credentials());
    }
    state
        .accounts
        .update_password(&user_name, &new_password)
        .await?;
    info!(user_name = %user_name, "password reset with one-time password");
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
#[path = "accounts_tests.rs"]
mod tests;
