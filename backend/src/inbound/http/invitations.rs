//! Invitation code endpoints.
//!
//! ```text
//! POST /api/v1/invitations {"grants":["student"]}
//! GET  /api/v1/invitations/{code}
//! POST /api/v1/invitations/{code}/redemption
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::domain::{ApiResult, Error, InvitationCode, Role, RoleSet};
use crate::inbound::http::accounts::parse_roles;
use crate::inbound::http::auth::{require_admin, require_caller};
use crate::inbound::http::error::code_field_error;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCodeRequest {
    pub grants: Vec<String>,
}

/// An invitation code and the roles it grants.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvitationResponse {
    #[schema(value_type = String, example = "Ab12Cd34")]
    pub code: InvitationCode,
    #[schema(value_type = Vec<Role>, example = json!(["student"]))]
    pub grants: RoleSet,
}

fn parse_code(raw: &str) -> Result<InvitationCode, Error> {
    InvitationCode::new(raw).map_err(|err| code_field_error(&err))
}

/// Issue a new invitation code.
#[utoipa::path(
    post,
    path = "/api/v1/invitations",
    request_body = GenerateCodeRequest,
    responses(
        (status = 201, description = "Code issued", body = InvitationResponse),
        (status = 400, description = "Invalid grants", body = Error),
        (status = 401, description = "Login required", body = Error),
        (status = 403, description = "Administrator role required", body = Error)
    ),
    tags = ["invitations"],
    operation_id = "generateInvitationCode"
)]
#[post("/invitations")]
pub async fn generate_code(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<GenerateCodeRequest>,
) -> ApiResult<HttpResponse> {
    let caller = require_admin(&state, &session).await?;
    let grants = parse_roles(&payload.grants)?;
    let code = state.invitations.generate_code(&grants).await?;
    info!(by = %caller.user_name, grants = %grants, "invitation code issued");
    Ok(HttpResponse::Created().json(InvitationResponse { code, grants }))
}

/// Show the roles a code grants, whether or not it was used.
#[utoipa::path(
    get,
    path = "/api/v1/invitations/{code}",
    params(("code" = String, Path, description = "Invitation code")),
    responses(
        (status = 200, description = "Grants", body = InvitationResponse),
        (status = 401, description = "Login required", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown code", body = Error),
        (status = 422, description = "Code grants no roles", body = Error)
    ),
    tags = ["invitations"],
    operation_id = "getInvitationGrants"
)]
#[get("/invitations/{code}")]
pub async fn get_grants(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<InvitationResponse>> {
    require_admin(&state, &session).await?;
    let code = parse_code(&path)?;
    let grants = state.invitations.get_role_grants(&code).await?;
    Ok(web::Json(InvitationResponse { code, grants }))
}

/// Redeem a code and take its grants as the session user's roles.
#[utoipa::path(
    post,
    path = "/api/v1/invitations/{code}/redemption",
    params(("code" = String, Path, description = "Invitation code")),
    responses(
        (status = 200, description = "Roles assigned", body = InvitationResponse),
        (status = 401, description = "Login required", body = Error),
        (status = 409, description = "Code unknown or already used", body = Error),
        (status = 410, description = "Code expired", body = Error)
    ),
    tags = ["invitations"],
    operation_id = "redeemInvitationCode"
)]
#[post("/invitations/{code}/redemption")]
pub async fn redeem_code(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<InvitationResponse>> {
    let caller = require_caller(&state, &session).await?;
    let code = parse_code(&path)?;
    state.invitations.redeem(&code).await?;
    let grants = state
        .invitations
        .assign_roles_from_code(&caller.user_name, &code)
        .await?;
    info!(user_name = %caller.user_name, roles = %grants, "invitation code redeemed");
    Ok(web::Json(InvitationResponse { code, grants }))
}

#[cfg(test)]
#[path = "invitations_tests.rs"]
mod tests;
