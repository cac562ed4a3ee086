//! OpenAPI documentation for the account and invitation API.
//!
//! Served by Swagger UI in debug builds.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{AccountSummary, Error, ErrorCode, Role};
use crate::inbound::http::accounts::{
    BootstrapRequest, OneTimePasswordResponse, PasswordResetRequest, PasswordUpdateRequest,
    RegisterRequest, RoleChangeResponse, RolesRequest,
};
use crate::inbound::http::invitations::{GenerateCodeRequest, InvitationResponse};
use crate::inbound::http::login::LoginRequest;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/login.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Forum accounts API",
        description = "Registration, login, roles and invitation codes for the classroom forum."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::login::login,
        crate::inbound::http::login::logout,
        crate::inbound::http::accounts::register,
        crate::inbound::http::accounts::bootstrap,
        crate::inbound::http::accounts::list_accounts,
        crate::inbound::http::accounts::get_account,
        crate::inbound::http::accounts::delete_account,
        crate::inbound::http::accounts::change_roles,
        crate::inbound::http::accounts::update_password,
        crate::inbound::http::accounts::request_one_time_password,
        crate::inbound::http::accounts::remove_one_time_password,
        crate::inbound::http::accounts::reset_password,
        crate::inbound::http::invitations::generate_code,
        crate::inbound::http::invitations::get_grants,
        crate::inbound::http::invitations::redeem_code,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        Role,
        AccountSummary,
        LoginRequest,
        RegisterRequest,
        BootstrapRequest,
        RolesRequest,
        RoleChangeResponse,
        PasswordUpdateRequest,
        PasswordResetRequest,
        OneTimePasswordResponse,
        GenerateCodeRequest,
        InvitationResponse,
    )),
    tags(
        (name = "sessions", description = "Login and logout"),
        (name = "accounts", description = "Account lifecycle"),
        (name = "invitations", description = "Role-granting invitation codes"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    fn object_has_field(schema: &RefOr<Schema>, field: &str) -> bool {
        matches!(schema, RefOr::T(Schema::Object(obj)) if obj.properties.contains_key(field))
    }

    #[rstest]
    #[case("Error", "code")]
    #[case("Error", "traceId")]
    #[case("AccountSummary", "userName")]
    #[case("LoginRequest", "roles")]
    #[case("InvitationResponse", "grants")]
    fn schemas_expose_camel_case_fields(#[case] schema: &str, #[case] field: &str) {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let found = schemas.get(schema).expect("schema registered");
        assert!(object_has_field(found, field), "{schema} lacks {field}");
    }

    #[rstest]
    #[case("/api/v1/accounts")]
    #[case("/api/v1/accounts/{userName}/roles")]
    #[case("/api/v1/invitations/{code}/redemption")]
    #[case("/health/ready")]
    fn paths_are_documented(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing {path}");
    }
}
