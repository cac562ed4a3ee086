//! HTTP mapping for domain errors.
//!
//! The domain error stays transport agnostic; this adapter picks the status
//! code, redacts internal failures and echoes the trace identifier.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use tracing::error;

use crate::domain::{
    Error, ErrorCode, InvitationCodeValidationError, RoleParseError, UserValidationError,
};
use crate::middleware::trace::TRACE_ID_HEADER;

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized | ErrorCode::InvalidCredentials => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden | ErrorCode::ProtectedAccount => StatusCode::FORBIDDEN,
        ErrorCode::UserNotFound | ErrorCode::CodeNotFound => StatusCode::NOT_FOUND,
        ErrorCode::DuplicateUser | ErrorCode::CodeNotFoundOrUsed => StatusCode::CONFLICT,
        ErrorCode::CodeExpired => StatusCode::GONE,
        ErrorCode::CodeGrantsNoRoles => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn redact_if_internal(error: &Error) -> Error {
    if matches!(error.code(), ErrorCode::InternalError) {
        error.redacted("Internal server error")
    } else {
        error.clone()
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        if let Some(id) = self.trace_id() {
            builder.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }
        builder.json(redact_if_internal(self))
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        error!(error = %err, "actix error promoted to domain error");
        Self::internal("Internal server error")
    }
}

/// Map a user field failure to `invalid_request` naming the offending field.
pub(crate) fn user_field_error(field: &'static str, err: &UserValidationError) -> Error {
    let code = match err {
        UserValidationError::EmptyUserName => "empty_user_name",
        UserValidationError::UserNameTooLong { .. } => "user_name_too_long",
        UserValidationError::UserNameInvalidCharacters => "user_name_invalid_characters",
        UserValidationError::EmptyPassword => "empty_password",
        UserValidationError::InvalidRoles(_) => "invalid_roles",
    };
    Error::invalid_request(err.to_string()).with_details(json!({ "field": field, "code": code }))
}

pub(crate) fn role_field_error(err: &RoleParseError) -> Error {
    let code = match err {
        RoleParseError::Empty => "empty_roles",
        RoleParseError::UnknownRole { .. } => "unknown_role",
    };
    Error::invalid_request(err.to_string()).with_details(json!({ "field": "roles", "code": code }))
}

pub(crate) fn code_field_error(err: &InvitationCodeValidationError) -> Error {
    Error::invalid_request(err.to_string())
        .with_details(json!({ "field": "invitationCode", "code": "invalid_invitation_code" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use rstest::{fixture, rstest};
    use rstest_bdd_macros::{given, then, when};

    const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

    #[fixture]
    fn expected_trace_id() -> String {
        TRACE_ID.to_owned()
    }

    #[rstest]
    #[case(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
    #[case(Error::invalid_credentials(), StatusCode::UNAUTHORIZED)]
    #[case(Error::protected_account("A"), StatusCode::FORBIDDEN)]
    #[case(Error::user_not_found("B"), StatusCode::NOT_FOUND)]
    #[case(Error::code_not_found("Ab12Cd34"), StatusCode::NOT_FOUND)]
    #[case(Error::duplicate_user("B"), StatusCode::CONFLICT)]
    #[case(Error::code_not_found_or_used("Ab12Cd34"), StatusCode::CONFLICT)]
    #[case(Error::code_expired("Ab12Cd34"), StatusCode::GONE)]
    #[case(Error::code_grants_no_roles("Ab12Cd34"), StatusCode::UNPROCESSABLE_ENTITY)]
    #[case(Error::service_unavailable("down"), StatusCode::SERVICE_UNAVAILABLE)]
    #[case(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
    fn status_code_matches_error_code(#[case] error: Error, #[case] status: StatusCode) {
        assert_eq!(ResponseError::status_code(&error), status);
    }

    #[rstest]
    #[actix_web::test]
    async fn internal_errors_are_redacted(expected_trace_id: String) {
        let error = Error::internal("connection string leaked")
            .with_trace_id(expected_trace_id.clone())
            .with_details(json!({ "secret": "x" }));

        let response = ResponseError::error_response(&error);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let header = response
            .headers()
            .get(TRACE_ID_HEADER)
            .expect("trace id header")
            .to_str()
            .expect("ascii header")
            .to_owned();
        assert_eq!(header, expected_trace_id);

        let bytes = to_bytes(response.into_body()).await.expect("body");
        let payload: Error = serde_json::from_slice(&bytes).expect("error payload");
        assert_eq!(payload.message(), "Internal server error");
        assert_eq!(payload.trace_id(), Some(TRACE_ID));
        assert!(payload.details().is_none());
    }

    #[rstest]
    #[actix_web::test]
    async fn domain_failures_keep_their_details() {
        let error = user_field_error("userName", &UserValidationError::EmptyUserName);

        let response = ResponseError::error_response(&error);
        assert!(response.headers().get(TRACE_ID_HEADER).is_none());
        let bytes = to_bytes(response.into_body()).await.expect("body");
        let payload: Error = serde_json::from_slice(&bytes).expect("error payload");
        assert_eq!(payload.code(), ErrorCode::InvalidRequest);
        assert_eq!(
            payload.details(),
            Some(&json!({ "field": "userName", "code": "empty_user_name" }))
        );
    }

    #[given("a protected account error code")]
    fn a_protected_account_error_code() -> ErrorCode {
        ErrorCode::ProtectedAccount
    }

    #[when("the adapter maps the code to an HTTP status")]
    fn the_adapter_maps_the_code_to_an_http_status(code: ErrorCode) -> StatusCode {
        status_for(code)
    }

    #[then("the status is 403 Forbidden")]
    fn the_status_is_403_forbidden(status: StatusCode) {
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[rstest]
    fn protected_accounts_map_to_forbidden() {
        let code = a_protected_account_error_code();
        let status = the_adapter_maps_the_code_to_an_http_status(code);
        the_status_is_403_forbidden(status);
    }

    #[test]
    fn actix_errors_become_redacted_internal_errors() {
        let err: Error = actix_web::error::ErrorBadRequest("boom").into();
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert_eq!(err.message(), "Internal server error");
    }
}
