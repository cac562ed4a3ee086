//! Domain-level error types.
//!
//! These errors are transport agnostic. Inbound adapters map them to HTTP
//! responses, CLI reports, or any other protocol-specific envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::middleware::trace::TraceId;

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is malformed or fails validation.
    InvalidRequest,
    /// Authentication failed or is missing.
    Unauthorized,
    /// Authenticated but not permitted to perform this action.
    Forbidden,
    /// An account with the requested user name already exists.
    DuplicateUser,
    /// No account exists for the requested user name.
    UserNotFound,
    /// The account is protected from the requested mutation.
    ProtectedAccount,
    /// Supplied credentials did not match a stored account.
    InvalidCredentials,
    /// The invitation code does not exist.
    CodeNotFound,
    /// The invitation code does not exist or was already redeemed.
    CodeNotFoundOrUsed,
    /// The invitation code was redeemed after its time-to-live.
    CodeExpired,
    /// The invitation code grants no roles.
    CodeGrantsNoRoles,
    /// The backing store is unreachable.
    ServiceUnavailable,
    /// An unexpected error occurred inside the domain.
    InternalError,
}

/// Domain error payload.
///
/// Captures the active [`TraceId`] on construction so adapters can correlate
/// the failure with request logs.
///
/// # Examples
/// ```
/// use accounts_backend::domain::{Error, ErrorCode};
///
/// let err = Error::user_not_found("alice");
/// assert_eq!(err.code(), ErrorCode::UserNotFound);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct Error {
    #[schema(example = "user_not_found")]
    code: ErrorCode,
    #[schema(example = "user alice does not exist")]
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl Error {
    /// Create a new error with the trace identifier currently in scope.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            trace_id: TraceId::current().map(|id| id.to_string()),
            details: None,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message returned to adapters.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Correlation identifier, if the error was raised inside a traced scope.
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Supplementary error details for adapters.
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Attach a trace identifier to the error.
    pub fn with_trace_id(mut self, id: impl Into<String>) -> Self {
        self.trace_id = Some(id.into());
        self
    }

    /// Attach structured details to the error.
    ///
    /// # Examples
    /// ```
    /// use accounts_backend::domain::Error;
    /// use serde_json::json;
    ///
    /// let err = Error::invalid_request("bad").with_details(json!({ "field": "userName" }));
    /// assert!(err.details().is_some());
    /// ```
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Strip details and replace the message, keeping the code and trace id.
    pub(crate) fn redacted(&self, message: &str) -> Self {
        Self {
            code: self.code,
            message: message.to_owned(),
            trace_id: self.trace_id.clone(),
            details: None,
        }
    }

    /// Convenience constructor for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Convenience constructor for [`ErrorCode::Unauthorized`].
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Convenience constructor for [`ErrorCode::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Account already registered under `user_name`.
    pub fn duplicate_user(user_name: impl AsRef<str>) -> Self {
        Self::new(
            ErrorCode::DuplicateUser,
            format!("user {} already exists", user_name.as_ref()),
        )
    }

    /// No account registered under `user_name`.
    pub fn user_not_found(user_name: impl AsRef<str>) -> Self {
        Self::new(
            ErrorCode::UserNotFound,
            format!("user {} does not exist", user_name.as_ref()),
        )
    }

    /// The account `user_name` cannot be mutated this way.
    pub fn protected_account(user_name: impl AsRef<str>) -> Self {
        Self::new(
            ErrorCode::ProtectedAccount,
            format!("user {} is an administrator and cannot be deleted", user_name.as_ref()),
        )
    }

    /// Convenience constructor for [`ErrorCode::InvalidCredentials`].
    pub fn invalid_credentials() -> Self {
        Self::new(ErrorCode::InvalidCredentials, "invalid credentials")
    }

    /// Invitation code `code` is unknown.
    pub fn code_not_found(code: impl AsRef<str>) -> Self {
        Self::new(
            ErrorCode::CodeNotFound,
            format!("invitation code {} does not exist", code.as_ref()),
        )
    }

    /// Invitation code `code` is unknown or already redeemed.
    pub fn code_not_found_or_used(code: impl AsRef<str>) -> Self {
        Self::new(
            ErrorCode::CodeNotFoundOrUsed,
            format!("invitation code {} is unknown or already used", code.as_ref()),
        )
    }

    /// Invitation code `code` outlived its time-to-live.
    pub fn code_expired(code: impl AsRef<str>) -> Self {
        Self::new(
            ErrorCode::CodeExpired,
            format!("invitation code {} has expired", code.as_ref()),
        )
    }

    /// Invitation code `code` carries no role grants.
    pub fn code_grants_no_roles(code: impl AsRef<str>) -> Self {
        Self::new(
            ErrorCode::CodeGrantsNoRoles,
            format!("invitation code {} grants no roles", code.as_ref()),
        )
    }

    /// Convenience constructor for [`ErrorCode::ServiceUnavailable`].
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}
