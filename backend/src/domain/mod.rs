//! Domain primitives, ports, and services for the account lifecycle.
//!
//! Purpose: Define strongly typed account and invitation entities and the
//! services that enforce their rules. Adapters reach the store only through
//! [`ports`].
//!
//! Public surface:
//! - Error (alias to `error::Error`): transport agnostic error payload.
//! - ErrorCode (alias to `error::ErrorCode`): stable error identifier.
//! - Account, Role, RoleSet, UserName: the account data model.
//! - Invitation, InvitationCode: role-granting invitation codes.
//! - AccountService, InvitationService: use-case implementations.

pub mod account_service;
pub mod credentials;
pub mod error;
pub mod invitation;
pub mod invitation_service;
pub mod ports;
pub mod secret;
pub mod user;

pub use self::account_service::AccountService;
pub use self::credentials::{LoginCredentials, Password, Registration};
pub use self::error::{Error, ErrorCode};
pub use self::invitation::{
    INVITATION_CODE_LEN, Invitation, InvitationCode, InvitationCodeValidationError,
    invitation_ttl, within_ttl,
};
pub use self::invitation_service::InvitationService;
pub use self::secret::{SecretDigest, SecretHashError, SecretHasher};
pub use self::user::{
    Account, AccountSummary, Role, RoleParseError, RoleSet, UserName, UserValidationError,
    role_change_permitted,
};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use accounts_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<()> {
///     Err(Error::forbidden("nope"))
/// }
/// assert!(handler().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
