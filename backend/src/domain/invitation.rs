//! Invitation codes that grant roles for one hour after generation.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::secret::random_token;
use super::user::RoleSet;

/// Length of freshly generated codes.
pub const INVITATION_CODE_LEN: usize = 8;

/// Longest code accepted from callers; matches the column width.
pub const INVITATION_CODE_MAX: usize = 16;

/// How long after generation a code may still be redeemed.
pub fn invitation_ttl() -> Duration {
    Duration::hours(1)
}

/// Validation errors for [`InvitationCode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvitationCodeValidationError {
    Empty,
    TooLong { max: usize },
    InvalidCharacters,
}

impl fmt::Display for InvitationCodeValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "invitation code must not be empty"),
            Self::TooLong { max } => {
                write!(f, "invitation code must be at most {max} characters")
            }
            Self::InvalidCharacters => {
                write!(f, "invitation code must be ASCII letters and digits")
            }
        }
    }
}

impl std::error::Error for InvitationCodeValidationError {}

/// Opaque invitation code value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InvitationCode(String);

impl InvitationCode {
    /// Validate a caller-supplied code.
    ///
    /// # Examples
    /// ```
    /// use accounts_backend::domain::InvitationCode;
    ///
    /// assert!(InvitationCode::new("Ab12Cd34").is_ok());
    /// assert!(InvitationCode::new("not a code").is_err());
    /// ```
    pub fn new(raw: impl AsRef<str>) -> Result<Self, InvitationCodeValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(InvitationCodeValidationError::Empty);
        }
        if trimmed.len() > INVITATION_CODE_MAX {
            return Err(InvitationCodeValidationError::TooLong {
                max: INVITATION_CODE_MAX,
            });
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(InvitationCodeValidationError::InvalidCharacters);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Fresh random code of [`INVITATION_CODE_LEN`] characters.
    pub fn generate() -> Self {
        Self(random_token(INVITATION_CODE_LEN).as_str().to_owned())
    }
}

impl AsRef<str> for InvitationCode {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for InvitationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<InvitationCode> for String {
    fn from(value: InvitationCode) -> Self {
        value.0
    }
}

impl TryFrom<String> for InvitationCode {
    type Error = InvitationCodeValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Stored invitation.
///
/// `grants` may be empty for rows written outside this service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
    pub code: InvitationCode,
    pub grants: RoleSet,
    pub used: bool,
    pub generated_at: DateTime<Utc>,
}

impl Invitation {
    /// Unused invitation generated at `generated_at`.
    pub fn new(code: InvitationCode, grants: RoleSet, generated_at: DateTime<Utc>) -> Self {
        Self {
            code,
            grants,
            used: false,
            generated_at,
        }
    }
}

/// Whether a code generated at `generated_at` is still redeemable at `now`.
///
/// The boundary is inclusive: exactly one hour old is still valid.
pub fn within_ttl(generated_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(generated_at) <= invitation_ttl()
}
