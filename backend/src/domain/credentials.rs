//! Credential primitives: passwords, login attempts, and registrations.
//!
//! Keep inbound payload parsing outside the domain by exposing constructors
//! that validate string inputs before a handler talks to a port or service.

use zeroize::Zeroizing;

use super::user::{RoleSet, UserName, UserValidationError};

/// Plaintext password held only while a request is in flight.
///
/// Whitespace is preserved; only the empty string is rejected.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(Zeroizing<String>);

impl Password {
    pub fn new(raw: impl Into<String>) -> Result<Self, UserValidationError> {
        let raw = Zeroizing::new(raw.into());
        if raw.is_empty() {
            return Err(UserValidationError::EmptyPassword);
        }
        Ok(Self(raw))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(..)")
    }
}

/// Validated login attempt: name, password, and the roles the caller claims.
///
/// # Examples
/// ```
/// use accounts_backend::domain::{LoginCredentials, Role};
///
/// let creds = LoginCredentials::try_from_parts(" admin ", "password", "admin").unwrap();
/// assert_eq!(creds.user_name().as_ref(), "admin");
/// assert!(creds.roles().contains(Role::Admin));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    user_name: UserName,
    password: Password,
    roles: RoleSet,
}

impl LoginCredentials {
    pub fn new(user_name: UserName, password: Password, roles: RoleSet) -> Self {
        Self {
            user_name,
            password,
            roles,
        }
    }

    /// Construct credentials from raw inputs; `roles` uses the `", "` form.
    pub fn try_from_parts(
        user_name: &str,
        password: &str,
        roles: &str,
    ) -> Result<Self, UserValidationError> {
        Ok(Self {
            user_name: UserName::new(user_name)?,
            password: Password::new(password)?,
            roles: roles.parse()?,
        })
    }

    pub fn user_name(&self) -> &UserName {
        &self.user_name
    }

    pub fn password(&self) -> &Password {
        &self.password
    }

    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }
}

/// New account request.
///
/// ## Invariants
/// - `roles` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    user_name: UserName,
    password: Password,
    roles: RoleSet,
}

impl Registration {
    pub fn new(
        user_name: UserName,
        password: Password,
        roles: RoleSet,
    ) -> Result<Self, UserValidationError> {
        if roles.is_empty() {
            return Err(UserValidationError::InvalidRoles(
                super::user::RoleParseError::Empty,
            ));
        }
        Ok(Self {
            user_name,
            password,
            roles,
        })
    }

    pub fn user_name(&self) -> &UserName {
        &self.user_name
    }

    pub fn password(&self) -> &Password {
        &self.password
    }

    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }
}
