//! Account data model: user names, roles, and stored accounts.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::secret::SecretDigest;

/// Validation errors returned by [`UserName::new`] and the credential
/// constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyUserName,
    UserNameTooLong { max: usize },
    UserNameInvalidCharacters,
    EmptyPassword,
    InvalidRoles(RoleParseError),
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUserName => write!(f, "user name must not be empty"),
            Self::UserNameTooLong { max } => {
                write!(f, "user name must be at most {max} characters")
            }
            Self::UserNameInvalidCharacters => write!(
                f,
                "user name may only contain letters, numbers, and the symbols . _ - @",
            ),
            Self::EmptyPassword => write!(f, "password must not be empty"),
            Self::InvalidRoles(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for UserValidationError {}

impl From<RoleParseError> for UserValidationError {
    fn from(value: RoleParseError) -> Self {
        Self::InvalidRoles(value)
    }
}

/// Maximum allowed length for a user name; matches the column width.
pub const USER_NAME_MAX: usize = 255;

static USER_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn user_name_regex() -> &'static Regex {
    USER_NAME_RE.get_or_init(|| {
        Regex::new("^[A-Za-z0-9._@-]+$")
            .unwrap_or_else(|error| panic!("user name regex failed to compile: {error}"))
    })
}

/// Unique account identifier chosen by the user at registration.
///
/// ## Invariants
/// - Trimmed of surrounding whitespace and non-empty.
/// - At most [`USER_NAME_MAX`] characters from `[A-Za-z0-9._@-]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserName(String);

impl UserName {
    /// Validate and construct a [`UserName`].
    ///
    /// # Examples
    /// ```
    /// use accounts_backend::domain::UserName;
    ///
    /// let name = UserName::new("  AdminUser ").unwrap();
    /// assert_eq!(name.as_ref(), "AdminUser");
    /// ```
    pub fn new(user_name: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let trimmed = user_name.as_ref().trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyUserName);
        }
        if trimmed.chars().count() > USER_NAME_MAX {
            return Err(UserValidationError::UserNameTooLong { max: USER_NAME_MAX });
        }
        if !user_name_regex().is_match(trimmed) {
            return Err(UserValidationError::UserNameInvalidCharacters);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for UserName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<UserName> for String {
    fn from(value: UserName) -> Self {
        value.0
    }
}

impl TryFrom<String> for UserName {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Permission category assigned to an account.
///
/// Declaration order is the canonical display order of a [`RoleSet`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
    Instructor,
    Staff,
    Reviewer,
}

impl Role {
    /// Every role in canonical order.
    pub const ALL: [Self; 5] = [
        Self::Admin,
        Self::Student,
        Self::Instructor,
        Self::Staff,
        Self::Reviewer,
    ];

    /// Stable lowercase name used in storage and on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Student => "student",
            Self::Instructor => "instructor",
            Self::Staff => "staff",
            Self::Reviewer => "reviewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while parsing roles from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleParseError {
    /// The input contained no role tokens.
    Empty,
    /// A token did not name a known role.
    UnknownRole { token: String },
}

impl fmt::Display for RoleParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "at least one role is required"),
            Self::UnknownRole { token } => write!(f, "unknown role: {token}"),
        }
    }
}

impl std::error::Error for RoleParseError {}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(token))
            .ok_or_else(|| RoleParseError::UnknownRole {
                token: token.to_owned(),
            })
    }
}

/// Set of roles held by an account or granted by an invitation code.
///
/// Membership is exact: `"administrator"` never parses as [`Role::Admin`].
///
/// # Examples
/// ```
/// use accounts_backend::domain::{Role, RoleSet};
///
/// let roles: RoleSet = "reviewer, Student".parse().unwrap();
/// assert!(roles.contains(Role::Student));
/// assert_eq!(roles.to_string(), "student, reviewer");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    /// Empty role set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set containing a single role.
    pub fn only(role: Role) -> Self {
        Self(BTreeSet::from([role]))
    }

    /// Parse storage names such as `["admin", "staff"]`.
    pub fn try_from_names<I, S>(names: I) -> Result<Self, RoleParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|name| name.as_ref().parse::<Role>())
            .collect()
    }

    /// Storage names in canonical order.
    pub fn to_names(&self) -> Vec<String> {
        self.0.iter().map(|role| role.as_str().to_owned()).collect()
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.contains(Role::Admin)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn insert(&mut self, role: Role) -> bool {
        self.0.insert(role)
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<T: IntoIterator<Item = Role>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for RoleSet {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let roles: Self = s
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::parse::<Role>)
            .collect::<Result<_, _>>()?;
        if roles.is_empty() {
            return Err(RoleParseError::Empty);
        }
        Ok(roles)
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for role in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            f.write_str(role.as_str())?;
            first = false;
        }
        Ok(())
    }
}

/// Decide whether replacing `current` with `next` keeps at least one admin.
///
/// `other_admins` counts admin accounts other than the one being changed.
/// Adapters must evaluate this while holding locks on every admin row so the
/// count cannot go stale before the update is applied.
pub fn role_change_permitted(current: &RoleSet, other_admins: u64, next: &RoleSet) -> bool {
    !(current.is_admin() && !next.is_admin() && other_admins == 0)
}

/// Persisted account.
///
/// ## Invariants
/// - `roles` is non-empty.
/// - Secrets are only ever held as digests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    user_name: UserName,
    password: SecretDigest,
    roles: RoleSet,
    one_time_password: Option<SecretDigest>,
}

impl Account {
    /// Build an account without an outstanding one-time password.
    pub fn new(user_name: UserName, password: SecretDigest, roles: RoleSet) -> Self {
        Self {
            user_name,
            password,
            roles,
            one_time_password: None,
        }
    }

    /// Attach an outstanding one-time password digest.
    pub fn with_one_time_password(mut self, digest: Option<SecretDigest>) -> Self {
        self.one_time_password = digest;
        self
    }

    pub fn user_name(&self) -> &UserName {
        &self.user_name
    }

    pub fn password(&self) -> &SecretDigest {
        &self.password
    }

    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    pub fn one_time_password(&self) -> Option<&SecretDigest> {
        self.one_time_password.as_ref()
    }

    /// Public listing entry for this account.
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            user_name: self.user_name.clone(),
            roles: self.roles.clone(),
        }
    }
}

/// User name and roles, as shown in account listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    #[schema(value_type = String, example = "AdminUser")]
    pub user_name: UserName,
    #[schema(value_type = Vec<Role>, example = json!(["admin"]))]
    pub roles: RoleSet,
}

impl fmt::Display for AccountSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserName: {}, Role(s): {}", self.user_name, self.roles)
    }
}
