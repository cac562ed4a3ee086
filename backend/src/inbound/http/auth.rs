//! Access gates for handlers.
//!
//! Roles are looked up per request. A session whose account has since been
//! deleted is treated as logged out.

use crate::domain::{Error, RoleSet, UserName};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// The session user and their current roles.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_name: UserName,
    pub roles: RoleSet,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.roles.is_admin()
    }

    pub fn is(&self, user_name: &UserName) -> bool {
        &self.user_name == user_name
    }
}

/// Resolve the logged-in caller or fail with `401`.
pub async fn require_caller(state: &HttpState, session: &SessionContext) -> Result<Caller, Error> {
    let user_name = session.require_user_name()?;
    match state.accounts.get_user_roles(&user_name).await? {
        Some(roles) => Ok(Caller { user_name, roles }),
        None => {
            session.purge();
            Err(Error::unauthorized("login required"))
        }
    }
}

/// Resolve a caller holding admin or fail with `401`/`403`.
pub async fn require_admin(state: &HttpState, session: &SessionContext) -> Result<Caller, Error> {
    let caller = require_caller(state, session).await?;
    if caller.is_admin() {
        Ok(caller)
    } else {
        Err(Error::forbidden("administrator role required"))
    }
}

/// Resolve a caller who is `target` themselves or an admin.
pub async fn require_self_or_admin(
    state: &HttpState,
    session: &SessionContext,
    target: &UserName,
) -> Result<Caller, Error> {
    let caller = require_caller(state, session).await?;
    if caller.is(target) || caller.is_admin() {
        Ok(caller)
    } else {
        Err(Error::forbidden("not permitted for this account"))
    }
}
