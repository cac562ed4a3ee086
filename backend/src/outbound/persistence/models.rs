//! Internal Diesel row structs.
//!
//! These types never leave the persistence layer.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::{Invitation, Role, RoleSet};

use super::schema::{invitation_codes, users};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub user_name: String,
    pub password_hash: String,
    pub roles: Vec<String>,
    pub one_time_password_hash: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub user_name: &'a str,
    pub password_hash: &'a str,
    pub roles: Vec<String>,
    pub one_time_password_hash: Option<&'a str>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = invitation_codes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct InvitationRow {
    pub code: String,
    pub is_used: bool,
    pub admin: bool,
    pub student: bool,
    pub instructor: bool,
    pub staff: bool,
    pub reviewer: bool,
    pub generated_at: DateTime<Utc>,
}

impl InvitationRow {
    pub fn grants(&self) -> RoleSet {
        [
            (Role::Admin, self.admin),
            (Role::Student, self.student),
            (Role::Instructor, self.instructor),
            (Role::Staff, self.staff),
            (Role::Reviewer, self.reviewer),
        ]
        .into_iter()
        .filter_map(|(role, granted)| granted.then_some(role))
        .collect()
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = invitation_codes)]
pub(crate) struct NewInvitationRow<'a> {
    pub code: &'a str,
    pub is_used: bool,
    pub admin: bool,
    pub student: bool,
    pub instructor: bool,
    pub staff: bool,
    pub reviewer: bool,
    pub generated_at: DateTime<Utc>,
}

impl<'a> From<&'a Invitation> for NewInvitationRow<'a> {
    fn from(invitation: &'a Invitation) -> Self {
        let grants = &invitation.grants;
        Self {
            code: invitation.code.as_ref(),
            is_used: invitation.used,
            admin: grants.contains(Role::Admin),
            student: grants.contains(Role::Student),
            instructor: grants.contains(Role::Instructor),
            staff: grants.contains(Role::Staff),
            reviewer: grants.contains(Role::Reviewer),
            generated_at: invitation.generated_at,
        }
    }
}
