//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod account_manager;
mod invitation_code_repository;
mod invitation_codes;
mod user_repository;

#[cfg(test)]
pub use account_manager::MockAccountManager;
pub use account_manager::{AccountManager, RoleChange};
#[cfg(test)]
pub use invitation_code_repository::MockInvitationCodeRepository;
pub(crate) use invitation_code_repository::map_code_error;
pub use invitation_code_repository::{InvitationCodePersistenceError, InvitationCodeRepository};
#[cfg(test)]
pub use invitation_codes::MockInvitationCodes;
pub use invitation_codes::InvitationCodes;
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub(crate) use user_repository::map_user_error;
pub use user_repository::{AccountRemoval, RoleReplacement, UserPersistenceError, UserRepository};
