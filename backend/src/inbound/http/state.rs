//! Shared HTTP adapter state.
//!
//! Handlers receive this through `web::Data` and depend only on the driving
//! ports, so they can be exercised with mocks or the in-memory adapters.

use std::sync::Arc;

use crate::domain::ports::{AccountManager, InvitationCodes};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub accounts: Arc<dyn AccountManager>,
    pub invitations: Arc<dyn InvitationCodes>,
}

impl HttpState {
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use accounts_backend::domain::{AccountService, InvitationService};
    /// use accounts_backend::inbound::http::state::HttpState;
    /// use accounts_backend::test_support::{
    ///     InMemoryInvitationCodeRepository, InMemoryUserRepository,
    /// };
    /// use mockable::DefaultClock;
    ///
    /// let users = Arc::new(InMemoryUserRepository::new());
    /// let codes = Arc::new(InMemoryInvitationCodeRepository::new());
    /// let state = HttpState::new(
    ///     Arc::new(AccountService::new(users.clone())),
    ///     Arc::new(InvitationService::new(codes, users, Arc::new(DefaultClock))),
    /// );
    /// let _accounts = state.accounts.clone();
    /// ```
    pub fn new(accounts: Arc<dyn AccountManager>, invitations: Arc<dyn InvitationCodes>) -> Self {
        Self {
            accounts,
            invitations,
        }
    }
}
