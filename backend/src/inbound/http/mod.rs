//! HTTP inbound adapter exposing the account and invitation API.

pub mod accounts;
pub mod auth;
pub mod error;
pub mod health;
pub mod invitations;
pub mod login;
pub mod session;
pub mod session_config;
pub mod state;
#[cfg(test)]
pub mod test_utils;
