//! Account and invitation lifecycle backend for the classroom forum.
//!
//! The crate is laid out hexagonally: [`domain`] holds the rules and ports,
//! [`outbound`] the PostgreSQL adapters and [`inbound`] the HTTP adapter.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use doc::ApiDoc;
pub use middleware::Trace;
