//! Inbound adapters translating external requests into driving port calls.
//!
//! HTTP handlers live under [`http`]. The operator CLI in `src/bin` talks to
//! the same ports directly.

pub mod http;
