//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! Only PostgreSQL persistence lives here today. Adapters convert between
//! domain types and storage representations without business logic.

pub mod persistence;
