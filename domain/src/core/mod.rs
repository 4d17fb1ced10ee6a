//! Core domain concepts shared across all subdomains.
//!
//! - [`model::Model`] — opaque model identifiers served by backends
//! - [`query::Query`] — a validated user query with its conversation history
//! - [`error::DomainError`] — domain-level errors

pub mod error;
pub mod model;
pub mod query;
