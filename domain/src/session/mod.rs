//! Model session primitives.
//!
//! - [`entities::Message`] — a single message sent to a backend
//! - [`stream::StreamEvent`] — one event of a streaming completion

pub mod entities;
pub mod stream;
