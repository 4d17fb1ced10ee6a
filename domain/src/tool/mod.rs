//! Tool domain module
//!
//! Tools live on external servers. The council sees them as a flat
//! [`ToolInventory`]; a selector model picks at most one
//! [`ToolSelection`], and the reply becomes a [`ToolOutcome`] whose
//! [`prompt_context`](ToolOutcome::prompt_context) is handed to the
//! answering model.
//!
//! | Outcome | Cause | Downstream instruction |
//! |---------|-------|------------------------|
//! | `succeeded` | server returned content | use the result |
//! | `transport_failed` | unreachable, timeout, HTTP error | report failure, do not fabricate |
//! | `content_failed` | `success: false`, `isError`, `error` in body | report failure, do not fabricate |

pub mod entities;
pub mod value_objects;

pub use entities::{ToolDescriptor, ToolInventory, ToolSelection, parse_tool_selection};
pub use value_objects::{ToolOutcome, ToolResponse, ToolStatus};
