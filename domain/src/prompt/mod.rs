//! Prompt domain
//!
//! Templates for every backend call of a deliberation: classification,
//! routing, tool selection, the three stages and direct answers.

mod template;

pub use template::{PromptTemplate, SynthesisContext};
