//! Model backend adapters

mod openai;
mod sse;

pub use openai::OpenAiCompatibleBackend;
