//! Event output for the terminal

pub mod ndjson;
