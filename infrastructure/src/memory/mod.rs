//! Memory service adapters

mod http_lookup;

pub use http_lookup::HttpMemoryLookup;
