//! Tool server adapters

mod http_invoker;

pub use http_invoker::HttpToolInvoker;
