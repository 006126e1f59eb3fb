//! Transport implementations for the intent protocol

mod stdio;
mod http;

pub use stdio::StdioTransport;
pub use http::{router, status_for, HttpTransport};
