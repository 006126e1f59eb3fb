//! Intent protocol types and handling

mod types;
mod handler;

pub use types::*;
pub use handler::RequestHandler;
