//! Wallet provider backends
//!
//! Every wallet backend (browser extension, hardware device, remote relay)
//! implements [`ProviderAdapter`]. This module ships:
//! 1. A configurable mock backend used by the demo and the tests
//! 2. A timeout decorator bounding every capability call
//! 3. The registry of selectable providers

mod traits;
mod types;
mod mock;
mod timeout;
mod registry;

pub use traits::{ProviderAdapter, ProviderResult};
pub use types::*;
pub use mock::{MockOperation, MockProvider};
pub use timeout::TimeoutAdapter;
pub use registry::ProviderRegistry;
