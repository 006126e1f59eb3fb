//! # wallet-dispatch
//!
//! Bridges display layers to the wallet session. Intents arrive over stdio
//! (JSON lines) or HTTP, are mapped onto session operations by the
//! [`IntentDispatcher`], and results flow back together with a fresh session
//! snapshot. Session events are streamed over SSE.

mod dispatcher;
pub mod notify;
pub mod protocol;
pub mod transport;

pub use dispatcher::{DispatchError, DispatchOutcome, IntentDispatcher, IntentKind, IntentOutput};
pub use notify::{ChannelNotifier, Notification, NotificationLevel, Notifier, TracingNotifier};
pub use protocol::{Intent, IntentRequest, IntentResponse, RequestHandler};
pub use transport::{router, HttpTransport, StdioTransport};
