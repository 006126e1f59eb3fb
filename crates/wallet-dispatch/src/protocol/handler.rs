//! Intent request handler shared by the transports

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

use super::types::{IntentRequest, IntentResponse};
use crate::dispatcher::IntentDispatcher;

/// Parses intent requests and answers them through the dispatcher
#[derive(Clone)]
pub struct RequestHandler {
    dispatcher: Arc<IntentDispatcher>,
}

impl RequestHandler {
    /// Create a new request handler
    pub fn new(dispatcher: Arc<IntentDispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<IntentDispatcher> {
        &self.dispatcher
    }

    /// Handle a raw JSON request
    pub async fn handle_json(&self, raw: &str) -> IntentResponse {
        match Self::parse(raw) {
            Ok(request) => self.handle(request).await,
            Err(response) => response,
        }
    }

    /// Parse a raw JSON request, producing a protocol error response on failure
    pub fn parse(raw: &str) -> Result<IntentRequest, IntentResponse> {
        serde_json::from_str::<IntentRequest>(raw).map_err(|e| {
            error!("Failed to parse intent: {}", e);
            // keep the caller's id when the envelope itself is readable
            let id = serde_json::from_str::<Value>(raw)
                .ok()
                .and_then(|v| v.get("id").cloned());
            IntentResponse::protocol_error(id, format!("Invalid intent: {}", e))
        })
    }

    /// Handle a parsed request
    pub async fn handle(&self, request: IntentRequest) -> IntentResponse {
        debug!("Handling intent: {:?}", request.intent);
        let outcome = self.dispatcher.dispatch(request.intent).await;
        IntentResponse::from_outcome(request.id, outcome)
    }
}
