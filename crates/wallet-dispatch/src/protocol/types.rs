//! Intent protocol message types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dispatcher::{DispatchError, DispatchOutcome};
use wallet_session::SessionSnapshot;

/// A user intent coming from the display layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    Connect {
        #[serde(rename = "providerId")]
        provider_id: String,
    },
    Disconnect,
    Send {
        to: String,
        amount: String,
        #[serde(default)]
        memo: Option<String>,
    },
    Sign {
        message: String,
    },
    Sync,
    /// Read the current session snapshot
    Snapshot,
    /// List selectable providers
    Providers,
}

/// Intent plus an optional caller-chosen correlation id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(flatten)]
    pub intent: Intent,
}

/// Error payload of a failed intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

/// Kind reported for requests that could not be parsed
pub const PROTOCOL_ERROR: &str = "protocol_error";

/// Kind reported when a result could not be encoded
pub const INTERNAL_ERROR: &str = "internal_error";

/// Response to an intent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SessionSnapshot>,
}

impl IntentResponse {
    /// Build a response from a dispatch outcome
    pub fn from_outcome(id: Option<Value>, outcome: DispatchOutcome) -> Self {
        let snapshot = Some(outcome.snapshot);

        match outcome.result {
            Ok(output) => match serde_json::to_value(output) {
                Ok(result) => Self {
                    id,
                    ok: true,
                    result: Some(result),
                    error: None,
                    snapshot,
                },
                Err(e) => Self::failure(id, INTERNAL_ERROR, e.to_string(), snapshot),
            },
            Err(err) => Self::from_error(id, &err, snapshot),
        }
    }

    /// Build a failed response from a dispatch error
    pub fn from_error(id: Option<Value>, error: &DispatchError, snapshot: Option<SessionSnapshot>) -> Self {
        Self::failure(id, error.kind_name(), error.to_string(), snapshot)
    }

    /// Response to a request that could not be parsed
    pub fn protocol_error(id: Option<Value>, message: impl Into<String>) -> Self {
        Self::failure(id, PROTOCOL_ERROR, message.into(), None)
    }

    fn failure(
        id: Option<Value>,
        kind: &str,
        message: String,
        snapshot: Option<SessionSnapshot>,
    ) -> Self {
        Self {
            id,
            ok: false,
            result: None,
            error: Some(ErrorBody {
                kind: kind.to_string(),
                message,
            }),
            snapshot,
        }
    }

    /// Error kind, if the intent failed
    pub fn error_kind(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.kind.as_str())
    }
}
