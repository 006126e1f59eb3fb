//! Session events published to notification consumers

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::{ConfirmationStatus, TransactionRecord};
use crate::provider::SignatureResult;

/// Something observable happened to the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Connected {
        #[serde(rename = "providerId")]
        provider_id: String,
        address: String,
    },
    ConnectionFailed {
        #[serde(rename = "providerId")]
        provider_id: String,
        reason: String,
    },
    Disconnected,
    TransactionSubmitted {
        record: TransactionRecord,
    },
    TransactionFailed {
        reason: String,
    },
    TransactionReceived {
        record: TransactionRecord,
    },
    TransactionStatusChanged {
        id: Uuid,
        status: ConfirmationStatus,
    },
    MessageSigned {
        signature: SignatureResult,
    },
    SigningFailed {
        reason: String,
    },
}

impl SessionEvent {
    /// Event name as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Connected { .. } => "connected",
            SessionEvent::ConnectionFailed { .. } => "connection_failed",
            SessionEvent::Disconnected => "disconnected",
            SessionEvent::TransactionSubmitted { .. } => "transaction_submitted",
            SessionEvent::TransactionFailed { .. } => "transaction_failed",
            SessionEvent::TransactionReceived { .. } => "transaction_received",
            SessionEvent::TransactionStatusChanged { .. } => "transaction_status_changed",
            SessionEvent::MessageSigned { .. } => "message_signed",
            SessionEvent::SigningFailed { .. } => "signing_failed",
        }
    }
}
