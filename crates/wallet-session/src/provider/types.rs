//! Provider payload and metadata types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::ConfirmationStatus;

/// Failure reported by a provider backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderFailure {
    #[error("wallet provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("request rejected by user")]
    UserRejected,

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("provider did not respond in time")]
    Timeout,

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Account reported by a successful connect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedAccount {
    pub address: String,
    pub balance: Decimal,
}

/// Transfer handed to the provider for submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    pub amount: Decimal,
    pub memo: Option<String>,
}

/// Provider acknowledgement of a submitted transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedTransfer {
    pub request_key: String,
    pub status: ConfirmationStatus,
}

/// Signed message produced by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureResult {
    pub signature: String,
    pub signed_at: DateTime<Utc>,
}

/// Transfer credited to the session account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingTransfer {
    pub request_key: String,
    pub from: String,
    pub amount: Decimal,
    pub memo: Option<String>,
    pub received_at: DateTime<Utc>,
}

/// Display metadata for a selectable wallet provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    /// Stable identifier used by `connect`
    pub id: String,

    pub display_name: String,

    pub description: String,

    /// Capability highlights shown on the option card
    #[serde(default)]
    pub features: Vec<String>,

    #[serde(default)]
    pub recommended: bool,
}

impl ProviderInfo {
    pub fn new(id: &str, display_name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            description: description.to_string(),
            features: Vec::new(),
            recommended: false,
        }
    }

    pub fn with_features(mut self, features: &[&str]) -> Self {
        self.features = features.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn recommended(mut self) -> Self {
        self.recommended = true;
        self
    }

    /// The built-in wallet catalog, in display order
    pub fn builtin_catalog() -> Vec<ProviderInfo> {
        vec![
            ProviderInfo::new(
                "spirekey",
                "SpireKey",
                "Kadena's native wallet solution with enhanced security",
            )
            .with_features(&["Gasless transactions", "Hardware security", "Multi-sig support"])
            .recommended(),
            ProviderInfo::new("chainweaver", "Chainweaver", "Desktop wallet for advanced users")
                .with_features(&["Full node access", "Advanced scripting", "Multi-account"]),
            ProviderInfo::new("walletconnect", "WalletConnect", "Connect with mobile wallets")
                .with_features(&["Mobile support", "QR code pairing", "Cross-platform"]),
        ]
    }
}
