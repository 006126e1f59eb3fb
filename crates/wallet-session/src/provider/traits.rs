//! Provider capability trait

use async_trait::async_trait;

use super::types::{
    ConnectedAccount, IncomingTransfer, ProviderFailure, SignatureResult, SubmittedTransfer,
    TransferRequest,
};
use crate::ledger::ConfirmationStatus;

/// Result of a provider capability call
pub type ProviderResult<T> = std::result::Result<T, ProviderFailure>;

/// Capability set of a wallet backend.
///
/// Calls may suspend for as long as the backend needs (network round trips,
/// user approval on a device).
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Open the wallet and report the active account
    async fn connect(&self) -> ProviderResult<ConnectedAccount>;

    /// Submit a transfer for inclusion
    async fn submit_transaction(&self, request: &TransferRequest) -> ProviderResult<SubmittedTransfer>;

    /// Sign an arbitrary message with the account key
    async fn sign_message(&self, message: &str) -> ProviderResult<SignatureResult>;

    /// Transfers received by `address` since the last poll
    async fn poll_incoming(&self, _address: &str) -> ProviderResult<Vec<IncomingTransfer>> {
        Ok(Vec::new())
    }

    /// Current confirmation status of a submitted transfer
    async fn transaction_status(&self, _request_key: &str) -> ProviderResult<ConfirmationStatus> {
        Ok(ConfirmationStatus::Pending)
    }

    /// Get a human-readable name for this backend
    fn backend_name(&self) -> &'static str;
}
