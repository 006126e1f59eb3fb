//! Deadline decorator for provider backends

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::traits::{ProviderAdapter, ProviderResult};
use super::types::{
    ConnectedAccount, IncomingTransfer, ProviderFailure, SignatureResult, SubmittedTransfer,
    TransferRequest,
};
use crate::ledger::ConfirmationStatus;

/// Wraps a backend so that every capability call fails with
/// [`ProviderFailure::Timeout`] once `timeout` elapses
pub struct TimeoutAdapter {
    inner: Arc<dyn ProviderAdapter>,
    timeout: Duration,
}

impl TimeoutAdapter {
    pub fn new(inner: Arc<dyn ProviderAdapter>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T: Send>(
        &self,
        capability: &str,
        call: impl Future<Output = ProviderResult<T>> + Send,
    ) -> ProviderResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "{} backend timed out after {:?} during {}",
                    self.inner.backend_name(),
                    self.timeout,
                    capability
                );
                Err(ProviderFailure::Timeout)
            }
        }
    }
}

#[async_trait]
impl ProviderAdapter for TimeoutAdapter {
    async fn connect(&self) -> ProviderResult<ConnectedAccount> {
        self.bounded("connect", self.inner.connect()).await
    }

    async fn submit_transaction(&self, request: &TransferRequest) -> ProviderResult<SubmittedTransfer> {
        self.bounded("submit", self.inner.submit_transaction(request))
            .await
    }

    async fn sign_message(&self, message: &str) -> ProviderResult<SignatureResult> {
        self.bounded("sign", self.inner.sign_message(message)).await
    }

    async fn poll_incoming(&self, address: &str) -> ProviderResult<Vec<IncomingTransfer>> {
        self.bounded("poll", self.inner.poll_incoming(address)).await
    }

    async fn transaction_status(&self, request_key: &str) -> ProviderResult<ConfirmationStatus> {
        self.bounded("status", self.inner.transaction_status(request_key))
            .await
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}
