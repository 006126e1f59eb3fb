//! Simulated wallet backend
//!
//! Answers every capability after a fixed delay with fixed payloads. Tests
//! can inject one-shot failures, queue incoming transfers, script
//! confirmation statuses and inspect how often each capability was hit.

use async_trait::async_trait;
use chrono::Utc;
use rand::RngCore;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use super::traits::{ProviderAdapter, ProviderResult};
use super::types::{
    ConnectedAccount, IncomingTransfer, ProviderFailure, SignatureResult, SubmittedTransfer,
    TransferRequest,
};
use crate::ledger::ConfirmationStatus;
use crate::settings::MockSettings;

/// Capabilities of the mock that can be counted or made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    Connect,
    Submit,
    Sign,
    PollIncoming,
    Status,
}

#[derive(Debug, Default)]
struct CallCounters {
    connect: AtomicUsize,
    submit: AtomicUsize,
    sign: AtomicUsize,
    poll_incoming: AtomicUsize,
    status: AtomicUsize,
}

impl CallCounters {
    fn counter(&self, operation: MockOperation) -> &AtomicUsize {
        match operation {
            MockOperation::Connect => &self.connect,
            MockOperation::Submit => &self.submit,
            MockOperation::Sign => &self.sign,
            MockOperation::PollIncoming => &self.poll_incoming,
            MockOperation::Status => &self.status,
        }
    }
}

/// Mock provider backend
pub struct MockProvider {
    account: ConnectedAccount,
    connect_latency: Duration,
    submit_latency: Duration,
    sign_latency: Duration,
    calls: CallCounters,
    failures: Mutex<HashMap<MockOperation, VecDeque<ProviderFailure>>>,
    incoming: Mutex<Vec<IncomingTransfer>>,
    statuses: Mutex<HashMap<String, ConfirmationStatus>>,
    submitted: Mutex<Vec<TransferRequest>>,
}

impl MockProvider {
    /// Create a mock with the demo account and latencies
    pub fn new() -> Self {
        Self::from_settings(&MockSettings::default())
    }

    /// Create a mock from configuration
    pub fn from_settings(settings: &MockSettings) -> Self {
        Self {
            account: ConnectedAccount {
                address: settings.address.clone(),
                balance: settings.opening_balance,
            },
            connect_latency: Duration::from_millis(settings.connect_latency_ms),
            submit_latency: Duration::from_millis(settings.submit_latency_ms),
            sign_latency: Duration::from_millis(settings.sign_latency_ms),
            calls: CallCounters::default(),
            failures: Mutex::new(HashMap::new()),
            incoming: Mutex::new(Vec::new()),
            statuses: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Override the account returned by `connect`
    pub fn with_account(mut self, address: &str, balance: Decimal) -> Self {
        self.account = ConnectedAccount {
            address: address.to_string(),
            balance,
        };
        self
    }

    /// Use the same latency for every capability
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.connect_latency = latency;
        self.submit_latency = latency;
        self.sign_latency = latency;
        self
    }

    /// Make the next call of `operation` fail with `failure`
    pub async fn fail_next(&self, operation: MockOperation, failure: ProviderFailure) {
        let mut failures = self.failures.lock().await;
        failures.entry(operation).or_default().push_back(failure);
    }

    /// Queue a transfer to be reported by the next incoming poll
    pub async fn push_incoming(&self, transfer: IncomingTransfer) {
        self.incoming.lock().await.push(transfer);
    }

    /// Script the confirmation status reported for a request key
    pub async fn set_status(&self, request_key: &str, status: ConfirmationStatus) {
        self.statuses
            .lock()
            .await
            .insert(request_key.to_string(), status);
    }

    /// Transfers accepted so far, oldest first
    pub async fn submitted(&self) -> Vec<TransferRequest> {
        self.submitted.lock().await.clone()
    }

    /// Number of times a capability was invoked
    pub fn calls(&self, operation: MockOperation) -> usize {
        self.calls.counter(operation).load(Ordering::SeqCst)
    }

    /// Total number of capability invocations
    pub fn total_calls(&self) -> usize {
        [
            MockOperation::Connect,
            MockOperation::Submit,
            MockOperation::Sign,
            MockOperation::PollIncoming,
            MockOperation::Status,
        ]
        .into_iter()
        .map(|op| self.calls(op))
        .sum()
    }

    async fn enter(&self, operation: MockOperation, latency: Duration) -> ProviderResult<()> {
        self.calls.counter(operation).fetch_add(1, Ordering::SeqCst);

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut failures = self.failures.lock().await;
        match failures.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(failure) => {
                debug!("Mock {:?} failing with: {}", operation, failure);
                Err(failure)
            }
            None => Ok(()),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn connect(&self) -> ProviderResult<ConnectedAccount> {
        self.enter(MockOperation::Connect, self.connect_latency).await?;
        Ok(self.account.clone())
    }

    async fn submit_transaction(&self, request: &TransferRequest) -> ProviderResult<SubmittedTransfer> {
        self.enter(MockOperation::Submit, self.submit_latency).await?;

        self.submitted.lock().await.push(request.clone());
        let request_key = random_hex(32);
        debug!("Mock accepted transfer {} -> {}", request_key, request.to);

        Ok(SubmittedTransfer {
            request_key,
            status: ConfirmationStatus::Pending,
        })
    }

    async fn sign_message(&self, _message: &str) -> ProviderResult<SignatureResult> {
        self.enter(MockOperation::Sign, self.sign_latency).await?;

        Ok(SignatureResult {
            signature: format!("0x{}", random_hex(32)),
            signed_at: Utc::now(),
        })
    }

    async fn poll_incoming(&self, _address: &str) -> ProviderResult<Vec<IncomingTransfer>> {
        self.enter(MockOperation::PollIncoming, Duration::ZERO).await?;
        Ok(std::mem::take(&mut *self.incoming.lock().await))
    }

    async fn transaction_status(&self, request_key: &str) -> ProviderResult<ConfirmationStatus> {
        self.enter(MockOperation::Status, Duration::ZERO).await?;

        let statuses = self.statuses.lock().await;
        Ok(statuses.get(request_key).copied().unwrap_or_default())
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}

/// `bytes` random bytes, hex encoded
fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}
