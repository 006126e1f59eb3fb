//! Wallet session state machine
//!
//! The session is the only owner of connection state, balance and the
//! transaction ledger. Display layers read it through [`SessionSnapshot`] and
//! observe it through [`SessionEvent`]s; they never mutate it directly.
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──ok──▶ Connected ──disconnect──▶ Disconnecting ──▶ Disconnected
//!                               │
//!                               └──provider failure──▶ Disconnected
//! ```
//!
//! At most one operation runs at a time. The operation lock is acquired with
//! `try_lock` and held across the provider call, so a competing call is
//! rejected instead of queued.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, MutexGuard, RwLock};
use tracing::{debug, info, warn};

use crate::amount::{format_amount, parse_amount, TOKEN_SYMBOL};
use crate::error::{Result, SessionError};
use crate::events::SessionEvent;
use crate::ledger::{ConfirmationStatus, TransactionLedger, TransactionRecord};
use crate::provider::{
    ConnectedAccount, ProviderAdapter, ProviderFailure, ProviderRegistry, SignatureResult,
    TransferRequest,
};
use crate::settings::Settings;

/// Default buffered events per subscriber
const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Connection status of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Disconnected => "disconnected",
            SessionStatus::Connecting => "connecting",
            SessionStatus::Connected => "connected",
            SessionStatus::Disconnecting => "disconnecting",
        };
        f.write_str(s)
    }
}

/// State-changing session operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Connect,
    Disconnect,
    Send,
    Sign,
    Sync,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Connect => "connect",
            Operation::Disconnect => "disconnect",
            Operation::Send => "send",
            Operation::Sign => "sign",
            Operation::Sync => "sync",
        };
        f.write_str(s)
    }
}

/// Read-only view of the session for display layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub provider_id: Option<String>,
    pub address: Option<String>,
    pub balance: Option<Decimal>,
    /// Most recent first
    pub transactions: Vec<TransactionRecord>,
}

/// Outcome of a [`WalletSession::sync`] pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Incoming transfers credited during this pass
    pub received: Vec<TransactionRecord>,
    /// Outgoing transfers that became final
    pub confirmed: usize,
    /// Outgoing transfers that failed and were refunded
    pub failed: usize,
    /// Total amount returned to the balance
    pub refunded: Decimal,
}

#[derive(Debug, Default)]
struct SessionState {
    status: SessionStatus,
    provider_id: Option<String>,
    address: Option<String>,
    balance: Option<Decimal>,
    ledger: TransactionLedger,
}

impl SessionState {
    fn require(&self, expected: SessionStatus, operation: Operation) -> Result<()> {
        if self.status != expected {
            return Err(SessionError::InvalidState {
                operation,
                status: self.status,
            });
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.status = SessionStatus::Disconnected;
        self.provider_id = None;
        self.address = None;
        self.balance = None;
        self.ledger.clear();
    }
}

/// Rolls a `Connecting` session back to `Disconnected` when the connect
/// future is dropped before the provider answers
struct PendingConnect<'a> {
    state: &'a RwLock<SessionState>,
    settled: bool,
}

impl<'a> PendingConnect<'a> {
    fn new(state: &'a RwLock<SessionState>) -> Self {
        Self {
            state,
            settled: false,
        }
    }

    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for PendingConnect<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        match self.state.try_write() {
            Ok(mut state) if state.status == SessionStatus::Connecting => {
                warn!("Connect abandoned before the provider answered");
                state.reset();
            }
            Ok(_) => {}
            // the next connect clears it
            Err(_) => debug!("Session busy, deferring rollback of abandoned connect"),
        }
    }
}

/// Account context captured at the start of a connected operation
struct ActiveAccount {
    adapter: Arc<dyn ProviderAdapter>,
    address: String,
    balance: Decimal,
}

/// Single wallet session
pub struct WalletSession {
    /// Selectable providers and their backends
    providers: ProviderRegistry,
    /// Session fields
    state: RwLock<SessionState>,
    /// Held for the whole duration of a state-changing operation
    in_flight: Mutex<()>,
    /// Notification fan-out
    events: broadcast::Sender<SessionEvent>,
}

impl WalletSession {
    /// Create a disconnected session over the given providers
    pub fn new(providers: ProviderRegistry) -> Self {
        Self::with_event_capacity(providers, DEFAULT_EVENT_CAPACITY)
    }

    /// Create a session with a custom event buffer size
    pub fn with_event_capacity(providers: ProviderRegistry, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));

        Self {
            providers,
            state: RwLock::new(SessionState::default()),
            in_flight: Mutex::new(()),
            events,
        }
    }

    /// Create the demo session described by `settings`
    pub fn from_settings(settings: &Settings) -> Self {
        Self::with_event_capacity(ProviderRegistry::from_settings(settings), settings.event_capacity)
    }

    /// Providers this session can connect to
    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Get the current status
    pub async fn status(&self) -> SessionStatus {
        self.state.read().await.status
    }

    /// Copy the current session fields
    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;

        SessionSnapshot {
            status: state.status,
            provider_id: state.provider_id.clone(),
            address: state.address.clone(),
            balance: state.balance,
            transactions: state.ledger.records().to_vec(),
        }
    }

    /// Connect to a wallet provider
    pub async fn connect(&self, provider_id: &str) -> Result<ConnectedAccount> {
        let _guard = self.begin(Operation::Connect)?;

        let adapter = {
            let mut state = self.state.write().await;
            // the op slot is ours, so a leftover Connecting belongs to an abandoned attempt
            if state.status == SessionStatus::Connecting {
                warn!("Discarding abandoned connection attempt");
                state.reset();
            }
            state.require(SessionStatus::Disconnected, Operation::Connect)?;

            let adapter = self
                .providers
                .adapter(provider_id)
                .ok_or_else(|| SessionError::validation(format!("unknown wallet provider '{}'", provider_id)))?;

            state.status = SessionStatus::Connecting;
            state.provider_id = Some(provider_id.to_string());
            adapter
        };

        let attempt = PendingConnect::new(&self.state);
        info!("Connecting to {} ({} backend)", provider_id, adapter.backend_name());

        let outcome = adapter.connect().await.and_then(|account| {
            if account.address.trim().is_empty() {
                return Err(ProviderFailure::MalformedResponse("empty account address".to_string()));
            }
            if account.balance.is_sign_negative() {
                return Err(ProviderFailure::MalformedResponse(format!(
                    "negative balance {}",
                    account.balance
                )));
            }
            Ok(account)
        });

        let mut state = self.state.write().await;
        attempt.settle();
        match outcome {
            Ok(account) => {
                state.status = SessionStatus::Connected;
                state.address = Some(account.address.clone());
                state.balance = Some(account.balance);
                state.ledger.clear();
                drop(state);

                info!(
                    "Connected to {} as {} (balance {} {})",
                    provider_id,
                    account.address,
                    format_amount(account.balance),
                    TOKEN_SYMBOL
                );
                self.emit(SessionEvent::Connected {
                    provider_id: provider_id.to_string(),
                    address: account.address.clone(),
                });
                Ok(account)
            }
            Err(failure) => {
                state.reset();
                drop(state);

                warn!("Connection to {} failed: {}", provider_id, failure);
                self.emit(SessionEvent::ConnectionFailed {
                    provider_id: provider_id.to_string(),
                    reason: failure.to_string(),
                });
                Err(SessionError::Provider(failure))
            }
        }
    }

    /// Tear down the connected session
    pub async fn disconnect(&self) -> Result<()> {
        let _guard = self.begin(Operation::Disconnect)?;

        {
            let mut state = self.state.write().await;
            state.require(SessionStatus::Connected, Operation::Disconnect)?;

            state.status = SessionStatus::Disconnecting;
            debug!(
                "Disconnecting from {}",
                state.provider_id.as_deref().unwrap_or_default()
            );
            state.reset();
        }

        info!("Wallet disconnected");
        self.emit(SessionEvent::Disconnected);
        Ok(())
    }

    /// Send `amount` to `to`
    pub async fn send(&self, to: &str, amount: &str, memo: Option<&str>) -> Result<TransactionRecord> {
        let _guard = self.begin(Operation::Send)?;
        let account = self.active_account(Operation::Send).await?;

        let to = to.trim();
        if to.is_empty() {
            return Err(SessionError::validation("recipient address is required"));
        }
        let amount = parse_amount(amount)?;
        let memo = memo
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        if amount > account.balance {
            return Err(SessionError::InsufficientBalance {
                requested: amount,
                available: account.balance,
            });
        }

        let request = TransferRequest {
            from: account.address,
            to: to.to_string(),
            amount,
            memo,
        };

        info!("Sending {} {} to {}", amount, TOKEN_SYMBOL, request.to);

        let submitted = account
            .adapter
            .submit_transaction(&request)
            .await
            .and_then(|submitted| match submitted.status {
                ConfirmationStatus::Failed => Err(ProviderFailure::NetworkError(format!(
                    "transfer {} rejected at submission",
                    submitted.request_key
                ))),
                _ => Ok(submitted),
            });

        match submitted {
            Ok(submitted) => {
                let record = TransactionRecord::outgoing(
                    submitted.request_key,
                    request.to,
                    amount,
                    request.memo,
                    submitted.status,
                );

                {
                    let mut state = self.state.write().await;
                    state.balance = state.balance.map(|balance| balance - amount);
                    state.ledger.insert(record.clone());
                }

                info!("Transfer {} submitted ({})", record.id, record.request_key);
                self.emit(SessionEvent::TransactionSubmitted {
                    record: record.clone(),
                });
                Ok(record)
            }
            Err(failure) => {
                warn!("Transfer to {} failed: {}", request.to, failure);
                self.emit(SessionEvent::TransactionFailed {
                    reason: failure.to_string(),
                });
                Err(SessionError::Transaction(failure))
            }
        }
    }

    /// Sign an arbitrary message with the connected account
    pub async fn sign(&self, message: &str) -> Result<SignatureResult> {
        let _guard = self.begin(Operation::Sign)?;
        let account = self.active_account(Operation::Sign).await?;

        if message.trim().is_empty() {
            return Err(SessionError::validation("message to sign is required"));
        }

        debug!("Signing {} byte message", message.len());

        match account.adapter.sign_message(message).await {
            Ok(signature) => {
                info!("Message signed at {}", signature.signed_at);
                self.emit(SessionEvent::MessageSigned {
                    signature: signature.clone(),
                });
                Ok(signature)
            }
            Err(failure) => {
                warn!("Signing failed: {}", failure);
                self.emit(SessionEvent::SigningFailed {
                    reason: failure.to_string(),
                });
                Err(SessionError::Signing(failure))
            }
        }
    }

    /// Pull incoming transfers and confirmation updates from the provider.
    ///
    /// Everything is fetched and checked first, then applied in one update,
    /// so a provider failure or an out-of-range amount leaves the session
    /// untouched.
    pub async fn sync(&self) -> Result<SyncReport> {
        let _guard = self.begin(Operation::Sync)?;
        let account = self.active_account(Operation::Sync).await?;

        let incoming = account
            .adapter
            .poll_incoming(&account.address)
            .await
            .map_err(SessionError::Provider)?;

        let pending = self.state.read().await.ledger.pending_outgoing();
        let mut updates = Vec::new();
        for record in pending {
            let status = account
                .adapter
                .transaction_status(&record.request_key)
                .await
                .map_err(SessionError::Provider)?;
            if status != ConfirmationStatus::Pending {
                updates.push((record, status));
            }
        }

        let mut credits = Vec::new();
        {
            let state = self.state.read().await;
            let mut seen = HashSet::new();

            for transfer in incoming {
                if transfer.amount <= Decimal::ZERO {
                    warn!("Ignoring non-positive incoming transfer {}", transfer.request_key);
                    continue;
                }
                if state.ledger.contains_request_key(&transfer.request_key)
                    || !seen.insert(transfer.request_key.clone())
                {
                    debug!("Incoming transfer {} already recorded", transfer.request_key);
                    continue;
                }

                credits.push(TransactionRecord::incoming(
                    transfer.request_key,
                    transfer.from,
                    transfer.amount,
                    transfer.memo,
                    transfer.received_at,
                ));
            }
        }

        let overflow = |record: &TransactionRecord| {
            SessionError::Provider(ProviderFailure::MalformedResponse(format!(
                "transfer {} overflows the balance",
                record.request_key
            )))
        };

        let mut balance = account.balance;
        let mut report = SyncReport::default();
        for record in &credits {
            balance = balance.checked_add(record.amount).ok_or_else(|| overflow(record))?;
        }
        for (record, status) in &updates {
            match status {
                ConfirmationStatus::Failed => {
                    balance = balance.checked_add(record.amount).ok_or_else(|| overflow(record))?;
                    report.refunded = report
                        .refunded
                        .checked_add(record.amount)
                        .ok_or_else(|| overflow(record))?;
                    report.failed += 1;
                }
                _ => report.confirmed += 1,
            }
        }

        let mut events = Vec::new();
        {
            let mut state = self.state.write().await;
            state.balance = Some(balance);

            for record in credits {
                state.ledger.insert(record.clone());
                report.received.push(record.clone());
                events.push(SessionEvent::TransactionReceived { record });
            }

            for (record, status) in updates {
                state.ledger.set_status(record.id, status);
                events.push(SessionEvent::TransactionStatusChanged {
                    id: record.id,
                    status,
                });
            }
        }

        debug!(
            "Sync complete: {} received, {} confirmed, {} failed",
            report.received.len(),
            report.confirmed,
            report.failed
        );
        for event in events {
            self.emit(event);
        }
        Ok(report)
    }

    /// Claim the operation slot or reject the call
    fn begin(&self, operation: Operation) -> Result<MutexGuard<'_, ()>> {
        self.in_flight.try_lock().map_err(|_| {
            debug!("Rejecting {}: another operation is in flight", operation);
            SessionError::OperationInFlight { operation }
        })
    }

    async fn active_account(&self, operation: Operation) -> Result<ActiveAccount> {
        let state = self.state.read().await;
        state.require(SessionStatus::Connected, operation)?;

        let invalid = || SessionError::InvalidState {
            operation,
            status: state.status,
        };
        let provider_id = state.provider_id.as_deref().ok_or_else(invalid)?;
        let adapter = self.providers.adapter(provider_id).ok_or_else(invalid)?;

        Ok(ActiveAccount {
            adapter,
            address: state.address.clone().ok_or_else(invalid)?,
            balance: state.balance.ok_or_else(invalid)?,
        })
    }

    fn emit(&self, event: SessionEvent) {
        let name = event.name();
        if self.events.send(event).is_err() {
            debug!("No subscribers for {} event", name);
        }
    }
}
