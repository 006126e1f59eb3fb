//! Maps display-layer intents onto session operations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::notify::{Notification, Notifier};
use crate::protocol::Intent;
use rust_decimal::Decimal;
use wallet_session::amount::{format_amount, TOKEN_SYMBOL};
use wallet_session::{
    ConnectedAccount, ErrorKind, ProviderInfo, SessionError, SessionSnapshot, SignatureResult,
    SyncReport, TransactionRecord, WalletSession,
};

/// State-changing intent kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Connect,
    Disconnect,
    Send,
    Sign,
    Sync,
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntentKind::Connect => "connect",
            IntentKind::Disconnect => "disconnect",
            IntentKind::Send => "send",
            IntentKind::Sign => "sign",
            IntentKind::Sync => "sync",
        };
        f.write_str(s)
    }
}

/// Dispatch failures
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("A {0} request is already in progress")]
    Busy(IntentKind),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Session task failed: {0}")]
    Task(String),
}

impl DispatchError {
    /// Wire name of the error kind
    pub fn kind_name(&self) -> &'static str {
        match self {
            DispatchError::Busy(_) => "busy",
            DispatchError::Task(_) => "internal_error",
            DispatchError::Session(e) => match e.kind() {
                ErrorKind::InvalidState => "invalid_state",
                ErrorKind::ValidationError => "validation_error",
                ErrorKind::InsufficientBalance => "insufficient_balance",
                ErrorKind::ProviderError => "provider_error",
                ErrorKind::TransactionError => "transaction_error",
                ErrorKind::SigningError => "signing_error",
                ErrorKind::ConfigError => "internal_error",
            },
        }
    }
}

/// Successful result of an intent
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IntentOutput {
    Connected(ConnectedAccount),
    Sent(TransactionRecord),
    Signed(SignatureResult),
    Synced(SyncReport),
    Providers(Vec<ProviderInfo>),
    /// Disconnect and snapshot reads carry no payload
    Done,
}

/// Result of an intent together with the session state after it
#[derive(Debug)]
pub struct DispatchOutcome {
    pub result: Result<IntentOutput, DispatchError>,
    pub snapshot: SessionSnapshot,
}

#[derive(Debug, Default)]
struct BusyFlags {
    connect: AtomicBool,
    send: AtomicBool,
    sign: AtomicBool,
    sync: AtomicBool,
}

impl BusyFlags {
    fn acquire(&self, kind: IntentKind) -> Result<Option<BusyGuard<'_>>, DispatchError> {
        let flag = match kind {
            IntentKind::Connect => &self.connect,
            IntentKind::Send => &self.send,
            IntentKind::Sign => &self.sign,
            IntentKind::Sync => &self.sync,
            // completes without suspending
            IntentKind::Disconnect => return Ok(None),
        };

        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| DispatchError::Busy(kind))?;
        Ok(Some(BusyGuard(flag)))
    }

    fn is_busy(&self, kind: IntentKind) -> bool {
        let flag = match kind {
            IntentKind::Connect => &self.connect,
            IntentKind::Send => &self.send,
            IntentKind::Sign => &self.sign,
            IntentKind::Sync => &self.sync,
            IntentKind::Disconnect => return false,
        };
        flag.load(Ordering::Acquire)
    }
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Thin dispatcher between the display layer and the session.
///
/// Holds no session state of its own, only a busy flag per in-flight intent
/// kind. Session operations run on spawned tasks so they always complete,
/// even when the caller stops waiting.
pub struct IntentDispatcher {
    session: Arc<WalletSession>,
    notifier: Arc<dyn Notifier>,
    busy: BusyFlags,
}

impl IntentDispatcher {
    /// Create a new dispatcher
    pub fn new(session: Arc<WalletSession>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            session,
            notifier,
            busy: BusyFlags::default(),
        }
    }

    pub fn session(&self) -> &Arc<WalletSession> {
        &self.session
    }

    /// Whether an intent of this kind is outstanding
    pub fn is_busy(&self, kind: IntentKind) -> bool {
        self.busy.is_busy(kind)
    }

    /// Run an intent and report the session state afterwards
    pub async fn dispatch(&self, intent: Intent) -> DispatchOutcome {
        let result = self.execute(intent).await;
        let snapshot = self.session.snapshot().await;
        DispatchOutcome { result, snapshot }
    }

    async fn execute(&self, intent: Intent) -> Result<IntentOutput, DispatchError> {
        let session = self.session.clone();

        let (kind, result) = match intent {
            Intent::Snapshot => return Ok(IntentOutput::Done),
            Intent::Providers => return Ok(IntentOutput::Providers(self.session.providers().list())),
            Intent::Connect { provider_id } => {
                let _busy = self.claim(IntentKind::Connect)?;
                let display_name = self
                    .session
                    .providers()
                    .info(&provider_id)
                    .map(|p| p.display_name.clone())
                    .unwrap_or_else(|| provider_id.clone());

                let result = run(async move { session.connect(&provider_id).await }).await;
                if result.is_ok() {
                    self.notifier.notify(Notification::success(
                        "Wallet Connected!",
                        format!("Successfully connected to {}", display_name),
                    ));
                }
                (IntentKind::Connect, result.map(IntentOutput::Connected))
            }
            Intent::Disconnect => {
                let _busy = self.claim(IntentKind::Disconnect)?;

                let result = run(async move { session.disconnect().await }).await;
                if result.is_ok() {
                    self.notifier.notify(Notification::success(
                        "Wallet Disconnected",
                        "Your wallet has been safely disconnected",
                    ));
                }
                (IntentKind::Disconnect, result.map(|_| IntentOutput::Done))
            }
            Intent::Send { to, amount, memo } => {
                let _busy = self.claim(IntentKind::Send)?;

                let result =
                    run(async move { session.send(&to, &amount, memo.as_deref()).await }).await;
                if let Ok(record) = &result {
                    self.notifier.notify(Notification::success(
                        "Transaction Sent!",
                        format!("Successfully sent {} {}", record.amount, TOKEN_SYMBOL),
                    ));
                }
                (IntentKind::Send, result.map(IntentOutput::Sent))
            }
            Intent::Sign { message } => {
                let _busy = self.claim(IntentKind::Sign)?;

                let result = run(async move { session.sign(&message).await }).await;
                if let Ok(signature) = &result {
                    let preview: String = signature.signature.chars().take(10).collect();
                    self.notifier.notify(Notification::success(
                        "Message Signed!",
                        format!("Signature: {}...", preview),
                    ));
                }
                (IntentKind::Sign, result.map(IntentOutput::Signed))
            }
            Intent::Sync => {
                let _busy = self.claim(IntentKind::Sync)?;

                let result = run(async move { session.sync().await }).await;
                if let Ok(report) = &result {
                    if !report.received.is_empty() {
                        let total: Decimal = report.received.iter().map(|r| r.amount).sum();
                        self.notifier.notify(Notification::success(
                            "Funds Received",
                            format!("Received {} {}", format_amount(total), TOKEN_SYMBOL),
                        ));
                    }
                }
                (IntentKind::Sync, result.map(IntentOutput::Synced))
            }
        };

        if let Err(err) = &result {
            self.notifier.notify(failure_notification(kind, err));
        }
        result
    }

    /// Mark an intent kind as in flight, rejecting duplicates
    fn claim(&self, kind: IntentKind) -> Result<Option<BusyGuard<'_>>, DispatchError> {
        self.busy.acquire(kind).map_err(|err| {
            debug!("Rejecting duplicate {} intent", kind);
            self.notifier.notify(failure_notification(kind, &err));
            err
        })
    }
}

/// Drive a session operation to completion on its own task
async fn run<T, F>(operation: F) -> Result<T, DispatchError>
where
    F: Future<Output = wallet_session::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(operation)
        .await
        .map_err(|e| DispatchError::Task(e.to_string()))?
        .map_err(DispatchError::from)
}

fn failure_notification(kind: IntentKind, err: &DispatchError) -> Notification {
    let title = match err {
        DispatchError::Busy(_) => {
            return Notification::info("Please wait", err.to_string());
        }
        DispatchError::Session(e) if e.kind() == ErrorKind::ValidationError => "Invalid input",
        DispatchError::Session(e) if e.kind() == ErrorKind::InsufficientBalance => {
            "Insufficient Balance"
        }
        _ => match kind {
            IntentKind::Connect => "Connection Failed",
            IntentKind::Disconnect => "Disconnect Failed",
            IntentKind::Send => "Transaction Failed",
            IntentKind::Sign => "Signing Failed",
            IntentKind::Sync => "Sync Failed",
        },
    };
    Notification::error(title, err.to_string())
}
