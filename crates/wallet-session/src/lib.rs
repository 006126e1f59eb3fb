//! # wallet-session
//!
//! Core of the wallet demo back-end:
//! - Session state machine owning connection lifecycle, balance and ledger
//! - Provider adapter capability trait with a configurable mock backend
//! - Provider registry describing the selectable wallets
//! - Event channel for notification consumers

pub mod amount;
pub mod error;
pub mod events;
pub mod ledger;
pub mod provider;
pub mod settings;
mod session;

pub use error::{ErrorKind, Result, SessionError};
pub use events::SessionEvent;
pub use ledger::{ConfirmationStatus, Direction, TransactionLedger, TransactionRecord};
pub use provider::{
    ConnectedAccount, IncomingTransfer, MockProvider, ProviderAdapter, ProviderFailure,
    ProviderInfo, ProviderRegistry, SignatureResult, SubmittedTransfer, TimeoutAdapter,
    TransferRequest,
};
pub use session::{Operation, SessionSnapshot, SessionStatus, SyncReport, WalletSession};
pub use settings::{MockSettings, Settings, SettingsManager};
