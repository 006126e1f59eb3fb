//! Session-scoped transaction history

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a transfer relative to the session account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// Confirmation status reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationStatus {
    /// Submitted but not yet final
    #[default]
    Pending,
    /// Included on chain
    Confirmed,
    /// Rejected or dropped
    Failed,
}

/// A single transfer recorded during a connected session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Unique identifier within the session
    pub id: Uuid,

    /// Provider-side key used to poll confirmation status
    pub request_key: String,

    pub direction: Direction,

    /// Recipient for outgoing transfers, sender for incoming ones
    pub counterparty: String,

    pub amount: Decimal,

    pub memo: Option<String>,

    pub created_at: DateTime<Utc>,

    pub confirmation_status: ConfirmationStatus,
}

impl TransactionRecord {
    /// Record an outgoing transfer accepted by the provider
    pub fn outgoing(
        request_key: String,
        to: String,
        amount: Decimal,
        memo: Option<String>,
        status: ConfirmationStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_key,
            direction: Direction::Outgoing,
            counterparty: to,
            amount,
            memo,
            created_at: Utc::now(),
            confirmation_status: status,
        }
    }

    /// Record an incoming transfer observed on chain
    pub fn incoming(
        request_key: String,
        from: String,
        amount: Decimal,
        memo: Option<String>,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_key,
            direction: Direction::Incoming,
            counterparty: from,
            amount,
            memo,
            created_at: received_at,
            confirmation_status: ConfirmationStatus::Confirmed,
        }
    }

    /// Whether this record still awaits confirmation
    pub fn is_pending(&self) -> bool {
        self.confirmation_status == ConfirmationStatus::Pending
    }
}

/// Transaction history ordered most recent first.
///
/// Records are sorted by `created_at` descending. Equal timestamps keep the
/// later insertion in front.
#[derive(Debug, Clone, Default)]
pub struct TransactionLedger {
    records: Vec<TransactionRecord>,
}

impl TransactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record at its ordered position
    pub fn insert(&mut self, record: TransactionRecord) {
        let position = self
            .records
            .iter()
            .position(|existing| existing.created_at <= record.created_at)
            .unwrap_or(self.records.len());
        self.records.insert(position, record);
    }

    /// Update the status of a record, returning the previous status
    pub fn set_status(&mut self, id: Uuid, status: ConfirmationStatus) -> Option<ConfirmationStatus> {
        self.records
            .iter_mut()
            .find(|record| record.id == id)
            .map(|record| std::mem::replace(&mut record.confirmation_status, status))
    }

    /// Whether a provider request key is already recorded
    pub fn contains_request_key(&self, request_key: &str) -> bool {
        self.records.iter().any(|r| r.request_key == request_key)
    }

    /// Outgoing records still awaiting confirmation
    pub fn pending_outgoing(&self) -> Vec<TransactionRecord> {
        self.records
            .iter()
            .filter(|r| r.direction == Direction::Outgoing && r.is_pending())
            .cloned()
            .collect()
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
