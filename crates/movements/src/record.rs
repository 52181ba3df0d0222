use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockwise_core::{DocumentNumber, DomainError, DomainResult, Entity, RecordId};
use stockwise_products::StockEffect;

use crate::line::MovementLine;

/// Direction of a stock voucher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    /// Goods in (entry voucher): adds to stock.
    Incoming,
    /// Goods out (exit voucher): takes from stock.
    Outgoing,
}

impl MovementKind {
    /// Sign applied to line quantities when the voucher takes effect.
    pub fn sign(self) -> i64 {
        match self {
            MovementKind::Incoming => 1,
            MovementKind::Outgoing => -1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MovementKind::Incoming => "incoming",
            MovementKind::Outgoing => "outgoing",
        }
    }

    /// Ledger effects of committing `lines` under this direction.
    pub fn effects(self, lines: &[MovementLine]) -> Vec<StockEffect> {
        lines
            .iter()
            .map(|l| StockEffect::apply(l.product_id(), self.sign() * l.quantity()))
            .collect()
    }

    /// Ledger effects that undo a prior commit of `lines`.
    pub fn reversal(self, lines: &[MovementLine]) -> Vec<StockEffect> {
        lines
            .iter()
            .map(|l| StockEffect::reverse(l.product_id(), -self.sign() * l.quantity()))
            .collect()
    }
}

fn default_status() -> String {
    "pending".to_string()
}

/// Caller-supplied header fields of a voucher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    pub date: DateTime<Utc>,
    /// Supplier for incoming vouchers, customer for outgoing ones.
    pub counterparty_name: String,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub notes: String,
}

impl RecordMetadata {
    pub fn new(date: DateTime<Utc>, counterparty_name: impl Into<String>) -> Self {
        Self {
            date,
            counterparty_name: counterparty_name.into(),
            destination: None,
            status: default_status(),
            notes: String::new(),
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.counterparty_name.trim().is_empty() {
            return Err(DomainError::validation("counterparty name is required"));
        }
        if self.status.trim().is_empty() {
            return Err(DomainError::validation("status cannot be empty"));
        }
        Ok(())
    }
}

/// A committed stock voucher, as persisted in the `movements` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementRecord {
    id: RecordId,
    kind: MovementKind,
    voucher_number: DocumentNumber,
    date: DateTime<Utc>,
    counterparty_name: String,
    #[serde(default)]
    destination: Option<String>,
    lines: Vec<MovementLine>,
    total_amount: i64,
    status: String,
    #[serde(default)]
    notes: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl MovementRecord {
    pub fn create(
        id: RecordId,
        kind: MovementKind,
        voucher_number: DocumentNumber,
        metadata: RecordMetadata,
        lines: Vec<MovementLine>,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        metadata.validate()?;
        let total_amount = total(&lines)?;
        Ok(Self {
            id,
            kind,
            voucher_number,
            date: metadata.date,
            counterparty_name: metadata.counterparty_name.trim().to_string(),
            destination: metadata.destination,
            lines,
            total_amount,
            status: metadata.status,
            notes: metadata.notes,
            created_at,
            updated_at: None,
        })
    }

    /// The same voucher with its header and whole line set replaced.
    ///
    /// Identity, direction, number and creation time carry over.
    pub fn revise(
        &self,
        metadata: RecordMetadata,
        lines: Vec<MovementLine>,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut revised = Self::create(
            self.id,
            self.kind,
            self.voucher_number.clone(),
            metadata,
            lines,
            self.created_at,
        )?;
        revised.updated_at = Some(at);
        Ok(revised)
    }

    pub fn id_typed(&self) -> RecordId {
        self.id
    }

    pub fn kind(&self) -> MovementKind {
        self.kind
    }

    pub fn voucher_number(&self) -> &DocumentNumber {
        &self.voucher_number
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn counterparty_name(&self) -> &str {
        &self.counterparty_name
    }

    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    pub fn lines(&self) -> &[MovementLine] {
        &self.lines
    }

    pub fn total_amount(&self) -> i64 {
        self.total_amount
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Ledger effects of this voucher as committed.
    pub fn effects(&self) -> Vec<StockEffect> {
        self.kind.effects(&self.lines)
    }

    /// Ledger effects that undo this voucher.
    pub fn reversal(&self) -> Vec<StockEffect> {
        self.kind.reversal(&self.lines)
    }

    /// `total_amount` is the sum of subtotals and every subtotal is
    /// `quantity * unit_price`.
    pub fn totals_consistent(&self) -> bool {
        self.lines.iter().all(MovementLine::is_consistent)
            && total(&self.lines).ok() == Some(self.total_amount)
    }
}

impl Entity for MovementRecord {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn total(lines: &[MovementLine]) -> DomainResult<i64> {
    if lines.is_empty() {
        return Err(DomainError::validation("a voucher needs at least one line"));
    }
    lines.iter().try_fold(0i64, |acc, l| {
        acc.checked_add(l.subtotal())
            .ok_or_else(|| DomainError::validation("voucher total overflows"))
    })
}
