use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockwise_core::{
    DocumentNumber, DomainError, DomainResult, Entity, ProductId, PurchaseOrderId,
};
use stockwise_products::StockEffect;

use crate::status::{ReceiptStatus, derive_status};

/// An order line as submitted by a caller, before pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineInput {
    pub product_id: ProductId,
    pub quantity_ordered: i64,
    /// Price in smallest currency unit (e.g. cents).
    pub unit_price: i64,
}

impl OrderLineInput {
    pub fn new(product_id: ProductId, quantity_ordered: i64, unit_price: i64) -> Self {
        Self {
            product_id,
            quantity_ordered,
            unit_price,
        }
    }
}

/// Purchase order line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderLine {
    line_no: u32,
    product_id: ProductId,
    product_name: String,
    quantity_ordered: i64,
    /// Never decreases and never exceeds `quantity_ordered`.
    quantity_received: i64,
    unit_price: i64,
    subtotal: i64,
}

impl PurchaseOrderLine {
    pub fn ordered(
        line_no: u32,
        input: &OrderLineInput,
        product_name: impl Into<String>,
    ) -> DomainResult<Self> {
        if line_no == 0 {
            return Err(DomainError::validation("line numbers start at 1"));
        }
        if input.quantity_ordered <= 0 {
            return Err(DomainError::validation("ordered quantity must be positive"));
        }
        if input.unit_price < 0 {
            return Err(DomainError::validation("unit price cannot be negative"));
        }
        let subtotal = input
            .quantity_ordered
            .checked_mul(input.unit_price)
            .ok_or_else(|| DomainError::validation("line subtotal overflows"))?;

        Ok(Self {
            line_no,
            product_id: input.product_id,
            product_name: product_name.into(),
            quantity_ordered: input.quantity_ordered,
            quantity_received: 0,
            unit_price: input.unit_price,
            subtotal,
        })
    }

    pub fn line_no(&self) -> u32 {
        self.line_no
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn quantity_ordered(&self) -> i64 {
        self.quantity_ordered
    }

    pub fn quantity_received(&self) -> i64 {
        self.quantity_received
    }

    pub fn outstanding(&self) -> i64 {
        (self.quantity_ordered - self.quantity_received).max(0)
    }

    pub fn unit_price(&self) -> i64 {
        self.unit_price
    }

    pub fn subtotal(&self) -> i64 {
        self.subtotal
    }

    #[cfg(test)]
    pub(crate) fn set_received_for_test(&mut self, received: i64) {
        self.quantity_received = received;
    }
}

/// Goods received against one order line in a single delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
    pub line_no: u32,
    /// Increment received in this delivery (not a running total).
    pub quantity: i64,
}

impl ReceiptLine {
    pub fn new(line_no: u32, quantity: i64) -> Self {
        Self { line_no, quantity }
    }
}

/// Caller-supplied fields for a new purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderDraft {
    pub date: DateTime<Utc>,
    pub supplier_id: String,
    #[serde(default)]
    pub expected_delivery_date: Option<DateTime<Utc>>,
    pub lines: Vec<OrderLineInput>,
    #[serde(default)]
    pub notes: String,
}

/// A purchase order, as persisted in the `purchase_orders` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    order_number: DocumentNumber,
    date: DateTime<Utc>,
    supplier_id: String,
    #[serde(default)]
    expected_delivery_date: Option<DateTime<Utc>>,
    lines: Vec<PurchaseOrderLine>,
    total_amount: i64,
    status: ReceiptStatus,
    #[serde(default)]
    received_date: Option<DateTime<Utc>>,
    #[serde(default)]
    notes: String,
    created_at: DateTime<Utc>,
}

impl PurchaseOrder {
    pub fn create(
        id: PurchaseOrderId,
        order_number: DocumentNumber,
        draft: &PurchaseOrderDraft,
        lines: Vec<PurchaseOrderLine>,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if draft.supplier_id.trim().is_empty() {
            return Err(DomainError::validation("supplier is required"));
        }
        ensure_unique_line_numbers(&lines)?;
        let total_amount = total(&lines)?;

        let mut order = Self {
            id,
            order_number,
            date: draft.date,
            supplier_id: draft.supplier_id.trim().to_string(),
            expected_delivery_date: draft.expected_delivery_date,
            lines,
            total_amount,
            status: ReceiptStatus::Pending,
            received_date: None,
            notes: draft.notes.clone(),
            created_at,
        };
        order.refresh_status(created_at);
        Ok(order)
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn order_number(&self) -> &DocumentNumber {
        &self.order_number
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn supplier_id(&self) -> &str {
        &self.supplier_id
    }

    pub fn expected_delivery_date(&self) -> Option<DateTime<Utc>> {
        self.expected_delivery_date
    }

    pub fn lines(&self) -> &[PurchaseOrderLine] {
        &self.lines
    }

    pub fn total_amount(&self) -> i64 {
        self.total_amount
    }

    pub fn status(&self) -> ReceiptStatus {
        self.status
    }

    pub fn received_date(&self) -> Option<DateTime<Utc>> {
        self.received_date
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Replace the ordered lines.
    ///
    /// Line numbers are positional, so quantities already received follow
    /// the product rather than the line number: each product's received
    /// total is spread over its new lines in order, up to each line's
    /// ordered quantity. Dropping a product with receipts, or ordering less
    /// of it than was already received, is an invariant violation.
    pub fn replace_lines(
        &mut self,
        lines: Vec<PurchaseOrderLine>,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        ensure_unique_line_numbers(&lines)?;
        let mut unplaced: BTreeMap<ProductId, i64> = BTreeMap::new();
        for line in &self.lines {
            *unplaced.entry(line.product_id).or_insert(0) += line.quantity_received;
        }

        let mut merged = lines;
        for line in &mut merged {
            line.quantity_received = match unplaced.get_mut(&line.product_id) {
                Some(left) => {
                    let carried = (*left).min(line.quantity_ordered);
                    *left -= carried;
                    carried
                }
                None => 0,
            };
        }

        if let Some((product_id, left)) = unplaced.iter().find(|(_, left)| **left > 0) {
            return Err(DomainError::invariant(format!(
                "product {product_id} already received {left} more than the new lines order"
            )));
        }

        self.total_amount = total(&merged)?;
        self.lines = merged;
        self.refresh_status(at);
        Ok(())
    }

    /// Record a delivery and return the ledger effects it implies.
    ///
    /// All receipt lines are validated before any line is touched. Receiving
    /// against a cancelled order still books the stock; the status stays
    /// `cancelled`.
    pub fn receive(
        &mut self,
        receipts: &[ReceiptLine],
        at: DateTime<Utc>,
    ) -> DomainResult<Vec<StockEffect>> {
        if receipts.is_empty() {
            return Err(DomainError::validation("a receipt needs at least one line"));
        }

        let mut increments: BTreeMap<u32, i64> = BTreeMap::new();
        for r in receipts {
            if r.quantity < 0 {
                return Err(DomainError::validation("received quantity cannot be negative"));
            }
            let slot = increments.entry(r.line_no).or_insert(0);
            *slot = slot
                .checked_add(r.quantity)
                .ok_or_else(|| DomainError::validation("received quantity overflows"))?;
        }

        for (line_no, qty) in &increments {
            let line = self
                .lines
                .iter()
                .find(|l| l.line_no == *line_no)
                .ok_or_else(|| DomainError::not_found(format!("order line {line_no}")))?;
            if *qty > line.outstanding() {
                return Err(DomainError::invariant(format!(
                    "line {line_no}: receiving {qty} exceeds outstanding {}",
                    line.outstanding()
                )));
            }
        }

        let mut effects = Vec::new();
        for line in &mut self.lines {
            if let Some(qty) = increments.get(&line.line_no).copied().filter(|q| *q > 0) {
                line.quantity_received += qty;
                effects.push(StockEffect::apply(line.product_id, qty));
            }
        }

        self.refresh_status(at);
        Ok(effects)
    }

    /// Cancel the order. Cancellation is final.
    pub fn cancel(&mut self) {
        self.status = ReceiptStatus::Cancelled;
    }

    fn refresh_status(&mut self, at: DateTime<Utc>) {
        let next = derive_status(self.status, &self.lines);
        if next == ReceiptStatus::Received && self.status != ReceiptStatus::Received {
            self.received_date = Some(at);
        } else if next != ReceiptStatus::Received && next != ReceiptStatus::Cancelled {
            self.received_date = None;
        }
        self.status = next;
    }
}

impl Entity for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn ensure_unique_line_numbers(lines: &[PurchaseOrderLine]) -> DomainResult<()> {
    let mut seen = BTreeSet::new();
    for line in lines {
        if !seen.insert(line.line_no) {
            return Err(DomainError::validation(format!(
                "duplicate line number {}",
                line.line_no
            )));
        }
    }
    Ok(())
}

fn total(lines: &[PurchaseOrderLine]) -> DomainResult<i64> {
    lines.iter().try_fold(0i64, |acc, l| {
        acc.checked_add(l.subtotal)
            .ok_or_else(|| DomainError::validation("order total overflows"))
    })
}
