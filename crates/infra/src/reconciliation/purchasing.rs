//! Purchase-order flows. Only receipts touch the ledger.

use chrono::Utc;
use tracing::{info, instrument};

use stockwise_core::{ExpectedVersion, ProductId, PurchaseOrderId};
use stockwise_products::plan_effects;
use stockwise_purchasing::{
    OrderLineInput, PurchaseOrder, PurchaseOrderDraft, PurchaseOrderLine, ReceiptLine,
    ReceiptStatus,
};

use super::numbering::reserve_number;
use super::{ReconciliationCoordinator, trace_plan};
use crate::collections::PURCHASE_ORDERS;
use crate::document_store::{DocumentStore, OrderBy, Versioned, WriteBatch};
use crate::error::{ReconcileError, ReconcileResult};
use crate::ledger::LedgerSnapshot;
use crate::retry::with_retry;

impl<S> ReconciliationCoordinator<S>
where
    S: DocumentStore,
{
    /// Create a `pending` order with a fresh `PO-YYYYMM-NNN` number.
    #[instrument(
        skip(self, draft),
        fields(supplier = %draft.supplier_id, lines = draft.lines.len()),
        err
    )]
    pub async fn create_purchase_order(
        &self,
        draft: PurchaseOrderDraft,
    ) -> ReconcileResult<PurchaseOrderId> {
        if draft.supplier_id.trim().is_empty() {
            return Err(ReconcileError::Validation("supplier is required".to_string()));
        }
        price_lines(&draft.lines, |_| Ok(String::new()))?;

        let id = PurchaseOrderId::new();
        let draft = &draft;
        let order = with_retry(self.max_commit_attempts, "create_purchase_order", move || {
            self.try_create_order(id, draft)
        })
        .await?;

        info!(
            order = %id,
            number = %order.order_number(),
            total = order.total_amount(),
            "purchase order created"
        );
        Ok(id)
    }

    /// Replace the ordered lines, numbered 1.. in the given order.
    ///
    /// Quantities already received stay with their line number; the status
    /// is re-derived.
    #[instrument(skip(self, lines), fields(order = %id, lines = lines.len()), err)]
    pub async fn update_purchase_order_lines(
        &self,
        id: PurchaseOrderId,
        lines: Vec<OrderLineInput>,
    ) -> ReconcileResult<ReceiptStatus> {
        price_lines(&lines, |_| Ok(String::new()))?;

        let lines = &lines;
        let order = with_retry(self.max_commit_attempts, "update_purchase_order_lines", move || {
            self.try_update_lines(id, lines)
        })
        .await?;

        info!(order = %id, status = order.status().as_str(), "purchase order lines updated");
        Ok(order.status())
    }

    /// Cancel an order. Later receipts still book stock but the order stays
    /// `cancelled`.
    #[instrument(skip(self), fields(order = %id), err)]
    pub async fn cancel_purchase_order(&self, id: PurchaseOrderId) -> ReconcileResult<()> {
        with_retry(self.max_commit_attempts, "cancel_purchase_order", move || async move {
            let mut current = self.read_order(id).await?;
            current.value.cancel();
            PURCHASE_ORDERS
                .replace(&self.store, &current.id, &current.value, current.expected())
                .await?;
            Ok(())
        })
        .await?;
        info!(order = %id, "purchase order cancelled");
        Ok(())
    }

    /// Delete an order. Stock already received stays in the ledger.
    #[instrument(skip(self), fields(order = %id), err)]
    pub async fn delete_purchase_order(&self, id: PurchaseOrderId) -> ReconcileResult<()> {
        with_retry(self.max_commit_attempts, "delete_purchase_order", move || async move {
            let current = self.read_order(id).await?;
            PURCHASE_ORDERS
                .remove(&self.store, &current.id, current.expected())
                .await?;
            Ok(())
        })
        .await?;
        info!(order = %id, "purchase order deleted");
        Ok(())
    }

    /// Book a delivery: per-line increments are added to the order and to
    /// the ledger in one batch. Returns the derived status.
    #[instrument(skip(self, receipts), fields(order = %id, lines = receipts.len()), err)]
    pub async fn receive_purchase_order_lines(
        &self,
        id: PurchaseOrderId,
        receipts: Vec<ReceiptLine>,
    ) -> ReconcileResult<ReceiptStatus> {
        if receipts.is_empty() {
            return Err(ReconcileError::Validation(
                "a receipt needs at least one line".to_string(),
            ));
        }
        if receipts.iter().any(|r| r.quantity < 0) {
            return Err(ReconcileError::Validation(
                "received quantity cannot be negative".to_string(),
            ));
        }

        let receipts = &receipts;
        let order = with_retry(self.max_commit_attempts, "receive_purchase_order_lines", move || {
            self.try_receive(id, receipts)
        })
        .await?;

        info!(order = %id, status = order.status().as_str(), "purchase order receipt booked");
        Ok(order.status())
    }

    pub async fn get_purchase_order(&self, id: PurchaseOrderId) -> ReconcileResult<PurchaseOrder> {
        Ok(self.read_order(id).await?.value)
    }

    /// All orders, highest order number first.
    pub async fn list_purchase_orders(&self) -> ReconcileResult<Vec<PurchaseOrder>> {
        Ok(PURCHASE_ORDERS
            .list(&self.store, Some(OrderBy::desc("orderNumber")))
            .await?
            .into_iter()
            .map(|v| v.value)
            .collect())
    }

    async fn try_create_order(
        &self,
        id: PurchaseOrderId,
        draft: &PurchaseOrderDraft,
    ) -> ReconcileResult<PurchaseOrder> {
        let now = Utc::now();
        let ledger =
            LedgerSnapshot::read(&self.store, draft.lines.iter().map(|l| l.product_id)).await?;
        let lines = price_lines(&draft.lines, |product_id| {
            Ok(ledger.require(product_id)?.name().to_string())
        })?;

        let mut batch = WriteBatch::new();
        let number =
            reserve_number(&self.store, &self.numbering.purchase_order, now, &mut batch).await?;
        let order = PurchaseOrder::create(id, number, draft, lines, now)?;
        PURCHASE_ORDERS.put_entity(&mut batch, &order, ExpectedVersion::ABSENT)?;

        self.store.commit(batch).await?;
        Ok(order)
    }

    async fn try_update_lines(
        &self,
        id: PurchaseOrderId,
        inputs: &[OrderLineInput],
    ) -> ReconcileResult<PurchaseOrder> {
        let now = Utc::now();
        let current = self.read_order(id).await?;
        let ledger = LedgerSnapshot::read(&self.store, inputs.iter().map(|l| l.product_id)).await?;

        let lines = price_lines(inputs, |product_id| {
            match ledger.product(product_id) {
                Some(product) => Ok(product.name().to_string()),
                // Deleted since the order was placed: keep the old snapshot.
                None => current
                    .value
                    .lines()
                    .iter()
                    .find(|l| l.product_id() == product_id)
                    .map(|l| l.product_name().to_string())
                    .ok_or_else(|| ReconcileError::not_found(format!("product {product_id}"))),
            }
        })?;

        let mut order = current.value.clone();
        order.replace_lines(lines, now)?;
        PURCHASE_ORDERS
            .replace(&self.store, &current.id, &order, current.expected())
            .await?;
        Ok(order)
    }

    async fn try_receive(
        &self,
        id: PurchaseOrderId,
        receipts: &[ReceiptLine],
    ) -> ReconcileResult<PurchaseOrder> {
        let now = Utc::now();
        let current = self.read_order(id).await?;
        let mut order = current.value.clone();
        let effects = order.receive(receipts, now)?;

        let ledger = LedgerSnapshot::read(&self.store, effects.iter().map(|e| e.product_id)).await?;
        for effect in &effects {
            ledger.require(effect.product_id)?;
        }

        let plan = plan_effects(&ledger.quantities(), effects);
        trace_plan("receive_purchase_order_lines", &plan);

        let mut batch = WriteBatch::new();
        ledger.stage(&plan, &mut batch)?;
        PURCHASE_ORDERS.put(&mut batch, &current.id, &order, current.expected())?;

        self.store.commit(batch).await?;
        Ok(order)
    }

    async fn read_order(&self, id: PurchaseOrderId) -> ReconcileResult<Versioned<PurchaseOrder>> {
        PURCHASE_ORDERS
            .get(&self.store, &id.key())
            .await?
            .ok_or_else(|| ReconcileError::not_found(format!("purchase order {id}")))
    }
}

/// Number lines 1.. in input order and price them.
fn price_lines(
    inputs: &[OrderLineInput],
    mut name_of: impl FnMut(ProductId) -> ReconcileResult<String>,
) -> ReconcileResult<Vec<PurchaseOrderLine>> {
    inputs
        .iter()
        .enumerate()
        .map(|(idx, input)| -> ReconcileResult<PurchaseOrderLine> {
            let line_no = u32::try_from(idx + 1)
                .map_err(|_| ReconcileError::Validation("too many order lines".to_string()))?;
            let name = name_of(input.product_id)?;
            Ok(PurchaseOrderLine::ordered(line_no, input, name)?)
        })
        .collect()
}
