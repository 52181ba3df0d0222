//! Incoming/outgoing voucher flows.

use chrono::Utc;
use tracing::{info, instrument, warn};

use stockwise_core::{ExpectedVersion, NumberingScheme, ProductId, RecordId};
use stockwise_movements::{
    LineInput, MovementKind, MovementLine, MovementRecord, RecordMetadata, validate_line_inputs,
};
use stockwise_products::plan_effects;

use super::numbering::reserve_number;
use super::{ReconciliationCoordinator, trace_plan};
use crate::collections::MOVEMENTS;
use crate::document_store::{DocumentStore, OrderBy, Versioned, WriteBatch};
use crate::error::{ReconcileError, ReconcileResult};
use crate::ledger::LedgerSnapshot;
use crate::retry::with_retry;

impl<S> ReconciliationCoordinator<S>
where
    S: DocumentStore,
{
    /// Goods in: record an incoming voucher and add its quantities to stock.
    pub async fn record_incoming(
        &self,
        lines: Vec<LineInput>,
        metadata: RecordMetadata,
    ) -> ReconcileResult<RecordId> {
        self.record(MovementKind::Incoming, lines, metadata).await
    }

    /// Goods out: record an outgoing voucher and take its quantities from
    /// stock, flooring each product at zero.
    pub async fn record_outgoing(
        &self,
        lines: Vec<LineInput>,
        metadata: RecordMetadata,
    ) -> ReconcileResult<RecordId> {
        self.record(MovementKind::Outgoing, lines, metadata).await
    }

    /// Replace a voucher's lines and header.
    ///
    /// The old lines are fully reversed before the new ones apply. Products
    /// that no longer exist are skipped, not treated as errors.
    #[instrument(skip(self, lines, metadata), fields(record = %id, lines = lines.len()), err)]
    pub async fn edit_record(
        &self,
        id: RecordId,
        lines: Vec<LineInput>,
        metadata: RecordMetadata,
    ) -> ReconcileResult<()> {
        validate_line_inputs(&lines)?;
        metadata.validate()?;

        let (lines, metadata) = (&lines, &metadata);
        let record = with_retry(self.max_commit_attempts, "edit_record", move || {
            self.try_edit(id, lines, metadata)
        })
        .await?;

        info!(
            record = %id,
            number = %record.voucher_number(),
            total = record.total_amount(),
            "voucher edited"
        );
        Ok(())
    }

    /// Reverse a voucher's effect on stock and delete it.
    #[instrument(skip(self), fields(record = %id), err)]
    pub async fn delete_record(&self, id: RecordId) -> ReconcileResult<()> {
        with_retry(self.max_commit_attempts, "delete_record", move || {
            self.try_delete(id)
        })
        .await?;
        info!(record = %id, "voucher deleted");
        Ok(())
    }

    pub async fn get_record(&self, id: RecordId) -> ReconcileResult<MovementRecord> {
        Ok(self.read_record(id).await?.value)
    }

    /// All vouchers, newest first.
    pub async fn list_records(&self) -> ReconcileResult<Vec<MovementRecord>> {
        Ok(MOVEMENTS
            .list(&self.store, Some(OrderBy::desc("date")))
            .await?
            .into_iter()
            .map(|v| v.value)
            .collect())
    }

    #[instrument(skip(self, lines, metadata), fields(kind = kind.as_str(), lines = lines.len()), err)]
    async fn record(
        &self,
        kind: MovementKind,
        lines: Vec<LineInput>,
        metadata: RecordMetadata,
    ) -> ReconcileResult<RecordId> {
        validate_line_inputs(&lines)?;
        metadata.validate()?;

        let id = RecordId::new();
        let scheme = match kind {
            MovementKind::Incoming => &self.numbering.incoming,
            MovementKind::Outgoing => &self.numbering.outgoing,
        };
        let (lines, metadata) = (&lines, &metadata);
        let record = with_retry(self.max_commit_attempts, "record_movement", move || {
            self.try_record(id, kind, scheme, lines, metadata)
        })
        .await?;

        info!(
            record = %id,
            number = %record.voucher_number(),
            total = record.total_amount(),
            "voucher recorded"
        );
        Ok(id)
    }

    async fn try_record(
        &self,
        id: RecordId,
        kind: MovementKind,
        scheme: &NumberingScheme,
        lines: &[LineInput],
        metadata: &RecordMetadata,
    ) -> ReconcileResult<MovementRecord> {
        let now = Utc::now();
        let ledger = LedgerSnapshot::read(&self.store, lines.iter().map(|l| l.product_id)).await?;

        // On creation every referenced product must exist.
        let priced = lines
            .iter()
            .map(|line| -> ReconcileResult<MovementLine> {
                let product = ledger.require(line.product_id)?;
                Ok(MovementLine::priced(line, product.name())?)
            })
            .collect::<ReconcileResult<Vec<_>>>()?;

        let mut batch = WriteBatch::new();
        let number = reserve_number(&self.store, scheme, now, &mut batch).await?;
        let record = MovementRecord::create(id, kind, number, metadata.clone(), priced, now)?;

        let plan = plan_effects(&ledger.quantities(), record.effects());
        trace_plan("record_movement", &plan);
        ledger.stage(&plan, &mut batch)?;
        MOVEMENTS.put_entity(&mut batch, &record, ExpectedVersion::ABSENT)?;

        self.store.commit(batch).await?;
        Ok(record)
    }

    async fn try_edit(
        &self,
        id: RecordId,
        lines: &[LineInput],
        metadata: &RecordMetadata,
    ) -> ReconcileResult<MovementRecord> {
        let now = Utc::now();
        let current = self.read_record(id).await?;
        let old = &current.value;

        let referenced = old
            .lines()
            .iter()
            .map(MovementLine::product_id)
            .chain(lines.iter().map(|l| l.product_id));
        let ledger = LedgerSnapshot::read(&self.store, referenced).await?;

        let priced = lines
            .iter()
            .map(|line| -> ReconcileResult<MovementLine> {
                let name = match ledger.product(line.product_id) {
                    Some(product) => product.name().to_string(),
                    None => previous_name(old, line.product_id),
                };
                Ok(MovementLine::priced(line, name)?)
            })
            .collect::<ReconcileResult<Vec<_>>>()?;
        let revised = old.revise(metadata.clone(), priced, now)?;

        let plan = plan_effects(
            &ledger.quantities(),
            old.reversal().into_iter().chain(revised.effects()),
        );
        trace_plan("edit_record", &plan);

        let mut batch = WriteBatch::new();
        ledger.stage(&plan, &mut batch)?;
        MOVEMENTS.put(&mut batch, &current.id, &revised, current.expected())?;

        self.store.commit(batch).await?;
        Ok(revised)
    }

    async fn try_delete(&self, id: RecordId) -> ReconcileResult<()> {
        let current = self.read_record(id).await?;
        let referenced = current.value.lines().iter().map(MovementLine::product_id);
        let ledger = LedgerSnapshot::read(&self.store, referenced).await?;

        let plan = plan_effects(&ledger.quantities(), current.value.reversal());
        trace_plan("delete_record", &plan);

        let mut batch = WriteBatch::new();
        ledger.stage(&plan, &mut batch)?;
        MOVEMENTS.delete(&mut batch, &current.id, current.expected());

        self.store.commit(batch).await?;
        Ok(())
    }

    async fn read_record(&self, id: RecordId) -> ReconcileResult<Versioned<MovementRecord>> {
        MOVEMENTS
            .get(&self.store, &id.key())
            .await?
            .ok_or_else(|| ReconcileError::not_found(format!("movement record {id}")))
    }
}

/// Name snapshot for a line whose product has since been deleted.
fn previous_name(record: &MovementRecord, product_id: ProductId) -> String {
    match record.lines().iter().find(|l| l.product_id() == product_id) {
        Some(line) => line.product_name().to_string(),
        None => {
            warn!(product = %product_id, "unknown product on edited voucher line");
            String::new()
        }
    }
}
