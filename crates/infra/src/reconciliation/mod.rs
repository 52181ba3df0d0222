//! Reconciliation Coordinator.
//!
//! Turns a voucher create/edit/delete, or a purchase-order receipt, into one
//! atomic batch holding the Product Ledger adjustments and the document
//! write.
//!
//! ## Execution flow (one attempt)
//!
//! ```text
//! validate inputs (no IO)
//!   ↓
//! read the current document + every referenced product (with versions)
//!   ↓
//! plan: reversal effects first, then new effects, clamped at zero per step
//!   ↓
//! stage product writes + document write, each guarded by the version read
//!   ↓
//! commit the batch (all-or-nothing)
//! ```
//!
//! A version conflict at commit means another writer got in between the read
//! and the commit; the attempt is thrown away and the whole flow re-runs from
//! the read, up to `reconciliation.max_commit_attempts` times.

mod numbering;
mod purchasing;
mod vouchers;

use tracing::{debug, warn};

use stockwise_products::EffectPlan;

use crate::config::{NumberingSchemes, StockwiseConfig};
use crate::error::{ReconcileError, ReconcileResult};

#[derive(Debug)]
pub struct ReconciliationCoordinator<S> {
    store: S,
    max_commit_attempts: u32,
    numbering: NumberingSchemes,
}

impl<S> ReconciliationCoordinator<S> {
    /// Coordinator with the default configuration.
    pub fn new(store: S) -> ReconcileResult<Self> {
        Self::with_config(store, &StockwiseConfig::default())
    }

    pub fn with_config(store: S, config: &StockwiseConfig) -> ReconcileResult<Self> {
        let numbering = config
            .numbering_schemes()
            .map_err(|e| ReconcileError::Validation(e.to_string()))?;
        Ok(Self {
            store,
            max_commit_attempts: config.reconciliation.max_commit_attempts.max(1),
            numbering,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

/// Log what a plan is about to do to the ledger.
fn trace_plan(operation: &'static str, plan: &EffectPlan) {
    for adjustment in plan.adjustments() {
        debug!(
            operation,
            product = %adjustment.product_id,
            before = adjustment.before,
            after = adjustment.after,
            "planned ledger adjustment"
        );
        if adjustment.clamped() {
            warn!(
                operation,
                product = %adjustment.product_id,
                before = adjustment.before,
                after = adjustment.after,
                "stock clamped at zero"
            );
        }
    }
    for skipped in plan.skipped() {
        warn!(
            operation,
            product = %skipped.product_id,
            delta = skipped.delta,
            "product missing from ledger, adjustment skipped"
        );
    }
}
