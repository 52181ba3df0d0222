//! The collections the reconciliation engine reads and writes.

use serde::{Deserialize, Serialize};

use stockwise_movements::MovementRecord;
use stockwise_products::Product;
use stockwise_purchasing::PurchaseOrder;

use crate::document_store::Collection;

/// The Product Ledger.
pub const PRODUCTS: Collection<Product> = Collection::new("products");

/// Incoming and outgoing stock vouchers.
pub const MOVEMENTS: Collection<MovementRecord> = Collection::new("movements");

pub const PURCHASE_ORDERS: Collection<PurchaseOrder> = Collection::new("purchase_orders");

/// Document-number sequences, one document per prefix and period
/// (e.g. `SRT-20260307`).
pub const COUNTERS: Collection<Counter> = Collection::new("counters");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    /// Last sequence number handed out.
    pub last: u64,
}
