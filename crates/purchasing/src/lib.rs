//! Purchasing domain module (purchase orders and goods receipts).
//!
//! Business rules for purchase orders, implemented purely as deterministic
//! domain logic (no IO, no storage). An order's status is never set by
//! callers directly: it is derived from the lines by [`derive_status`] after
//! every line mutation, except for the sticky `cancelled` state.

pub mod order;
pub mod status;

pub use order::{
    OrderLineInput, PurchaseOrder, PurchaseOrderDraft, PurchaseOrderLine, ReceiptLine,
};
pub use status::{ReceiptStatus, derive_status};
