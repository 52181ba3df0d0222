//! Movement records: incoming and outgoing stock vouchers.
//!
//! This crate holds the voucher document model and its validation rules as
//! deterministic domain logic (no IO, no storage). The ledger effect of a
//! voucher is expressed as [`stockwise_products::StockEffect`]s so that the
//! reconciliation flows can plan create, edit and delete the same way.

pub mod line;
pub mod record;

pub use line::{LineInput, MovementLine, validate_line_inputs};
pub use record::{MovementKind, MovementRecord, RecordMetadata};
