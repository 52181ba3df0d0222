//! `stockwise-core`: domain building blocks shared by every crate.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod numbering;
pub mod version;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{ProductId, PurchaseOrderId, RecordId};
pub use numbering::{DocumentNumber, NumberingScheme, Period};
pub use version::ExpectedVersion;
