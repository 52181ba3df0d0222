//! Infrastructure layer: document store, product ledger, reconciliation,
//! configuration and store-backed views.

pub mod collections;
pub mod config;
pub mod document_store;
pub mod error;
pub mod ledger;
pub mod live_view;
pub mod reconciliation;

mod retry;

mod integration_tests;

pub use collections::{COUNTERS, Counter, MOVEMENTS, PRODUCTS, PURCHASE_ORDERS};
pub use crate::config::{ConfigError, StockwiseConfig};
pub use document_store::{
    Collection, CommitReceipt, DocumentStore, InMemoryDocumentStore, OrderBy, StoreError,
    StoredDocument, Versioned, WriteBatch, WriteOp,
};
pub use error::{ReconcileError, ReconcileResult};
pub use ledger::ProductLedger;
pub use live_view::LiveView;
pub use reconciliation::ReconciliationCoordinator;
