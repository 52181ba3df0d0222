//! Bindings of [`FilteredView`](crate::FilteredView) for the list screens:
//! products, stock vouchers and purchase orders.

use chrono::{DateTime, Utc};

use stockwise_movements::{MovementKind, MovementRecord};
use stockwise_products::Product;
use stockwise_purchasing::{PurchaseOrder, ReceiptStatus};

use crate::filter::Filter;
use crate::sort::{SortDirection, SortKey, SortValue, Sortable};

/// Filter slot names shared by the screens.
pub mod slots {
    pub const SEARCH: &str = "search";
    pub const STOCK: &str = "stock";
    pub const KIND: &str = "kind";
    pub const COUNTERPARTY: &str = "counterparty";
    pub const DATE: &str = "date";
    pub const AMOUNT: &str = "amount";
    pub const STATUS: &str = "status";
}

// ---------------------------------------------------------------- products

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductSortKey {
    Name,
    Quantity,
    UnitPrice,
}

impl SortKey for ProductSortKey {}

impl Sortable<ProductSortKey> for Product {
    fn sort_value(&self, key: ProductSortKey) -> SortValue {
        match key {
            ProductSortKey::Name => SortValue::text(Some(self.name())),
            ProductSortKey::Quantity => SortValue::number(Some(self.quantity())),
            ProductSortKey::UnitPrice => SortValue::number(Some(self.unit_price())),
        }
    }
}

/// Stock-level selector of the products screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLevel {
    All,
    /// Out of stock ("rupture"): quantity is zero.
    OutOfStock,
    /// In stock but at or below the threshold.
    Low { threshold: i64 },
    /// Above the threshold.
    InStock { threshold: i64 },
}

pub fn stock_filter(level: StockLevel) -> Filter<Product> {
    match level {
        StockLevel::All => Filter::none(),
        StockLevel::OutOfStock => Filter::new(|p: &Product| p.quantity() == 0),
        StockLevel::Low { threshold } => {
            Filter::new(move |p: &Product| p.quantity() > 0 && p.quantity() <= threshold)
        }
        StockLevel::InStock { threshold } => {
            Filter::new(move |p: &Product| p.quantity() > threshold)
        }
    }
}

pub fn product_search(term: &str) -> Filter<Product> {
    Filter::text(term, |p: &Product| vec![p.name(), p.description()])
}

// ---------------------------------------------------------------- vouchers

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementSortKey {
    Date,
    Number,
    Counterparty,
    Amount,
}

impl SortKey for MovementSortKey {
    fn default_direction(self) -> SortDirection {
        match self {
            MovementSortKey::Date => SortDirection::Descending,
            _ => SortDirection::Ascending,
        }
    }
}

impl Sortable<MovementSortKey> for MovementRecord {
    fn sort_value(&self, key: MovementSortKey) -> SortValue {
        match key {
            MovementSortKey::Date => SortValue::number(Some(self.date().timestamp_millis())),
            MovementSortKey::Number => SortValue::text(Some(self.voucher_number().as_str())),
            MovementSortKey::Counterparty => SortValue::text(Some(self.counterparty_name())),
            MovementSortKey::Amount => SortValue::number(Some(self.total_amount())),
        }
    }
}

/// Matches the voucher number or the counterparty name.
pub fn movement_search(term: &str) -> Filter<MovementRecord> {
    Filter::text(term, |r: &MovementRecord| {
        vec![r.voucher_number().as_str(), r.counterparty_name()]
    })
}

pub fn movement_kind(kind: Option<MovementKind>) -> Filter<MovementRecord> {
    Filter::equals(kind, |r: &MovementRecord| r.kind())
}

pub fn movement_counterparty(name: Option<String>) -> Filter<MovementRecord> {
    Filter::equals(name, |r: &MovementRecord| r.counterparty_name().to_string())
}

pub fn movement_dates(
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Filter<MovementRecord> {
    Filter::within(from, to, |r: &MovementRecord| r.date())
}

pub fn movement_amount(min: Option<i64>, max: Option<i64>) -> Filter<MovementRecord> {
    Filter::between(min, max, |r: &MovementRecord| r.total_amount())
}

pub fn movement_status(status: Option<String>) -> Filter<MovementRecord> {
    Filter::equals(status, |r: &MovementRecord| r.status().to_string())
}

// ---------------------------------------------------------- purchase orders

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOrderSortKey {
    OrderNumber,
    Date,
    Supplier,
    Amount,
}

impl SortKey for PurchaseOrderSortKey {
    fn default_direction(self) -> SortDirection {
        match self {
            PurchaseOrderSortKey::OrderNumber | PurchaseOrderSortKey::Date => {
                SortDirection::Descending
            }
            _ => SortDirection::Ascending,
        }
    }
}

impl Sortable<PurchaseOrderSortKey> for PurchaseOrder {
    fn sort_value(&self, key: PurchaseOrderSortKey) -> SortValue {
        match key {
            PurchaseOrderSortKey::OrderNumber => SortValue::text(Some(self.order_number().as_str())),
            PurchaseOrderSortKey::Date => SortValue::number(Some(self.date().timestamp_millis())),
            PurchaseOrderSortKey::Supplier => SortValue::text(Some(self.supplier_id())),
            PurchaseOrderSortKey::Amount => SortValue::number(Some(self.total_amount())),
        }
    }
}

pub fn order_search(term: &str) -> Filter<PurchaseOrder> {
    Filter::text(term, |o: &PurchaseOrder| vec![o.order_number().as_str(), o.notes()])
}

pub fn order_supplier(supplier_id: Option<String>) -> Filter<PurchaseOrder> {
    Filter::equals(supplier_id, |o: &PurchaseOrder| o.supplier_id().to_string())
}

pub fn order_status(status: Option<ReceiptStatus>) -> Filter<PurchaseOrder> {
    Filter::equals(status, |o: &PurchaseOrder| o.status())
}
