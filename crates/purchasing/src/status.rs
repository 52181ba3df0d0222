//! Receipt status derivation.

use serde::{Deserialize, Serialize};

use crate::order::PurchaseOrderLine;

/// Purchase order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Pending,
    Partial,
    Received,
    Cancelled,
}

impl ReceiptStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReceiptStatus::Pending => "pending",
            ReceiptStatus::Partial => "partial",
            ReceiptStatus::Received => "received",
            ReceiptStatus::Cancelled => "cancelled",
        }
    }
}

/// Status implied by `lines`, given the order's `current` status.
///
/// - `cancelled` is sticky and never overridden.
/// - No lines: `pending` (an empty order is never auto-received).
/// - Every line fully received: `received`.
/// - Some quantity received on any line: `partial`.
/// - Otherwise: `pending`.
pub fn derive_status(current: ReceiptStatus, lines: &[PurchaseOrderLine]) -> ReceiptStatus {
    if current == ReceiptStatus::Cancelled {
        return ReceiptStatus::Cancelled;
    }
    if lines.is_empty() {
        return ReceiptStatus::Pending;
    }
    if lines
        .iter()
        .all(|l| l.quantity_received() >= l.quantity_ordered())
    {
        ReceiptStatus::Received
    } else if lines.iter().any(|l| l.quantity_received() > 0) {
        ReceiptStatus::Partial
    } else {
        ReceiptStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderLineInput;
    use stockwise_core::ProductId;

    fn line(ordered: i64, received: i64) -> PurchaseOrderLine {
        let mut l = PurchaseOrderLine::ordered(
            1,
            &OrderLineInput::new(ProductId::new(), ordered, 100),
            "part",
        )
        .unwrap();
        l.set_received_for_test(received);
        l
    }

    #[test]
    fn fully_received_line_derives_received() {
        assert_eq!(
            derive_status(ReceiptStatus::Pending, &[line(10, 10)]),
            ReceiptStatus::Received
        );
    }

    #[test]
    fn partially_received_line_derives_partial() {
        assert_eq!(
            derive_status(ReceiptStatus::Pending, &[line(10, 4)]),
            ReceiptStatus::Partial
        );
    }

    #[test]
    fn nothing_received_stays_pending() {
        assert_eq!(
            derive_status(ReceiptStatus::Pending, &[line(10, 0)]),
            ReceiptStatus::Pending
        );
    }

    #[test]
    fn one_open_line_keeps_order_partial() {
        assert_eq!(
            derive_status(ReceiptStatus::Pending, &[line(5, 5), line(3, 0)]),
            ReceiptStatus::Partial
        );
    }

    #[test]
    fn cancelled_is_sticky() {
        assert_eq!(
            derive_status(ReceiptStatus::Cancelled, &[line(10, 10)]),
            ReceiptStatus::Cancelled
        );
    }

    #[test]
    fn empty_order_is_pending() {
        assert_eq!(derive_status(ReceiptStatus::Received, &[]), ReceiptStatus::Pending);
    }
}
