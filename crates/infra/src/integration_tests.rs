//! Integration tests for the full reconciliation pipeline.
//!
//! Tests: Coordinator → DocumentStore batch → Product Ledger → LiveView
//!
//! Verifies:
//! - Ledger quantities follow voucher create/edit/delete, clamped at zero
//! - Failed or conflicting commits leave no partial state
//! - Purchase-order receipts book stock and derive status

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use stockwise_core::{ExpectedVersion, ProductId, PurchaseOrderId};
    use stockwise_movements::{LineInput, MovementKind, RecordMetadata};
    use stockwise_products::{NewProduct, Product};
    use stockwise_purchasing::{OrderLineInput, PurchaseOrderDraft, ReceiptLine, ReceiptStatus};
    use stockwise_observability::LogFormat;
    use stockwise_views::FilteredView;
    use stockwise_views::screens::{ProductSortKey, StockLevel, slots, stock_filter};

    use crate::collections::{COUNTERS, MOVEMENTS, PRODUCTS};
    use crate::config::{ReconciliationConfig, StockwiseConfig};
    use crate::document_store::{DocumentStore, InMemoryDocumentStore, WriteBatch};
    use crate::error::ReconcileError;
    use crate::ledger::ProductLedger;
    use crate::live_view::LiveView;
    use crate::reconciliation::ReconciliationCoordinator;

    type Store = Arc<InMemoryDocumentStore>;

    struct Harness {
        store: Store,
        ledger: ProductLedger<Store>,
        coordinator: ReconciliationCoordinator<Store>,
    }

    fn setup() -> Harness {
        setup_with(&StockwiseConfig::default())
    }

    fn setup_with(config: &StockwiseConfig) -> Harness {
        stockwise_observability::tracing::init(LogFormat::Pretty, "warn");
        let store = Arc::new(InMemoryDocumentStore::new());
        Harness {
            ledger: ProductLedger::with_config(store.clone(), config),
            coordinator: ReconciliationCoordinator::with_config(store.clone(), config).unwrap(),
            store,
        }
    }

    impl Harness {
        async fn product(&self, name: &str, quantity: i64) -> ProductId {
            self.ledger
                .create_product(NewProduct {
                    name: name.to_string(),
                    unit_price: 150,
                    quantity,
                    description: String::new(),
                })
                .await
                .unwrap()
                .id_typed()
        }

        async fn quantity(&self, id: ProductId) -> i64 {
            self.ledger.get(id).await.unwrap().quantity()
        }

        /// Another writer adds `delta` to a product right before the next commit.
        async fn interleave_stock_change(&self, id: ProductId, delta: i64) {
            let mut product = self.ledger.get(id).await.unwrap();
            product.apply_delta(delta);
            let mut batch = WriteBatch::new();
            PRODUCTS
                .put(&mut batch, &id.key(), &product, ExpectedVersion::Any)
                .unwrap();
            self.store.interleave_before_next_commit(batch);
        }
    }

    fn meta(counterparty: &str) -> RecordMetadata {
        RecordMetadata::new(Utc::now(), counterparty)
    }

    fn line(product: ProductId, quantity: i64) -> LineInput {
        LineInput::new(product, quantity, 150)
    }

    #[tokio::test]
    async fn outgoing_voucher_clamps_and_edit_is_clamp_aware() {
        let h = setup();
        let p = h.product("Bolt", 5).await;

        let id = h
            .coordinator
            .record_outgoing(vec![line(p, 8)], meta("ACME"))
            .await
            .unwrap();
        assert_eq!(h.quantity(p).await, 0);

        // Reversal gives back the full 8 (0 + 8), then 2 go out: 6, not 3.
        h.coordinator
            .edit_record(id, vec![line(p, 2)], meta("ACME"))
            .await
            .unwrap();
        assert_eq!(h.quantity(p).await, 6);
    }

    #[tokio::test]
    async fn round_trip_without_clamp_is_net_zero() {
        let h = setup();
        let p = h.product("Bolt", 20).await;

        let id = h
            .coordinator
            .record_outgoing(vec![line(p, 5)], meta("ACME"))
            .await
            .unwrap();
        assert_eq!(h.quantity(p).await, 15);

        h.coordinator
            .edit_record(id, vec![line(p, 7)], meta("ACME"))
            .await
            .unwrap();
        assert_eq!(h.quantity(p).await, 13);

        h.coordinator
            .edit_record(id, vec![line(p, 5)], meta("ACME"))
            .await
            .unwrap();
        h.coordinator.delete_record(id).await.unwrap();
        assert_eq!(h.quantity(p).await, 20);
    }

    #[tokio::test]
    async fn round_trip_through_a_clamp_is_not_net_zero() {
        let h = setup();
        let p = h.product("Bolt", 5).await;

        let id = h
            .coordinator
            .record_outgoing(vec![line(p, 8)], meta("ACME"))
            .await
            .unwrap();
        h.coordinator.delete_record(id).await.unwrap();

        assert_eq!(h.quantity(p).await, 8);
    }

    #[tokio::test]
    async fn incoming_voucher_adds_and_delete_reverses() {
        let h = setup();
        let p = h.product("Nut", 2).await;

        let id = h
            .coordinator
            .record_incoming(vec![line(p, 10)], meta("Supplier"))
            .await
            .unwrap();
        assert_eq!(h.quantity(p).await, 12);

        h.coordinator.delete_record(id).await.unwrap();
        assert_eq!(h.quantity(p).await, 2);
        assert!(matches!(
            h.coordinator.get_record(id).await,
            Err(ReconcileError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn totals_hold_after_create_and_after_edit() {
        let h = setup();
        let a = h.product("A", 50).await;
        let b = h.product("B", 50).await;

        let id = h
            .coordinator
            .record_outgoing(
                vec![LineInput::new(a, 2, 1_000), LineInput::new(b, 3, 250)],
                meta("ACME"),
            )
            .await
            .unwrap();
        let created = h.coordinator.get_record(id).await.unwrap();
        assert_eq!(created.total_amount(), 2_750);
        assert!(created.totals_consistent());
        assert_eq!(created.lines()[0].product_name(), "A");

        h.coordinator
            .edit_record(id, vec![LineInput::new(b, 1, 999)], meta("Other"))
            .await
            .unwrap();
        let edited = h.coordinator.get_record(id).await.unwrap();
        assert_eq!(edited.total_amount(), 999);
        assert!(edited.totals_consistent());
        assert_eq!(edited.voucher_number(), created.voucher_number());
        assert_eq!(edited.created_at(), created.created_at());
        assert!(edited.updated_at().is_some());
        assert_eq!(edited.counterparty_name(), "Other");

        assert_eq!(h.quantity(a).await, 50);
        assert_eq!(h.quantity(b).await, 49);
    }

    #[tokio::test]
    async fn several_lines_for_one_product_apply_in_order() {
        let h = setup();
        let p = h.product("Bolt", 3).await;

        h.coordinator
            .record_outgoing(vec![line(p, 5), line(p, 1)], meta("ACME"))
            .await
            .unwrap();
        assert_eq!(h.quantity(p).await, 0);
    }

    #[tokio::test]
    async fn missing_product_on_create_is_not_found_and_writes_nothing() {
        let h = setup();
        let known = h.product("Bolt", 5).await;

        let err = h
            .coordinator
            .record_outgoing(vec![line(known, 1), line(ProductId::new(), 1)], meta("ACME"))
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::NotFound(_)));
        assert_eq!(h.quantity(known).await, 5);
        assert_eq!(h.store.document_count(MOVEMENTS.name()), 0);
        assert_eq!(h.store.document_count(COUNTERS.name()), 0);
    }

    #[tokio::test]
    async fn missing_product_on_delete_is_skipped() {
        let h = setup();
        let kept = h.product("Bolt", 0).await;
        let gone = h.product("Washer", 0).await;

        let id = h
            .coordinator
            .record_incoming(vec![line(kept, 4), line(gone, 6)], meta("Supplier"))
            .await
            .unwrap();
        h.ledger.delete_product(gone).await.unwrap();

        h.coordinator.delete_record(id).await.unwrap();
        assert_eq!(h.quantity(kept).await, 0);
        assert_eq!(h.store.document_count(MOVEMENTS.name()), 0);
        assert!(matches!(h.ledger.get(gone).await, Err(ReconcileError::NotFound(_))));
    }

    #[tokio::test]
    async fn edit_keeps_name_snapshot_of_deleted_product() {
        let h = setup();
        let kept = h.product("Bolt", 10).await;
        let gone = h.product("Washer", 10).await;

        let id = h
            .coordinator
            .record_outgoing(vec![line(kept, 1), line(gone, 1)], meta("ACME"))
            .await
            .unwrap();
        h.ledger.delete_product(gone).await.unwrap();

        h.coordinator
            .edit_record(id, vec![line(kept, 2), line(gone, 2)], meta("ACME"))
            .await
            .unwrap();

        let record = h.coordinator.get_record(id).await.unwrap();
        assert_eq!(record.lines()[1].product_name(), "Washer");
        assert_eq!(h.quantity(kept).await, 8);
    }

    #[tokio::test]
    async fn validation_fails_before_any_io() {
        let h = setup();
        let p = h.product("Bolt", 5).await;

        // Armed failure stays armed because nothing reaches the store.
        h.store.fail_next_commit("should not be consumed");
        let err = h
            .coordinator
            .record_outgoing(vec![], meta("ACME"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Validation(_)));

        let err = h
            .coordinator
            .record_outgoing(vec![line(p, 1)], meta("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Validation(_)));

        let err = h
            .coordinator
            .record_incoming(vec![LineInput::new(p, 1, -5)], meta("ACME"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Validation(_)));

        let err = h
            .coordinator
            .record_outgoing(vec![line(p, 1)], meta("ACME"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::CommitFailure(_)));
    }

    #[tokio::test]
    async fn failed_commit_leaves_no_partial_state() {
        let h = setup();
        let p = h.product("Bolt", 5).await;
        let id = h
            .coordinator
            .record_outgoing(vec![line(p, 2)], meta("ACME"))
            .await
            .unwrap();

        h.store.fail_next_commit("network down");
        let err = h
            .coordinator
            .edit_record(id, vec![line(p, 4)], meta("ACME"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::CommitFailure(_)));

        assert_eq!(h.quantity(p).await, 3);
        let record = h.coordinator.get_record(id).await.unwrap();
        assert_eq!(record.lines()[0].quantity(), 2);
        assert!(record.updated_at().is_none());
    }

    #[tokio::test]
    async fn concurrent_stock_change_is_retried_not_lost() {
        let h = setup();
        let p = h.product("Bolt", 10).await;

        h.interleave_stock_change(p, 5).await;
        h.coordinator
            .record_outgoing(vec![line(p, 3)], meta("ACME"))
            .await
            .unwrap();

        assert_eq!(h.quantity(p).await, 12);
    }

    #[tokio::test]
    async fn persistent_conflicts_surface_as_concurrent_modification() {
        let config = StockwiseConfig {
            reconciliation: ReconciliationConfig {
                max_commit_attempts: 2,
            },
            ..StockwiseConfig::default()
        };
        let h = setup_with(&config);
        let p = h.product("Bolt", 10).await;

        h.interleave_stock_change(p, 1).await;
        h.interleave_stock_change(p, 1).await;
        let err = h
            .coordinator
            .record_outgoing(vec![line(p, 3)], meta("ACME"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::ConcurrentModification { attempts: 2, .. }
        ));
        assert_eq!(h.store.document_count(MOVEMENTS.name()), 0);
        // Both interleaved writers landed; ours did not.
        assert_eq!(h.quantity(p).await, 11);
    }

    #[tokio::test]
    async fn voucher_numbers_are_sequential_per_prefix() {
        let h = setup();
        let p = h.product("Bolt", 100).await;

        let mut numbers = Vec::new();
        for _ in 0..2 {
            let id = h
                .coordinator
                .record_outgoing(vec![line(p, 1)], meta("ACME"))
                .await
                .unwrap();
            numbers.push(h.coordinator.get_record(id).await.unwrap());
        }
        let incoming = h
            .coordinator
            .record_incoming(vec![line(p, 1)], meta("Supplier"))
            .await
            .unwrap();
        let incoming = h.coordinator.get_record(incoming).await.unwrap();

        let today = Utc::now().format("%Y%m%d").to_string();
        assert_eq!(numbers[0].voucher_number().as_str(), format!("SRT-{today}-001"));
        assert_eq!(numbers[1].voucher_number().as_str(), format!("SRT-{today}-002"));
        assert_eq!(incoming.voucher_number().as_str(), format!("ENT-{today}-001"));
        assert_eq!(incoming.kind(), MovementKind::Incoming);

        let listed = h.coordinator.list_records().await.unwrap();
        assert_eq!(listed.len(), 3);
    }

    async fn order(h: &Harness, lines: Vec<OrderLineInput>) -> PurchaseOrderId {
        h.coordinator
            .create_purchase_order(PurchaseOrderDraft {
                date: Utc::now(),
                supplier_id: "supplier-1".to_string(),
                expected_delivery_date: None,
                lines,
                notes: String::new(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn receipts_book_stock_and_derive_status() {
        let h = setup();
        let p = h.product("Bolt", 0).await;
        let id = order(&h, vec![OrderLineInput::new(p, 10, 100)]).await;

        let created = h.coordinator.get_purchase_order(id).await.unwrap();
        assert_eq!(created.status(), ReceiptStatus::Pending);
        assert_eq!(created.total_amount(), 1_000);
        assert!(created.order_number().as_str().starts_with("PO-"));

        let status = h
            .coordinator
            .receive_purchase_order_lines(id, vec![ReceiptLine::new(1, 4)])
            .await
            .unwrap();
        assert_eq!(status, ReceiptStatus::Partial);
        assert_eq!(h.quantity(p).await, 4);

        let status = h
            .coordinator
            .receive_purchase_order_lines(id, vec![ReceiptLine::new(1, 6)])
            .await
            .unwrap();
        assert_eq!(status, ReceiptStatus::Received);
        assert_eq!(h.quantity(p).await, 10);
        assert!(h.coordinator.get_purchase_order(id).await.unwrap().received_date().is_some());

        let err = h
            .coordinator
            .receive_purchase_order_lines(id, vec![ReceiptLine::new(1, 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::InvariantViolation(_)));
        assert_eq!(h.quantity(p).await, 10);
    }

    #[tokio::test]
    async fn cancelled_order_is_never_auto_transitioned() {
        let h = setup();
        let p = h.product("Bolt", 0).await;
        let id = order(&h, vec![OrderLineInput::new(p, 10, 100)]).await;

        h.coordinator.cancel_purchase_order(id).await.unwrap();
        let status = h
            .coordinator
            .receive_purchase_order_lines(id, vec![ReceiptLine::new(1, 10)])
            .await
            .unwrap();

        assert_eq!(status, ReceiptStatus::Cancelled);
        assert_eq!(h.quantity(p).await, 10);
    }

    #[tokio::test]
    async fn updating_lines_keeps_received_quantities() {
        let h = setup();
        let a = h.product("A", 0).await;
        let b = h.product("B", 0).await;
        let id = order(&h, vec![OrderLineInput::new(a, 4, 100)]).await;

        h.coordinator
            .receive_purchase_order_lines(id, vec![ReceiptLine::new(1, 4)])
            .await
            .unwrap();

        let status = h
            .coordinator
            .update_purchase_order_lines(
                id,
                vec![OrderLineInput::new(a, 4, 100), OrderLineInput::new(b, 2, 50)],
            )
            .await
            .unwrap();
        assert_eq!(status, ReceiptStatus::Partial);

        let updated = h.coordinator.get_purchase_order(id).await.unwrap();
        assert_eq!(updated.lines()[0].quantity_received(), 4);
        assert_eq!(updated.total_amount(), 500);
    }

    #[tokio::test]
    async fn removing_a_line_keeps_receipts_with_their_product() {
        let h = setup();
        let a = h.product("A", 0).await;
        let b = h.product("B", 0).await;
        let id = order(
            &h,
            vec![OrderLineInput::new(a, 10, 100), OrderLineInput::new(b, 10, 100)],
        )
        .await;
        h.coordinator
            .receive_purchase_order_lines(id, vec![ReceiptLine::new(2, 4)])
            .await
            .unwrap();

        let status = h
            .coordinator
            .update_purchase_order_lines(id, vec![OrderLineInput::new(b, 10, 100)])
            .await
            .unwrap();
        assert_eq!(status, ReceiptStatus::Partial);

        let updated = h.coordinator.get_purchase_order(id).await.unwrap();
        assert_eq!(updated.lines().len(), 1);
        assert_eq!(updated.lines()[0].product_id(), b);
        assert_eq!(updated.lines()[0].quantity_received(), 4);
        assert_eq!(h.quantity(b).await, 4);
    }

    #[tokio::test]
    async fn dropping_a_received_line_is_rejected() {
        let h = setup();
        let a = h.product("A", 0).await;
        let b = h.product("B", 0).await;
        let id = order(
            &h,
            vec![OrderLineInput::new(a, 10, 100), OrderLineInput::new(b, 10, 100)],
        )
        .await;
        h.coordinator
            .receive_purchase_order_lines(id, vec![ReceiptLine::new(1, 10)])
            .await
            .unwrap();
        let before = h.coordinator.get_purchase_order(id).await.unwrap();

        let err = h
            .coordinator
            .update_purchase_order_lines(id, vec![OrderLineInput::new(b, 10, 100)])
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::InvariantViolation(_)));
        assert_eq!(h.coordinator.get_purchase_order(id).await.unwrap(), before);
        assert_eq!(h.quantity(b).await, 0);
    }

    #[tokio::test]
    async fn reordering_lines_moves_receipts_with_the_product() {
        let h = setup();
        let a = h.product("A", 0).await;
        let b = h.product("B", 0).await;
        let id = order(
            &h,
            vec![OrderLineInput::new(a, 10, 100), OrderLineInput::new(b, 5, 100)],
        )
        .await;
        h.coordinator
            .receive_purchase_order_lines(id, vec![ReceiptLine::new(2, 5)])
            .await
            .unwrap();

        h.coordinator
            .update_purchase_order_lines(
                id,
                vec![OrderLineInput::new(b, 5, 100), OrderLineInput::new(a, 10, 100)],
            )
            .await
            .unwrap();

        let updated = h.coordinator.get_purchase_order(id).await.unwrap();
        let received: Vec<_> = updated
            .lines()
            .iter()
            .map(|l| (l.product_id(), l.quantity_received()))
            .collect();
        assert_eq!(received, vec![(b, 5), (a, 0)]);
        assert_eq!(updated.status(), ReceiptStatus::Partial);

        // Line 2 is now A; receiving it books A, not B.
        h.coordinator
            .receive_purchase_order_lines(id, vec![ReceiptLine::new(2, 10)])
            .await
            .unwrap();
        assert_eq!(h.quantity(a).await, 10);
        assert_eq!(h.quantity(b).await, 5);
    }

    #[tokio::test]
    async fn shrinking_a_line_below_received_is_rejected() {
        let h = setup();
        let p = h.product("Bolt", 0).await;
        let id = order(&h, vec![OrderLineInput::new(p, 10, 100)]).await;
        h.coordinator
            .receive_purchase_order_lines(id, vec![ReceiptLine::new(1, 6)])
            .await
            .unwrap();

        let err = h
            .coordinator
            .update_purchase_order_lines(id, vec![OrderLineInput::new(p, 5, 100)])
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::InvariantViolation(_)));
        let unchanged = h.coordinator.get_purchase_order(id).await.unwrap();
        assert_eq!(unchanged.lines()[0].quantity_ordered(), 10);
        assert_eq!(unchanged.lines()[0].quantity_received(), 6);
    }

    #[tokio::test]
    async fn deleting_an_order_leaves_the_ledger_alone() {
        let h = setup();
        let p = h.product("Bolt", 0).await;
        let id = order(&h, vec![OrderLineInput::new(p, 10, 100)]).await;
        h.coordinator
            .receive_purchase_order_lines(id, vec![ReceiptLine::new(1, 3)])
            .await
            .unwrap();

        h.coordinator.delete_purchase_order(id).await.unwrap();
        assert_eq!(h.quantity(p).await, 3);
        assert!(h.coordinator.list_purchase_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn order_for_unknown_product_is_not_found() {
        let h = setup();
        let err = h
            .coordinator
            .create_purchase_order(PurchaseOrderDraft {
                date: Utc::now(),
                supplier_id: "supplier-1".to_string(),
                expected_delivery_date: None,
                lines: vec![OrderLineInput::new(ProductId::new(), 1, 1)],
                notes: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::NotFound(_)));
    }

    fn names(view: &FilteredView<Product, ProductSortKey>) -> Vec<String> {
        view.items().iter().map(|p| p.name().to_string()).collect()
    }

    #[tokio::test]
    async fn live_view_follows_committed_changes() {
        let h = setup();
        let p = h.product("Bolt", 5).await;
        h.product("Nut", 0).await;

        let mut screen = FilteredView::new(ProductSortKey::Name);
        screen.set_filter(slots::STOCK, stock_filter(StockLevel::OutOfStock));
        let mut live = LiveView::open(h.store.clone(), h.store.changes(), PRODUCTS, None, screen)
            .await
            .unwrap();
        assert_eq!(names(live.view()), vec!["Nut"]);

        h.coordinator
            .record_outgoing(vec![line(p, 8)], meta("ACME"))
            .await
            .unwrap();
        assert!(live.sync().await.unwrap());
        assert_eq!(names(live.view()), vec!["Bolt", "Nut"]);

        live.view_mut().sort_by(ProductSortKey::Name);
        assert_eq!(names(live.view()), vec!["Nut", "Bolt"]);
        assert!(!live.sync().await.unwrap());
    }

    #[tokio::test]
    async fn store_reads_are_usable_through_arc() {
        let h = setup();
        h.product("Bolt", 1).await;
        let docs = h.store.query(PRODUCTS.name(), None).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].version, 1);
    }
}
