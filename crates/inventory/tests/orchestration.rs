use std::sync::Arc;

use serde_json::json;
use stockbridge_core::{AdjustmentKind, LocationId, ProductId};
use stockbridge_gateway::InMemoryStockBackend;
use stockbridge_inventory::{
    AdjustRequest, Compensation, MoveRequest, OperationError, QuantityAdjuster, ReservationPolicy,
    StockQueries, StockQuery, TransferConfig, TransferOrchestrator, TransferStep,
};

fn orchestrator(
    backend: &Arc<InMemoryStockBackend>,
    config: TransferConfig,
) -> TransferOrchestrator<Arc<InMemoryStockBackend>> {
    TransferOrchestrator::new(backend.clone(), config)
}

fn move_request(product: i64, from: i64, to: i64, quantity: f64) -> MoveRequest {
    MoveRequest {
        product_id: ProductId::new(product),
        from_location_id: LocationId::new(from),
        to_location_id: LocationId::new(to),
        quantity,
        note: None,
    }
}

fn adjust_request(product: i64, location: i64, delta: f64) -> AdjustRequest {
    AdjustRequest {
        product_id: ProductId::new(product),
        location_id: LocationId::new(location),
        delta,
    }
}

#[tokio::test]
async fn move_creates_one_picking_with_one_move_and_books_stock() {
    let backend = Arc::new(InMemoryStockBackend::with_internal_picking_type());
    backend.seed_quant(5, 1, 10.0);

    let outcome = orchestrator(&backend, TransferConfig::default())
        .move_stock(move_request(5, 1, 2, 3.0))
        .await
        .unwrap();

    assert_eq!(outcome.message, "Moved 3 units successfully");

    let pickings = backend.records("stock.picking");
    assert_eq!(pickings.len(), 1);
    assert_eq!(pickings[0]["id"], json!(outcome.picking_id.get()));
    assert_eq!(pickings[0]["state"], json!("done"));

    let moves = backend.records("stock.move");
    assert_eq!(moves.len(), 1);
    assert_eq!(moves[0]["id"], json!(outcome.move_id.get()));
    assert_eq!(moves[0]["picking_id"], json!(outcome.picking_id.get()));
    assert_eq!(moves[0]["product_uom_qty"], json!(3.0));
    assert_eq!(moves[0]["location_id"], json!(1));
    assert_eq!(moves[0]["location_dest_id"], json!(2));
    assert_eq!(moves[0]["product_uom"], json!(1));
    assert_eq!(moves[0]["name"], json!("Product Move"));

    assert_eq!(backend.quant_quantity(5, 1), Some(7.0));
    assert_eq!(backend.quant_quantity(5, 2), Some(3.0));

    assert_eq!(
        backend.call_names(),
        vec![
            "stock.picking.type.search_read",
            "stock.picking.create",
            "stock.move.create",
            "stock.picking.action_confirm",
            "stock.picking.action_assign",
            "stock.picking.read",
            "stock.move.line.search_read",
            "stock.move.line.write",
            "stock.picking.button_validate",
        ]
    );
}

#[tokio::test]
async fn move_to_same_location_is_rejected_without_remote_calls() {
    let backend = Arc::new(InMemoryStockBackend::with_internal_picking_type());

    let failure = orchestrator(&backend, TransferConfig::default())
        .move_stock(move_request(5, 4, 4, 1.0))
        .await
        .unwrap_err();

    assert_eq!(failure.step, TransferStep::Precheck);
    assert!(matches!(failure.error, OperationError::Validation(_)));
    assert!(!failure.partially_executed());
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn move_of_zero_quantity_is_rejected_without_remote_calls() {
    let backend = Arc::new(InMemoryStockBackend::with_internal_picking_type());

    let failure = orchestrator(&backend, TransferConfig::default())
        .move_stock(move_request(5, 1, 2, 0.0))
        .await
        .unwrap_err();

    assert!(matches!(failure.error, OperationError::Validation(_)));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn missing_internal_type_is_not_found_and_persists_nothing() {
    let backend = Arc::new(InMemoryStockBackend::new());

    let failure = orchestrator(&backend, TransferConfig::default())
        .move_stock(move_request(5, 1, 2, 3.0))
        .await
        .unwrap_err();

    assert_eq!(failure.step, TransferStep::ResolveType);
    assert!(matches!(failure.error, OperationError::NotFound(_)));
    assert_eq!(failure.compensation, Compensation::NotNeeded);
    assert_eq!(failure.picking_id, None);
    assert!(backend.records("stock.picking").is_empty());
    assert!(backend.records("stock.move").is_empty());
}

#[tokio::test]
async fn failed_validation_cancels_the_picking_and_reports_ids() {
    let backend = Arc::new(InMemoryStockBackend::with_internal_picking_type());
    backend.seed_quant(5, 1, 10.0);
    backend.fail_next("stock.picking", "button_validate", "Validation exploded");

    let failure = orchestrator(&backend, TransferConfig::default())
        .move_stock(move_request(5, 1, 2, 3.0))
        .await
        .unwrap_err();

    assert_eq!(failure.step, TransferStep::Validate);
    assert_eq!(failure.error, OperationError::Remote("Validation exploded".into()));
    assert!(failure.compensated());

    let picking_id = failure.picking_id.unwrap();
    assert!(failure.move_id.is_some());
    let picking = backend.record("stock.picking", picking_id.get()).unwrap();
    assert_eq!(picking["state"], json!("cancel"));

    // Reservation released, nothing booked.
    assert_eq!(backend.quant_quantity(5, 1), Some(10.0));
    let quant = &backend.records("stock.quant")[0];
    assert_eq!(quant["reserved_quantity"], json!(0.0));
    assert_eq!(backend.quant_quantity(5, 2), None);
}

#[tokio::test]
async fn compensation_can_be_disabled() {
    let backend = Arc::new(InMemoryStockBackend::with_internal_picking_type());
    backend.seed_quant(5, 1, 10.0);
    backend.fail_next("stock.picking", "button_validate", "nope");

    let config = TransferConfig {
        compensate_on_failure: false,
        ..TransferConfig::default()
    };
    let failure = orchestrator(&backend, config)
        .move_stock(move_request(5, 1, 2, 3.0))
        .await
        .unwrap_err();

    assert_eq!(failure.compensation, Compensation::Skipped);
    let picking = backend
        .record("stock.picking", failure.picking_id.unwrap().get())
        .unwrap();
    assert_eq!(picking["state"], json!("assigned"));
    assert!(!backend.call_names().contains(&"stock.picking.action_cancel".to_string()));
}

#[tokio::test]
async fn failing_compensation_keeps_the_original_error() {
    let backend = Arc::new(InMemoryStockBackend::with_internal_picking_type());
    backend.seed_quant(5, 1, 10.0);
    backend.fail_next("stock.picking", "action_confirm", "confirm failed");
    backend.fail_next("stock.picking", "action_cancel", "cancel failed");

    let failure = orchestrator(&backend, TransferConfig::default())
        .move_stock(move_request(5, 1, 2, 3.0))
        .await
        .unwrap_err();

    assert_eq!(failure.step, TransferStep::Confirm);
    assert_eq!(failure.error, OperationError::Remote("confirm failed".into()));
    assert!(matches!(failure.compensation, Compensation::Failed { .. }));
    assert!(!failure.compensated());
}

#[tokio::test]
async fn abort_policy_stops_when_nothing_is_reserved() {
    let backend = Arc::new(InMemoryStockBackend::with_internal_picking_type());

    let config = TransferConfig {
        reservation_policy: ReservationPolicy::Abort,
        ..TransferConfig::default()
    };
    let failure = orchestrator(&backend, config)
        .move_stock(move_request(5, 1, 2, 3.0))
        .await
        .unwrap_err();

    assert_eq!(failure.step, TransferStep::Reserve);
    assert!(matches!(failure.error, OperationError::Validation(_)));
    assert!(failure.compensated());
    assert!(!backend.call_names().contains(&"stock.picking.button_validate".to_string()));
}

#[tokio::test]
async fn proceed_policy_without_any_reservation_fails_at_validation() {
    let backend = Arc::new(InMemoryStockBackend::with_internal_picking_type());

    let failure = orchestrator(&backend, TransferConfig::default())
        .move_stock(move_request(5, 1, 2, 3.0))
        .await
        .unwrap_err();

    assert_eq!(failure.step, TransferStep::Validate);
    assert!(matches!(failure.error, OperationError::Remote(_)));
    assert!(failure.compensated());
}

#[tokio::test]
async fn proceed_policy_forces_requested_quantity_on_partial_reservation() {
    let backend = Arc::new(InMemoryStockBackend::with_internal_picking_type());
    backend.seed_quant(5, 1, 2.0);

    orchestrator(&backend, TransferConfig::default())
        .move_stock(move_request(5, 1, 2, 3.0))
        .await
        .unwrap();

    assert_eq!(backend.quant_quantity(5, 2), Some(3.0));
    assert_eq!(backend.quant_quantity(5, 1), Some(-1.0));
}

#[tokio::test]
async fn note_and_done_field_are_forwarded() {
    let backend = Arc::new(InMemoryStockBackend::with_internal_picking_type());
    backend.seed_quant(5, 1, 10.0);
    // Keep the lines around to inspect them.
    backend.fail_next("stock.picking", "button_validate", "stop here");

    let config = TransferConfig {
        done_field: "qty_done".to_string(),
        compensate_on_failure: false,
        ..TransferConfig::default()
    };
    let mut request = move_request(5, 1, 2, 4.0);
    request.note = Some("restock shelf".to_string());
    let failure = orchestrator(&backend, config).move_stock(request).await.unwrap_err();

    let picking = backend
        .record("stock.picking", failure.picking_id.unwrap().get())
        .unwrap();
    assert_eq!(picking["note"], json!("restock shelf"));
    let lines = backend.records("stock.move.line");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["qty_done"], json!(4.0));
}

#[tokio::test]
async fn removing_from_existing_quant_applies_target() {
    let backend = Arc::new(InMemoryStockBackend::new());
    let quant_id = backend.seed_quant(42, 7, 10.0);

    let outcome = QuantityAdjuster::new(backend.clone())
        .adjust_quantity(adjust_request(42, 7, -4.0))
        .await
        .unwrap();

    assert_eq!(outcome.quant_id.get(), quant_id);
    assert_eq!(outcome.kind, AdjustmentKind::Removed);
    assert_eq!(outcome.target.get(), 6.0);
    assert!(outcome.message.contains("Removed 4"));
    assert_eq!(outcome.message, "Removed 4 units successfully");
    assert_eq!(backend.quant_quantity(42, 7), Some(6.0));
}

#[tokio::test]
async fn adding_without_quant_creates_it() {
    let backend = Arc::new(InMemoryStockBackend::new());

    let outcome = QuantityAdjuster::new(backend.clone())
        .adjust_quantity(adjust_request(99, 3, 15.0))
        .await
        .unwrap();

    assert_eq!(outcome.kind, AdjustmentKind::Added);
    assert!(outcome.message.contains("Added 15"));
    assert_eq!(backend.quant_quantity(99, 3), Some(15.0));
    assert_eq!(
        backend.call_names(),
        vec![
            "stock.quant.search_read",
            "stock.quant.create",
            "stock.quant.action_apply_inventory",
        ]
    );
}

#[tokio::test]
async fn zero_delta_is_rejected_before_any_call() {
    let backend = Arc::new(InMemoryStockBackend::new());

    let err = QuantityAdjuster::new(backend.clone())
        .adjust_quantity(adjust_request(42, 7, 0.0))
        .await
        .unwrap_err();

    assert!(matches!(err, OperationError::Validation(_)));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn removing_missing_stock_is_rejected_without_mutation() {
    let backend = Arc::new(InMemoryStockBackend::new());

    let err = QuantityAdjuster::new(backend.clone())
        .adjust_quantity(adjust_request(42, 7, -1.0))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        OperationError::Validation("Cannot remove stock that doesn't exist at this location".into())
    );
    assert_eq!(backend.call_names(), vec!["stock.quant.search_read"]);
    assert!(backend.records("stock.quant").is_empty());
}

#[tokio::test]
async fn removing_below_zero_is_rejected_without_mutation() {
    let backend = Arc::new(InMemoryStockBackend::new());
    backend.seed_quant(42, 7, 2.0);

    let err = QuantityAdjuster::new(backend.clone())
        .adjust_quantity(adjust_request(42, 7, -5.0))
        .await
        .unwrap_err();

    assert!(matches!(err, OperationError::Validation(_)));
    assert_eq!(backend.call_names(), vec!["stock.quant.search_read"]);
    assert_eq!(backend.quant_quantity(42, 7), Some(2.0));
}

#[tokio::test]
async fn adding_to_negative_quant_restages_the_sum() {
    let backend = Arc::new(InMemoryStockBackend::new());
    let quant_id = backend.seed_quant(42, 7, -5.0);

    let outcome = QuantityAdjuster::new(backend.clone())
        .adjust_quantity(adjust_request(42, 7, 3.0))
        .await
        .unwrap();

    assert_eq!(outcome.quant_id.get(), quant_id);
    assert_eq!(outcome.kind, AdjustmentKind::Added);
    assert_eq!(outcome.target.get(), -2.0);
    assert_eq!(outcome.message, "Added 3 units successfully");
    assert_eq!(backend.quant_quantity(42, 7), Some(-2.0));
}

#[tokio::test]
async fn stock_levels_skip_empty_quants_and_sort() {
    let backend = Arc::new(InMemoryStockBackend::new());
    backend.seed_quant(8, 2, 1.0);
    backend.seed_quant(8, 1, 5.0);
    backend.seed_quant(3, 9, 0.0);
    backend.seed_quant(3, 4, 2.0);

    let levels = StockQueries::new(backend.clone())
        .stock_levels(&StockQuery::default())
        .await
        .unwrap();

    let pairs: Vec<(i64, i64)> = levels
        .iter()
        .map(|q| (q.product_id.get(), q.location_id.get()))
        .collect();
    assert_eq!(pairs, vec![(3, 4), (8, 1), (8, 2)]);

    let at_one = StockQueries::new(backend.clone())
        .stock_levels(&StockQuery {
            location_id: Some(LocationId::new(1)),
            ..StockQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(at_one.len(), 1);
    assert_eq!(at_one[0].quantity.get(), 5.0);
}

#[tokio::test]
async fn history_lists_done_moves_touching_a_location_newest_first() {
    let backend = Arc::new(InMemoryStockBackend::new());
    let move_fields = |from: i64, to: i64, state: &str, date: &str| {
        json!({
            "product_id": 5,
            "product_uom_qty": 1.0,
            "location_id": from,
            "location_dest_id": to,
            "state": state,
            "date": date,
        })
    };
    let older = backend.seed("stock.move", move_fields(1, 2, "done", "2024-01-01 10:00:00"));
    let newer = backend.seed("stock.move", move_fields(2, 3, "done", "2024-02-01 10:00:00"));
    backend.seed("stock.move", move_fields(2, 4, "assigned", "2024-03-01 10:00:00"));
    backend.seed("stock.move", move_fields(6, 7, "done", "2024-04-01 10:00:00"));

    let history = StockQueries::new(backend.clone())
        .move_history(&StockQuery {
            location_id: Some(LocationId::new(2)),
            ..StockQuery::default()
        })
        .await
        .unwrap();

    let ids: Vec<i64> = history.iter().map(|m| m.id.get()).collect();
    assert_eq!(ids, vec![newer, older]);
}

#[tokio::test]
async fn oversized_limit_is_rejected() {
    let backend = Arc::new(InMemoryStockBackend::new());
    let err = StockQueries::new(backend.clone())
        .move_history(&StockQuery {
            limit: Some(10_000),
            ..StockQuery::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, OperationError::Validation(_)));
    assert!(backend.calls().is_empty());
}
