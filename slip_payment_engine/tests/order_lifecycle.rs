//! Admin-side state machine and the background sweep operations.

mod support;

use chrono::Duration;
use slip_payment_engine::{
    db_types::OrderStatusType,
    events::EventProducers,
    traits::{ReconciliationDatabase, ReconciliationError},
    OrderManagementApi,
};
use spg_common::Baht;
use support::{new_test_db, payer, seed_order};

#[tokio::test]
async fn the_happy_path_walks_the_full_state_machine() {
    let db = new_test_db().await;
    let order = seed_order(&db, "ord-life", Baht::from_baht(100), None).await;
    let api = OrderManagementApi::new(db.clone(), EventProducers::default());

    let paid = api.modify_status_for_order(&order.order_id, OrderStatusType::Paid).await.unwrap();
    assert_eq!(paid.status, OrderStatusType::Paid);
    let processing = api.modify_status_for_order(&order.order_id, OrderStatusType::Processing).await.unwrap();
    assert_eq!(processing.status, OrderStatusType::Processing);
    let completed = api.modify_status_for_order(&order.order_id, OrderStatusType::Completed).await.unwrap();
    assert_eq!(completed.status, OrderStatusType::Completed);
}

#[tokio::test]
async fn forbidden_and_noop_transitions_are_refused() {
    let db = new_test_db().await;
    let order = seed_order(&db, "ord-strict", Baht::from_baht(100), None).await;
    let api = OrderManagementApi::new(db.clone(), EventProducers::default());

    // Skipping payment entirely is not a thing
    let err = api.modify_status_for_order(&order.order_id, OrderStatusType::Completed).await.unwrap_err();
    assert!(matches!(err, ReconciliationError::OrderModificationForbidden));

    // A no-op transition is refused rather than silently succeeding
    let err = api.modify_status_for_order(&order.order_id, OrderStatusType::Pending).await.unwrap_err();
    assert!(matches!(err, ReconciliationError::OrderModificationNoOp));

    // Terminal states stay terminal
    api.modify_status_for_order(&order.order_id, OrderStatusType::Cancelled).await.unwrap();
    let err = api.modify_status_for_order(&order.order_id, OrderStatusType::Paid).await.unwrap_err();
    assert!(matches!(err, ReconciliationError::OrderModificationForbidden));
}

#[tokio::test]
async fn paid_orders_can_still_be_cancelled() {
    let db = new_test_db().await;
    let order = seed_order(&db, "ord-refundable", Baht::from_baht(100), None).await;
    let api = OrderManagementApi::new(db.clone(), EventProducers::default());

    api.modify_status_for_order(&order.order_id, OrderStatusType::Paid).await.unwrap();
    let cancelled = api.modify_status_for_order(&order.order_id, OrderStatusType::Cancelled).await.unwrap();
    assert_eq!(cancelled.status, OrderStatusType::Cancelled);
}

#[tokio::test]
async fn reminders_fire_once_per_order() {
    let db = new_test_db().await;
    let payer = payer();
    seed_order(&db, "ord-nudge", Baht::from_baht(100), Some(&payer)).await;
    // Web-only orders have nobody to nudge
    seed_order(&db, "ord-no-chat", Baht::from_baht(100), None).await;
    let api = OrderManagementApi::new(db.clone(), EventProducers::default());

    // A cutoff in the future makes the freshly created order eligible immediately
    let reminded = api.send_due_reminders(Duration::seconds(-5)).await.unwrap();
    assert_eq!(reminded.len(), 1);
    assert_eq!(reminded[0].order_id.as_str(), "ord-nudge");

    let again = api.send_due_reminders(Duration::seconds(-5)).await.unwrap();
    assert!(again.is_empty(), "the reminder flag must suppress repeats");
}

#[tokio::test]
async fn stale_pending_orders_are_cancelled_not_deleted() {
    let db = new_test_db().await;
    let payer = payer();
    let stale = seed_order(&db, "ord-stale", Baht::from_baht(100), Some(&payer)).await;
    let api = OrderManagementApi::new(db.clone(), EventProducers::default());

    let swept = api.cancel_stale_orders(Duration::seconds(-5)).await.unwrap();
    assert_eq!(swept.len(), 1);
    assert_eq!(swept[0].status, OrderStatusType::Cancelled);

    // The record survives for the books; only its status changed
    let stored = db.fetch_order_by_order_id(&stale.order_id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatusType::Cancelled);

    // Paid orders are never swept
    let kept = seed_order(&db, "ord-kept", Baht::from_baht(50), Some(&payer)).await;
    api.modify_status_for_order(&kept.order_id, OrderStatusType::Paid).await.unwrap();
    let swept = api.cancel_stale_orders(Duration::seconds(-5)).await.unwrap();
    assert!(swept.is_empty());
}
