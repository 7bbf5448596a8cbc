use chrono::Duration;
use spg_common::Baht;
use thiserror::Error;

use crate::{
    db_types::{ChatUserId, NewOrder, Order, OrderId, OrderStatusType, SlipReference},
    traits::VerificationError,
};

//--------------------------------------   MarkPaidOutcome    ---------------------------------------------------------
/// Result of the conditional `pending → paid` update.
#[derive(Debug, Clone)]
pub enum MarkPaidOutcome {
    /// The precondition held and the order is now `Paid`.
    Paid(Order),
    /// The order had already left `Pending` by the time the update ran — typically because a
    /// near-simultaneous submission won the race. The order is returned as found.
    AlreadyReconciled(Order),
}

//--------------------------------------ReconciliationDatabase---------------------------------------------------------
/// The storage contract the reconciliation and order-lifecycle flows run against.
///
/// The engine never owns the order schema beyond what is listed here: status, price, payer
/// linkage, timestamps and the reconciliation bookkeeping flags. Everything else on an order is
/// opaque pass-through data.
///
/// The one hard concurrency requirement lives in [`Self::mark_order_paid`] and
/// [`Self::update_order_status`]: both are compare-and-swap updates guarded on the current
/// status, so that two racing submissions can never both settle the same order.
#[allow(async_fn_in_trait)]
pub trait ReconciliationDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new order. Idempotent: returns the order record and `true` if it was inserted,
    /// or the existing record and `false` if an order with the same id was already present.
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), ReconciliationError>;

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, ReconciliationError>;

    /// All `pending` orders for the given payer, newest first. The ordering is load-bearing:
    /// the matcher's "prefer the most recent order" heuristic relies on it.
    async fn fetch_pending_orders_for_payer(&self, payer: &ChatUserId) -> Result<Vec<Order>, ReconciliationError>;

    /// Atomically transitions the order `pending → paid`, stamping the slip reference, the
    /// excess flag and reminder suppression in the same conditional update. The update must
    /// apply only while `status = 'pending'`; when the precondition fails the current record is
    /// returned as [`MarkPaidOutcome::AlreadyReconciled`].
    async fn mark_order_paid(
        &self,
        order_id: &OrderId,
        slip: &SlipReference,
        excess: Baht,
    ) -> Result<MarkPaidOutcome, ReconciliationError>;

    /// Conditionally moves an order from `expected` to `new_status`. Returns the updated order,
    /// or `None` when the order was not in `expected` at update time.
    async fn update_order_status(
        &self,
        order_id: &OrderId,
        expected: OrderStatusType,
        new_status: OrderStatusType,
    ) -> Result<Option<Order>, ReconciliationError>;

    /// Pending, chat-linked orders older than `older_than` whose payment reminder has not been
    /// sent yet.
    async fn fetch_orders_due_for_reminder(&self, older_than: Duration) -> Result<Vec<Order>, ReconciliationError>;

    /// Flips the reminder flag, guarded on it still being unset. Returns whether this call won
    /// the flip.
    async fn mark_reminder_sent(&self, order_id: &OrderId) -> Result<bool, ReconciliationError>;

    /// Cancels all pending orders older than `older_than` and returns them.
    async fn cancel_stale_pending_orders(&self, older_than: Duration) -> Result<Vec<Order>, ReconciliationError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), ReconciliationError> {
        Ok(())
    }
}

//--------------------------------------ReconciliationError   ---------------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Cannot insert order, since it already exists with id {0}")]
    OrderAlreadyExists(OrderId),
    #[error("The requested order change would result in a no-op.")]
    OrderModificationNoOp,
    #[error("The requested order change is forbidden.")]
    OrderModificationForbidden,
    #[error("The order was modified concurrently and the status precondition no longer holds.")]
    StatusPreconditionFailed,
    #[error("A payer identity or an explicit order reference is required to reconcile a slip")]
    MissingPayerIdentity,
    #[error("{0}")]
    VerificationError(#[from] VerificationError),
}

impl From<sqlx::Error> for ReconciliationError {
    fn from(e: sqlx::Error) -> Self {
        ReconciliationError::DatabaseError(e.to_string())
    }
}
