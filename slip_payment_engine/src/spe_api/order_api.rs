use std::fmt::Debug;

use chrono::Duration;
use log::*;
use spg_common::Baht;

use crate::{
    db_types::{ChatUserId, NewOrder, Order, OrderId, OrderStatusType},
    events::{EventProducers, OrderAnnulledEvent, PaymentConfirmedEvent, PaymentReminderEvent},
    traits::{ReconciliationDatabase, ReconciliationError},
};

/// Order creation, queries, and the admin-driven side of the order lifecycle.
///
/// Reconciliation owns exactly one transition (`pending → paid`, via
/// [`crate::ReconciliationApi`]); everything else on the state machine is driven from here.
pub struct OrderManagementApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderManagementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderManagementApi")
    }
}

impl<B> OrderManagementApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderManagementApi<B>
where B: ReconciliationDatabase
{
    /// Stores a new order. Idempotent: re-submitting an existing order id returns the stored
    /// record and `false` instead of an error.
    pub async fn process_new_order(&self, order: NewOrder) -> Result<(Order, bool), ReconciliationError> {
        let (order, inserted) = self.db.insert_order(order).await?;
        if inserted {
            debug!("🔄️📦️ Order {} created, awaiting payment of {}", order.order_id, order.total_price);
        } else {
            debug!("🔄️📦️ Order {} already existed; nothing to do", order.order_id);
        }
        Ok((order, inserted))
    }

    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, ReconciliationError> {
        self.db.fetch_order_by_order_id(order_id).await
    }

    pub async fn fetch_pending_orders_for_payer(&self, payer: &ChatUserId) -> Result<Vec<Order>, ReconciliationError> {
        self.db.fetch_pending_orders_for_payer(payer).await
    }

    /// Changes the status of an order on behalf of an admin.
    ///
    /// Permitted transitions:
    ///
    /// | From \ To  | Paid | Processing | Completed | Cancelled |
    /// |------------|------|------------|-----------|-----------|
    /// | Pending    | ✓    | Err        | Err       | ✓         |
    /// | Paid       | Err  | ✓          | Err       | ✓         |
    /// | Processing | Err  | Err        | ✓         | Err       |
    /// | Completed  | Err  | Err        | Err       | Err       |
    /// | Cancelled  | Err  | Err        | Err       | Err       |
    ///
    /// A transition to the current status is a no-op and returns an error. `Pending → Paid` here
    /// is the manual override path (an admin confirming a payment that arrived outside the slip
    /// flow); it runs through the same conditional update as reconciliation and emits the same
    /// `PaymentConfirmed` event. Cancellations emit `OrderAnnulled`.
    ///
    /// Returns the updated order.
    pub async fn modify_status_for_order(
        &self,
        order_id: &OrderId,
        new_status: OrderStatusType,
    ) -> Result<Order, ReconciliationError> {
        let order = self
            .db
            .fetch_order_by_order_id(order_id)
            .await?
            .ok_or_else(|| ReconciliationError::OrderNotFound(order_id.clone()))?;
        let old_status = order.status;
        use OrderStatusType::*;
        match (old_status, new_status) {
            (old, new) if old == new => Err(ReconciliationError::OrderModificationNoOp),
            (Pending, Paid) => {
                let updated = self.guarded_update(order_id, Pending, Paid).await?;
                info!("🔄️📦️ Order {order_id} manually marked as paid");
                self.call_payment_confirmed_hook(&updated).await;
                Ok(updated)
            },
            (Pending, Cancelled) | (Paid, Cancelled) => {
                let updated = self.guarded_update(order_id, old_status, Cancelled).await?;
                info!("🔄️📦️ Order {order_id} cancelled");
                self.call_order_annulled_hook(&updated).await;
                Ok(updated)
            },
            (Paid, Processing) | (Processing, Completed) => self.guarded_update(order_id, old_status, new_status).await,
            (_, _) => Err(ReconciliationError::OrderModificationForbidden),
        }
    }

    /// Finds pending orders that have waited longer than `older_than`, flips their reminder
    /// flag, and emits a `PaymentReminder` event for each. The flag flip is a conditional
    /// update, so overlapping sweeps cannot double-remind.
    pub async fn send_due_reminders(&self, older_than: Duration) -> Result<Vec<Order>, ReconciliationError> {
        let due = self.db.fetch_orders_due_for_reminder(older_than).await?;
        let mut reminded = Vec::with_capacity(due.len());
        for order in due {
            if self.db.mark_reminder_sent(&order.order_id).await? {
                for emitter in &self.producers.payment_reminder_producer {
                    emitter.publish_event(PaymentReminderEvent::new(order.clone())).await;
                }
                reminded.push(order);
            }
        }
        Ok(reminded)
    }

    /// Cancels pending orders that have gone unpaid for longer than `older_than`, emitting an
    /// `OrderAnnulled` event for each.
    pub async fn cancel_stale_orders(&self, older_than: Duration) -> Result<Vec<Order>, ReconciliationError> {
        let cancelled = self.db.cancel_stale_pending_orders(older_than).await?;
        for order in &cancelled {
            self.call_order_annulled_hook(order).await;
        }
        Ok(cancelled)
    }

    async fn guarded_update(
        &self,
        order_id: &OrderId,
        expected: OrderStatusType,
        new_status: OrderStatusType,
    ) -> Result<Order, ReconciliationError> {
        self.db
            .update_order_status(order_id, expected, new_status)
            .await?
            .ok_or(ReconciliationError::StatusPreconditionFailed)
    }

    async fn call_payment_confirmed_hook(&self, order: &Order) {
        for emitter in &self.producers.payment_confirmed_producer {
            trace!("🔄️📦️ Notifying payment confirmed hook subscribers");
            emitter.publish_event(PaymentConfirmedEvent::new(order.clone(), Baht::default())).await;
        }
    }

    async fn call_order_annulled_hook(&self, order: &Order) {
        for emitter in &self.producers.order_annulled_producer {
            trace!("🔄️📦️ Notifying order annulled hook subscribers");
            emitter.publish_event(OrderAnnulledEvent::new(order.clone())).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
