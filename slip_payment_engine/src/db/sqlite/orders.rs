use chrono::{DateTime, Utc};
use log::trace;
use spg_common::Baht;
use sqlx::SqliteConnection;

use super::SqliteDatabaseError;
use crate::{
    db_types::{ChatUserId, NewOrder, Order, OrderId, OrderStatusType, SlipReference},
    traits::MarkPaidOutcome,
};

#[derive(Debug, Clone)]
pub enum InsertOrderResult {
    Inserted(i64),
    AlreadyExists(i64),
}

const ORDER_COLUMNS: &str = "id, order_id, customer_name, service_name, chat_user_id, total_price, payment_method, \
                             slip_ref, payment_proof_url, reminder_sent, has_excess, status, created_at, updated_at";

/// Inserts a new order if no order with the same `order_id` exists yet. This is not atomic on
/// its own; embed it in a transaction by passing `&mut *tx` when atomicity matters.
pub async fn idempotent_insert(
    order: NewOrder,
    conn: &mut SqliteConnection,
) -> Result<InsertOrderResult, SqliteDatabaseError> {
    let result = match order_exists(&order.order_id, conn).await? {
        Some(id) => InsertOrderResult::AlreadyExists(id),
        None => insert_order(order, conn).await?,
    };
    Ok(result)
}

async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<InsertOrderResult, SqliteDatabaseError> {
    let id: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO orders (order_id, customer_name, service_name, chat_user_id, total_price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id;
        "#,
    )
    .bind(&order.order_id)
    .bind(&order.customer_name)
    .bind(&order.service_name)
    .bind(&order.chat_user_id)
    .bind(order.total_price)
    .fetch_one(conn)
    .await?;
    Ok(InsertOrderResult::Inserted(id))
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1 LIMIT 1;");
    let order = sqlx::query_as::<_, Order>(&sql).bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, SqliteDatabaseError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 LIMIT 1;");
    let order = sqlx::query_as::<_, Order>(&sql).bind(id).fetch_optional(conn).await?;
    Ok(order)
}

/// Checks whether the order with the given `OrderId` already exists, returning its row id if so.
pub async fn order_exists(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<i64>, SqliteDatabaseError> {
    fetch_order_by_order_id(order_id, conn).await.map(|o| o.map(|o| o.id))
}

/// The payer's open orders, newest first. The matcher's recency preference leans on this order.
pub async fn fetch_pending_orders_for_payer(
    payer: &ChatUserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, SqliteDatabaseError> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE chat_user_id = $1 AND status = 'pending' ORDER BY created_at DESC, \
         id DESC;"
    );
    let orders = sqlx::query_as::<_, Order>(&sql).bind(payer).fetch_all(conn).await?;
    Ok(orders)
}

/// The conditional `pending → paid` update. The WHERE clause is the whole concurrency story:
/// of any number of racing submissions, exactly one sees `rows_affected = 1`.
pub async fn mark_order_paid(
    order_id: &OrderId,
    slip: &SlipReference,
    excess: Baht,
    conn: &mut SqliteConnection,
) -> Result<MarkPaidOutcome, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET
                status = 'paid',
                payment_method = 'promptpay',
                slip_ref = $1,
                payment_proof_url = $2,
                has_excess = $3,
                reminder_sent = 1,
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $4 AND status = 'pending';
        "#,
    )
    .bind(&slip.transaction_ref)
    .bind(&slip.proof_url)
    .bind(excess.is_positive())
    .bind(order_id)
    .execute(&mut *conn)
    .await?;
    let order = fetch_order_by_order_id(order_id, conn)
        .await?
        .ok_or_else(|| SqliteDatabaseError::OrderNotFound(order_id.clone()))?;
    if result.rows_affected() == 0 {
        trace!("🗃️ Order {order_id} was not pending any more; leaving it untouched");
        Ok(MarkPaidOutcome::AlreadyReconciled(order))
    } else {
        trace!("🗃️ Order {order_id} marked as paid");
        Ok(MarkPaidOutcome::Paid(order))
    }
}

/// Moves an order from `expected` to `new_status`, returning `None` if the precondition failed.
pub async fn update_order_status(
    order_id: &OrderId,
    expected: OrderStatusType,
    new_status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let result =
        sqlx::query("UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE order_id = $2 AND status = $3;")
            .bind(new_status)
            .bind(order_id)
            .bind(expected)
            .execute(&mut *conn)
            .await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    fetch_order_by_order_id(order_id, conn).await
}

pub async fn fetch_orders_due_for_reminder(
    cutoff: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, SqliteDatabaseError> {
    // datetime() normalizes both CURRENT_TIMESTAMP and RFC3339 bind values before comparing
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE status = 'pending' AND reminder_sent = 0 AND chat_user_id IS NOT \
         NULL AND datetime(created_at) < datetime($1) ORDER BY created_at;"
    );
    let orders = sqlx::query_as::<_, Order>(&sql).bind(cutoff).fetch_all(conn).await?;
    Ok(orders)
}

/// Flips the reminder flag iff it is still unset.
pub async fn mark_reminder_sent(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        "UPDATE orders SET reminder_sent = 1, updated_at = CURRENT_TIMESTAMP WHERE order_id = $1 AND reminder_sent = \
         0;",
    )
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Cancels every pending order created before `cutoff`, returning the cancelled records.
pub async fn cancel_stale_pending(
    cutoff: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, SqliteDatabaseError> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE status = 'pending' AND datetime(created_at) < datetime($1) ORDER BY \
         created_at;"
    );
    let stale = sqlx::query_as::<_, Order>(&sql).bind(cutoff).fetch_all(&mut *conn).await?;
    let mut cancelled = Vec::with_capacity(stale.len());
    for order in stale {
        let result = sqlx::query(
            "UPDATE orders SET status = 'cancelled', updated_at = CURRENT_TIMESTAMP WHERE id = $1 AND status = \
             'pending';",
        )
        .bind(order.id)
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() > 0 {
            if let Some(updated) = fetch_order_by_id(order.id, conn).await? {
                cancelled.push(updated);
            }
        }
    }
    Ok(cancelled)
}
