use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;
use spg_common::Baht;
use sqlx::SqlitePool;

use super::{db_url, new_pool, orders, orders::InsertOrderResult, SqliteDatabaseError};
use crate::{
    db_types::{ChatUserId, NewOrder, Order, OrderId, OrderStatusType, SlipReference},
    traits::{MarkPaidOutcome, ReconciliationDatabase, ReconciliationError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects to the database at `url` and brings the schema up to date.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let pool = new_pool(url, max_connections).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!("🗃️ Connected to database at {url}");
        Ok(Self { url: url.to_string(), pool })
    }

    /// Connects using the `SPG_DATABASE_URL` environment variable, or the default location.
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        Self::new_with_url(&db_url(), max_connections).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl ReconciliationDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let order_id = order.order_id.clone();
        let (id, inserted) = match orders::idempotent_insert(order, &mut conn).await? {
            InsertOrderResult::Inserted(id) => {
                debug!("🗃️ Order {order_id} saved with row id {id}");
                (id, true)
            },
            InsertOrderResult::AlreadyExists(id) => {
                debug!("🗃️ Order {order_id} already exists with row id {id}");
                (id, false)
            },
        };
        let order = orders::fetch_order_by_id(id, &mut conn)
            .await?
            .ok_or(ReconciliationError::OrderNotFound(order_id))?;
        Ok((order, inserted))
    }

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_order_id(order_id, &mut conn).await?)
    }

    async fn fetch_pending_orders_for_payer(&self, payer: &ChatUserId) -> Result<Vec<Order>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_pending_orders_for_payer(payer, &mut conn).await?)
    }

    async fn mark_order_paid(
        &self,
        order_id: &OrderId,
        slip: &SlipReference,
        excess: Baht,
    ) -> Result<MarkPaidOutcome, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::mark_order_paid(order_id, slip, excess, &mut conn).await?)
    }

    async fn update_order_status(
        &self,
        order_id: &OrderId,
        expected: OrderStatusType,
        new_status: OrderStatusType,
    ) -> Result<Option<Order>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::update_order_status(order_id, expected, new_status, &mut conn).await?)
    }

    async fn fetch_orders_due_for_reminder(&self, older_than: Duration) -> Result<Vec<Order>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let cutoff = Utc::now() - older_than;
        Ok(orders::fetch_orders_due_for_reminder(cutoff, &mut conn).await?)
    }

    async fn mark_reminder_sent(&self, order_id: &OrderId) -> Result<bool, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::mark_reminder_sent(order_id, &mut conn).await?)
    }

    async fn cancel_stale_pending_orders(&self, older_than: Duration) -> Result<Vec<Order>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let cutoff = Utc::now() - older_than;
        Ok(orders::cancel_stale_pending(cutoff, &mut conn).await?)
    }

    async fn close(&mut self) -> Result<(), ReconciliationError> {
        self.pool.close().await;
        Ok(())
    }
}
