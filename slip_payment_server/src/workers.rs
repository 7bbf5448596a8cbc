use chrono::Duration;
use log::*;
use slip_payment_engine::{db_types::Order, events::EventProducers, OrderManagementApi, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the payment reminder worker. Do not await the returned JoinHandle, as it will run
/// indefinitely.
pub fn start_reminder_worker(db: SqliteDatabase, producers: EventProducers, delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(60));
        let api = OrderManagementApi::new(db, producers);
        info!("🕰️ Payment reminder worker started");
        loop {
            timer.tick().await;
            match api.send_due_reminders(delay).await {
                Ok(reminded) if reminded.is_empty() => trace!("🕰️ No payment reminders due"),
                Ok(reminded) => {
                    info!("🕰️ {} payment reminder(s) queued: {}", reminded.len(), order_list(&reminded));
                },
                Err(e) => {
                    error!("🕰️ Error running payment reminder sweep: {e}");
                },
            }
        }
    })
}

/// Starts the stale-order worker: pending orders that outlived the unpaid timeout are cancelled
/// (never deleted — the record stays for the books).
pub fn start_stale_order_worker(db: SqliteDatabase, producers: EventProducers, timeout: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(60));
        let api = OrderManagementApi::new(db, producers);
        info!("🕰️ Stale order worker started");
        loop {
            timer.tick().await;
            match api.cancel_stale_orders(timeout).await {
                Ok(cancelled) if cancelled.is_empty() => trace!("🕰️ No stale orders to cancel"),
                Ok(cancelled) => {
                    info!("🕰️ {} stale order(s) cancelled: {}", cancelled.len(), order_list(&cancelled));
                },
                Err(e) => {
                    error!("🕰️ Error running stale order sweep: {e}");
                },
            }
        }
    })
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] order_id: {} customer: {}", o.id, o.order_id, o.customer_name))
        .collect::<Vec<String>>()
        .join(", ")
}
