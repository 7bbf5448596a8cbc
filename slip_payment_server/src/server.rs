use std::{future::Future, pin::Pin, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use slip2go_tools::Slip2GoApi;
use slip_payment_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    traits::SlipVerifier,
    OrderManagementApi,
    ReconciliationApi,
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    middleware::HmacMiddlewareFactory,
    routes::{chat_webhook, create_order, get_order, health, order_qr, upload_slip},
    workers::{start_reminder_worker, start_stale_order_worker},
};

const EVENT_BUFFER_SIZE: usize = 25;
pub const CHAT_SIGNATURE_HEADER: &str = "X-Chat-Signature";

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let verifier = Slip2GoApi::new(config.slip2go.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;

    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, notification_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;

    start_reminder_worker(db.clone(), producers.clone(), config.reminder_delay);
    start_stale_order_worker(db.clone(), producers.clone(), config.unpaid_order_timeout);

    let srv = create_server_instance(config, db, verifier, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance<V>(
    config: ServerConfig,
    db: SqliteDatabase,
    verifier: V,
    producers: EventProducers,
) -> Result<Server, ServerError>
where
    V: SlipVerifier + Clone + Send + Sync + 'static,
{
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let reconciliation_api =
            ReconciliationApi::new(db.clone(), verifier.clone(), config.match_policy, producers.clone());
        let order_api = OrderManagementApi::new(db.clone(), producers.clone());
        let hmac = HmacMiddlewareFactory::new(
            CHAT_SIGNATURE_HEADER,
            config.chat_webhook_secret.clone(),
            config.chat_hmac_checks,
        );
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("spg::access_log"))
            .app_data(web::Data::new(reconciliation_api))
            .app_data(web::Data::new(order_api))
            .app_data(web::Data::new(config.clone()))
            .service(health)
            .service(
                web::scope("/api")
                    .route("/orders", web::post().to(create_order))
                    .route("/orders/{id}", web::get().to(get_order))
                    .route("/orders/{id}/qr", web::get().to(order_qr))
                    .route("/orders/{id}/slip", web::post().to(upload_slip::<V>)),
            )
            .service(web::scope("/webhook").wrap(hmac).route("/chat", web::post().to(chat_webhook::<V>)))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

/// The default event hooks: a stand-in for the external messaging collaborator. Each hook logs
/// the named event; a deployment wanting chat push messages, e-mail, or anything else subscribes
/// its own handlers here instead. The gateway never formats customer-facing message content.
pub fn notification_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_payment_confirmed(|ev| {
        Box::pin(async move {
            info!(
                "📣️ payment_confirmed: order {} for {} ({}){}",
                ev.order.order_id,
                ev.order.customer_name,
                ev.order.total_price,
                if ev.excess.is_positive() { format!(", overpaid by {}", ev.excess) } else { String::new() }
            );
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks.on_slip_rejected(|ev| {
        Box::pin(async move {
            info!("📣️ slip_rejected: payer {:?}, reason {:?}", ev.payer, ev.reason);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks.on_order_annulled(|ev| {
        Box::pin(async move {
            info!("📣️ order_annulled: order {} ({})", ev.order.order_id, ev.order.status);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks.on_payment_reminder(|ev| {
        Box::pin(async move {
            info!("📣️ payment_reminder: order {} has been waiting since {}", ev.order.order_id, ev.order.created_at);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks
}
