//! Request handler definitions
//!
//! Handlers stay thin: decode the request, call into the engine, translate the outcome. The
//! slip handlers are generic over the verifier so tests can swap the live Slip2Go client for a
//! scripted one; actix's attribute macros cannot express that, so those routes are registered
//! manually in [`crate::server`].

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use slip_payment_engine::{
    db_types::{ChatUserId, NewOrder, OrderId},
    promptpay::qr_payload,
    traits::SlipVerifier,
    OrderManagementApi,
    ReconciliationApi,
    SlipSubmission,
    SqliteDatabase,
};
use spg_common::Baht;

use crate::{
    config::ServerConfig,
    data_objects::{ChatWebhookBody, JsonResponse, NewOrderRequest, QrResponse, SlipResultResponse, SlipUpload},
    errors::ServerError,
    helpers::get_remote_ip,
};

pub type OrderApi = OrderManagementApi<SqliteDatabase>;

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(JsonResponse::success("👍️"))
}

pub async fn create_order(
    api: web::Data<OrderApi>,
    body: web::Json<NewOrderRequest>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    let price = Baht::try_from(request.total_price)
        .map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
    if !price.is_positive() {
        return Err(ServerError::InvalidRequestBody("total_price must be positive".to_string()));
    }
    let mut order = NewOrder::new(OrderId::random(), request.customer_name, request.service_name, price);
    if let Some(chat_user_id) = request.chat_user_id {
        order = order.with_chat_user(ChatUserId::from(chat_user_id));
    }
    let (order, _) = api.process_new_order(order).await?;
    Ok(HttpResponse::Created().json(order))
}

pub async fn get_order(api: web::Data<OrderApi>, path: web::Path<String>) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    let order = api
        .fetch_order(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id}")))?;
    Ok(HttpResponse::Ok().json(order))
}

/// A fresh PromptPay payload for the order's outstanding amount. Payloads are rebuilt on every
/// call and never stored.
pub async fn order_qr(
    api: web::Data<OrderApi>,
    config: web::Data<ServerConfig>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError> {
    let payee = config
        .promptpay_id
        .as_ref()
        .ok_or_else(|| ServerError::ConfigurationError("SPG_PROMPTPAY_ID is not configured".to_string()))?;
    let order_id = OrderId::from(path.into_inner());
    let order = api
        .fetch_order(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id}")))?;
    if !order.status.is_pending() {
        return Err(ServerError::OrderNotPayable(format!("Order {order_id} is {}", order.status)));
    }
    let payload = qr_payload(payee, Some(order.total_price));
    debug!("💳️ Generated QR payload for order {order_id}");
    Ok(HttpResponse::Ok().json(QrResponse { payload, amount: order.total_price.format_qr() }))
}

/// The web channel: the customer is on a specific order's payment page, so the order id rides
/// along as an explicit hint and no matching is needed.
pub async fn upload_slip<V: SlipVerifier>(
    api: web::Data<ReconciliationApi<SqliteDatabase, V>>,
    path: web::Path<String>,
    body: web::Json<SlipUpload>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    let upload = body.into_inner();
    let image = base64::decode(upload.image_base64.trim())
        .map_err(|e| ServerError::InvalidRequestBody(format!("image_base64 is not valid base64: {e}")))?;
    let mut submission = SlipSubmission::from_web(order_id, image);
    if let Some(url) = upload.proof_url {
        submission = submission.with_proof_url(url);
    }
    let result = api.process_slip(submission).await?;
    Ok(HttpResponse::Ok().json(SlipResultResponse::from(result)))
}

/// The chat channel: the platform forwards an image with only the sender's identity attached;
/// the engine infers which order it pays for. The webhook always acknowledges with 200 so the
/// platform does not retry deliveries we have already judged — per-event outcomes ride in the
/// response body.
pub async fn chat_webhook<V: SlipVerifier>(
    api: web::Data<ReconciliationApi<SqliteDatabase, V>>,
    config: web::Data<ServerConfig>,
    body: web::Json<ChatWebhookBody>,
    req: HttpRequest,
) -> Result<HttpResponse, ServerError> {
    let peer = get_remote_ip(&req, config.use_x_forwarded_for, config.use_forwarded);
    debug!("📨️ Chat webhook delivery from {peer:?} with {} event(s)", body.events.len());
    let mut results: Vec<SlipResultResponse> = Vec::new();
    for event in &body.events {
        if event.kind != "slip_image" {
            trace!("📨️ Ignoring chat event of type {}", event.kind);
            continue;
        }
        let (Some(payer_id), Some(image_base64)) = (&event.payer_id, &event.image_base64) else {
            warn!("📨️ slip_image event without payer_id or image payload; skipping");
            results.push(SlipResultResponse::from_error("malformed slip_image event"));
            continue;
        };
        let image = match base64::decode(image_base64.trim()) {
            Ok(image) => image,
            Err(e) => {
                warn!("📨️ slip_image event carried invalid base64: {e}");
                results.push(SlipResultResponse::from_error("image payload is not valid base64"));
                continue;
            },
        };
        let submission = SlipSubmission::from_chat(ChatUserId::from(payer_id.clone()), image);
        match api.process_slip(submission).await {
            Ok(result) => results.push(SlipResultResponse::from(result)),
            Err(e) => {
                // One bad event must not make the platform redeliver the whole batch
                error!("📨️ Error reconciling chat slip: {e}");
                results.push(SlipResultResponse::from_error(e.to_string()));
            },
        }
    }
    Ok(HttpResponse::Ok().json(results))
}
