use serde::{Deserialize, Serialize};
use slip_payment_engine::ReconciliationResult;

//--------------------------------------   Request payloads   ---------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderRequest {
    pub customer_name: String,
    pub service_name: String,
    /// Decimal baht, e.g. `120` or `120.50`.
    pub total_price: f64,
    pub chat_user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlipUpload {
    pub image_base64: String,
    /// Where the storefront already stored the slip image, if it has.
    #[serde(default)]
    pub proof_url: Option<String>,
}

/// The chat platform's webhook envelope. Non-image events are acknowledged and ignored — text
/// handling, follow greetings and the like belong to the messaging collaborator, not the
/// payment gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatWebhookBody {
    #[serde(default)]
    pub events: Vec<ChatEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub payer_id: Option<String>,
    pub image_base64: Option<String>,
}

//--------------------------------------  Response payloads   ---------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Into<String>>(message: S) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn failure<S: Into<String>>(message: S) -> Self {
        Self { success: false, message: message.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrResponse {
    /// The literal EMV payload to render as a QR image; this server never rasterizes it.
    pub payload: String,
    pub amount: String,
}

/// What a slip submitter gets back, for either channel. Amounts are decimal-baht strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlipResultResponse {
    pub success: bool,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excess: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slip_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<String>>,
    pub message: String,
}

impl SlipResultResponse {
    /// A per-event failure entry for batch (webhook) processing, where one bad event must not
    /// fail the whole delivery.
    pub fn from_error<S: Into<String>>(message: S) -> Self {
        Self {
            success: false,
            status: "error".to_string(),
            order_id: None,
            excess: None,
            slip_amount: None,
            candidates: None,
            message: message.into(),
        }
    }
}

impl From<ReconciliationResult> for SlipResultResponse {
    fn from(result: ReconciliationResult) -> Self {
        let blank = Self {
            success: false,
            status: String::new(),
            order_id: None,
            excess: None,
            slip_amount: None,
            candidates: None,
            message: String::new(),
        };
        match result {
            ReconciliationResult::Matched { order_id, excess } => Self {
                success: true,
                status: "matched".to_string(),
                message: if excess.is_positive() {
                    format!("Payment confirmed, overpaid by {excess}. We will contact you about the refund.")
                } else {
                    "Payment confirmed.".to_string()
                },
                order_id: Some(order_id.0),
                excess: excess.is_positive().then(|| excess.format_qr()),
                ..blank
            },
            ReconciliationResult::AlreadyPaid { order_id } => Self {
                success: true,
                status: "already_paid".to_string(),
                message: "This order has already been paid for.".to_string(),
                order_id: Some(order_id.0),
                ..blank
            },
            ReconciliationResult::NoCandidate => Self {
                success: false,
                status: "no_candidate".to_string(),
                message: "No order is waiting for this payment. Please create an order first.".to_string(),
                ..blank
            },
            ReconciliationResult::AmountMismatch { slip_amount } => Self {
                success: false,
                status: "amount_mismatch".to_string(),
                message: format!("The slip amount ({slip_amount}) does not match any open order."),
                slip_amount: Some(slip_amount.format_qr()),
                ..blank
            },
            ReconciliationResult::ManualReviewRequired { candidates } => Self {
                success: false,
                status: "manual_review".to_string(),
                message: "Several open orders match this amount. An operator will confirm the payment manually."
                    .to_string(),
                candidates: Some(candidates.into_iter().map(|c| c.0).collect()),
                ..blank
            },
            ReconciliationResult::Rejected(reason) => Self {
                success: false,
                status: "rejected".to_string(),
                message: format!("The slip was rejected: {reason:?}"),
                ..blank
            },
        }
    }
}

#[cfg(test)]
mod test {
    use slip_payment_engine::{db_types::OrderId, RejectionReason};
    use spg_common::Baht;

    use super::*;

    #[test]
    fn matched_with_excess_reports_the_overshoot() {
        let result = ReconciliationResult::Matched {
            order_id: OrderId::from("ord-1".to_string()),
            excess: Baht::from_satang(90),
        };
        let response = SlipResultResponse::from(result);
        assert!(response.success);
        assert_eq!(response.status, "matched");
        assert_eq!(response.excess.as_deref(), Some("0.90"));
    }

    #[test]
    fn already_paid_is_a_success_for_the_submitter() {
        let result = ReconciliationResult::AlreadyPaid { order_id: OrderId::from("ord-1".to_string()) };
        let response = SlipResultResponse::from(result);
        assert!(response.success);
        assert_eq!(response.status, "already_paid");
    }

    #[test]
    fn rejections_are_failures() {
        let response = SlipResultResponse::from(ReconciliationResult::Rejected(RejectionReason::Duplicate));
        assert!(!response.success);
        assert_eq!(response.status, "rejected");
    }
}
