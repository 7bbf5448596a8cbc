use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use spg_common::Baht;
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------      ChatUserId      ---------------------------------------------------------
/// The opaque chat-platform identity token that links a payer to their orders. Orders created on
/// the web without a linked chat account carry no `ChatUserId`, and slips for them can only be
/// reconciled through the explicit order hint.
#[derive(Clone, Debug, Type, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct ChatUserId(pub String);

impl Display for ChatUserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<S: Into<String>> From<S> for ChatUserId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl ChatUserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------        OrderId        --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A fresh order id for orders originating inside the gateway itself.
    pub fn random() -> Self {
        let suffix: String = rand::thread_rng().sample_iter(&Alphanumeric).take(12).map(char::from).collect();
        Self(format!("ord-{}", suffix.to_lowercase()))
    }
}

//--------------------------------------   OrderStatusType     --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// The order has been created and is waiting for a payment slip.
    Pending,
    /// A slip has been reconciled against the order and payment is confirmed.
    Paid,
    /// An admin has started work on the order.
    Processing,
    /// The work has been delivered. Terminal.
    Completed,
    /// The order was cancelled by the customer or an admin, or timed out unpaid. Terminal.
    Cancelled,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Completed | OrderStatusType::Cancelled)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, OrderStatusType::Pending)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "pending"),
            OrderStatusType::Paid => write!(f, "paid"),
            OrderStatusType::Processing => write!(f, "processing"),
            OrderStatusType::Completed => write!(f, "completed"),
            OrderStatusType::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------    SlipReference      --------------------------------------------------------
/// The idempotency stamp left on a paid order: the provider's transaction reference for the slip
/// that settled it, and (when the caller has stored the image with its file-storage collaborator)
/// a URL to the stored proof image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlipReference {
    pub transaction_ref: String,
    pub proof_url: Option<String>,
}

impl SlipReference {
    pub fn new<S: Into<String>>(transaction_ref: S) -> Self {
        Self { transaction_ref: transaction_ref.into(), proof_url: None }
    }

    pub fn with_proof_url(mut self, url: String) -> Self {
        self.proof_url = Some(url);
        self
    }
}

//--------------------------------------        Order       -----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub customer_name: String,
    pub service_name: String,
    pub chat_user_id: Option<ChatUserId>,
    pub total_price: Baht,
    pub payment_method: Option<String>,
    pub slip_ref: Option<String>,
    pub payment_proof_url: Option<String>,
    pub reminder_sent: bool,
    pub has_excess: bool,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      NewOrder       ----------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub customer_name: String,
    /// Which of the merchant's services is being bought. Free text as far as the engine cares.
    pub service_name: String,
    /// The chat identity of the payer, when the order was placed through (or linked to) the chat
    /// channel. Slips forwarded over chat can only reconcile against orders that carry this.
    pub chat_user_id: Option<ChatUserId>,
    pub total_price: Baht,
}

impl NewOrder {
    pub fn new<S1: Into<String>, S2: Into<String>>(
        order_id: OrderId,
        customer_name: S1,
        service_name: S2,
        total_price: Baht,
    ) -> Self {
        Self {
            order_id,
            customer_name: customer_name.into(),
            service_name: service_name.into(),
            chat_user_id: None,
            total_price,
        }
    }

    pub fn with_chat_user(mut self, chat_user_id: ChatUserId) -> Self {
        self.chat_user_id = Some(chat_user_id);
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_round_trip() {
        for status in
            [OrderStatusType::Pending, OrderStatusType::Paid, OrderStatusType::Processing, OrderStatusType::Completed, OrderStatusType::Cancelled]
        {
            assert_eq!(status.to_string().parse::<OrderStatusType>().unwrap(), status);
        }
        assert!("shipped".parse::<OrderStatusType>().is_err());
        assert_eq!(OrderStatusType::from("garbage".to_string()), OrderStatusType::Pending);
    }

    #[test]
    fn terminal_states() {
        assert!(OrderStatusType::Completed.is_terminal());
        assert!(OrderStatusType::Cancelled.is_terminal());
        assert!(!OrderStatusType::Paid.is_terminal());
        assert!(OrderStatusType::Pending.is_pending());
    }

    #[test]
    fn random_order_ids_are_unique() {
        let a = OrderId::random();
        let b = OrderId::random();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("ord-"));
    }
}
