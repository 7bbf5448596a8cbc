use serde::{Deserialize, Serialize};
use spg_common::Baht;

use crate::{db_types::{ChatUserId, Order}, spe_api::RejectionReason};

/// A slip reconciled successfully and the order moved `pending → paid`. The external messaging
/// collaborator formats and delivers the customer-facing confirmation; the engine only names the
/// fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentConfirmedEvent {
    pub order: Order,
    /// The amount by which the slip overshot the order price. Positive values need a manual
    /// refund follow-up.
    pub excess: Baht,
}

impl PaymentConfirmedEvent {
    pub fn new(order: Order, excess: Baht) -> Self {
        Self { order, excess }
    }
}

/// A slip was rejected by the verification oracle. No order was touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlipRejectedEvent {
    pub payer: Option<ChatUserId>,
    pub reason: RejectionReason,
}

impl SlipRejectedEvent {
    pub fn new(payer: Option<ChatUserId>, reason: RejectionReason) -> Self {
        Self { payer, reason }
    }
}

/// An order left the payable path: cancelled by an admin or swept as stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order: Order,
}

impl OrderAnnulledEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// A pending order has been waiting long enough that the payer should be nudged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReminderEvent {
    pub order: Order,
}

impl PaymentReminderEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventType {
    PaymentConfirmed(PaymentConfirmedEvent),
    SlipRejected(SlipRejectedEvent),
    OrderAnnulled(OrderAnnulledEvent),
    PaymentReminder(PaymentReminderEvent),
}
