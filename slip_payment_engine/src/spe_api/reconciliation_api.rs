use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};
use spg_common::{Baht, PAYMENT_TOLERANCE};

use crate::{
    db_types::{ChatUserId, Order, OrderId, SlipReference},
    events::{EventProducers, PaymentConfirmedEvent, SlipRejectedEvent},
    matcher::{match_slip_to_order, MatchOutcome, MatchPolicy},
    traits::{MarkPaidOutcome, ReconciliationDatabase, ReconciliationError, SlipOutcome, SlipVerdict, SlipVerifier},
};

//--------------------------------------   SlipSubmission     ---------------------------------------------------------
/// One inbound slip, from either entry channel. The two channels differ only in what they know:
/// a web upload happens on a specific order's payment page and carries that order's id as an
/// explicit hint; a chat-forwarded image carries only the payer's identity and the order must be
/// inferred by the matcher.
#[derive(Debug, Clone)]
pub struct SlipSubmission {
    pub image: Vec<u8>,
    pub payer: Option<ChatUserId>,
    pub order_hint: Option<OrderId>,
    /// Where the caller stored the slip image with its file-storage collaborator, if it has.
    pub proof_url: Option<String>,
}

impl SlipSubmission {
    pub fn from_web(order_id: OrderId, image: Vec<u8>) -> Self {
        Self { image, payer: None, order_hint: Some(order_id), proof_url: None }
    }

    pub fn from_chat(payer: ChatUserId, image: Vec<u8>) -> Self {
        Self { image, payer: Some(payer), order_hint: None, proof_url: None }
    }

    pub fn with_proof_url(mut self, url: String) -> Self {
        self.proof_url = Some(url);
        self
    }
}

//--------------------------------------   RejectionReason    ---------------------------------------------------------
/// Why the oracle refused a slip. Mirrors the non-valid [`SlipOutcome`] arms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum RejectionReason {
    Duplicate,
    Fraudulent,
    ReceiverMismatch,
    DateOutOfRange,
    Unrecognized { message: String },
}

//--------------------------------------ReconciliationResult  ---------------------------------------------------------
/// The business outcome of one orchestration attempt. Backend failures are *not* represented
/// here — they surface as [`ReconciliationError`] so callers can distinguish "the slip didn't
/// match" from "the gateway broke".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum ReconciliationResult {
    /// The slip settled this order.
    Matched { order_id: OrderId, excess: Baht },
    /// The referenced order had already been reconciled (race or repeat submission).
    /// Informational, never an error: nothing changed and no event fired.
    AlreadyPaid { order_id: OrderId },
    /// The payer has no pending orders to pay for.
    NoCandidate,
    /// Pending orders exist, but none within tolerance of the slip amount.
    AmountMismatch { slip_amount: Baht },
    /// Several orders were within tolerance and the policy forbids guessing.
    ManualReviewRequired { candidates: Vec<OrderId> },
    /// The oracle refused the slip. No order was touched.
    Rejected(RejectionReason),
}

//--------------------------------------  ReconciliationApi   ---------------------------------------------------------
/// The state-machine driver for slip submissions.
///
/// One instance is shared across all inbound slip events; submissions for different payers run
/// freely in parallel. The only serialization point is the conditional status update inside the
/// database backend, which guarantees at most one `pending → paid` transition per order no
/// matter how many submissions race.
pub struct ReconciliationApi<B, V> {
    db: B,
    verifier: V,
    policy: MatchPolicy,
    producers: EventProducers,
}

impl<B, V> Debug for ReconciliationApi<B, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B, V> ReconciliationApi<B, V> {
    pub fn new(db: B, verifier: V, policy: MatchPolicy, producers: EventProducers) -> Self {
        Self { db, verifier, policy, producers }
    }
}

impl<B, V> ReconciliationApi<B, V>
where
    B: ReconciliationDatabase,
    V: SlipVerifier,
{
    /// Runs one slip submission through the full reconciliation sequence.
    ///
    /// 1. A hinted order that is no longer `pending` short-circuits *before* the oracle is
    ///    called: no verification credit is spent and no side effect can double-fire.
    /// 2. The oracle verdict is obtained. Any non-valid outcome stops here; no order is touched.
    /// 3. Hinted submissions settle directly against the hinted order; chat submissions run the
    ///    matcher over the payer's pending orders.
    /// 4. Settling is a single conditional update. Losing the race is reported as
    ///    [`ReconciliationResult::AlreadyPaid`], not an error.
    ///
    /// Oracle transport failures propagate as [`ReconciliationError::VerificationError`] — the
    /// caller decides whether to invite a resubmission. There are no retries here.
    pub async fn process_slip(&self, submission: SlipSubmission) -> Result<ReconciliationResult, ReconciliationError> {
        let hinted = match &submission.order_hint {
            Some(oid) => {
                let order = self
                    .db
                    .fetch_order_by_order_id(oid)
                    .await?
                    .ok_or_else(|| ReconciliationError::OrderNotFound(oid.clone()))?;
                if !order.status.is_pending() {
                    debug!("🔄️🧾️ Order {oid} is already {}; skipping oracle call", order.status);
                    // A cancelled order has nothing to pay for; every other non-pending status
                    // means the money already arrived.
                    return Ok(match order.status {
                        crate::db_types::OrderStatusType::Cancelled => ReconciliationResult::NoCandidate,
                        _ => ReconciliationResult::AlreadyPaid { order_id: order.order_id },
                    });
                }
                Some(order)
            },
            None => None,
        };

        let expected_amount = hinted.as_ref().map(|o| o.total_price);
        let verdict = self.verifier.verify_slip(&submission.image, expected_amount).await?;
        let slip_amount = match &verdict.outcome {
            SlipOutcome::Valid { amount, .. } => *amount,
            other => {
                let reason = rejection_reason(other);
                info!("🔄️🧾️ Slip rejected by oracle: {reason:?}");
                self.call_slip_rejected_hook(submission.payer.clone(), reason.clone()).await;
                return Ok(ReconciliationResult::Rejected(reason));
            },
        };

        match hinted {
            Some(order) => self.settle(order, slip_amount, &verdict, submission.proof_url).await,
            None => {
                let payer = submission.payer.clone().ok_or(ReconciliationError::MissingPayerIdentity)?;
                let candidates = self.db.fetch_pending_orders_for_payer(&payer).await?;
                trace!("🔄️🧾️ {} pending orders fetched for payer {payer}", candidates.len());
                match match_slip_to_order(&payer, &candidates, slip_amount, self.policy) {
                    MatchOutcome::Matched { order, .. } => {
                        self.settle(order, slip_amount, &verdict, submission.proof_url).await
                    },
                    MatchOutcome::NoCandidates => Ok(ReconciliationResult::NoCandidate),
                    MatchOutcome::AmountMismatch => Ok(ReconciliationResult::AmountMismatch { slip_amount }),
                    MatchOutcome::Ambiguous(orders) => Ok(ReconciliationResult::ManualReviewRequired {
                        candidates: orders.into_iter().map(|o| o.order_id).collect(),
                    }),
                }
            },
        }
    }

    /// Commits the `pending → paid` transition for `order` against the verified `slip_amount`.
    /// The tolerance check runs here for both entry paths; the matcher has already applied it
    /// for inferred matches, but a hinted order has not been amount-checked yet.
    async fn settle(
        &self,
        order: Order,
        slip_amount: Baht,
        verdict: &SlipVerdict,
        proof_url: Option<String>,
    ) -> Result<ReconciliationResult, ReconciliationError> {
        if (slip_amount - order.total_price).abs() >= PAYMENT_TOLERANCE {
            info!(
                "🔄️🧾️ Slip amount {slip_amount} is not within tolerance of {} for order {}",
                order.total_price, order.order_id
            );
            return Ok(ReconciliationResult::AmountMismatch { slip_amount });
        }
        let overshoot = slip_amount - order.total_price;
        let excess = if overshoot.is_positive() { overshoot } else { Baht::default() };
        let mut slip = match &verdict.transaction_ref {
            Some(tx_ref) => SlipReference::new(tx_ref.clone()),
            None => SlipReference::new(format!("unreferenced-{}", order.order_id.as_str())),
        };
        if let Some(url) = proof_url {
            slip = slip.with_proof_url(url);
        }
        match self.db.mark_order_paid(&order.order_id, &slip, excess).await? {
            MarkPaidOutcome::Paid(order) => {
                debug!("🔄️🧾️ Order {} reconciled and marked as paid", order.order_id);
                if excess.is_positive() {
                    info!("🔄️🧾️ Order {} was overpaid by {excess}; flagging for manual refund", order.order_id);
                }
                let order_id = order.order_id.clone();
                self.call_payment_confirmed_hook(order, excess).await;
                Ok(ReconciliationResult::Matched { order_id, excess })
            },
            MarkPaidOutcome::AlreadyReconciled(order) => {
                debug!("🔄️🧾️ Order {} was reconciled by a concurrent submission", order.order_id);
                Ok(ReconciliationResult::AlreadyPaid { order_id: order.order_id })
            },
        }
    }

    async fn call_payment_confirmed_hook(&self, order: Order, excess: Baht) {
        for emitter in &self.producers.payment_confirmed_producer {
            trace!("🔄️🧾️ Notifying payment confirmed hook subscribers");
            let event = PaymentConfirmedEvent::new(order.clone(), excess);
            emitter.publish_event(event).await;
        }
    }

    async fn call_slip_rejected_hook(&self, payer: Option<ChatUserId>, reason: RejectionReason) {
        for emitter in &self.producers.slip_rejected_producer {
            trace!("🔄️🧾️ Notifying slip rejected hook subscribers");
            let event = SlipRejectedEvent::new(payer.clone(), reason.clone());
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

/// Collapses a non-valid oracle outcome into the reason reported to the submitter.
/// A `Valid` outcome never reaches this point; it would indicate a broken caller, so it maps to
/// an `Unrecognized` reason rather than panicking.
fn rejection_reason(outcome: &SlipOutcome) -> RejectionReason {
    match outcome {
        SlipOutcome::Duplicate => RejectionReason::Duplicate,
        SlipOutcome::Fraudulent => RejectionReason::Fraudulent,
        SlipOutcome::ReceiverMismatch => RejectionReason::ReceiverMismatch,
        SlipOutcome::DateOutOfRange => RejectionReason::DateOutOfRange,
        SlipOutcome::Unrecognized { message } => RejectionReason::Unrecognized { message: message.clone() },
        SlipOutcome::Valid { .. } => {
            RejectionReason::Unrecognized { message: "internal: valid verdict routed to rejection".to_string() }
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db_types::OrderId;

    #[test]
    fn results_serialize_with_a_result_tag() {
        let matched =
            ReconciliationResult::Matched { order_id: OrderId::from("ord-1".to_string()), excess: Baht::default() };
        let json = serde_json::to_value(&matched).unwrap();
        assert_eq!(json["result"], "matched");
        assert_eq!(json["order_id"], "ord-1");

        let rejected = ReconciliationResult::Rejected(RejectionReason::DateOutOfRange);
        let json = serde_json::to_value(&rejected).unwrap();
        assert_eq!(json["result"], "rejected");
    }

    #[test]
    fn every_nonvalid_outcome_maps_to_its_reason() {
        assert_eq!(rejection_reason(&SlipOutcome::Duplicate), RejectionReason::Duplicate);
        assert_eq!(rejection_reason(&SlipOutcome::Fraudulent), RejectionReason::Fraudulent);
        assert_eq!(rejection_reason(&SlipOutcome::ReceiverMismatch), RejectionReason::ReceiverMismatch);
        assert_eq!(rejection_reason(&SlipOutcome::DateOutOfRange), RejectionReason::DateOutOfRange);
        assert_eq!(
            rejection_reason(&SlipOutcome::Unrecognized { message: "?".into() }),
            RejectionReason::Unrecognized { message: "?".into() }
        );
    }
}
