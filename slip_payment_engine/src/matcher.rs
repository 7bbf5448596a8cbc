//! Selects which pending order a verified slip pays for.
//!
//! The matcher is a pure function over a snapshot of the payer's open orders. It never touches
//! the store and never guesses: when no candidate's price falls inside the tolerance window the
//! answer is "no match", not "the closest one" — amount ambiguity is for an operator to resolve.

use std::str::FromStr;

use spg_common::{Baht, PAYMENT_TOLERANCE};
use thiserror::Error;

use crate::db_types::{ChatUserId, Order};

//--------------------------------------     MatchPolicy      ---------------------------------------------------------
/// What to do when several of a payer's pending orders fall within tolerance of the same slip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// Reconcile against the most recently created in-tolerance order. A payer who opens a new
    /// order almost always intends to pay that one next.
    #[default]
    PreferNewest,
    /// Never pick silently — more than one in-tolerance candidate requires operator confirmation.
    ManualReview,
}

#[derive(Debug, Clone, Error)]
#[error("Invalid match policy: {0}. Expected 'prefer_newest' or 'manual_review'")]
pub struct MatchPolicyParseError(String);

impl FromStr for MatchPolicy {
    type Err = MatchPolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prefer_newest" => Ok(Self::PreferNewest),
            "manual_review" => Ok(Self::ManualReview),
            other => Err(MatchPolicyParseError(other.to_string())),
        }
    }
}

//--------------------------------------     MatchOutcome     ---------------------------------------------------------
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    Matched {
        order: Order,
        /// How much the slip overshoots the order's price. Never silently dropped: the caller is
        /// responsible for prompting a manual refund of the excess.
        excess: Baht,
    },
    /// More than one order was within tolerance and the policy forbids guessing.
    Ambiguous(Vec<Order>),
    /// The payer has pending orders, but none within tolerance of the slip amount.
    AmountMismatch,
    /// The payer has no pending orders at all.
    NoCandidates,
}

/// Picks at most one of `candidates` to reconcile `slip_amount` against.
///
/// Candidates are first narrowed to pending orders belonging to `payer` (the store query already
/// does this, but the matcher does not trust its input), then to those whose price differs from
/// the slip amount by strictly less than [`PAYMENT_TOLERANCE`]. Ties are broken by creation
/// time, newest first, unless the policy demands manual review.
pub fn match_slip_to_order(
    payer: &ChatUserId,
    candidates: &[Order],
    slip_amount: Baht,
    policy: MatchPolicy,
) -> MatchOutcome {
    let mine: Vec<&Order> = candidates
        .iter()
        .filter(|o| o.status.is_pending())
        .filter(|o| o.chat_user_id.as_ref() == Some(payer))
        .collect();
    if mine.is_empty() {
        return MatchOutcome::NoCandidates;
    }
    let mut in_tolerance: Vec<&Order> =
        mine.into_iter().filter(|o| (slip_amount - o.total_price).abs() < PAYMENT_TOLERANCE).collect();
    if in_tolerance.is_empty() {
        return MatchOutcome::AmountMismatch;
    }
    if in_tolerance.len() > 1 && policy == MatchPolicy::ManualReview {
        return MatchOutcome::Ambiguous(in_tolerance.into_iter().cloned().collect());
    }
    // Row ids break ties between orders created within the same timestamp granule
    in_tolerance.sort_by_key(|o| (o.created_at, o.id));
    let order = match in_tolerance.pop() {
        Some(o) => o.clone(),
        None => return MatchOutcome::AmountMismatch,
    };
    let overshoot = slip_amount - order.total_price;
    let excess = if overshoot.is_positive() { overshoot } else { Baht::default() };
    MatchOutcome::Matched { order, excess }
}

#[cfg(test)]
mod test {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::db_types::{OrderId, OrderStatusType};

    fn order(id: i64, payer: &str, price: Baht, minutes_ago: i64) -> Order {
        let now = Utc::now();
        Order {
            id,
            order_id: OrderId::from(format!("ord-{id}")),
            customer_name: "Somchai".to_string(),
            service_name: "volunteer-hours".to_string(),
            chat_user_id: Some(ChatUserId::from(payer)),
            total_price: price,
            payment_method: None,
            slip_ref: None,
            payment_proof_url: None,
            reminder_sent: false,
            has_excess: false,
            status: OrderStatusType::Pending,
            created_at: now - Duration::minutes(minutes_ago),
            updated_at: now - Duration::minutes(minutes_ago),
        }
    }

    fn payer() -> ChatUserId {
        ChatUserId::from("U1234")
    }

    #[test]
    fn exact_amount_matches() {
        let orders = vec![order(1, "U1234", Baht::from_baht(120), 5)];
        let outcome = match_slip_to_order(&payer(), &orders, Baht::from_baht(120), MatchPolicy::PreferNewest);
        assert!(matches!(outcome, MatchOutcome::Matched { ref order, excess } if order.id == 1 && excess == Baht::default()));
    }

    #[test]
    fn sub_baht_difference_is_within_tolerance() {
        let orders = vec![order(1, "U1234", Baht::from_baht(120), 5)];
        let slip = Baht::try_from(120.999).unwrap();
        match match_slip_to_order(&payer(), &orders, slip, MatchPolicy::PreferNewest) {
            MatchOutcome::Matched { order, excess } => {
                assert_eq!(order.id, 1);
                assert_eq!(excess, slip - Baht::from_baht(120));
            },
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn out_of_tolerance_is_a_mismatch_not_a_guess() {
        let orders = vec![order(1, "U1234", Baht::from_baht(120), 5)];
        let slip = Baht::try_from(121.01).unwrap();
        assert!(matches!(
            match_slip_to_order(&payer(), &orders, slip, MatchPolicy::PreferNewest),
            MatchOutcome::AmountMismatch
        ));
    }

    #[test]
    fn payers_never_cross_match() {
        let orders = vec![order(1, "U9999", Baht::from_baht(120), 5)];
        assert!(matches!(
            match_slip_to_order(&payer(), &orders, Baht::from_baht(120), MatchPolicy::PreferNewest),
            MatchOutcome::NoCandidates
        ));
    }

    #[test]
    fn newest_in_tolerance_order_wins() {
        let orders = vec![
            order(1, "U1234", Baht::from_baht(120), 60),
            order(2, "U1234", Baht::from_baht(120), 5),
            order(3, "U1234", Baht::from_baht(500), 1),
        ];
        match match_slip_to_order(&payer(), &orders, Baht::from_baht(120), MatchPolicy::PreferNewest) {
            MatchOutcome::Matched { order, .. } => assert_eq!(order.id, 2),
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn manual_review_policy_refuses_to_pick() {
        let orders =
            vec![order(1, "U1234", Baht::from_baht(120), 60), order(2, "U1234", Baht::from_baht(120), 5)];
        match match_slip_to_order(&payer(), &orders, Baht::from_baht(120), MatchPolicy::ManualReview) {
            MatchOutcome::Ambiguous(candidates) => assert_eq!(candidates.len(), 2),
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn single_candidate_is_fine_under_manual_review() {
        let orders = vec![order(1, "U1234", Baht::from_baht(120), 5)];
        assert!(matches!(
            match_slip_to_order(&payer(), &orders, Baht::from_baht(120), MatchPolicy::ManualReview),
            MatchOutcome::Matched { .. }
        ));
    }

    #[test]
    fn non_pending_candidates_are_ignored() {
        let mut paid = order(1, "U1234", Baht::from_baht(120), 5);
        paid.status = OrderStatusType::Paid;
        assert!(matches!(
            match_slip_to_order(&payer(), &[paid], Baht::from_baht(120), MatchPolicy::PreferNewest),
            MatchOutcome::NoCandidates
        ));
    }
}
