use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spg_common::Baht;
use thiserror::Error;

//--------------------------------------     SlipOutcome      ---------------------------------------------------------
/// What the oracle concluded about one slip image. The provider's response-code space collapses
/// to this closed set; anything a provider invents that we cannot place lands in `Unrecognized`
/// with the raw message preserved for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum SlipOutcome {
    /// A genuine, first-seen slip. The extracted amount is only present on this arm.
    Valid {
        amount: Baht,
        transaction_time: Option<DateTime<Utc>>,
    },
    /// The provider has seen this image before.
    Duplicate,
    /// Not a genuine slip.
    Fraudulent,
    /// The money went to an account that is not the configured payee.
    ReceiverMismatch,
    /// The slip's transaction date falls outside the provider's accepted window.
    DateOutOfRange,
    Unrecognized {
        message: String,
    },
}

//--------------------------------------     SlipVerdict      ---------------------------------------------------------
/// The normalized result of one verification call. Built once, consumed by the orchestrator,
/// then discarded — verdicts are never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlipVerdict {
    pub outcome: SlipOutcome,
    /// The provider's reference for the underlying bank transfer, when it reported one.
    pub transaction_ref: Option<String>,
    pub sender_name: Option<String>,
    pub receiver_name: Option<String>,
}

impl SlipVerdict {
    pub fn new(outcome: SlipOutcome) -> Self {
        Self { outcome, transaction_ref: None, sender_name: None, receiver_name: None }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.outcome, SlipOutcome::Valid { .. })
    }
}

//--------------------------------------  VerificationError   ---------------------------------------------------------
/// Failure to obtain *any* verdict. Distinct from a negative verdict: a down oracle must never
/// be read as "slip invalid" — the submitter gets "try again", not "rejected".
#[derive(Debug, Clone, Error)]
pub enum VerificationError {
    #[error("The slip verification service could not be reached: {0}")]
    Unavailable(String),
    #[error("The slip verification service returned an unusable response: {0}")]
    InvalidResponse(String),
}

//--------------------------------------     SlipVerifier     ---------------------------------------------------------
/// The slip-verification oracle.
#[allow(async_fn_in_trait)]
pub trait SlipVerifier {
    /// Submit one slip image for verification. When `expected_amount` is given, the provider is
    /// asked to enforce it as a floor check as well; the engine still applies its own tolerance
    /// comparison either way.
    async fn verify_slip(&self, image: &[u8], expected_amount: Option<Baht>) -> Result<SlipVerdict, VerificationError>;
}
