//! Behaviour contracts for the engine's collaborators.
//!
//! The engine itself owns no I/O. Two seams connect it to the outside world:
//!
//! * [`ReconciliationDatabase`] is what a storage backend must expose for the reconciliation and
//!   order-lifecycle flows to run against it. The SQLite backend in [`crate::db`] implements it;
//!   the contract is deliberately small so alternative stores stay feasible.
//! * [`SlipVerifier`] is the slip-verification oracle: hand it an image, get back a closed
//!   [`SlipVerdict`]. Concrete providers live in their own crates and map their response-code
//!   space onto the verdict here, keeping provider churn out of the engine.

mod reconciliation_database;
mod slip_verification;

pub use reconciliation_database::{MarkPaidOutcome, ReconciliationDatabase, ReconciliationError};
pub use slip_verification::{SlipOutcome, SlipVerdict, SlipVerifier, VerificationError};
