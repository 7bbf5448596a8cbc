//! Slip Payment Engine
//!
//! The core of a PromptPay payment gateway for a small order-taking business. The engine owns
//! the parts with real failure modes and leaves everything presentational to its callers:
//!
//! 1. **QR encoding** ([`mod@promptpay`]): pure construction of the EMV merchant-presented QR
//!    payload a customer scans at checkout, checksum included.
//! 2. **Reconciliation** ([`ReconciliationApi`]): a payment slip arrives (web upload or a
//!    chat-forwarded photo), gets verified by the external oracle behind the
//!    [`traits::SlipVerifier`] seam, is matched onto one of the payer's pending orders
//!    ([`mod@matcher`]), and the order is moved `pending → paid` under a conditional update that
//!    makes the transition race-safe.
//! 3. **Order lifecycle** ([`OrderManagementApi`]): creation, queries, the admin-driven
//!    transitions, and the reminder/stale-order sweeps.
//!
//! Storage is abstracted behind [`traits::ReconciliationDatabase`]; a SQLite backend ships in
//! [`mod@db`]. The engine emits named events (payment confirmed, slip rejected, …) through a
//! small actor-style hook system ([`mod@events`]) so that an external messaging collaborator can
//! react without the engine knowing anything about message content or delivery.

mod db;

pub mod db_types;
pub mod events;
pub mod matcher;
pub mod promptpay;
mod spe_api;
pub mod traits;

#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use spe_api::{OrderManagementApi, ReconciliationApi, ReconciliationResult, RejectionReason, SlipSubmission};
