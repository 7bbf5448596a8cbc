//! Client for the Slip2Go slip-verification service.
//!
//! Slip2Go answers one question: is this photograph a genuine, first-seen bank-transfer slip,
//! and if so, how much moved and when? This crate wraps the HTTP round trip and — the part that
//! actually matters — maps Slip2Go's response-code space onto the engine's closed
//! [`slip_payment_engine::traits::SlipVerdict`]. The code values are configuration data
//! ([`VerdictMap`]), not hardcoded branches, because providers renumber.
//!
//! Transport failures and timeouts surface as
//! [`slip_payment_engine::traits::VerificationError::Unavailable`]; a down oracle is never
//! reported as a rejected slip.

mod api;
pub mod config;
pub mod data_objects;
mod error;
mod verdict;

pub use api::Slip2GoApi;
pub use config::Slip2GoConfig;
pub use error::Slip2GoApiError;
pub use verdict::VerdictMap;
