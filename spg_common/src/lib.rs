mod baht;
mod helpers;
pub mod op;
mod secret;

pub use baht::{Baht, BahtConversionError, PAYMENT_TOLERANCE, THB_CURRENCY_CODE, THB_NUMERIC_CODE};
pub use helpers::parse_boolean_flag;
pub use secret::Secret;
