use slip_payment_engine::traits::VerificationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Slip2GoApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("The verification service did not respond in time")]
    Timeout,
    #[error("Could not reach the verification service: {0}")]
    Transport(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Verification query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}

impl From<reqwest::Error> for Slip2GoApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// A down or misbehaving oracle is `Unavailable`; only a reachable oracle speaking gibberish is
/// an `InvalidResponse`. The distinction drives whether the submitter is told "try again" or
/// "contact support" — never "your slip is invalid".
impl From<Slip2GoApiError> for VerificationError {
    fn from(e: Slip2GoApiError) -> Self {
        match e {
            Slip2GoApiError::Timeout | Slip2GoApiError::Transport(_) | Slip2GoApiError::Initialization(_) => {
                VerificationError::Unavailable(e.to_string())
            },
            other => VerificationError::InvalidResponse(other.to_string()),
        }
    }
}
