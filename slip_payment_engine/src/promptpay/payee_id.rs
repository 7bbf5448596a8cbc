use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A normalized PromptPay payment destination.
///
/// PromptPay addresses payees by a proxy value: a Thai mobile number or a 13-digit national/tax
/// id. The wire form is always 13 characters; mobile numbers are rewritten with the `0066`
/// country prefix, replacing the leading zero. Construction is the only place validation
/// happens — once built, the identifier is immutable and always valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayeeIdentifier(String);

#[derive(Debug, Clone, Error)]
#[error("Invalid PromptPay payee id: {0}")]
pub struct PayeeIdError(String);

impl PayeeIdentifier {
    pub fn new(raw: &str) -> Result<Self, PayeeIdError> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        let normalized = match digits.len() {
            // Mobile number: swap the leading zero for the 0066 country prefix
            10 => format!("0066{}", &digits[1..]),
            // Mobile number already stripped of its leading zero
            9 => format!("0066{digits}"),
            // National id / tax id: used verbatim
            13 => digits,
            n => {
                return Err(PayeeIdError(format!(
                    "expected a 10-digit mobile number or a 13-digit national id, but {n} digits remain after \
                     stripping formatting"
                )))
            },
        };
        Ok(Self(normalized))
    }

    /// The 13-character proxy value carried in merchant-account sub-field 01.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PayeeIdentifier {
    type Err = PayeeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Display for PayeeIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mobile_number_is_prefixed() {
        let id = PayeeIdentifier::new("0812345678").unwrap();
        assert_eq!(id.as_str(), "0066812345678");
        assert_eq!(id.as_str().len(), 13);
    }

    #[test]
    fn formatting_characters_are_stripped() {
        let id = PayeeIdentifier::new("081-234-5678").unwrap();
        assert_eq!(id.as_str(), "0066812345678");
    }

    #[test]
    fn nine_digit_mobile_is_accepted() {
        let id = PayeeIdentifier::new("812345678").unwrap();
        assert_eq!(id.as_str(), "0066812345678");
    }

    #[test]
    fn national_id_is_verbatim() {
        let id = PayeeIdentifier::new("1234567890123").unwrap();
        assert_eq!(id.as_str(), "1234567890123");
    }

    #[test]
    fn wrong_lengths_are_rejected() {
        assert!(PayeeIdentifier::new("1234567").is_err());
        assert!(PayeeIdentifier::new("").is_err());
        assert!(PayeeIdentifier::new("12345678901234").is_err());
    }
}
