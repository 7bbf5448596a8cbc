use chrono::DateTime;
use log::*;
use regex::Regex;
use slip_payment_engine::traits::{SlipOutcome, SlipVerdict};
use spg_common::Baht;

use crate::data_objects::VerifyResponse;

const DEFAULT_SUCCESS_CODES: &[&str] = &["200"];
const DEFAULT_SUCCESS_PREFIXES: &[&str] = &["2002"];
const DEFAULT_DUPLICATE_CODES: &[&str] = &["200501"];
const DEFAULT_FRAUD_CODES: &[&str] = &["200500"];
const DEFAULT_RECEIVER_MISMATCH_CODES: &[&str] = &["200401"];
const DEFAULT_DATE_RANGE_PATTERN: &str = r"(?i)date is not in range";

//--------------------------------------      VerdictMap      ---------------------------------------------------------
/// The mapping from the provider's response-code space to the engine's verdict enumeration.
///
/// This is configuration, not business logic: providers renumber their codes, and when they do
/// the fix is an environment variable, not a release. The defaults are the values observed from
/// Slip2Go in production.
#[derive(Debug, Clone)]
pub struct VerdictMap {
    pub success_codes: Vec<String>,
    /// Code *prefixes* treated as success; Slip2Go reports fine-grained success sub-codes
    /// (e.g. `200200` "Slip is valid") under a common prefix.
    pub success_prefixes: Vec<String>,
    pub duplicate_codes: Vec<String>,
    pub fraud_codes: Vec<String>,
    pub receiver_mismatch_codes: Vec<String>,
    /// Matched against the human-readable message of otherwise-unclassified failures.
    pub date_range_pattern: Regex,
}

impl Default for VerdictMap {
    fn default() -> Self {
        Self {
            success_codes: to_owned(DEFAULT_SUCCESS_CODES),
            success_prefixes: to_owned(DEFAULT_SUCCESS_PREFIXES),
            duplicate_codes: to_owned(DEFAULT_DUPLICATE_CODES),
            fraud_codes: to_owned(DEFAULT_FRAUD_CODES),
            receiver_mismatch_codes: to_owned(DEFAULT_RECEIVER_MISMATCH_CODES),
            date_range_pattern: Regex::new(DEFAULT_DATE_RANGE_PATTERN).unwrap(),
        }
    }
}

impl VerdictMap {
    /// Builds the map from `SPG_SLIP2GO_*_CODES` environment variables (comma-separated lists),
    /// falling back to the observed defaults per list.
    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let date_range_pattern = match std::env::var("SPG_SLIP2GO_DATE_RANGE_PATTERN") {
            Ok(s) => Regex::new(&s).unwrap_or_else(|e| {
                error!("🧾️ SPG_SLIP2GO_DATE_RANGE_PATTERN is not a valid pattern ({e}). Using the default.");
                defaults.date_range_pattern.clone()
            }),
            Err(_) => defaults.date_range_pattern.clone(),
        };
        Self {
            success_codes: env_code_list("SPG_SLIP2GO_SUCCESS_CODES", DEFAULT_SUCCESS_CODES),
            success_prefixes: env_code_list("SPG_SLIP2GO_SUCCESS_PREFIXES", DEFAULT_SUCCESS_PREFIXES),
            duplicate_codes: env_code_list("SPG_SLIP2GO_DUPLICATE_CODES", DEFAULT_DUPLICATE_CODES),
            fraud_codes: env_code_list("SPG_SLIP2GO_FRAUD_CODES", DEFAULT_FRAUD_CODES),
            receiver_mismatch_codes: env_code_list("SPG_SLIP2GO_MISMATCH_CODES", DEFAULT_RECEIVER_MISMATCH_CODES),
            date_range_pattern,
        }
    }

    /// Collapses one provider response into the engine's verdict.
    ///
    /// Precedence follows the provider's own semantics: the explicit rejection codes win over
    /// the success family, and the date-range message sniff only applies to responses that were
    /// not classified by code. Anything left over is `Unrecognized`, carrying the raw message
    /// for display to the submitter.
    pub fn verdict(&self, response: &VerifyResponse) -> SlipVerdict {
        let code = response.code.as_str();
        let data = response.data.as_ref();
        let flagged_duplicate = data.and_then(|d| d.is_duplicate).unwrap_or(false);

        let outcome = if self.duplicate_codes.iter().any(|c| c == code) || flagged_duplicate {
            SlipOutcome::Duplicate
        } else if self.fraud_codes.iter().any(|c| c == code) {
            SlipOutcome::Fraudulent
        } else if self.receiver_mismatch_codes.iter().any(|c| c == code) {
            SlipOutcome::ReceiverMismatch
        } else if self.success_codes.iter().any(|c| c == code)
            || self.success_prefixes.iter().any(|p| !p.is_empty() && code.starts_with(p.as_str()))
        {
            self.valid_outcome(response)
        } else if response.message.as_deref().is_some_and(|m| self.date_range_pattern.is_match(m)) {
            SlipOutcome::DateOutOfRange
        } else {
            SlipOutcome::Unrecognized { message: unrecognized_message(response) }
        };

        SlipVerdict {
            outcome,
            transaction_ref: data.and_then(|d| d.trans_ref.clone()),
            sender_name: data.and_then(|d| d.sender.as_ref()).and_then(|p| p.best_name()),
            receiver_name: data.and_then(|d| d.receiver.as_ref()).and_then(|p| p.best_name()),
        }
    }

    /// A success code still needs a readable amount to be worth anything to the matcher.
    fn valid_outcome(&self, response: &VerifyResponse) -> SlipOutcome {
        let Some(amount) = response.data.as_ref().and_then(|d| d.amount) else {
            warn!("🧾️ Provider reported success (code {}) but no amount was extracted", response.code);
            return SlipOutcome::Unrecognized {
                message: "the provider accepted the slip but could not read an amount from it".to_string(),
            };
        };
        let amount = match Baht::try_from(amount) {
            Ok(amount) => amount,
            Err(e) => {
                warn!("🧾️ Provider reported an unusable amount: {e}");
                return SlipOutcome::Unrecognized { message: format!("unusable slip amount: {e}") };
            },
        };
        let transaction_time = response
            .data
            .as_ref()
            .and_then(|d| d.transaction_date.as_deref())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&chrono::Utc));
        SlipOutcome::Valid { amount, transaction_time }
    }
}

fn unrecognized_message(response: &VerifyResponse) -> String {
    match response.message.as_deref() {
        Some(m) if !m.trim().is_empty() => m.to_string(),
        _ => format!("the provider returned unclassified code {}", response.code),
    }
}

fn to_owned(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|s| s.to_string()).collect()
}

fn env_code_list(var: &str, default: &[&str]) -> Vec<String> {
    match std::env::var(var) {
        Ok(s) if !s.trim().is_empty() => s.split(',').map(|c| c.trim().to_string()).collect(),
        _ => to_owned(default),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data_objects::SlipData;

    fn response(code: &str, message: Option<&str>, data: Option<SlipData>) -> VerifyResponse {
        VerifyResponse { code: code.to_string(), message: message.map(String::from), data }
    }

    fn amount_data(amount: f64) -> SlipData {
        SlipData { amount: Some(amount), ..Default::default() }
    }

    #[test]
    fn success_family_maps_to_valid_with_amount() {
        let map = VerdictMap::default();
        for code in ["200", "200200", "200201"] {
            let verdict = map.verdict(&response(code, Some("Slip is valid."), Some(amount_data(120.0))));
            match verdict.outcome {
                SlipOutcome::Valid { amount, .. } => assert_eq!(amount, Baht::from_baht(120)),
                other => panic!("code {code} should be valid, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejection_codes_map_to_their_outcomes() {
        let map = VerdictMap::default();
        assert_eq!(map.verdict(&response("200501", None, None)).outcome, SlipOutcome::Duplicate);
        assert_eq!(map.verdict(&response("200500", None, None)).outcome, SlipOutcome::Fraudulent);
        assert_eq!(map.verdict(&response("200401", None, None)).outcome, SlipOutcome::ReceiverMismatch);
    }

    #[test]
    fn duplicate_data_flag_wins_even_with_a_success_code() {
        let map = VerdictMap::default();
        let mut data = amount_data(120.0);
        data.is_duplicate = Some(true);
        assert_eq!(map.verdict(&response("200200", None, Some(data))).outcome, SlipOutcome::Duplicate);
    }

    #[test]
    fn date_range_message_is_sniffed_from_unclassified_failures() {
        let map = VerdictMap::default();
        let verdict = map.verdict(&response("400400", Some("Slip date is not in range."), None));
        assert_eq!(verdict.outcome, SlipOutcome::DateOutOfRange);
    }

    #[test]
    fn unknown_codes_carry_the_raw_message() {
        let map = VerdictMap::default();
        let verdict = map.verdict(&response("999999", Some("mercury is in retrograde"), None));
        assert_eq!(verdict.outcome, SlipOutcome::Unrecognized { message: "mercury is in retrograde".to_string() });
        let verdict = map.verdict(&response("999999", None, None));
        assert!(matches!(verdict.outcome, SlipOutcome::Unrecognized { message } if message.contains("999999")));
    }

    #[test]
    fn success_without_an_amount_is_not_valid() {
        let map = VerdictMap::default();
        let verdict = map.verdict(&response("200200", Some("Slip is valid."), Some(SlipData::default())));
        assert!(matches!(verdict.outcome, SlipOutcome::Unrecognized { .. }));
    }

    #[test]
    fn extracted_fields_ride_along() {
        let map = VerdictMap::default();
        let data = SlipData {
            amount: Some(250.0),
            transaction_date: Some("2024-06-01T10:30:00+07:00".to_string()),
            trans_ref: Some("TX-12345".to_string()),
            sender: Some(crate::data_objects::Party { name: Some("SOMCHAI J".into()), display_name: None }),
            ..Default::default()
        };
        let verdict = map.verdict(&response("200200", None, Some(data)));
        assert_eq!(verdict.transaction_ref.as_deref(), Some("TX-12345"));
        assert_eq!(verdict.sender_name.as_deref(), Some("SOMCHAI J"));
        match verdict.outcome {
            SlipOutcome::Valid { transaction_time, .. } => assert!(transaction_time.is_some()),
            other => panic!("expected valid, got {other:?}"),
        }
    }
}
