use std::{env, time::Duration};

use log::*;
use spg_common::Secret;

use crate::VerdictMap;

const DEFAULT_VERIFY_URL: &str = "https://connect.slip2go.com/api/verify-slip/qr-base64/info";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct Slip2GoConfig {
    pub verify_url: String,
    pub secret_key: Secret<String>,
    /// Ceiling on one verification round trip. A provider that does not answer in time is
    /// treated exactly like one that is down.
    pub timeout: Duration,
    pub verdict_map: VerdictMap,
}

impl Default for Slip2GoConfig {
    fn default() -> Self {
        Self {
            verify_url: DEFAULT_VERIFY_URL.to_string(),
            secret_key: Secret::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            verdict_map: VerdictMap::default(),
        }
    }
}

impl Slip2GoConfig {
    pub fn new_from_env_or_default() -> Self {
        let verify_url = env::var("SPG_SLIP2GO_VERIFY_URL").unwrap_or_else(|_| DEFAULT_VERIFY_URL.to_string());
        let secret_key = Secret::new(env::var("SPG_SLIP2GO_SECRET_KEY").unwrap_or_else(|_| {
            warn!("🧾️ SPG_SLIP2GO_SECRET_KEY not set. Verification calls will be rejected by the provider.");
            String::default()
        }));
        let timeout = env::var("SPG_SLIP2GO_TIMEOUT_SECS")
            .ok()
            .map(|s| {
                s.parse::<u64>().unwrap_or_else(|e| {
                    error!(
                        "🧾️ {s} is not a valid value for SPG_SLIP2GO_TIMEOUT_SECS. {e} Using the default, \
                         {DEFAULT_TIMEOUT_SECS}, instead."
                    );
                    DEFAULT_TIMEOUT_SECS
                })
            })
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self {
            verify_url,
            secret_key,
            timeout: Duration::from_secs(timeout),
            verdict_map: VerdictMap::from_env_or_default(),
        }
    }

    pub fn with_secret_key(mut self, key: String) -> Self {
        self.secret_key = Secret::new(key);
        self
    }
}
