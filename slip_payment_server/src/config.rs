use std::env;

use chrono::Duration;
use log::*;
use slip2go_tools::Slip2GoConfig;
use slip_payment_engine::{matcher::MatchPolicy, promptpay::PayeeIdentifier};
use spg_common::{parse_boolean_flag, Secret};

const DEFAULT_SPG_HOST: &str = "127.0.0.1";
const DEFAULT_SPG_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/spg.db";
const DEFAULT_REMINDER_DELAY: Duration = Duration::minutes(30);
const DEFAULT_UNPAID_ORDER_TIMEOUT: Duration = Duration::hours(1);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The merchant's PromptPay destination. Checkout QR payloads cannot be generated while this
    /// is unset; everything else keeps working.
    pub promptpay_id: Option<PayeeIdentifier>,
    pub slip2go: Slip2GoConfig,
    /// Shared secret for the chat platform's webhook signature (HMAC-SHA256 over the raw body).
    pub chat_webhook_secret: Secret<String>,
    /// If false, webhook signatures are not checked. Only ever disable this on a closed network.
    pub chat_hmac_checks: bool,
    pub match_policy: MatchPolicy,
    /// How long a pending order may sit before the payer is nudged once.
    pub reminder_delay: Duration,
    /// How long a pending order may sit before it is cancelled as abandoned.
    pub unpaid_order_timeout: Duration,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address,
    /// rather than the connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SPG_HOST.to_string(),
            port: DEFAULT_SPG_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            promptpay_id: None,
            slip2go: Slip2GoConfig::default(),
            chat_webhook_secret: Secret::default(),
            chat_hmac_checks: true,
            match_policy: MatchPolicy::default(),
            reminder_delay: DEFAULT_REMINDER_DELAY,
            unpaid_order_timeout: DEFAULT_UNPAID_ORDER_TIMEOUT,
            use_x_forwarded_for: false,
            use_forwarded: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SPG_HOST").ok().unwrap_or_else(|| DEFAULT_SPG_HOST.into());
        let port = env::var("SPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SPG_PORT. {e} Using the default, {DEFAULT_SPG_PORT}, instead."
                    );
                    DEFAULT_SPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SPG_PORT);
        let database_url = env::var("SPG_DATABASE_URL").unwrap_or_else(|_| {
            info!("🪛️ SPG_DATABASE_URL is not set. Using the default.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let promptpay_id = match env::var("SPG_PROMPTPAY_ID") {
            Ok(s) => match s.parse::<PayeeIdentifier>() {
                Ok(id) => Some(id),
                Err(e) => {
                    error!("🪛️ SPG_PROMPTPAY_ID is not usable: {e}. QR generation will be disabled.");
                    None
                },
            },
            Err(_) => {
                warn!("🪛️ SPG_PROMPTPAY_ID is not set. QR generation will be disabled.");
                None
            },
        };
        let chat_webhook_secret = Secret::new(env::var("SPG_CHAT_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ SPG_CHAT_WEBHOOK_SECRET is not set. Chat webhook calls will fail the signature check.");
            String::default()
        }));
        let chat_hmac_checks = parse_boolean_flag(env::var("SPG_CHAT_HMAC_CHECKS").ok(), true);
        if !chat_hmac_checks {
            warn!("🪛️ Chat webhook HMAC checks are DISABLED. Anyone can submit slips. Don't do this in production.");
        }
        let match_policy = env::var("SPG_MATCH_POLICY")
            .ok()
            .map(|s| {
                s.parse::<MatchPolicy>().unwrap_or_else(|e| {
                    error!("🪛️ {e} Using the default policy instead.");
                    MatchPolicy::default()
                })
            })
            .unwrap_or_default();
        let reminder_delay = env_minutes("SPG_REMINDER_DELAY_MINUTES", DEFAULT_REMINDER_DELAY);
        let unpaid_order_timeout = env_minutes("SPG_UNPAID_ORDER_TIMEOUT_MINUTES", DEFAULT_UNPAID_ORDER_TIMEOUT);
        let use_x_forwarded_for = parse_boolean_flag(env::var("SPG_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("SPG_USE_FORWARDED").ok(), false);
        Self {
            host,
            port,
            database_url,
            promptpay_id,
            slip2go: Slip2GoConfig::new_from_env_or_default(),
            chat_webhook_secret,
            chat_hmac_checks,
            match_policy,
            reminder_delay,
            unpaid_order_timeout,
            use_x_forwarded_for,
            use_forwarded,
        }
    }
}

fn env_minutes(var: &str, default: Duration) -> Duration {
    match env::var(var) {
        Ok(s) => match s.parse::<i64>() {
            Ok(mins) if mins > 0 => Duration::minutes(mins),
            _ => {
                error!("🪛️ {s} is not a valid minute count for {var}. Using the default.");
                default
            },
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ServerConfig::default();
        assert_eq!(config.port, DEFAULT_SPG_PORT);
        assert!(config.chat_hmac_checks);
        assert!(config.promptpay_id.is_none());
        assert_eq!(config.match_policy, MatchPolicy::PreferNewest);
        assert_eq!(config.reminder_delay, Duration::minutes(30));
    }
}
