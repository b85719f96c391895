use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

use super::models::OptionSide;

// -----------------------------------------------
// TDA API ENDPOINTS
// -----------------------------------------------
pub const TDA_BASE_URL: &str = "https://api.tdameritrade.com";
pub const TDA_AUTH_URL: &str = "https://auth.tdameritrade.com/auth";
pub const TDA_TOKEN_URL: &str = "https://api.tdameritrade.com/v1/oauth2/token";

/// Success sentinel in the chain envelope's status field.
pub const STATUS_SUCCESS: &str = "SUCCESS";

pub fn chain_url(
    symbol: &str,
    api_key: &str,
    side: OptionSide,
    from: NaiveDate,
    to: NaiveDate,
) -> String {
    format!(
        "{}/v1/marketdata/chains?apikey={}&symbol={}&contractType={}&strikeCount=5&range=SBK&fromDate={}&toDate={}",
        TDA_BASE_URL,
        urlencoding::encode(api_key),
        urlencoding::encode(symbol),
        side.as_str(),
        from.format("%Y-%m-%d"),
        to.format("%Y-%m-%d"),
    )
}

pub fn quote_url(symbol: &str, api_key: &str) -> String {
    format!(
        "{}/v1/marketdata/{}/quotes?apikey={}",
        TDA_BASE_URL,
        urlencoding::encode(symbol),
        urlencoding::encode(api_key),
    )
}

pub fn accounts_url() -> String {
    format!("{TDA_BASE_URL}/v1/accounts")
}

pub fn account_url(account_id: &str) -> String {
    format!(
        "{}/v1/accounts/{}?fields=positions",
        TDA_BASE_URL,
        urlencoding::encode(account_id),
    )
}

// -----------------------------------------------
// ENGINE DEFAULTS
// -----------------------------------------------
pub const DEFAULT_MIN_OPEN_INTEREST: u32 = 10;
pub const DEFAULT_MULTIPLIER: f64 = 100.0;
pub const DEFAULT_SUGGESTION_COUNT: usize = 3;

/// How far out the chain request looks for expirations.
pub const CHAIN_WINDOW_DAYS: i64 = 45;

/// Tunables of the normalization and ranking pipeline. Passed in rather
/// than compiled in so tests can run with arbitrary thresholds.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Liquidity floor: contracts with less open interest are skipped.
    pub min_open_interest: u32,

    /// Used when the chain omits a contract's multiplier. 100 is the
    /// standard US equity contract size.
    pub default_multiplier: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_open_interest: DEFAULT_MIN_OPEN_INTEREST,
            default_multiplier: DEFAULT_MULTIPLIER,
        }
    }
}

// -----------------------------------------------
// HTTP CLIENT CONFIG
// -----------------------------------------------
pub const USER_AGENT: &str = "put-screener/0.2";

pub const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

pub const RETRY_BASE_DELAY_MS: u64 = 100;
pub const RETRY_FACTOR: u64 = 2;
pub const RETRY_MAX_DELAY_SECS: u64 = 3;
pub const RETRY_MAX_ATTEMPTS: usize = 3;

// -----------------------------------------------
// APP SETTINGS
// -----------------------------------------------

/// OAuth and API credentials as registered with TDAmeritrade.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(rename = "tda_client_id")]
    pub client_id: String,

    #[serde(rename = "tda_redirect_url")]
    pub redirect_url: String,

    #[serde(rename = "tda_api_key")]
    pub api_key: String,
}

impl AppSettings {
    /// Load settings from the APP_SETTINGS env var (a JSON blob).
    pub fn from_env() -> Result<Self> {
        let raw = std::env::var("APP_SETTINGS")
            .context("APP_SETTINGS env var is not set")?;
        serde_json::from_str(&raw).context("Failed to parse APP_SETTINGS")
    }

    /// TDA expects the registered client id with this suffix; the OAuth
    /// app has no client secret.
    pub fn oauth_client_id(&self) -> String {
        format!("{}@AMER.OAUTHAP", self.client_id)
    }
}

// -----------------------------------------------
// RUNTIME CONFIGURATION
// -----------------------------------------------

/// Get the execution mode from environment or default to server.
pub fn get_execution_mode() -> String {
    std::env::var("SCREENER_MODE").unwrap_or_else(|_| "server".to_string())
}

/// Get port from environment or default.
pub fn get_port() -> u16 {
    std::env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse::<u16>()
        .unwrap_or(8080)
}

/// Get symbol for single mode execution.
pub fn get_single_symbol() -> String {
    std::env::var("SCREENER_SYMBOL").unwrap_or_else(|_| "MSFT".to_string())
}

/// Get the budget for single mode execution (no account lookup there).
pub fn get_single_budget() -> f64 {
    std::env::var("SCREENER_BUDGET")
        .unwrap_or_else(|_| "10000".to_string())
        .parse::<f64>()
        .unwrap_or(10_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_url_encodes_parameters() {
        let from = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let to = NaiveDate::from_ymd_opt(2026, 2, 19).unwrap();
        let url = chain_url("MSFT", "key123", OptionSide::Put, from, to);

        assert!(url.starts_with("https://api.tdameritrade.com/v1/marketdata/chains?"));
        assert!(url.contains("apikey=key123"));
        assert!(url.contains("symbol=MSFT"));
        assert!(url.contains("contractType=PUT"));
        assert!(url.contains("fromDate=2026-01-05"));
        assert!(url.contains("toDate=2026-02-19"));
    }

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.min_open_interest, 10);
        assert_eq!(config.default_multiplier, 100.0);
    }
}
