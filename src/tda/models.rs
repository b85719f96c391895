use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use super::error::EngineError;

/// Which half of the chain a contract belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionSide {
    #[serde(rename = "PUT")]
    Put,
    #[serde(rename = "CALL")]
    Call,
}

impl OptionSide {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Put => "PUT",
            Self::Call => "CALL",
        }
    }
}

impl FromStr for OptionSide {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PUT" => Ok(Self::Put),
            "CALL" => Ok(Self::Call),
            _ => Err(EngineError::UnsupportedSide(s.to_string())),
        }
    }
}

/// One normalized option contract, flattened out of the chain response.
/// Built once per parse and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub symbol: String,

    #[serde(rename = "putcall")]
    pub put_call: OptionSide,

    #[serde(rename = "strikePrice")]
    pub strike_price: f64,

    /// Expiration as YYYY-MM-DD.
    #[serde(rename = "date")]
    pub expiration: String,

    pub bid: f64,

    #[serde(rename = "bidSize")]
    pub bid_size: u32,

    pub ask: f64,

    #[serde(rename = "askSize")]
    pub ask_size: u32,

    pub mark: f64,

    /// Number of underlying shares one contract controls.
    pub multiplier: f64,

    #[serde(rename = "openInterest")]
    pub open_interest: u32,

    #[serde(rename = "daysToExpiration")]
    pub days_to_expiration: u32,
}

/// Strike price (as a string key) to the contracts quoted at it.
pub type StrikeMap = HashMap<String, Vec<RawContract>>;

/// Expiration key ("YYYY-MM-DD:daysToExpiration") to its strikes.
pub type ExpirationMap = HashMap<String, StrikeMap>;

/// Chain envelope as TDA returns it: one nested map per side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainResponse {
    pub symbol: String,
    pub status: String,

    #[serde(rename = "underlyingPrice")]
    pub underlying_price: f64,

    #[serde(rename = "numberOfContracts")]
    pub number_of_contracts: usize,

    #[serde(rename = "putExpDateMap", default)]
    pub put_exp_date_map: ExpirationMap,

    #[serde(rename = "callExpDateMap", default)]
    pub call_exp_date_map: ExpirationMap,
}

/// Per-contract wire shape inside the chain maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawContract {
    pub symbol: String,

    #[serde(rename = "putCall")]
    pub put_call: OptionSide,

    pub bid: f64,

    #[serde(rename = "bidSize")]
    pub bid_size: u32,

    pub ask: f64,

    #[serde(rename = "askSize")]
    pub ask_size: u32,

    pub mark: f64,

    #[serde(rename = "openInterest")]
    pub open_interest: u32,

    #[serde(rename = "strikePrice")]
    pub strike_price: f64,

    #[serde(rename = "daysToExpiration")]
    pub days_to_expiration: u32,

    /// Some chain shapes omit this; the parser fills in the configured
    /// default rather than letting a zero slip through the budget check.
    pub multiplier: Option<f64>,
}

/// Quote for the underlying, pulled out of the per-symbol quote map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,

    #[serde(rename = "lastPrice")]
    pub last_price: f64,

    #[serde(rename = "totalVolume")]
    pub total_volume: u64,

    pub exchange: String,

    #[serde(rename = "52WkHigh")]
    pub fifty_two_week_high: f64,

    #[serde(rename = "52WkLow")]
    pub fifty_two_week_low: f64,

    pub cusip: String,
}

/// One entry of the GET /v1/accounts listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    #[serde(rename = "securitiesAccount")]
    pub securities_account: AccountSummary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountSummary {
    #[serde(rename = "accountId")]
    pub account_id: String,
}

/// Detail response for a single account; only the balance survives.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountDetailResponse {
    #[serde(rename = "securitiesAccount")]
    pub securities_account: AccountDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountDetail {
    #[serde(rename = "currentBalances")]
    pub current_balances: CurrentBalances,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentBalances {
    #[serde(rename = "cashAvailableForTrading")]
    pub cash_available_for_trading: f64,
}

/// What the rest of the app needs to know about the account.
#[derive(Debug, Clone, Serialize)]
pub struct AccountInfo {
    pub cash_available_for_trading: f64,
}

/// OAuth token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct Token {
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: String,

    #[serde(default)]
    pub expires_in: u64,
}
