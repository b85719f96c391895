pub mod chain;
pub mod config;
pub mod error;
pub mod models;
pub mod suggest;
pub mod tda_client;

// Re-exports (public API)
pub use chain::flatten_chain;
pub use config::{AppSettings, EngineConfig};
pub use error::EngineError;
pub use models::{
    Account, AccountInfo, ChainResponse, Contract, OptionSide, Quote, RawContract, Token,
};
pub use suggest::{filter_eligible, rank_top, suggest};
pub use tda_client::{authorize_url, TdaClient};
