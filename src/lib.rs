pub mod api_server;
pub mod logging;
pub mod tda;

// Re-exports for convenience
pub use tda::{Contract, EngineConfig, EngineError, OptionSide, TdaClient};
