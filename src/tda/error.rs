use thiserror::Error;

/// Faults the suggestion engine can surface. Any of these aborts the whole
/// call; the engine never partially recovers or drops data on the floor.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The chain envelope carried a non-success status flag.
    #[error("chain response status was '{status}', expected SUCCESS")]
    InvalidResponseStatus { status: String },

    /// An (expiration, strike) slot held zero or more than one contract.
    /// That breaks the one-quote-per-pair contract of the chain payload,
    /// so the parse stops rather than guess which entry is real.
    #[error("expected exactly one contract at {expiration} strike {strike}, got {count}")]
    MalformedChainEntry {
        expiration: String,
        strike: String,
        count: usize,
    },

    /// The caller asked for a side this engine does not know about.
    #[error("unsupported option side: {0}")]
    UnsupportedSide(String),

    /// The eligibility filter encodes a PUT-selling strategy; feeding it a
    /// CALL would silently invert the moneyness check, so it refuses.
    #[error("eligibility filter only supports PUT contracts, got CALL for {symbol}")]
    UnsupportedContractType { symbol: String },
}
