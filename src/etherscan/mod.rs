pub mod client;
pub mod connector;

/// Provider identifier used in diagnostics and API responses
pub const EXCHANGE: &str = "etherscan";

pub use client::{ApiClient, ApiOutcome, DEFAULT_MAX_RETRIES, RETRY_BACKOFF};
pub use connector::{EtherscanConnector, NATIVE_SYMBOL};
