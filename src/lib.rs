pub mod api;
pub mod config;
pub mod connector;
pub mod error;
pub mod etherscan;
pub mod logging;
pub mod units;

pub use api::ApiServer;
pub use config::{AppConfig, ConnectorConfig, ExporterConfig, LoggingConfig, TokenSpec};
pub use connector::{BalanceTable, Connector};
pub use error::{ConfigError, ExporterError, RequestError, Result, ServerError};
pub use etherscan::{ApiClient, ApiOutcome, EtherscanConnector, NATIVE_SYMBOL};
pub use logging::{ErrorLogger, LogContext};
pub use units::{normalize_units, parse_raw_amount, DEFAULT_DECIMALS};
