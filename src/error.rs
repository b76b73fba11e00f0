use thiserror::Error;

/// Main error type for the Etherscan balance exporter
#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),
}

/// Configuration errors
///
/// These are the only errors that propagate as hard failures. Everything the
/// connector hits at runtime is absorbed into an outcome and degrades to
/// "no new data for this request".
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing mandatory api_key")]
    MissingApiKey,

    #[error("No account addresses configured")]
    MissingAddresses,

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Configuration parsing failed: {0}")]
    Parsing(String),

    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
}

/// Per-request failures observed by the API client
///
/// One attempt of a call classifies into exactly one of these. Whether the
/// retry loop continues is decided by `is_recoverable`.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Provider reported failure: {0}")]
    Application(String),

    #[error("Authentication failed")]
    Authentication,

    #[error("Retry budget exhausted after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

/// HTTP server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind to {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("Server error: {0}")]
    Serve(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ExporterError>;

impl RequestError {
    /// Check if the failure is transient and the request can be retried
    pub fn is_recoverable(&self) -> bool {
        match self {
            RequestError::Connection(_) => true,
            RequestError::Timeout { .. } => true,
            RequestError::Http(_) => true,
            RequestError::Application(_) => true,

            // Terminal failures
            RequestError::Authentication => false,
            RequestError::Exhausted { .. } => false,
        }
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RequestError::Timeout { seconds: 30 }
        } else if err.is_connect() {
            RequestError::Connection(err.to_string())
        } else {
            RequestError::Http(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_error_recoverability() {
        assert!(RequestError::Connection("refused".to_string()).is_recoverable());
        assert!(RequestError::Timeout { seconds: 30 }.is_recoverable());
        assert!(RequestError::Application("NOTOK".to_string()).is_recoverable());

        assert!(!RequestError::Authentication.is_recoverable());
        assert!(!RequestError::Exhausted { attempts: 5 }.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let error = ExporterError::Request(RequestError::Exhausted { attempts: 5 });
        assert_eq!(
            format!("{}", error),
            "Request error: Retry budget exhausted after 5 attempts"
        );

        let error = ExporterError::Config(ConfigError::MissingApiKey);
        assert_eq!(format!("{}", error), "Configuration error: Missing mandatory api_key");
    }

    #[test]
    fn test_config_error_display() {
        let error = ConfigError::InvalidValue {
            key: "exporter.port".to_string(),
            value: "0".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Invalid configuration value for exporter.port: 0"
        );
    }
}
