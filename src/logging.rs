use log::{debug, error, info, trace, warn};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::RequestError;

/// Structured logging context for the exporter
///
/// Every emitted line is a JSON document carrying the component and operation
/// it belongs to, so the connector's diagnostics stay machine-filterable.
/// The API key is never attached as metadata.
pub struct LogContext {
    pub component: String,
    pub operation: String,
    pub metadata: HashMap<String, Value>,
}

impl LogContext {
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn with_address(self, address: &str) -> Self {
        self.with_metadata("address", json!(address))
    }

    pub fn with_symbol(self, symbol: &str) -> Self {
        self.with_metadata("symbol", json!(symbol))
    }

    pub fn with_retry_count(self, retry_count: u32) -> Self {
        self.with_metadata("retry_count", json!(retry_count))
    }

    pub fn with_duration_ms(self, duration_ms: u64) -> Self {
        self.with_metadata("duration_ms", json!(duration_ms))
    }

    fn format_message(&self, level: &str, message: &str) -> String {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let mut log_entry = json!({
            "timestamp": timestamp,
            "level": level,
            "component": self.component,
            "operation": self.operation,
            "message": message,
        });

        for (key, value) in &self.metadata {
            log_entry[key] = value.clone();
        }

        log_entry.to_string()
    }

    pub fn info(&self, message: &str) {
        info!("{}", self.format_message("INFO", message));
    }

    pub fn warn(&self, message: &str) {
        warn!("{}", self.format_message("WARN", message));
    }

    pub fn error(&self, message: &str) {
        error!("{}", self.format_message("ERROR", message));
    }

    pub fn debug(&self, message: &str) {
        debug!("{}", self.format_message("DEBUG", message));
    }

    pub fn trace(&self, message: &str) {
        trace!("{}", self.format_message("TRACE", message));
    }
}

/// Diagnostic helpers for the retry loop and authentication handling
pub struct ErrorLogger;

impl ErrorLogger {
    /// Log a failed attempt that will be retried after the backoff interval
    pub fn log_retry_attempt(error: &RequestError, attempt: u32, max_attempts: u32) {
        let context = LogContext::new("api_client", "retry")
            .with_retry_count(attempt)
            .with_metadata("max_attempts", json!(max_attempts));
        context.warn(&format!(
            "Attempt {} of {} failed: {}",
            attempt, max_attempts, error
        ));
    }

    /// Log an exhausted retry budget before the caller proceeds without data
    pub fn log_retry_exhausted(action: &str, max_attempts: u32) {
        let context = LogContext::new("api_client", "retry")
            .with_metadata("action", json!(action))
            .with_metadata("max_attempts", json!(max_attempts));
        context.warn("Maximum number of retries reached. Giving up.");
    }

    /// Log the one-time authentication failure that disables the connector
    pub fn log_authentication_failure(exchange: &str, detail: &str) {
        let context = LogContext::new("api_client", "authentication")
            .with_metadata("exchange", json!(exchange));
        context.error(&format!(
            "Authentication failed, disabling balance retrieval: {}",
            detail
        ));
    }
}
