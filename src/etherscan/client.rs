use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::RequestError;
use crate::etherscan::EXCHANGE;
use crate::logging::{ErrorLogger, LogContext};

/// Retry budget per logical call, including the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Fixed delay between attempts
pub const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Result of one logical API call
///
/// Per-attempt failures never surface as errors. The caller only sees which
/// terminal state the retry loop reached and proceeds accordingly.
#[derive(Debug, PartialEq)]
pub enum ApiOutcome {
    /// The provider answered with a usable `result` payload
    Success(Value),
    /// The provider rejected the API key; the client is disabled for good
    AuthenticationFailure,
    /// The retry budget ran out without a usable answer
    Exhausted,
}

/// Classification of a single attempt
enum Attempt {
    Success(Value),
    Failed(RequestError),
    NoData,
}

/// Resilient Etherscan API client
///
/// Issues one logical request per `call`, retrying transport and provider
/// failures with a fixed backoff. Etherscan signals failure inside the
/// `message` field of an HTTP 200 response, so classification works on the
/// returned document rather than the status code.
#[derive(Debug)]
pub struct ApiClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    auth_enabled: AtomicBool,
    backoff: Duration,
}

impl ApiClient {
    pub fn new(url: &str, api_key: &str, timeout_seconds: u64) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_seconds))
                .build()
                .expect("Failed to create HTTP client"),
            url: url.to_string(),
            api_key: api_key.to_string(),
            auth_enabled: AtomicBool::new(true),
            backoff: RETRY_BACKOFF,
        }
    }

    /// Replace the backoff interval, mainly to keep tests fast
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Whether the API key is still considered valid
    ///
    /// Flips to false permanently once the provider rejects the key. The
    /// aggregator reads this to skip whole refresh cycles.
    pub fn authentication_enabled(&self) -> bool {
        self.auth_enabled.load(Ordering::Relaxed)
    }

    /// Issue one logical request, retrying up to `max_retries` attempts
    ///
    /// The caller supplies the action-specific query parameters; the fixed
    /// authenticated-call fields (`apikey`, `module`, `tag`) are merged in
    /// here on every attempt.
    pub async fn call(&self, params: &[(&str, &str)], max_retries: u32) -> ApiOutcome {
        if !self.authentication_enabled() {
            return ApiOutcome::AuthenticationFailure;
        }

        let action = lookup_param(params, "action").unwrap_or("unknown");
        let context = LogContext::new("api_client", "call")
            .with_metadata("action", json!(action))
            .with_metadata("max_attempts", json!(max_retries));
        context.debug(&format!("Loading {:?} with {} attempts", params, max_retries));

        for attempt in 1..=max_retries {
            match self.attempt(params).await {
                Attempt::Success(result) => return ApiOutcome::Success(result),
                Attempt::Failed(error) if !error.is_recoverable() => {
                    ErrorLogger::log_authentication_failure(EXCHANGE, "Invalid API Key");
                    self.auth_enabled.store(false, Ordering::Relaxed);
                    return ApiOutcome::AuthenticationFailure;
                }
                Attempt::Failed(error) => {
                    ErrorLogger::log_retry_attempt(&error, attempt, max_retries);
                }
                Attempt::NoData => {
                    context.debug(&format!("No usable data on attempt {}", attempt));
                }
            }

            if attempt < max_retries {
                sleep(self.backoff).await;
            }
        }

        ErrorLogger::log_retry_exhausted(action, max_retries);
        ApiOutcome::Exhausted
    }

    /// Perform one network attempt and classify the outcome
    async fn attempt(&self, params: &[(&str, &str)]) -> Attempt {
        let mut query = params.to_vec();
        query.push(("apikey", self.api_key.as_str()));
        query.push(("module", "account"));
        query.push(("tag", "latest"));

        let response = match self.client.get(&self.url).query(&query).send().await {
            Ok(response) => response,
            Err(error) => return Attempt::Failed(RequestError::from(error)),
        };

        let document: Value = match response.json().await {
            Ok(document) => document,
            Err(error) => return Attempt::Failed(RequestError::from(error)),
        };

        classify_document(&document)
    }
}

/// Classify a provider response document into an attempt outcome
///
/// The matching rules ("NOTOK" substring, "OK" or an "OK-" prefix variant)
/// mirror what the provider actually sends and must stay substring-based.
fn classify_document(document: &Value) -> Attempt {
    let Some(message) = document.get("message").and_then(Value::as_str) else {
        return Attempt::NoData;
    };

    if message.contains("NOTOK") {
        let result = document.get("result").and_then(Value::as_str);
        if result == Some("Invalid API Key") {
            return Attempt::Failed(RequestError::Authentication);
        }
        let reason = result.unwrap_or(message);
        return Attempt::Failed(RequestError::Application(reason.to_string()));
    }

    if message == "OK" || message.contains("OK-") {
        if let Some(result) = document.get("result") {
            if has_payload(result) {
                return Attempt::Success(result.clone());
            }
        }
    }

    Attempt::NoData
}

/// A `result` counts as usable only when it actually carries data
fn has_payload(result: &Value) -> bool {
    match result {
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(_) => true,
        Value::Bool(_) | Value::Null => false,
    }
}

fn lookup_param<'a>(params: &[(&'a str, &'a str)], key: &str) -> Option<&'a str> {
    params.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_ok_with_string_result() {
        let document = json!({"status": "1", "message": "OK", "result": "5000000"});
        match classify_document(&document) {
            Attempt::Success(result) => assert_eq!(result, json!("5000000")),
            _ => panic!("expected success"),
        }
    }

    #[test]
    fn test_classify_ok_with_list_result() {
        let document = json!({
            "status": "1",
            "message": "OK",
            "result": [{"account": "0xA", "balance": "0"}]
        });
        assert!(matches!(classify_document(&document), Attempt::Success(_)));
    }

    #[test]
    fn test_classify_ok_dash_variant() {
        // Rate-limited but still successful responses carry an "OK-" message
        let document = json!({
            "status": "1",
            "message": "OK-Rate limit of 5/sec applied",
            "result": "42"
        });
        assert!(matches!(classify_document(&document), Attempt::Success(_)));
    }

    #[test]
    fn test_classify_notok_is_transient() {
        let document = json!({
            "status": "0",
            "message": "NOTOK",
            "result": "Max rate limit reached"
        });
        match classify_document(&document) {
            Attempt::Failed(error) => assert!(error.is_recoverable()),
            _ => panic!("expected transient failure"),
        }
    }

    #[test]
    fn test_classify_invalid_api_key_is_terminal() {
        let document = json!({
            "status": "0",
            "message": "NOTOK",
            "result": "Invalid API Key"
        });
        match classify_document(&document) {
            Attempt::Failed(error) => {
                assert!(matches!(error, RequestError::Authentication));
                assert!(!error.is_recoverable());
            }
            _ => panic!("expected authentication failure"),
        }
    }

    #[test]
    fn test_classify_missing_message_yields_no_data() {
        let document = json!({"result": "5000000"});
        assert!(matches!(classify_document(&document), Attempt::NoData));
    }

    #[test]
    fn test_classify_empty_result_yields_no_data() {
        let document = json!({"status": "1", "message": "OK", "result": ""});
        assert!(matches!(classify_document(&document), Attempt::NoData));

        let document = json!({"status": "1", "message": "OK", "result": []});
        assert!(matches!(classify_document(&document), Attempt::NoData));

        let document = json!({"status": "1", "message": "OK", "result": null});
        assert!(matches!(classify_document(&document), Attempt::NoData));

        let document = json!({"status": "1", "message": "OK"});
        assert!(matches!(classify_document(&document), Attempt::NoData));
    }

    #[test]
    fn test_has_payload() {
        assert!(has_payload(&json!("x")));
        assert!(has_payload(&json!([1])));
        assert!(has_payload(&json!({"a": 1})));
        assert!(has_payload(&json!(0)));

        assert!(!has_payload(&json!("")));
        assert!(!has_payload(&json!([])));
        assert!(!has_payload(&json!({})));
        assert!(!has_payload(&json!(null)));
        assert!(!has_payload(&json!(true)));
    }

    #[test]
    fn test_lookup_param() {
        let params = [("action", "balancemulti"), ("address", "0xA")];
        assert_eq!(lookup_param(&params, "action"), Some("balancemulti"));
        assert_eq!(lookup_param(&params, "contractaddress"), None);
    }

    #[tokio::test]
    async fn test_call_short_circuits_when_authentication_disabled() {
        // Endpoint that would refuse connections if it were ever contacted
        let client = ApiClient::new("http://127.0.0.1:1", "KEY", 1);
        client.auth_enabled.store(false, Ordering::Relaxed);

        let outcome = client.call(&[("action", "balancemulti")], 5).await;
        assert_eq!(outcome, ApiOutcome::AuthenticationFailure);
    }
}
