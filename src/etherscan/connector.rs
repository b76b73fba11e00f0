use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::config::{ConnectorConfig, TokenSpec};
use crate::connector::{BalanceTable, Connector};
use crate::error::ConfigError;
use crate::etherscan::client::{ApiClient, ApiOutcome};
use crate::etherscan::EXCHANGE;
use crate::logging::LogContext;
use crate::units::{normalize_units, parse_raw_amount, DEFAULT_DECIMALS};

/// Symbol the native chain balance is recorded under
pub const NATIVE_SYMBOL: &str = "ETH";

/// Wire shape of one `balancemulti` entry
#[derive(Debug, Deserialize)]
struct NativeBalanceEntry {
    account: String,
    balance: String,
}

/// Balance connector backed by the Etherscan account API
///
/// Owns its balance table and authentication state for the lifetime of the
/// instance. Retrieval is strictly sequential: one native-balance call for
/// all configured addresses, then one call per (token, account) pair, each
/// retried to completion before the next begins.
#[derive(Debug)]
pub struct EtherscanConnector {
    settings: ConnectorConfig,
    client: ApiClient,
    accounts: BalanceTable,
    last_refresh: Option<DateTime<Utc>>,
}

impl EtherscanConnector {
    /// Create a connector from validated settings
    ///
    /// The API key and a non-empty address list are mandatory. This is the
    /// only place a hard error escapes the connector; every later failure
    /// degrades to stale balances instead.
    pub fn new(settings: ConnectorConfig) -> Result<Self, ConfigError> {
        if settings.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if settings.addresses.is_empty() {
            return Err(ConfigError::MissingAddresses);
        }

        let client = ApiClient::new(&settings.url, &settings.api_key, settings.timeout_seconds);

        Ok(Self {
            settings,
            client,
            accounts: BalanceTable::new(),
            last_refresh: None,
        })
    }

    /// Whether the API key is still accepted by the provider
    pub fn authentication_enabled(&self) -> bool {
        self.client.authentication_enabled()
    }

    /// Time of the last completed refresh cycle
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh
    }

    /// Refresh native balances for all configured addresses in one request
    async fn refresh_native_balances(&mut self) {
        let addresses = self.settings.addresses.join(",");
        let params = [("action", "balancemulti"), ("address", addresses.as_str())];

        match self.client.call(&params, self.settings.max_retries).await {
            ApiOutcome::Success(result) => self.merge_native_balances(result),
            ApiOutcome::AuthenticationFailure | ApiOutcome::Exhausted => {
                LogContext::new("connector", "refresh_native")
                    .with_symbol(NATIVE_SYMBOL)
                    .debug("No data this cycle, keeping previous native balances");
            }
        }
    }

    /// Merge a successful `balancemulti` payload into the table
    fn merge_native_balances(&mut self, result: Value) {
        let entries: Vec<NativeBalanceEntry> = match serde_json::from_value(result) {
            Ok(entries) => entries,
            Err(error) => {
                LogContext::new("connector", "refresh_native")
                    .warn(&format!("Unexpected balancemulti payload: {}", error));
                return;
            }
        };

        let table = self.accounts.entry(NATIVE_SYMBOL.to_string()).or_default();
        for entry in entries {
            match parse_raw_amount(&entry.balance) {
                Some(raw) => {
                    table.insert(entry.account, normalize_units(raw, DEFAULT_DECIMALS));
                }
                None => {
                    LogContext::new("connector", "refresh_native")
                        .with_address(&entry.account)
                        .warn(&format!("Unparsable native balance: {:?}", entry.balance));
                }
            }
        }
    }

    /// Refresh token balances for every account known under the native symbol
    async fn refresh_token_balances(&mut self) {
        self.accounts.entry(NATIVE_SYMBOL.to_string()).or_default();
        let known_accounts: Vec<String> = self.accounts[NATIVE_SYMBOL].keys().cloned().collect();
        let tokens = self.settings.tokens.clone();

        for token in &tokens {
            for account in &known_accounts {
                // Failures are isolated per (token, account) pair; a pair
                // without data keeps its previous value.
                if let Some(balance) = self.token_balance_on_account(account, token).await {
                    self.accounts
                        .entry(token.symbol.clone())
                        .or_default()
                        .insert(account.clone(), balance);
                }
            }
        }
    }

    /// Retrieve one token balance on one account
    ///
    /// Returns `None` when the call yielded no usable data, so the caller
    /// leaves the existing entry untouched. A successful zero balance is
    /// `Some(0.0)` and does overwrite.
    async fn token_balance_on_account(&self, account: &str, token: &TokenSpec) -> Option<f64> {
        let params = [
            ("action", "tokenbalance"),
            ("contractaddress", token.contract.as_str()),
            ("address", account),
        ];

        match self.client.call(&params, self.settings.max_retries).await {
            ApiOutcome::Success(result) => {
                let Some(raw) = result.as_str().and_then(parse_raw_amount) else {
                    LogContext::new("connector", "refresh_tokens")
                        .with_symbol(&token.symbol)
                        .with_address(account)
                        .warn(&format!("Unparsable token balance: {}", result));
                    return None;
                };
                Some(normalize_units(raw, token.decimals.unwrap_or(-1)))
            }
            ApiOutcome::AuthenticationFailure | ApiOutcome::Exhausted => None,
        }
    }
}

#[async_trait]
impl Connector for EtherscanConnector {
    fn exchange(&self) -> &str {
        EXCHANGE
    }

    fn get_accounts(&self) -> BalanceTable {
        self.accounts.clone()
    }

    async fn retrieve_accounts(&mut self) -> &BalanceTable {
        if !self.client.authentication_enabled() {
            return &self.accounts;
        }

        let context = LogContext::new("connector", "retrieve_accounts");
        context.debug("Retrieving the account balances");

        self.refresh_native_balances().await;

        if !self.settings.tokens.is_empty() && self.client.authentication_enabled() {
            self.refresh_token_balances().await;
        }

        self.last_refresh = Some(Utc::now());
        context.debug(&format!("Accounts: {:?}", self.accounts));
        &self.accounts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_settings() -> ConnectorConfig {
        ConnectorConfig {
            api_key: "TESTKEY".to_string(),
            addresses: vec!["0xA".to_string(), "0xB".to_string()],
            ..ConnectorConfig::default()
        }
    }

    #[test]
    fn test_construction_requires_api_key() {
        let settings = ConnectorConfig {
            api_key: String::new(),
            addresses: vec!["0xA".to_string()],
            ..ConnectorConfig::default()
        };
        assert!(matches!(
            EtherscanConnector::new(settings).unwrap_err(),
            ConfigError::MissingApiKey
        ));
    }

    #[test]
    fn test_construction_requires_addresses() {
        let settings = ConnectorConfig {
            api_key: "TESTKEY".to_string(),
            ..ConnectorConfig::default()
        };
        assert!(matches!(
            EtherscanConnector::new(settings).unwrap_err(),
            ConfigError::MissingAddresses
        ));
    }

    #[test]
    fn test_fresh_connector_has_empty_table() {
        let connector = EtherscanConnector::new(test_settings()).unwrap();
        assert!(connector.get_accounts().is_empty());
        assert!(connector.authentication_enabled());
        assert!(connector.last_refresh().is_none());
    }

    #[test]
    fn test_merge_native_balances() {
        let mut connector = EtherscanConnector::new(test_settings()).unwrap();
        connector.merge_native_balances(json!([
            {"account": "0xA", "balance": "2000000000000000000"},
            {"account": "0xB", "balance": "0"},
        ]));

        let table = connector.get_accounts();
        assert_eq!(table[NATIVE_SYMBOL]["0xA"], 2.0);
        assert_eq!(table[NATIVE_SYMBOL]["0xB"], 0.0);
    }

    #[test]
    fn test_merge_skips_unparsable_entry() {
        let mut connector = EtherscanConnector::new(test_settings()).unwrap();
        connector.merge_native_balances(json!([
            {"account": "0xA", "balance": "not-a-number"},
            {"account": "0xB", "balance": "1000000000000000000"},
        ]));

        let table = connector.get_accounts();
        assert!(!table[NATIVE_SYMBOL].contains_key("0xA"));
        assert_eq!(table[NATIVE_SYMBOL]["0xB"], 1.0);
    }

    #[test]
    fn test_merge_keeps_prior_value_on_bad_payload() {
        let mut connector = EtherscanConnector::new(test_settings()).unwrap();
        connector.merge_native_balances(json!([
            {"account": "0xA", "balance": "3000000000000000000"},
        ]));
        // A later malformed payload must not clear what was already observed
        connector.merge_native_balances(json!({"unexpected": "shape"}));

        let table = connector.get_accounts();
        assert_eq!(table[NATIVE_SYMBOL]["0xA"], 3.0);
    }
}
