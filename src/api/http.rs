use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::connector::{BalanceTable, Connector};
use crate::error::ServerError;
use crate::etherscan::{EtherscanConnector, NATIVE_SYMBOL};

/// Response structure for the balances endpoint
#[derive(Debug, Serialize)]
pub struct BalancesResponse {
    pub exchange: String,
    pub balances: BalanceTable,
    pub last_refresh: Option<String>,
}

/// Response structure for the status endpoint
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub authentication_enabled: bool,
    pub symbols: usize,
    pub accounts: usize,
    pub last_refresh: Option<String>,
}

/// Application state shared across handlers
///
/// The poll loop holds the write side while a refresh cycle runs; handlers
/// only ever take short read locks to snapshot the table.
#[derive(Clone)]
pub struct AppState {
    pub connector: Arc<RwLock<EtherscanConnector>>,
}

/// HTTP server exposing the balance table to the scraping process
pub struct ApiServer {
    connector: Arc<RwLock<EtherscanConnector>>,
    pub host: String,
    pub port: u16,
}

impl ApiServer {
    /// Create a new API server instance
    pub fn new(connector: Arc<RwLock<EtherscanConnector>>, host: &str, port: u16) -> Self {
        Self {
            connector,
            host: host.to_string(),
            port,
        }
    }

    /// Build the router with all routes and middleware
    pub fn router(&self) -> Router {
        let app_state = AppState {
            connector: self.connector.clone(),
        };

        Router::new()
            .route("/balances", get(get_balances))
            .route("/status", get(get_status))
            .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
            .with_state(app_state)
    }

    /// Start the HTTP server
    pub async fn start(&self) -> Result<(), ServerError> {
        let app = self.router();

        let addr = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&addr).await.map_err(|e| ServerError::Bind {
            addr: addr.clone(),
            reason: e.to_string(),
        })?;

        log::info!("HTTP API server starting on {}", addr);

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        Ok(())
    }
}

/// GET /balances - Current balance table snapshot
pub async fn get_balances(State(state): State<AppState>) -> Json<BalancesResponse> {
    let connector = state.connector.read().await;

    Json(BalancesResponse {
        exchange: connector.exchange().to_string(),
        balances: connector.get_accounts(),
        last_refresh: connector.last_refresh().map(|t| t.to_rfc3339()),
    })
}

/// GET /status - Connector health information
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let connector = state.connector.read().await;
    let balances = connector.get_accounts();

    let status = if connector.authentication_enabled() {
        "healthy"
    } else {
        "authentication_disabled"
    };

    Json(StatusResponse {
        status: status.to_string(),
        authentication_enabled: connector.authentication_enabled(),
        symbols: balances.len(),
        accounts: balances.get(NATIVE_SYMBOL).map_or(0, |table| table.len()),
        last_refresh: connector.last_refresh().map(|t| t.to_rfc3339()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectorConfig;

    fn test_state() -> AppState {
        let settings = ConnectorConfig {
            api_key: "TESTKEY".to_string(),
            addresses: vec!["0xA".to_string()],
            ..ConnectorConfig::default()
        };
        let connector = EtherscanConnector::new(settings).unwrap();
        AppState {
            connector: Arc::new(RwLock::new(connector)),
        }
    }

    #[tokio::test]
    async fn test_status_handler_fresh_connector() {
        let state = test_state();
        let Json(response) = get_status(State(state)).await;

        assert_eq!(response.status, "healthy");
        assert!(response.authentication_enabled);
        assert_eq!(response.symbols, 0);
        assert_eq!(response.accounts, 0);
        assert!(response.last_refresh.is_none());
    }

    #[tokio::test]
    async fn test_balances_handler_fresh_connector() {
        let state = test_state();
        let Json(response) = get_balances(State(state)).await;

        assert_eq!(response.exchange, "etherscan");
        assert!(response.balances.is_empty());
    }
}
