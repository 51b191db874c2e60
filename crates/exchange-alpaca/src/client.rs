//! HTTP client and endpoint configuration for the Alpaca REST API.

use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::error::AlpacaError;

const PAPER_BASE_URL: &str = "https://paper-api.alpaca.markets";
const LIVE_BASE_URL: &str = "https://api.alpaca.markets";
const DATA_URL: &str = "https://data.alpaca.markets";

/// Endpoint and credential configuration.
#[derive(Debug, Clone)]
pub struct AlpacaConfig {
    pub key_id: String,
    pub secret_key: String,
    pub base_url: String,
    pub data_url: String,
}

impl AlpacaConfig {
    pub fn paper(key_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            secret_key: secret_key.into(),
            base_url: PAPER_BASE_URL.to_string(),
            data_url: DATA_URL.to_string(),
        }
    }

    pub fn live(key_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            secret_key: secret_key.into(),
            base_url: LIVE_BASE_URL.to_string(),
            data_url: DATA_URL.to_string(),
        }
    }

    /// Read credentials from `APCA_API_KEY_ID` / `APCA_API_SECRET_KEY`.
    ///
    /// # Errors
    ///
    /// Fails when either variable is missing or empty.
    pub fn from_env(paper: bool) -> Result<Self, AlpacaError> {
        let key_id = std::env::var("APCA_API_KEY_ID").unwrap_or_default();
        let secret_key = std::env::var("APCA_API_SECRET_KEY").unwrap_or_default();
        if key_id.is_empty() || secret_key.is_empty() {
            return Err(AlpacaError::MissingCredentials);
        }
        Ok(if paper {
            Self::paper(key_id, secret_key)
        } else {
            Self::live(key_id, secret_key)
        })
    }
}

/// REST client for account, order, and options-data endpoints.
#[derive(Debug, Clone)]
pub struct AlpacaClient {
    pub(crate) http: reqwest::Client,
    pub(crate) config: AlpacaConfig,
}

impl AlpacaClient {
    pub fn new(config: AlpacaConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Build a client and verify connectivity against the account endpoint.
    ///
    /// # Errors
    ///
    /// Fails when credentials are rejected or the endpoint is unreachable.
    pub async fn connect(config: AlpacaConfig) -> Result<Self, AlpacaError> {
        let client = Self::new(config);
        let account = client.fetch_account().await?;
        info!(
            equity = %account.equity,
            buying_power = %account.buying_power,
            trading_blocked = account.trading_blocked,
            "connected to Alpaca"
        );
        Ok(client)
    }

    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(v) = HeaderValue::from_str(&self.config.key_id) {
            headers.insert("APCA-API-KEY-ID", v);
        }
        if let Ok(v) = HeaderValue::from_str(&self.config.secret_key) {
            headers.insert("APCA-API-SECRET-KEY", v);
        }
        headers
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, AlpacaError> {
        let response = self.http.get(url).headers(self.auth_headers()).send().await?;
        Self::decode(response).await
    }

    pub(crate) async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, AlpacaError> {
        let response = self
            .http
            .post(url)
            .headers(self.auth_headers())
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub(crate) async fn delete(&self, url: &str) -> Result<(), AlpacaError> {
        let response = self
            .http
            .delete(url)
            .headers(self.auth_headers())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AlpacaError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AlpacaError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AlpacaError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}
