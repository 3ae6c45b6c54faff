use std::sync::RwLock;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use hmac::{Hmac, Mac};
use log::{debug, info};
use reqwest::Method;
use serde::de::DeserializeOwned;
use sha2::Sha256;

use crate::domain::constants::API_KEY_HEADER;
use crate::domain::errors::ExchangeError;
use crate::domain::model::exchange::OrderRequest;

use super::models::*;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    TEST,
    PROD,
}

impl Network {
    pub fn rest_url(&self) -> &'static str {
        match self {
            Network::TEST => "https://testnet.binance.vision",
            Network::PROD => "https://api.binance.com",
        }
    }

    pub fn ws_url(&self) -> &'static str {
        match self {
            Network::TEST => "wss://testnet.binance.vision/ws",
            Network::PROD => "wss://stream.binance.com:9443/ws",
        }
    }
}

#[derive(Clone)]
pub struct BinanceKeys {
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for BinanceKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceKeys")
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .finish()
    }
}

impl BinanceKeys {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), api_secret: api_secret.into() }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("BINANCE_API_KEY")
            .map_err(|_| anyhow!("Missing BINANCE_API_KEY"))?;
        let api_secret = std::env::var("BINANCE_API_SECRET")
            .map_err(|_| anyhow!("Missing BINANCE_API_SECRET"))?;
        Ok(Self { api_key, api_secret })
    }

    /// Hex encoded HMAC-SHA256 of the query string
    pub fn sign(&self, query: &str) -> Result<String, ExchangeError> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| ExchangeError::Transport(format!("invalid api secret: {}", e)))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// Thin REST client over the Binance spot API.
///
/// The HTTP client is held until `release` is called; every request made
/// afterwards fails with `ExchangeError::ClientReleased`.
pub struct BinanceClient {
    base_url: String,
    keys: BinanceKeys,
    recv_window: Duration,
    http: RwLock<Option<reqwest::Client>>,
}

impl BinanceClient {
    pub fn new(base_url: impl Into<String>, keys: BinanceKeys, recv_window: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            keys,
            recv_window,
            http: RwLock::new(Some(reqwest::Client::new())),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_released(&self) -> bool {
        match self.http.read() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }

    /// Drops the HTTP client. Returns false when it was already gone.
    pub fn release(&self) -> bool {
        let mut guard = match self.http.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let released = guard.take().is_some();
        if released {
            info!("Binance HTTP client released");
        }
        released
    }

    fn http(&self) -> Result<reqwest::Client, ExchangeError> {
        let guard = match self.http.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clone().ok_or(ExchangeError::ClientReleased)
    }

    async fn public_get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ExchangeError> {
        let http = self.http()?;
        let response = http
            .get(format!("{}{}", self.base_url, path))
            .query(params)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Signs `params` plus `recvWindow`/`timestamp` and sends them as the query string
    async fn signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        recv_window: Duration,
    ) -> Result<T, ExchangeError> {
        let http = self.http()?;
        let timestamp = chrono::Utc::now().timestamp_millis();
        let query = build_query(params, recv_window, timestamp);
        let signature = self.keys.sign(&query)?;
        let url = format!("{}{}?{}&signature={}", self.base_url, path, query, signature);
        debug!("{} {}?{}", method, path, query);

        let response = http
            .request(method, url)
            .header(API_KEY_HEADER, &self.keys.api_key)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ExchangeError> {
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }
        Err(api_error(status.as_u16(), &body))
    }

    /// Round trip time of `GET /api/v3/ping`
    pub async fn ping(&self) -> Result<Duration, ExchangeError> {
        let started = Instant::now();
        let _: serde_json::Value = self.public_get("/api/v3/ping", &[]).await?;
        Ok(started.elapsed())
    }

    pub async fn depth(&self, symbol: &str, limit: u32) -> Result<DepthSnapshot, ExchangeError> {
        self.public_get(
            "/api/v3/depth",
            &[("symbol", symbol.to_uppercase()), ("limit", limit.to_string())],
        )
        .await
    }

    pub async fn open_orders(&self, symbol: &str) -> Result<Vec<OpenOrderResponse>, ExchangeError> {
        self.signed(
            Method::GET,
            "/api/v3/openOrders",
            &[("symbol", symbol.to_string())],
            self.recv_window,
        )
        .await
    }

    pub async fn cancel_order(
        &self,
        symbol: &str,
        order_id: u64,
        client_order_id: &str,
    ) -> Result<CancelOrderResponse, ExchangeError> {
        let mut params = vec![("symbol", symbol.to_string()), ("orderId", order_id.to_string())];
        if !client_order_id.is_empty() {
            params.push(("origClientOrderId", client_order_id.to_string()));
        }
        self.signed(Method::DELETE, "/api/v3/order", &params, self.recv_window).await
    }

    pub async fn new_order(&self, request: &OrderRequest) -> Result<NewOrderResponse, ExchangeError> {
        let params = order_params(request);
        self.signed(Method::POST, "/api/v3/order", &params, request.receive_window).await
    }

    /// Validates an order without sending it to the matching engine
    pub async fn test_order(&self, request: &OrderRequest) -> Result<(), ExchangeError> {
        let params = order_params(request);
        let _: serde_json::Value = self
            .signed(Method::POST, "/api/v3/order/test", &params, request.receive_window)
            .await?;
        Ok(())
    }
}

pub fn order_params(request: &OrderRequest) -> Vec<(&'static str, String)> {
    vec![
        ("symbol", request.symbol.clone()),
        ("side", request.side.as_str().to_string()),
        ("type", request.order_type.as_str().to_string()),
        ("timeInForce", request.time_in_force.as_str().to_string()),
        ("quantity", request.formatted_quantity()),
        ("price", request.formatted_price()),
        ("newClientOrderId", request.client_order_id.clone()),
    ]
}

pub fn build_query(params: &[(&str, String)], recv_window: Duration, timestamp: i64) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        query.append_pair(key, value);
    }
    query.append_pair("recvWindow", &recv_window.as_millis().to_string());
    query.append_pair("timestamp", &timestamp.to_string());
    query.finish()
}

pub fn api_error(status: u16, body: &str) -> ExchangeError {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(err) => ExchangeError::Api { status, code: err.code, msg: err.msg },
        Err(_) => ExchangeError::Api { status, code: 0, msg: body.to_string() },
    }
}
