//! HTTP client for the data logger REST API.
//!
//! Every request carries the `X-Api-Token` header when the shared
//! [`TokenStore`] holds a non-empty token. Any non-success status becomes
//! [`Error::RequestFailed`]; the body of a failed response is ignored.
//!
//! # Example
//!
//! ```no_run
//! use canlog_core::{ApiClient, DeviceApi, TokenStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::new("http://192.168.4.1", TokenStore::in_memory("secret"))?;
//!
//! let status = client.status().await?;
//! println!("free: {} bytes", status.storage.free_bytes);
//!
//! client.start_logging().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use canlog_types::{
    CanCounters, DeviceConfig, LogFile, LoggingStats, StatusSnapshot, StorageStats, WifiNetwork,
};

use crate::error::{Error, Result};
use crate::token::TokenStore;
use crate::traits::DeviceApi;

/// Header carrying the access token.
pub const TOKEN_HEADER: &str = "X-Api-Token";

/// HTTP client for the data logger.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: TokenStore,
}

impl ApiClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Device address, e.g. "http://192.168.4.1"
    /// * `token` - Shared token store read on every request
    pub fn new(base_url: &str, token: TokenStore) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| Error::transport(base_url, e))?;
        Self::with_client(base_url, client, token)
    }

    /// Create a client with a custom reqwest Client.
    pub fn with_client(base_url: &str, client: Client, token: TokenStore) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::InvalidUrl(format!(
                "URL must start with http:// or https://, got: {}",
                base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The shared token store.
    pub fn token(&self) -> &TokenStore {
        &self.token
    }

    /// GET `path` and decode the JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let response = self.send(self.client.get(&url), &url).await?;
        Self::decode(response, &url).await
    }

    /// POST `payload` as JSON to `path` and decode the response.
    pub async fn post<T, B>(&self, path: &str, payload: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        let response = self.send(self.client.post(&url).json(payload), &url).await?;
        Self::decode(response, &url).await
    }

    /// PUT `payload` as JSON to `path` and decode the response.
    pub async fn put<T, B>(&self, path: &str, payload: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        let response = self.send(self.client.put(&url).json(payload), &url).await?;
        Self::decode(response, &url).await
    }

    /// Per-bus CAN receive counters.
    pub async fn can_stats(&self) -> Result<Vec<CanCounters>> {
        self.get("/api/can/stats").await
    }

    /// Storage capacity.
    pub async fn storage_stats(&self) -> Result<StorageStats> {
        self.get("/api/storage/stats").await
    }

    /// Log writer statistics.
    pub async fn buffers(&self) -> Result<LoggingStats> {
        self.get("/api/buffers").await
    }

    /// Fetch a file's binary content.
    pub async fn download(&self, id: &str) -> Result<Vec<u8>> {
        let url = self.download_url(id);
        let response = self.send(self.client.get(&url), &url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::transport(&url, e))?;
        Ok(bytes.to_vec())
    }

    // ======================================================================
    // Internal HTTP helpers
    // ======================================================================

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn control(&self, path: &str) -> Result<()> {
        let _: Value = self.post(path, &json!({})).await?;
        Ok(())
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response> {
        let request = match self.token.get() {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(url, e))?;

        let status = response.status();
        debug!(url, status = status.as_u16(), "Device responded");
        if !status.is_success() {
            return Err(Error::RequestFailed {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response, url: &str) -> Result<T> {
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport(url, e))?;
        // Some handlers answer with an empty body.
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl DeviceApi for ApiClient {
    async fn status(&self) -> Result<StatusSnapshot> {
        self.get("/api/status").await
    }

    async fn config(&self) -> Result<DeviceConfig> {
        self.get("/api/config").await
    }

    async fn wifi_scan(&self) -> Result<Vec<WifiNetwork>> {
        self.get("/api/wifi/scan").await
    }

    async fn files(&self) -> Result<Vec<LogFile>> {
        self.get("/api/files").await
    }

    async fn save_config(&self, config: &DeviceConfig) -> Result<()> {
        let _: Value = self.put("/api/config", config).await?;
        Ok(())
    }

    async fn mark_downloaded(&self, id: &str) -> Result<()> {
        self.control(&format!("/api/files/{}/mark_downloaded", id))
            .await
    }

    async fn delete_file(&self, id: &str) -> Result<()> {
        self.control(&format!("/api/files/{}/delete", id)).await
    }

    async fn start_logging(&self) -> Result<()> {
        self.control("/api/control/start_logging").await
    }

    async fn stop_logging(&self) -> Result<()> {
        self.control("/api/control/stop_logging").await
    }

    async fn close_active_file(&self) -> Result<()> {
        self.control("/api/control/close_active_file").await
    }

    async fn set_time(&self, epoch: i64) -> Result<()> {
        let _: Value = self.post("/api/time", &json!({ "epoch": epoch })).await?;
        Ok(())
    }

    fn download_url(&self, id: &str) -> String {
        self.url(&format!("/api/files/{}/download", id))
    }
}
