//! HTTP record gateway backed by reqwest.

use crate::error::{Result, StoreError};
use crate::traits::RecordStore;
use crate::types::{AssetRef, Query, Record, RecordId};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Configuration for the HTTP record gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Base URL of the record API.
    pub base_url: String,
    /// Bearer token attached to every request, when present.
    pub auth_token: Option<String>,
    /// Request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            base_url: "http://127.0.0.1:3000".to_string(),
            auth_token: None,
            request_timeout_ms: 30000,
        }
    }
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        GatewayConfig {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}

/// [`RecordStore`] over a REST-ish record API.
///
/// Records live under `records/{type}/{key}`, queries go to `records/query`,
/// assets under `assets`. A 409 from the server is the optimistic-save
/// conflict; its body is passed through unchanged.
pub struct HttpGateway {
    client: Client,
    config: GatewayConfig,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| StoreError::Http(e.to_string()))?;
        Ok(HttpGateway { client, config })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> Result<url::Url> {
        let base = url::Url::parse(&self.config.base_url)
            .map_err(|e| StoreError::Http(format!("bad base url: {e}")))?;
        base.join(path)
            .map_err(|e| StoreError::Http(format!("bad endpoint {path}: {e}")))
    }

    fn request(&self, method: reqwest::Method, endpoint: url::Url) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, endpoint);
        if let Some(token) = &self.config.auth_token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::CONFLICT => Err(StoreError::Conflict(body)),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(body)),
            _ => Err(StoreError::Backend(format!("{status}: {body}"))),
        }
    }
}

#[async_trait]
impl RecordStore for HttpGateway {
    async fn save(&self, record: Record) -> Result<Record> {
        let endpoint =
            self.endpoint(&format!("records/{}/{}", record.id.record_type, record.id.key))?;
        tracing::debug!("PUT {endpoint}");
        let response = self
            .request(reqwest::Method::PUT, endpoint)
            .json(&record)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        let response = Self::check(response).await?;
        response
            .json::<Record>()
            .await
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn fetch(&self, id: &RecordId) -> Result<Option<Record>> {
        let endpoint = self.endpoint(&format!("records/{}/{}", id.record_type, id.key))?;
        let response = self
            .request(reqwest::Method::GET, endpoint)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check(response).await?;
        response
            .json::<Record>()
            .await
            .map(Some)
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn delete(&self, id: &RecordId) -> Result<()> {
        let endpoint = self.endpoint(&format!("records/{}/{}", id.record_type, id.key))?;
        tracing::debug!("DELETE {endpoint}");
        let response = self
            .request(reqwest::Method::DELETE, endpoint)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response).await.map(|_| ())
    }

    async fn query(&self, query: Query) -> Result<Vec<Record>> {
        let endpoint = self.endpoint("records/query")?;
        let response = self
            .request(reqwest::Method::POST, endpoint)
            .json(&query)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        let response = Self::check(response).await?;
        response
            .json::<Vec<Record>>()
            .await
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn upload_asset(
        &self,
        name: &str,
        mime_type: Option<&str>,
        data: Bytes,
    ) -> Result<AssetRef> {
        let mut endpoint = self.endpoint("assets")?;
        endpoint.query_pairs_mut().append_pair("name", name);
        tracing::debug!("POST {endpoint} ({} bytes)", data.len());
        let mut builder = self.request(reqwest::Method::POST, endpoint).body(data);
        if let Some(mime) = mime_type {
            builder = builder.header(reqwest::header::CONTENT_TYPE, mime);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        let response = Self::check(response).await?;
        response
            .json::<AssetRef>()
            .await
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn fetch_asset(&self, name: &str) -> Result<Option<AssetRef>> {
        let endpoint = self.endpoint(&format!("assets/{name}"))?;
        let response = self
            .request(reqwest::Method::GET, endpoint)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check(response).await?;
        response
            .json::<AssetRef>()
            .await
            .map(Some)
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:3000");
        assert!(config.auth_token.is_none());
        assert_eq!(config.request_timeout_ms, 30000);
    }

    #[test]
    fn test_config_builder() {
        let config = GatewayConfig::new("https://records.example.com").with_auth_token("tok");
        assert_eq!(config.base_url, "https://records.example.com");
        assert_eq!(config.auth_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_endpoint_join() {
        let gateway = HttpGateway::new(GatewayConfig::new("http://host:9000/")).unwrap();
        let endpoint = gateway.endpoint("records/message/m1").unwrap();
        assert_eq!(endpoint.as_str(), "http://host:9000/records/message/m1");
    }

    #[test]
    fn test_bad_base_url() {
        let gateway = HttpGateway::new(GatewayConfig::new("not a url")).unwrap();
        assert!(gateway.endpoint("records/query").is_err());
    }
}
