//! REST data source for list views.

use crate::config::{AuthConfig, SiftConfig};
use ::async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use sift_core::DataSourceError;
use sift_storage::{DataSource, ListQuery, Page};
use std::marker::PhantomData;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Config error: {0}")]
    Config(String),
}

/// Shared HTTP client with auth headers applied to every request.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    auth_header: HeaderMap,
    timeout_ms: u64,
}

impl RestClient {
    pub fn new(config: &SiftConfig) -> Result<Self, ApiClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        let auth_header = build_auth_headers(&config.auth)?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_header,
            timeout_ms: config.request_timeout_ms,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn query_url(&self, resource: &str) -> String {
        format!("{}/api/v1/{}/query", self.base_url, resource.trim_matches('/'))
    }

    async fn post_json<T, B>(&self, resource: &str, body: &B) -> Result<T, DataSourceError>
    where
        T: DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let url = self.query_url(resource);
        let response = self
            .client
            .post(url)
            .headers(self.auth_header.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(resource, e))?;
        self.parse_response(resource, response).await
    }

    async fn parse_response<T: DeserializeOwned>(
        &self,
        resource: &str,
        response: reqwest::Response,
    ) -> Result<T, DataSourceError> {
        let status = response.status();
        if status.is_success() {
            response.json::<T>().await.map_err(|e| DataSourceError::InvalidResponse {
                resource: resource.to_string(),
                reason: e.to_string(),
            })
        } else {
            let text = response
                .text()
                .await
                .map_err(|e| self.transport_error(resource, e))?;
            Err(request_failed(resource, status.as_u16(), &text))
        }
    }

    fn transport_error(&self, resource: &str, error: reqwest::Error) -> DataSourceError {
        if error.is_timeout() {
            DataSourceError::Timeout {
                resource: resource.to_string(),
                timeout_ms: self.timeout_ms,
            }
        } else if error.is_decode() {
            DataSourceError::InvalidResponse {
                resource: resource.to_string(),
                reason: error.to_string(),
            }
        } else {
            DataSourceError::Unavailable {
                reason: error.to_string(),
            }
        }
    }
}

/// Error bodies are usually `{ "message": ".." }`; anything else is kept raw.
fn request_failed(resource: &str, status: u16, body: &str) -> DataSourceError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string());
    DataSourceError::RequestFailed {
        resource: resource.to_string(),
        status,
        message,
    }
}

fn build_auth_headers(auth: &AuthConfig) -> Result<HeaderMap, ApiClientError> {
    let mut headers = HeaderMap::new();
    if let Some(api_key) = &auth.api_key {
        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(api_key).map_err(|e| ApiClientError::Config(e.to_string()))?,
        );
    }
    if let Some(jwt) = &auth.jwt {
        let value = format!("Bearer {}", jwt);
        headers.insert(
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&value).map_err(|e| ApiClientError::Config(e.to_string()))?,
        );
    }
    Ok(headers)
}

/// `POST {base}/api/v1/{resource}/query` with a [`ListQuery`] body.
#[derive(Debug)]
pub struct RestDataSource<T> {
    client: RestClient,
    resource: String,
    _item: PhantomData<fn() -> T>,
}

impl<T> Clone for RestDataSource<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            resource: self.resource.clone(),
            _item: PhantomData,
        }
    }
}

impl<T> RestDataSource<T> {
    pub fn new(client: RestClient, resource: impl Into<String>) -> Self {
        Self {
            client,
            resource: resource.into(),
            _item: PhantomData,
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }
}

#[async_trait]
impl<T> DataSource for RestDataSource<T>
where
    T: DeserializeOwned + Send,
{
    type Item = T;

    async fn list(&self, query: &ListQuery) -> Result<Page<T>, DataSourceError> {
        debug!(resource = %self.resource, page = query.page, page_size = query.page_size, "POST list query");
        self.client.post_json(&self.resource, query).await
    }
}
