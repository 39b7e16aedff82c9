use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::time::Duration;

use crate::domain::{AudioSink, DomainError, EngineId};

/// Stream type for HTTP responses
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, DomainError>> + Send>>;

/// Trait for HTTP client operations (for mocking)
#[async_trait]
pub trait HttpClientTrait: Send + Sync + std::fmt::Debug {
    async fn get_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
    ) -> Result<serde_json::Value, DomainError>;

    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, DomainError>;

    /// POST a JSON body and return the raw response body (audio)
    async fn post_for_bytes(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<Bytes, DomainError>;

    async fn post_json_stream(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<ByteStream, DomainError>;
}

/// Re-attribute an HTTP-level error to the engine that made the call
pub fn attribute_to(engine: EngineId, error: DomainError) -> DomainError {
    match error {
        DomainError::VendorUnreachable { message, .. } => {
            DomainError::vendor_unreachable(engine.as_str(), message)
        }
        DomainError::Provider { message, .. } => DomainError::provider(engine.as_str(), message),
        other => other,
    }
}

/// Forward every chunk of `stream` into `sink`, in order.
///
/// Stops early with `SessionFailed` if the receiving side has gone away.
/// Returns the number of bytes forwarded.
pub async fn forward_to_sink(mut stream: ByteStream, sink: &AudioSink) -> Result<usize, DomainError> {
    use futures::StreamExt;

    let mut forwarded = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if chunk.is_empty() {
            continue;
        }
        forwarded += chunk.len();
        sink.send(chunk)
            .await
            .map_err(|_| DomainError::session_failed("Audio sink closed"))?;
    }
    Ok(forwarded)
}

/// Real HTTP client using reqwest
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    fn request(
        &self,
        method: reqwest::Method,
        url: &str,
        headers: Vec<(&str, &str)>,
    ) -> reqwest::RequestBuilder {
        let mut request = self.client.request(method, url);
        for (key, value) in headers {
            request = request.header(key, value);
        }
        request
    }

    async fn send(request: reqwest::RequestBuilder) -> Result<reqwest::Response, DomainError> {
        let response = request.send().await.map_err(map_send_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            if status.is_server_error() {
                return Err(DomainError::vendor_unreachable(
                    "http",
                    format!("HTTP {}: {}", status, error_body),
                ));
            }
            return Err(DomainError::provider(
                "http",
                format!("HTTP {}: {}", status, error_body),
            ));
        }

        Ok(response)
    }
}

fn map_send_error(e: reqwest::Error) -> DomainError {
    if e.is_connect() || e.is_timeout() {
        DomainError::vendor_unreachable("http", e.to_string())
    } else {
        DomainError::provider("http", format!("Request failed: {}", e))
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn get_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
    ) -> Result<serde_json::Value, DomainError> {
        let response = Self::send(self.request(reqwest::Method::GET, url, headers)).await?;
        response
            .json()
            .await
            .map_err(|e| DomainError::provider("http", format!("Failed to parse response: {}", e)))
    }

    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, DomainError> {
        let request = self.request(reqwest::Method::POST, url, headers).json(body);
        let response = Self::send(request).await?;
        response
            .json()
            .await
            .map_err(|e| DomainError::provider("http", format!("Failed to parse response: {}", e)))
    }

    async fn post_for_bytes(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<Bytes, DomainError> {
        let request = self.request(reqwest::Method::POST, url, headers).json(body);
        let response = Self::send(request).await?;
        response
            .bytes()
            .await
            .map_err(|e| DomainError::vendor_unreachable("http", format!("Body read failed: {}", e)))
    }

    async fn post_json_stream(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<ByteStream, DomainError> {
        let request = self.request(reqwest::Method::POST, url, headers).json(body);
        let response = Self::send(request).await?;

        use futures::StreamExt;
        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| DomainError::vendor_unreachable("http", format!("Stream error: {}", e)))
        });

        Ok(Box::pin(stream))
    }
}
