use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use super::error::{normalize_error_response, ApiError, ApiResult};
use crate::config::Config;

/// Header carrying the per-request correlation id
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid base URL '{0}': {1}")]
    BaseUrl(String, String),

    #[error("failed to create HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// HTTP client for the listing backend.
///
/// Cheap to clone; clones share the connection pool and the bearer token.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    timeout: Duration,
    access_token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        Self::with_base_url(&config.api_base_url, config.request_timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("million-listings/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: parse_base_url(base_url)?,
            timeout,
            access_token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Replace (or clear) the bearer token sent with every request
    pub async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }

    pub async fn access_token(&self) -> Option<String> {
        self.access_token.read().await.clone()
    }

    /// `{base_url}/{segments...}`, each segment percent-encoded
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> ApiResult<T> {
        self.dispatch(Method::GET, segments, |req| req.query(query))
            .await
    }

    pub async fn post<B, T>(&self, segments: &[&str], body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.dispatch(Method::POST, segments, |req| req.json(body))
            .await
    }

    pub async fn put<B, T>(&self, segments: &[&str], body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.dispatch(Method::PUT, segments, |req| req.json(body))
            .await
    }

    pub async fn patch<B, T>(&self, segments: &[&str], body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.dispatch(Method::PATCH, segments, |req| req.json(body))
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> ApiResult<T> {
        self.dispatch(Method::DELETE, segments, |req| req).await
    }

    async fn dispatch<T, F>(&self, method: Method, segments: &[&str], configure: F) -> ApiResult<T>
    where
        T: DeserializeOwned,
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let url = self.endpoint(segments);
        let mut request = configure(self.http.request(method, url));
        if let Some(token) = self.access_token().await {
            request = request.bearer_auth(token);
        }
        send_request(&self.http, request, self.timeout).await
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let url = Url::parse(raw).map_err(|e| ClientError::BaseUrl(raw.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ClientError::BaseUrl(
            raw.to_string(),
            "URL cannot be used as a base".to_string(),
        ));
    }
    Ok(url)
}

/// Send a prepared request and decode the outcome.
///
/// Attaches a fresh correlation id, then maps every failure path into an
/// [`ApiError`]. Empty success bodies decode as JSON `null`, so `()` works
/// as the target type for 204 responses.
pub(crate) async fn send_request<T: DeserializeOwned>(
    http: &Client,
    request: RequestBuilder,
    timeout: Duration,
) -> ApiResult<T> {
    let correlation_id = Uuid::new_v4().to_string();
    let request = request
        .header(CORRELATION_ID_HEADER, &correlation_id)
        .build()
        .map_err(|e| ApiError::network(e, &correlation_id))?;

    let method = request.method().clone();
    let url = request.url().clone();
    debug!(%method, %url, correlation_id = %correlation_id, "Sending request");

    let started = Instant::now();
    let response = match http.execute(request).await {
        Ok(response) => response,
        Err(e) => {
            let err = ApiError::from_transport(&e, timeout, &correlation_id);
            warn!(%method, %url, correlation_id = %correlation_id, status = err.status(), "Request failed: {}", e);
            return Err(err);
        }
    };

    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::from_transport(&e, timeout, &correlation_id))?;

    debug!(
        %method,
        %url,
        status = status.as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        bytes = body.len(),
        "Received response"
    );

    if !status.is_success() {
        let err = normalize_error_response(status, content_type.as_deref(), &body, &correlation_id);
        warn!(%method, %url, correlation_id = %correlation_id, status = status.as_u16(), "Backend error: {}", err);
        return Err(err);
    }

    let payload = if body.trim().is_empty() { "null" } else { body.as_str() };
    serde_json::from_str(payload).map_err(|e| ApiError::decode(status, e, &correlation_id))
}

