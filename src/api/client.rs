//! API client over a pluggable transport.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use super::endpoints::{Endpoint, HttpMethod};
use super::tokens::{token_expires_within, TokenStore};
use crate::errors::AppError;

const AUTH_HEADER: &str = "Authorization";

/// Remote API settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub enabled: bool,
    pub base_url: String,
    pub timeout: Duration,
    /// Refresh this long before the access token expires
    pub refresh_skew: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "/api".to_string(),
            timeout: Duration::from_millis(15_000),
            refresh_skew: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Parsed JSON body; an empty object when the body was not JSON
    pub body: Value,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request could not be delivered (DNS, refused connection, reset).
#[derive(Debug, Clone, PartialEq)]
pub struct TransportError(pub String);

/// Sends one HTTP request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Errors surfaced by [`ApiClient`].
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    Disabled,
    EndpointNotConfigured(String),
    Timeout,
    Connection(String),
    Status { status: u16, message: String },
    SessionExpired,
    RefreshUnavailable,
    /// Token storage failed
    Storage(String),
}

impl ApiError {
    pub fn message(&self) -> String {
        match self {
            ApiError::Disabled => "API desativada".to_string(),
            ApiError::EndpointNotConfigured(key) => format!("Endpoint nao configurado: {}", key),
            ApiError::Timeout => "Tempo limite da API excedido".to_string(),
            ApiError::Connection(_) => "Erro de conexao com API".to_string(),
            ApiError::Status { message, .. } => message.clone(),
            ApiError::SessionExpired => "Sessao expirada. Faca login novamente.".to_string(),
            ApiError::RefreshUnavailable => "Refresh token indisponivel.".to_string(),
            ApiError::Storage(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Status { status, message } => write!(f, "[{}] {}", status, message),
            ApiError::Connection(cause) => write!(f, "{} ({})", self.message(), cause),
            _ => f.write_str(&self.message()),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError::Storage(err.message())
    }
}

/// Per-request behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Send without the bearer header
    pub skip_auth: bool,
    /// Refresh and retry once on HTTP 401
    pub retry_on_unauthorized: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            skip_auth: false,
            retry_on_unauthorized: true,
        }
    }
}

impl RequestOptions {
    pub fn unauthenticated() -> Self {
        Self {
            skip_auth: true,
            retry_on_unauthorized: false,
        }
    }
}

pub struct ApiClient<T: Transport> {
    config: ApiConfig,
    transport: T,
    tokens: TokenStore,
    /// Serializes refreshes so concurrent callers share one outcome
    refresh_lock: Mutex<()>,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(config: ApiConfig, transport: T, tokens: TokenStore) -> Self {
        Self {
            config,
            transport,
            tokens,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Look up an endpoint by its key and call it.
    pub async fn request_by_key(
        &self,
        key: &str,
        payload: Option<Value>,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        if !self.config.enabled {
            return Err(ApiError::Disabled);
        }
        let endpoint = Endpoint::from_key(key)
            .ok_or_else(|| ApiError::EndpointNotConfigured(key.to_string()))?;
        self.request(endpoint, payload, options).await
    }

    /// Call an endpoint and return the response body.
    pub async fn request(
        &self,
        endpoint: Endpoint,
        payload: Option<Value>,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        if !self.config.enabled {
            return Err(ApiError::Disabled);
        }

        if !options.skip_auth {
            if let Some(token) = self.tokens.access_token().await? {
                if token_expires_within(&token, self.config.refresh_skew, Utc::now()) {
                    tracing::debug!(endpoint = endpoint.key(), "Access token near expiry");
                    if let Err(e) = self.refresh(Some(&token)).await {
                        tracing::warn!("Proactive token refresh failed: {}", e);
                        self.tokens.clear().await?;
                        return Err(ApiError::SessionExpired);
                    }
                }
            }
        }

        self.execute(endpoint, payload.as_ref(), options).await
    }

    pub async fn login(&self, credentials: Value) -> Result<Value, ApiError> {
        self.request(
            Endpoint::Login,
            Some(credentials),
            RequestOptions::unauthenticated(),
        )
        .await
    }

    /// Tell the backend, then drop local tokens whatever it answered.
    pub async fn logout(&self) -> Result<Value, ApiError> {
        let result = self
            .request(
                Endpoint::Logout,
                Some(json!({})),
                RequestOptions {
                    retry_on_unauthorized: false,
                    ..RequestOptions::default()
                },
            )
            .await;
        self.tokens.clear().await?;
        result
    }

    pub async fn check_health(&self) -> Result<Value, ApiError> {
        self.request(Endpoint::Health, None, RequestOptions::unauthenticated())
            .await
    }

    /// Exchange the refresh token for a new access token.
    pub async fn refresh_access_token(&self) -> Result<(), ApiError> {
        let current = self.tokens.access_token().await?;
        self.refresh(current.as_deref()).await
    }

    async fn execute(
        &self,
        endpoint: Endpoint,
        payload: Option<&Value>,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        let token = self.bearer(options).await?;
        let response = self.send(endpoint, payload, token.as_deref()).await?;
        if response.is_success() {
            return self.accept(response).await;
        }

        let can_retry =
            response.status == 401 && options.retry_on_unauthorized && !options.skip_auth;
        if can_retry {
            match self.refresh(token.as_deref()).await {
                Ok(()) => {
                    let token = self.bearer(options).await?;
                    let retried = self.send(endpoint, payload, token.as_deref()).await?;
                    if retried.is_success() {
                        return self.accept(retried).await;
                    }
                    return Err(status_error(&retried));
                }
                Err(e) => {
                    tracing::warn!(
                        endpoint = endpoint.key(),
                        "Token refresh after 401 failed: {}",
                        e
                    );
                    self.tokens.clear().await?;
                }
            }
        }

        Err(status_error(&response))
    }

    async fn refresh(&self, observed: Option<&str>) -> Result<(), ApiError> {
        let _guard = self.refresh_lock.lock().await;

        // Another caller already replaced the token we saw fail
        let current = self.tokens.access_token().await?;
        if current.is_some() && current.as_deref() != observed {
            return Ok(());
        }

        let Some(refresh_token) = self.tokens.refresh_token().await? else {
            return Err(ApiError::RefreshUnavailable);
        };

        let body = json!({ "refreshToken": refresh_token });
        match self.send(Endpoint::RefreshToken, Some(&body), None).await {
            Ok(response) if response.is_success() => {
                self.tokens.store_from_response(&response.body).await?;
                tracing::info!("Access token refreshed");
                Ok(())
            }
            Ok(response) => {
                self.tokens.clear().await?;
                Err(status_error(&response))
            }
            Err(e) => {
                self.tokens.clear().await?;
                Err(e)
            }
        }
    }

    async fn bearer(&self, options: RequestOptions) -> Result<Option<String>, ApiError> {
        if options.skip_auth {
            return Ok(None);
        }
        Ok(self.tokens.access_token().await?)
    }

    async fn accept(&self, response: HttpResponse) -> Result<Value, ApiError> {
        self.tokens.store_from_response(&response.body).await?;
        Ok(response.body)
    }

    async fn send(
        &self,
        endpoint: Endpoint,
        payload: Option<&Value>,
        token: Option<&str>,
    ) -> Result<HttpResponse, ApiError> {
        let method = endpoint.method();
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(token) = token {
            headers.push((AUTH_HEADER.to_string(), format!("Bearer {}", token)));
        }
        let request = HttpRequest {
            method,
            url: format!("{}{}", self.config.base_url, endpoint.path()),
            headers,
            body: match method {
                HttpMethod::Get => None,
                HttpMethod::Post => payload.cloned(),
            },
        };

        match tokio::time::timeout(self.config.timeout, self.transport.send(request)).await {
            Err(_) => {
                tracing::warn!(endpoint = endpoint.key(), "API request timed out");
                Err(ApiError::Timeout)
            }
            Ok(Err(TransportError(cause))) => {
                tracing::warn!(endpoint = endpoint.key(), "API connection failed: {}", cause);
                Err(ApiError::Connection(cause))
            }
            Ok(Ok(response)) => Ok(response),
        }
    }
}

fn status_error(response: &HttpResponse) -> ApiError {
    let message = response
        .body
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .unwrap_or("Falha na API")
        .to_string();
    ApiError::Status {
        status: response.status,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryKv;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    type Handler = dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync;

    /// Transport answering from a closure, optionally after a delay.
    struct FakeTransport {
        handler: Box<Handler>,
        delay: Duration,
        seen: std::sync::Mutex<Vec<HttpRequest>>,
        refreshes: AtomicUsize,
    }

    impl FakeTransport {
        fn new<F>(handler: F) -> Self
        where
            F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
        {
            Self {
                handler: Box::new(handler),
                delay: Duration::ZERO,
                seen: std::sync::Mutex::new(Vec::new()),
                refreshes: AtomicUsize::new(0),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            if request.url.ends_with("/auth/refresh") {
                self.refreshes.fetch_add(1, Ordering::SeqCst);
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.seen.lock().unwrap().push(request.clone());
            (self.handler)(&request)
        }
    }

    fn ok(body: Value) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse { status: 200, body })
    }

    fn status(code: u16, body: Value) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse { status: code, body })
    }

    fn jwt(exp: i64) -> String {
        let claims = URL_SAFE_NO_PAD.encode(json!({ "exp": exp }).to_string());
        format!("h.{}.s", claims)
    }

    /// Accepts only "Bearer fresh"; refresh hands out "fresh".
    fn strict_backend(request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        if request.url.ends_with("/auth/refresh") {
            return ok(json!({ "accessToken": "fresh", "refreshToken": "r2" }));
        }
        match request.header(AUTH_HEADER) {
            Some("Bearer fresh") => ok(json!({ "queue": [] })),
            _ => status(401, json!({ "message": "Token expirado" })),
        }
    }

    fn enabled() -> ApiConfig {
        ApiConfig {
            enabled: true,
            ..ApiConfig::default()
        }
    }

    async fn client_with(
        config: ApiConfig,
        transport: FakeTransport,
        access: Option<&str>,
        refresh: Option<&str>,
    ) -> ApiClient<FakeTransport> {
        let tokens = TokenStore::new(Arc::new(MemoryKv::new()));
        let mut body = serde_json::Map::new();
        if let Some(access) = access {
            body.insert("accessToken".to_string(), json!(access));
        }
        if let Some(refresh) = refresh {
            body.insert("refreshToken".to_string(), json!(refresh));
        }
        tokens
            .store_from_response(&Value::Object(body))
            .await
            .unwrap();
        ApiClient::new(config, transport, tokens)
    }

    #[tokio::test]
    async fn test_disabled_and_unknown_endpoints() {
        let disabled = client_with(
            ApiConfig::default(),
            FakeTransport::new(|_| ok(json!({}))),
            None,
            None,
        )
        .await;
        assert_eq!(
            disabled
                .request(Endpoint::GetQueue, None, RequestOptions::default())
                .await,
            Err(ApiError::Disabled)
        );

        let client = client_with(
            enabled(),
            FakeTransport::new(|_| ok(json!({}))),
            None,
            None,
        )
        .await;
        assert_eq!(
            client
                .request_by_key("dropTables", None, RequestOptions::default())
                .await,
            Err(ApiError::EndpointNotConfigured("dropTables".to_string()))
        );
    }

    #[tokio::test]
    async fn test_bearer_header_and_get_without_body() {
        let client = client_with(
            enabled(),
            FakeTransport::new(strict_backend),
            Some("fresh"),
            None,
        )
        .await;

        let body = client
            .request(Endpoint::GetQueue, Some(json!({"x": 1})), RequestOptions::default())
            .await
            .unwrap();
        assert_eq!(body, json!({ "queue": [] }));

        let seen = client.transport.seen.lock().unwrap().clone();
        assert_eq!(seen[0].url, "/api/queue");
        assert_eq!(seen[0].method, HttpMethod::Get);
        assert_eq!(seen[0].body, None);
        assert_eq!(seen[0].header("authorization"), Some("Bearer fresh"));
    }

    #[tokio::test]
    async fn test_login_stores_tokens_and_skips_auth() {
        let client = client_with(
            enabled(),
            FakeTransport::new(|_| ok(json!({ "token": "t1", "refreshToken": "r1" }))),
            Some("old"),
            None,
        )
        .await;

        client
            .login(json!({ "email": "a@sb.com", "password": "x" }))
            .await
            .unwrap();

        let seen = client.transport.seen.lock().unwrap().clone();
        assert_eq!(seen[0].header(AUTH_HEADER), None);
        assert_eq!(client.tokens().access_token().await.unwrap().as_deref(), Some("t1"));
        assert_eq!(client.tokens().refresh_token().await.unwrap().as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn test_unauthorized_refreshes_and_retries_once() {
        let client = client_with(
            enabled(),
            FakeTransport::new(strict_backend),
            Some("stale"),
            Some("r1"),
        )
        .await;

        let body = client
            .request(Endpoint::GetStats, None, RequestOptions::default())
            .await
            .unwrap();
        assert_eq!(body, json!({ "queue": [] }));
        assert_eq!(client.transport.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(client.tokens().refresh_token().await.unwrap().as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn test_unauthorized_without_refresh_token_clears_tokens() {
        let client = client_with(
            enabled(),
            FakeTransport::new(strict_backend),
            Some("stale"),
            None,
        )
        .await;

        let err = client
            .request(Endpoint::GetStats, None, RequestOptions::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::Status {
                status: 401,
                message: "Token expirado".to_string()
            }
        );
        assert_eq!(client.tokens().access_token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let client = client_with(
            enabled(),
            FakeTransport::new(strict_backend).with_delay(Duration::from_millis(20)),
            Some("stale"),
            Some("r1"),
        )
        .await;

        let (a, b) = tokio::join!(
            client.request(Endpoint::GetQueue, None, RequestOptions::default()),
            client.request(Endpoint::GetStats, None, RequestOptions::default()),
        );
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(client.transport.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expiring_token_is_refreshed_first() {
        let soon = Utc::now().timestamp() + 5;
        let client = client_with(
            enabled(),
            FakeTransport::new(strict_backend),
            Some(&jwt(soon)),
            Some("r1"),
        )
        .await;

        client
            .request(Endpoint::GetSnapshot, None, RequestOptions::default())
            .await
            .unwrap();

        let seen = client.transport.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].url.ends_with("/auth/refresh"));
        assert_eq!(seen[0].header(AUTH_HEADER), None);
        assert_eq!(seen[1].header(AUTH_HEADER), Some("Bearer fresh"));
    }

    #[tokio::test]
    async fn test_failed_proactive_refresh_expires_session() {
        let soon = Utc::now().timestamp() + 5;
        let client = client_with(
            enabled(),
            FakeTransport::new(|_| status(500, json!({}))),
            Some(&jwt(soon)),
            Some("r1"),
        )
        .await;

        let err = client
            .request(Endpoint::GetQueue, None, RequestOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::SessionExpired);
        assert_eq!(client.tokens().refresh_token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_timeout_and_connection_errors_differ() {
        let slow = client_with(
            ApiConfig {
                timeout: Duration::from_millis(10),
                ..enabled()
            },
            FakeTransport::new(|_| ok(json!({}))).with_delay(Duration::from_millis(500)),
            None,
            None,
        )
        .await;
        let err = slow.check_health().await.unwrap_err();
        assert_eq!(err, ApiError::Timeout);
        assert_eq!(err.message(), "Tempo limite da API excedido");

        let down = client_with(
            enabled(),
            FakeTransport::new(|_| Err(TransportError("connection refused".to_string()))),
            None,
            None,
        )
        .await;
        let err = down.check_health().await.unwrap_err();
        assert_eq!(err.message(), "Erro de conexao com API");
    }

    #[tokio::test]
    async fn test_error_message_fallback_and_logout() {
        let client = client_with(
            enabled(),
            FakeTransport::new(|_| status(503, json!({}))),
            Some("fresh"),
            Some("r1"),
        )
        .await;

        let err = client.logout().await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Status {
                status: 503,
                message: "Falha na API".to_string()
            }
        );
        assert_eq!(client.tokens().access_token().await.unwrap(), None);
    }
}
