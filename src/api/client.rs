use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, Duration};

use crate::api::auth::AuthState;
use crate::config::{ClientConfig, RetrySettings};
use crate::errors::{AppError, AppResult};
use crate::storage::TokenStore;

/// Route the app navigates to when the session is terminally unauthorized.
pub const LOGIN_ROUTE: &str = "/login";

const CSRF_COOKIE: &str = "csrftoken";
const CSRF_HEADER: &str = "X-CSRFToken";
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Called with the login route when stored credentials are purged.
pub type SessionExpiredHook = Box<dyn Fn(&str) + Send + Sync>;

/// Thin client for the marketplace REST API.
///
/// Every authorized request is decorated with the current bearer token and,
/// when the backend has set one, the CSRF token read from the cookie jar.
/// A 401 triggers exactly one token refresh followed by one retry of the
/// original request; the retry path is not re-entered, so a second 401
/// surfaces as a plain API error instead of looping.
pub struct ApiClient {
    pub(crate) http: Client,
    base_url: String,
    jar: Arc<Jar>,
    pub(crate) store: Arc<TokenStore>,
    pub(crate) state: Mutex<AuthState>,
    /// Serializes refresh attempts so concurrent 401s trigger one refresh.
    pub(crate) refresh_lock: tokio::sync::Mutex<()>,
    pub(crate) on_session_expired: Option<SessionExpiredHook>,
    retry: RetrySettings,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, store: Arc<TokenStore>) -> AppResult<Self> {
        let jar = Arc::new(Jar::default());
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .cookie_provider(jar.clone())
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            jar,
            store,
            state: Mutex::new(AuthState::Unauthorized),
            refresh_lock: tokio::sync::Mutex::new(()),
            on_session_expired: None,
            retry: config.retry.clone(),
        })
    }

    /// Install the hook invoked (with [`LOGIN_ROUTE`]) after a failed
    /// refresh purges the stored credentials.
    pub fn with_session_expired_hook(
        mut self,
        hook: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.on_session_expired = Some(Box::new(hook));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn set_state(&self, state: AuthState) {
        if let Ok(mut guard) = self.state.lock() {
            *guard = state;
        }
    }

    pub fn auth_state(&self) -> AuthState {
        self.state
            .lock()
            .map(|guard| *guard)
            .unwrap_or(AuthState::Unauthorized)
    }

    /// CSRF token from the cookie jar, if the backend has set one.
    pub(crate) fn csrf_token(&self) -> Option<String> {
        let url = reqwest::Url::parse(&self.base_url).ok()?;
        let header = self.jar.cookies(&url)?;
        let raw = header.to_str().ok()?;

        raw.split(';')
            .map(str::trim)
            .find_map(|pair| pair.strip_prefix(CSRF_COOKIE).and_then(|rest| rest.strip_prefix('=')))
            .map(|value| value.to_string())
    }

    /// Send one decorated request. Returns the store generation observed
    /// when the token was attached, so the refresh path can tell whether
    /// another task already replaced the credentials.
    async fn send_authorized(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> AppResult<(Response, u64)> {
        let generation = self.store.generation();

        let mut request = self.http.request(method, self.url(path));
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = self.store.access_token().await? {
            request = request.bearer_auth(token);
        }
        if let Some(csrf) = self.csrf_token() {
            request = request.header(CSRF_HEADER, csrf);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        Ok((request.send().await?, generation))
    }

    /// Decorated request with the one-shot 401 handling described above.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> AppResult<Response> {
        let (response, generation) = self
            .send_authorized(method.clone(), path, query, body)
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            log::debug!("401 on {} {}, refreshing token and retrying once", method, path);
            self.refresh_access_token(generation).await?;

            let (retried, _) = self.send_authorized(method, path, query, body).await?;
            return Ok(retried);
        }

        Ok(response)
    }

    pub(crate) async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
        fallback: &str,
    ) -> AppResult<T> {
        let response = self.execute(method, path, query, body.as_ref()).await?;
        decode_json(response, fallback).await
    }

    /// Decorated request where the caller does not care about the body.
    pub(crate) async fn request_empty(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        fallback: &str,
    ) -> AppResult<()> {
        let response = self.execute(method, path, &[], body.as_ref()).await?;
        ensure_success(response, fallback).await
    }

    /// Undecorated request for the auth endpoints themselves (login,
    /// register, refresh, password reset). A 401 here means the submitted
    /// credentials were wrong, never that a token expired.
    pub(crate) async fn request_json_noauth<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        fallback: &str,
    ) -> AppResult<T> {
        let mut request = self.http.request(method, self.url(path));
        if let Some(body) = &body {
            request = request.json(body);
        }

        decode_json(request.send().await?, fallback).await
    }

    /// Generic exponential-backoff helper for arbitrary requests.
    ///
    /// Auth errors are returned immediately: retrying a rejected token only
    /// hides the real failure from the user.
    pub async fn retry_with_backoff<T, F, Fut>(&self, mut operation: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = AppResult<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_auth_error() || !e.is_retryable() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.retry.max_attempts {
                        return Err(e);
                    }

                    let delay = backoff_delay(&self.retry, attempt);
                    log::warn!(
                        "Request attempt {} failed, retrying in {:?}: {}",
                        attempt,
                        delay,
                        e
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    /// Multipart POST with transfer-progress callbacks.
    ///
    /// The payload is wrapped in a chunked stream so the callback fires as
    /// the networking layer pulls data onto the wire; percentages come from
    /// bytes handed over, not a timer.
    pub(crate) async fn post_multipart_with_progress<T: DeserializeOwned>(
        &self,
        path: &str,
        field_name: &str,
        file_name: &str,
        mime_type: &str,
        bytes: &[u8],
        text_fields: &[(&str, &str)],
        progress: Arc<dyn Fn(f32) + Send + Sync>,
        fallback: &str,
    ) -> AppResult<T> {
        let (response, generation) = self
            .send_upload(path, field_name, file_name, mime_type, bytes, text_fields, progress.clone())
            .await?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            log::debug!("401 on upload to {}, refreshing token and retrying once", path);
            self.refresh_access_token(generation).await?;

            let (retried, _) = self
                .send_upload(path, field_name, file_name, mime_type, bytes, text_fields, progress)
                .await?;
            retried
        } else {
            response
        };

        decode_json(response, fallback).await
    }

    async fn send_upload(
        &self,
        path: &str,
        field_name: &str,
        file_name: &str,
        mime_type: &str,
        bytes: &[u8],
        text_fields: &[(&str, &str)],
        progress: Arc<dyn Fn(f32) + Send + Sync>,
    ) -> AppResult<(Response, u64)> {
        let generation = self.store.generation();

        let total = bytes.len() as u64;
        let chunks: Vec<Vec<u8>> = bytes
            .chunks(UPLOAD_CHUNK_BYTES)
            .map(|chunk| chunk.to_vec())
            .collect();

        let mut sent: u64 = 0;
        let stream = futures_util::stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            let percent = if total == 0 {
                100.0
            } else {
                (sent as f32 / total as f32) * 100.0
            };
            progress(percent);
            Ok::<Vec<u8>, std::io::Error>(chunk)
        }));

        let part = reqwest::multipart::Part::stream_with_length(
            reqwest::Body::wrap_stream(stream),
            total,
        )
        .file_name(file_name.to_string())
        .mime_str(mime_type)?;

        let mut form = reqwest::multipart::Form::new().part(field_name.to_string(), part);
        for (key, value) in text_fields {
            form = form.text(key.to_string(), value.to_string());
        }

        let mut request = self.http.post(self.url(path)).multipart(form);
        if let Some(token) = self.store.access_token().await? {
            request = request.bearer_auth(token);
        }
        if let Some(csrf) = self.csrf_token() {
            request = request.header(CSRF_HEADER, csrf);
        }

        Ok((request.send().await?, generation))
    }
}

fn backoff_delay(retry: &RetrySettings, attempt: u32) -> Duration {
    let shift = (attempt.saturating_sub(1)).min(20);
    let delay_ms = retry.base_delay_ms.saturating_mul(1u64 << shift);
    Duration::from_millis(delay_ms.min(retry.max_delay_ms))
}

/// Check the response status and parse the JSON body.
pub(crate) async fn decode_json<T: DeserializeOwned>(
    response: Response,
    fallback: &str,
) -> AppResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    Err(error_from_body(status.as_u16(), &body, fallback))
}

pub(crate) async fn ensure_success(response: Response, fallback: &str) -> AppResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(error_from_body(status.as_u16(), &body, fallback))
}

/// Unwrap a backend error body to a human-readable message, preferring
/// whatever the server supplied and falling back to the caller's generic
/// message.
fn error_from_body(status: u16, body: &str, fallback: &str) -> AppError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            ["error", "message", "detail"]
                .iter()
                .find_map(|key| value.get(key).and_then(Value::as_str).map(String::from))
        })
        .unwrap_or_else(|| fallback.to_string());

    AppError::Api { status, message }
}
