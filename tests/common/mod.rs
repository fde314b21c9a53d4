//! Loopback mock of the marketplace backend used by the integration tests.
//!
//! Tokens are modeled explicitly: the login endpoint issues `access-1`, the
//! refresh endpoint reissues `access-2`, and protected routes accept only
//! tokens currently registered as valid. Tests simulate expiry by
//! invalidating a token.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use gigdesk::ClientConfig;

pub const TEST_EMAIL: &str = "user@example.com";
pub const TEST_PASSWORD: &str = "hunter2";
pub const CSRF_TOKEN: &str = "mock-csrf-token";
pub const FIRST_ACCESS: &str = "access-1";
#[allow(dead_code)]
pub const REFRESHED_ACCESS: &str = "access-2";
#[allow(dead_code)]
pub const REFRESH_TOKEN: &str = "refresh-1";
#[allow(dead_code)]
pub const AVATAR_URL: &str = "https://cdn.gigdesk.example/avatars/u1.jpg";

#[derive(Default)]
pub struct MockState {
    pub valid_tokens: Mutex<HashSet<String>>,
    pub refresh_calls: AtomicUsize,
    pub protected_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub refresh_should_fail: AtomicBool,
    pub always_unauthorized: AtomicBool,
    pub upload_should_fail: AtomicBool,
    pub logout_should_fail: AtomicBool,
    pub require_csrf: AtomicBool,
}

impl MockState {
    pub fn invalidate_token(&self, token: &str) {
        self.valid_tokens
            .lock()
            .expect("token set lock poisoned")
            .remove(token);
    }

    fn token_valid(&self, headers: &HeaderMap) -> bool {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        match bearer {
            Some(token) => self
                .valid_tokens
                .lock()
                .expect("token set lock poisoned")
                .contains(token),
            None => false,
        }
    }
}

pub struct MockBackend {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockBackend {
    pub async fn spawn() -> anyhow::Result<Self> {
        let state = Arc::new(MockState::default());

        let app = Router::new()
            .route("/api/auth/login/", post(login))
            .route("/api/auth/token/refresh/", post(refresh))
            .route("/api/auth/logout/", post(logout))
            .route("/api/auth/me/", get(me))
            .route("/api/reviews/", get(reviews))
            .route("/api/users/me/avatar/", post(upload_avatar))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock server died");
        });

        Ok(Self { addr, state })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Client config pointed at this backend, with short retry delays so
    /// backoff tests stay fast.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::default();
        config.api_base_url = self.base_url();
        config.retry.base_delay_ms = 100;
        config.retry.max_delay_ms = 400;
        config
    }
}

fn user_json() -> Value {
    json!({
        "id": "u1",
        "username": "jane",
        "email": TEST_EMAIL,
        "first_name": "Jane",
        "last_name": "Doe",
        "user_type": "freelancer",
        "avatar": null
    })
}

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    if body["email"] == TEST_EMAIL && body["password"] == TEST_PASSWORD {
        state
            .valid_tokens
            .lock()
            .expect("token set lock poisoned")
            .insert(FIRST_ACCESS.to_string());

        (
            StatusCode::OK,
            [(
                header::SET_COOKIE,
                format!("csrftoken={}; Path=/", CSRF_TOKEN),
            )],
            Json(json!({
                "access": FIRST_ACCESS,
                "refresh": REFRESH_TOKEN,
                "user": user_json()
            })),
        )
            .into_response()
    } else {
        unauthorized("Invalid email or password")
    }
}

async fn refresh(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);

    if state.refresh_should_fail.load(Ordering::SeqCst) {
        return unauthorized("Token is invalid or expired");
    }

    if body["refresh"] == REFRESH_TOKEN {
        state
            .valid_tokens
            .lock()
            .expect("token set lock poisoned")
            .insert(REFRESHED_ACCESS.to_string());

        Json(json!({ "access": REFRESHED_ACCESS })).into_response()
    } else {
        unauthorized("Unknown refresh token")
    }
}

async fn logout(State(state): State<Arc<MockState>>) -> Response {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);

    if state.logout_should_fail.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "logout backend unavailable" })),
        )
            .into_response();
    }

    Json(json!({})).into_response()
}

async fn me(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.protected_calls.fetch_add(1, Ordering::SeqCst);

    if state.require_csrf.load(Ordering::SeqCst) {
        let csrf = headers.get("X-CSRFToken").and_then(|v| v.to_str().ok());
        if csrf != Some(CSRF_TOKEN) {
            return (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "CSRF token missing" })),
            )
                .into_response();
        }
    }

    if state.always_unauthorized.load(Ordering::SeqCst) || !state.token_valid(&headers) {
        return unauthorized("Invalid or expired token");
    }

    Json(user_json()).into_response()
}

async fn reviews(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !state.token_valid(&headers) {
        return unauthorized("Invalid or expired token");
    }

    Json(json!({
        "count": 2,
        "next": null,
        "previous": null,
        "results": [
            {
                "id": "r1",
                "rating": 5,
                "title": "Great work",
                "content": "Delivered early and polished.",
                "created_at": "2026-07-01T12:00:00Z",
                "helpful_count": 4,
                "reviewer": { "id": "u2", "name": "Ming", "avatar": null },
                "response": null
            },
            {
                "id": "r2",
                "rating": 4,
                "title": null,
                "content": "Solid communication.",
                "created_at": "2026-07-03T09:30:00Z",
                "helpful_count": 1,
                "reviewer": { "id": "u3", "name": "Alex", "avatar": null },
                "response": "Thanks!"
            }
        ]
    }))
    .into_response()
}

async fn upload_avatar(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.upload_calls.fetch_add(1, Ordering::SeqCst);

    if !state.token_valid(&headers) {
        return unauthorized("Invalid or expired token");
    }

    if state.upload_should_fail.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "storage backend unavailable" })),
        )
            .into_response();
    }

    if body.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "empty upload" })),
        )
            .into_response();
    }

    Json(json!({ "url": AVATAR_URL })).into_response()
}
