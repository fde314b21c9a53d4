//! Token lifecycle integration tests against the loopback mock backend:
//! storage scopes, the one-shot 401 refresh-and-retry, terminal refresh
//! failure and the backoff helper.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use gigdesk::api::types::LoginCredentials;
use gigdesk::api::ReviewQuery;
use gigdesk::{ApiClient, AppError, AuthState, StorageScope, TokenStore};

mod common;
use common::{MockBackend, FIRST_ACCESS, REFRESHED_ACCESS, REFRESH_TOKEN, TEST_EMAIL, TEST_PASSWORD};

async fn client_for(backend: &MockBackend) -> (ApiClient, Arc<TokenStore>) {
    let _ = env_logger::builder().is_test(true).try_init();

    let store = Arc::new(TokenStore::in_memory().await.expect("store"));
    let client = ApiClient::new(&backend.client_config(), store.clone()).expect("client");
    (client, store)
}

fn credentials(remember_me: bool) -> LoginCredentials {
    LoginCredentials {
        email: TEST_EMAIL.to_string(),
        password: TEST_PASSWORD.to_string(),
        remember_me,
    }
}

#[tokio::test]
async fn test_login_without_remember_uses_session_scope() -> anyhow::Result<()> {
    let backend = MockBackend::spawn().await?;
    let (client, store) = client_for(&backend).await;

    client.login(&credentials(false)).await?;
    assert_eq!(client.auth_state(), AuthState::Authorized);
    assert_eq!(store.access_token().await?.as_deref(), Some(FIRST_ACCESS));

    // Clearing the persistent scope must not touch a session login...
    store.clear_scope(StorageScope::Persistent).await?;
    assert_eq!(store.access_token().await?.as_deref(), Some(FIRST_ACCESS));

    // ...but clearing the session scope removes it.
    store.clear_scope(StorageScope::Session).await?;
    assert_eq!(store.access_token().await?, None);
    Ok(())
}

#[tokio::test]
async fn test_login_with_remember_uses_persistent_scope() -> anyhow::Result<()> {
    let backend = MockBackend::spawn().await?;
    let (client, store) = client_for(&backend).await;

    client.login(&credentials(true)).await?;
    assert!(store.remember_me().await?);

    store.clear_scope(StorageScope::Session).await?;
    assert_eq!(store.access_token().await?.as_deref(), Some(FIRST_ACCESS));

    store.clear_scope(StorageScope::Persistent).await?;
    assert_eq!(store.access_token().await?, None);
    Ok(())
}

#[tokio::test]
async fn test_login_failure_surfaces_server_message() -> anyhow::Result<()> {
    let backend = MockBackend::spawn().await?;
    let (client, store) = client_for(&backend).await;

    let result = client
        .login(&LoginCredentials {
            email: TEST_EMAIL.to_string(),
            password: "wrong".to_string(),
            remember_me: false,
        })
        .await;

    match result {
        Err(AppError::Api { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid email or password");
        }
        other => panic!("expected API error, got {:?}", other.map(|u| u.username)),
    }

    assert_eq!(store.access_token().await?, None);
    assert_eq!(client.auth_state(), AuthState::Unauthorized);
    Ok(())
}

#[tokio::test]
async fn test_single_401_refreshes_once_and_retries_once() -> anyhow::Result<()> {
    let backend = MockBackend::spawn().await?;
    let (client, store) = client_for(&backend).await;

    client.login(&credentials(true)).await?;
    // Simulate access-token expiry on the server side.
    backend.state.invalidate_token(FIRST_ACCESS);

    let user = client.current_user().await?;
    assert_eq!(user.username, "jane");

    assert_eq!(backend.state.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.state.protected_calls.load(Ordering::SeqCst), 2);

    // The access token was replaced in place; the refresh token survived.
    assert_eq!(store.access_token().await?.as_deref(), Some(REFRESHED_ACCESS));
    assert_eq!(store.refresh_token().await?.as_deref(), Some(REFRESH_TOKEN));
    assert_eq!(client.auth_state(), AuthState::Authorized);
    Ok(())
}

#[tokio::test]
async fn test_second_401_on_retry_does_not_loop() -> anyhow::Result<()> {
    let backend = MockBackend::spawn().await?;
    let (client, _store) = client_for(&backend).await;

    client.login(&credentials(false)).await?;
    backend
        .state
        .always_unauthorized
        .store(true, Ordering::SeqCst);

    let result = client.current_user().await;
    match result {
        Err(AppError::Api { status, .. }) => assert_eq!(status, 401),
        other => panic!("expected 401 API error, got {:?}", other.map(|u| u.username)),
    }

    // Exactly one refresh and one retried request, then give up.
    assert_eq!(backend.state.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.state.protected_calls.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_refresh_failure_purges_tokens_and_redirects() -> anyhow::Result<()> {
    let backend = MockBackend::spawn().await?;
    let store = Arc::new(TokenStore::in_memory().await?);

    let redirected_to: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let seen = redirected_to.clone();

    let client = ApiClient::new(&backend.client_config(), store.clone())?
        .with_session_expired_hook(move |route| {
            *seen.lock().expect("hook lock") = Some(route.to_string());
        });

    client.login(&credentials(true)).await?;
    backend.state.invalidate_token(FIRST_ACCESS);
    backend
        .state
        .refresh_should_fail
        .store(true, Ordering::SeqCst);

    let result = client.current_user().await;
    assert!(matches!(result, Err(AppError::SessionExpired)));

    // Both scopes are empty and the caller was pointed at the login page.
    assert_eq!(store.access_token().await?, None);
    assert_eq!(store.refresh_token().await?, None);
    assert_eq!(client.auth_state(), AuthState::Unauthorized);
    assert_eq!(
        redirected_to.lock().expect("hook lock").as_deref(),
        Some("/login")
    );
    Ok(())
}

#[tokio::test]
async fn test_concurrent_401s_trigger_a_single_refresh() -> anyhow::Result<()> {
    let backend = MockBackend::spawn().await?;
    let (client, _store) = client_for(&backend).await;

    client.login(&credentials(false)).await?;
    backend.state.invalidate_token(FIRST_ACCESS);

    let (a, b) = tokio::join!(client.current_user(), client.current_user());
    assert!(a.is_ok() && b.is_ok());

    assert_eq!(backend.state.refresh_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_logout_clears_tokens_even_when_server_fails() -> anyhow::Result<()> {
    let backend = MockBackend::spawn().await?;
    let (client, store) = client_for(&backend).await;

    client.login(&credentials(true)).await?;
    backend
        .state
        .logout_should_fail
        .store(true, Ordering::SeqCst);

    client.logout().await?;

    assert_eq!(backend.state.logout_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.access_token().await?, None);
    assert_eq!(store.refresh_token().await?, None);
    assert_eq!(client.auth_state(), AuthState::Unauthorized);
    Ok(())
}

#[tokio::test]
async fn test_csrf_cookie_is_echoed_as_header() -> anyhow::Result<()> {
    let backend = MockBackend::spawn().await?;
    let (client, _store) = client_for(&backend).await;

    // The server rejects authenticated calls without the CSRF header; the
    // login response set the cookie, so the client must echo it back.
    backend.state.require_csrf.store(true, Ordering::SeqCst);
    client.login(&credentials(false)).await?;

    let user = client.current_user().await?;
    assert_eq!(user.email, TEST_EMAIL);
    Ok(())
}

#[tokio::test]
async fn test_backoff_helper_retries_transient_errors() -> anyhow::Result<()> {
    let backend = MockBackend::spawn().await?;
    let (client, _store) = client_for(&backend).await;

    let calls = AtomicUsize::new(0);
    let value = client
        .retry_with_backoff(|| {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(AppError::api(503, "flaky upstream"))
                } else {
                    Ok(42)
                }
            }
        })
        .await?;

    assert_eq!(value, 42);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    Ok(())
}

#[tokio::test]
async fn test_backoff_helper_never_retries_401() -> anyhow::Result<()> {
    let backend = MockBackend::spawn().await?;
    let (client, _store) = client_for(&backend).await;

    let calls = AtomicUsize::new(0);
    let result: Result<(), _> = client
        .retry_with_backoff(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AppError::api(401, "expired")) }
        })
        .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_review_listing_is_a_thin_passthrough() -> anyhow::Result<()> {
    let backend = MockBackend::spawn().await?;
    let (client, _store) = client_for(&backend).await;

    client.login(&credentials(false)).await?;

    let page = client
        .list_reviews(&ReviewQuery {
            page: Some(1),
            page_size: Some(20),
            ..Default::default()
        })
        .await?;

    assert_eq!(page.count, 2);
    assert_eq!(page.results.len(), 2);
    assert_eq!(page.results[0].rating, 5);
    assert_eq!(page.results[1].response.as_deref(), Some("Thanks!"));
    Ok(())
}
