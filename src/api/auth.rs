use reqwest::Method;
use serde_json::{json, Value};

use crate::api::client::{decode_json, ensure_success, ApiClient, LOGIN_ROUTE};
use crate::api::types::{
    AuthResponse, LoginCredentials, RefreshResponse, RegisterData, SocialProvider, User,
};
use crate::errors::{AppError, AppResult};
use crate::security::InputValidator;

const AUTH_LOGIN: &str = "/auth/login/";
const AUTH_REGISTER: &str = "/auth/register/";
const AUTH_LOGOUT: &str = "/auth/logout/";
const AUTH_REFRESH: &str = "/auth/token/refresh/";
const AUTH_VERIFY_EMAIL: &str = "/auth/verify-email/";
const AUTH_RESEND_VERIFICATION: &str = "/auth/resend-verification/";
const AUTH_PASSWORD_RESET: &str = "/auth/password-reset/";
const AUTH_PASSWORD_RESET_CONFIRM: &str = "/auth/password-reset-confirm/";
const AUTH_CHANGE_PASSWORD: &str = "/auth/change-password/";
const AUTH_ME: &str = "/auth/me/";
const AUTH_PROFILE: &str = "/auth/profile/";

/// Session state as seen by the client.
///
/// `Refreshing` is entered when a 401 kicks off a token refresh;
/// `Unauthorized` is terminal until the next successful login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Authorized,
    Refreshing,
    Unauthorized,
}

impl ApiClient {
    /// Sign in and store the issued token pair in the scope selected by the
    /// remember-me flag.
    pub async fn login(&self, credentials: &LoginCredentials) -> AppResult<User> {
        InputValidator::validate_email(&credentials.email)?;
        if credentials.password.is_empty() {
            return Err(AppError::validation("password", "Password cannot be empty"));
        }

        let body = json!({
            "email": credentials.email,
            "password": credentials.password,
            "remember_me": credentials.remember_me,
        });

        let response: AuthResponse = self
            .request_json_noauth(Method::POST, AUTH_LOGIN, Some(body), "Login failed")
            .await?;

        self.store
            .store_tokens(&response.access, &response.refresh, credentials.remember_me)
            .await?;
        self.set_state(AuthState::Authorized);

        log::info!("Logged in as {}", response.user.username);
        Ok(response.user)
    }

    pub async fn register(&self, data: &RegisterData) -> AppResult<User> {
        InputValidator::validate_username(&data.username)?;
        InputValidator::validate_email(&data.email)?;
        InputValidator::validate_password(&data.password)?;

        let body = json!({
            "username": data.username,
            "email": data.email,
            "password": data.password,
            "first_name": data.first_name,
            "last_name": data.last_name,
            "role": data.role,
        });

        let response: AuthResponse = self
            .request_json_noauth(Method::POST, AUTH_REGISTER, Some(body), "Registration failed")
            .await?;

        // A fresh registration is a session-scoped login until the user opts
        // into being remembered.
        self.store
            .store_tokens(&response.access, &response.refresh, false)
            .await?;
        self.set_state(AuthState::Authorized);

        log::info!("Registered account {}", response.user.username);
        Ok(response.user)
    }

    /// Best-effort server notification; token clearing happens
    /// unconditionally even if the network call fails.
    pub async fn logout(&self) -> AppResult<()> {
        if let Err(e) = self
            .request_empty(Method::POST, AUTH_LOGOUT, None, "Logout failed")
            .await
        {
            log::warn!("Logout request failed (clearing local session anyway): {}", e);
        }

        self.store.clear_all().await?;
        self.set_state(AuthState::Unauthorized);
        log::info!("Logged out");
        Ok(())
    }

    /// Refresh the access token with the stored refresh token.
    ///
    /// `observed_generation` is the store generation seen when the failing
    /// request was decorated. Refreshes are serialized, and if the
    /// generation moved while we waited the refresh already happened and is
    /// skipped, so a burst of concurrent 401s produces a single refresh
    /// call.
    ///
    /// On failure the session is over: both storage scopes are purged, the
    /// state machine moves to `Unauthorized` and the session-expired hook is
    /// invoked with the login route.
    pub(crate) async fn refresh_access_token(&self, observed_generation: u64) -> AppResult<()> {
        let _guard = self.refresh_lock.lock().await;

        if self.store.generation() != observed_generation {
            log::debug!("Skipping refresh, credentials already replaced by another task");
            return Ok(());
        }

        self.set_state(AuthState::Refreshing);

        let refresh_token = match self.store.refresh_token().await? {
            Some(token) => token,
            None => {
                log::warn!("No refresh token stored, ending session");
                return self.fail_session().await;
            }
        };

        let body = json!({ "refresh": refresh_token });
        let refreshed: AppResult<RefreshResponse> = match self
            .http
            .post(self.url(AUTH_REFRESH))
            .json(&body)
            .send()
            .await
        {
            Ok(response) => decode_json(response, "Token refresh failed").await,
            Err(e) => Err(e.into()),
        };

        match refreshed {
            Ok(tokens) => {
                // The refresh token stays; only the access token is reissued.
                self.store.replace_access_token(&tokens.access).await?;
                self.set_state(AuthState::Authorized);
                log::info!("Access token refreshed");
                Ok(())
            }
            Err(e) => {
                log::warn!("Token refresh failed, ending session: {}", e);
                self.fail_session().await
            }
        }
    }

    async fn fail_session(&self) -> AppResult<()> {
        if let Err(e) = self.store.clear_all().await {
            log::error!("Failed to clear stored credentials: {}", e);
        }
        self.set_state(AuthState::Unauthorized);

        if let Some(hook) = &self.on_session_expired {
            hook(LOGIN_ROUTE);
        }

        Err(AppError::SessionExpired)
    }

    pub async fn current_user(&self) -> AppResult<User> {
        self.request_json(Method::GET, AUTH_ME, &[], None, "Failed to load profile")
            .await
    }

    pub async fn update_profile(&self, fields: Value) -> AppResult<User> {
        self.request_json(
            Method::PATCH,
            AUTH_PROFILE,
            &[],
            Some(fields),
            "Failed to update profile",
        )
        .await
    }

    pub async fn verify_email(&self, token: &str) -> AppResult<()> {
        self.post_noauth_empty(
            AUTH_VERIFY_EMAIL,
            json!({ "token": token }),
            "Email verification failed",
        )
        .await
    }

    pub async fn resend_verification_email(&self, email: &str) -> AppResult<()> {
        InputValidator::validate_email(email)?;
        self.post_noauth_empty(
            AUTH_RESEND_VERIFICATION,
            json!({ "email": email }),
            "Failed to send verification email",
        )
        .await
    }

    pub async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        InputValidator::validate_email(email)?;
        self.post_noauth_empty(
            AUTH_PASSWORD_RESET,
            json!({ "email": email }),
            "Failed to send reset email",
        )
        .await
    }

    pub async fn confirm_password_reset(&self, token: &str, new_password: &str) -> AppResult<()> {
        InputValidator::validate_password(new_password)?;
        self.post_noauth_empty(
            AUTH_PASSWORD_RESET_CONFIRM,
            json!({ "token": token, "new_password": new_password }),
            "Password reset failed",
        )
        .await
    }

    pub async fn change_password(&self, old_password: &str, new_password: &str) -> AppResult<()> {
        InputValidator::validate_password(new_password)?;
        self.request_empty(
            Method::POST,
            AUTH_CHANGE_PASSWORD,
            Some(json!({ "old_password": old_password, "new_password": new_password })),
            "Password change failed",
        )
        .await
    }

    /// Social sign-in. Failures are converted to a field-scoped message for
    /// the login form rather than propagated raw.
    pub async fn social_login(
        &self,
        provider: SocialProvider,
        provider_token: &str,
    ) -> AppResult<User> {
        let body = json!({ "access_token": provider_token });
        let fallback = format!("{} login failed", provider.label());

        let response: AuthResponse = self
            .request_json_noauth(Method::POST, provider.endpoint(), Some(body), &fallback)
            .await
            .map_err(|e| AppError::validation("social", &e.to_string()))?;

        self.store
            .store_tokens(&response.access, &response.refresh, false)
            .await?;
        self.set_state(AuthState::Authorized);

        log::info!("Signed in via {}", provider.label());
        Ok(response.user)
    }

    async fn post_noauth_empty(&self, path: &str, body: Value, fallback: &str) -> AppResult<()> {
        let response = self.http.post(self.url(path)).json(&body).send().await?;
        ensure_success(response, fallback).await
    }
}
