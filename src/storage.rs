use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::errors::{AppError, AppResult};

const ACCESS_TOKEN_KEY: &str = "access_token";
const REFRESH_TOKEN_KEY: &str = "refresh_token";
const REMEMBER_KEY: &str = "auth_remember";

/// Where a credential lives. `Persistent` survives restarts (the
/// "remember me" scope), `Session` is wiped with the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageScope {
    Persistent,
    Session,
}

/// Centralized credential store.
///
/// Owns both storage scopes so token state has a single writer: a login
/// writes the access/refresh pair to exactly one scope (chosen by the
/// remember-me flag), a refresh replaces the access token in place and
/// preserves the refresh token, and clearing purges both scopes.
///
/// Every mutation bumps a generation counter. Callers snapshot the
/// generation when they read a token and pass it back when they ask for a
/// refresh; a changed generation means another task already replaced the
/// credentials, so the refresh can be skipped.
pub struct TokenStore {
    persistent: Pool<Sqlite>,
    session: Pool<Sqlite>,
    generation: AtomicU64,
}

impl TokenStore {
    /// Open the store with the persistent scope backed by a sqlite file
    /// under `data_dir` and the session scope held in memory.
    pub async fn open(data_dir: &Path) -> AppResult<Self> {
        std::fs::create_dir_all(data_dir)?;

        let db_path = data_dir.join("credentials.db");
        if !db_path.exists() {
            std::fs::File::create(&db_path)?;
        }

        let persistent = Self::connect(&format!("sqlite:{}", db_path.display())).await?;
        let session = Self::connect("sqlite::memory:").await?;

        log::info!("Credential store opened at {}", db_path.display());

        Ok(Self {
            persistent,
            session,
            generation: AtomicU64::new(0),
        })
    }

    /// Open the store under the app's default data directory.
    pub async fn open_default() -> AppResult<Self> {
        Self::open(&crate::config::get_data_directory()?).await
    }

    /// Fully in-memory store (both scopes); used by tests.
    pub async fn in_memory() -> AppResult<Self> {
        Ok(Self {
            persistent: Self::connect("sqlite::memory:").await?,
            session: Self::connect("sqlite::memory:").await?,
            generation: AtomicU64::new(0),
        })
    }

    async fn connect(url: &str) -> AppResult<Pool<Sqlite>> {
        // A single connection per scope: an in-memory sqlite database exists
        // per connection, and credential access is serial anyway.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(|e| AppError::Config(format!("Cannot open credential store: {}", e)))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS credentials (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(pool)
    }

    fn pool(&self, scope: StorageScope) -> &Pool<Sqlite> {
        match scope {
            StorageScope::Persistent => &self.persistent,
            StorageScope::Session => &self.session,
        }
    }

    async fn get(&self, scope: StorageScope, key: &str) -> AppResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM credentials WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool(scope))
            .await?;

        Ok(row.map(|r| r.get("value")))
    }

    async fn set(&self, scope: StorageScope, key: &str, value: &str) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO credentials (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(key)
        .bind(value)
        .execute(self.pool(scope))
        .await?;

        Ok(())
    }

    async fn remove_all(&self, scope: StorageScope) -> AppResult<()> {
        sqlx::query("DELETE FROM credentials")
            .execute(self.pool(scope))
            .await?;
        Ok(())
    }

    fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Store a freshly issued access/refresh pair in the scope selected by
    /// the remember-me flag. The other scope is left untouched.
    pub async fn store_tokens(
        &self,
        access_token: &str,
        refresh_token: &str,
        remember_me: bool,
    ) -> AppResult<()> {
        let scope = if remember_me {
            StorageScope::Persistent
        } else {
            StorageScope::Session
        };

        self.set(scope, ACCESS_TOKEN_KEY, access_token).await?;
        self.set(scope, REFRESH_TOKEN_KEY, refresh_token).await?;
        self.set(scope, REMEMBER_KEY, if remember_me { "true" } else { "false" })
            .await?;

        self.bump_generation();
        log::info!("Stored credentials in {:?} scope", scope);
        Ok(())
    }

    async fn get_either(&self, key: &str) -> AppResult<Option<String>> {
        if let Some(value) = self.get(StorageScope::Persistent, key).await? {
            return Ok(Some(value));
        }
        self.get(StorageScope::Session, key).await
    }

    pub async fn access_token(&self) -> AppResult<Option<String>> {
        self.get_either(ACCESS_TOKEN_KEY).await
    }

    pub async fn refresh_token(&self) -> AppResult<Option<String>> {
        self.get_either(REFRESH_TOKEN_KEY).await
    }

    pub async fn remember_me(&self) -> AppResult<bool> {
        Ok(self
            .get_either(REMEMBER_KEY)
            .await?
            .map(|v| v == "true")
            .unwrap_or(false))
    }

    /// Replace the access token in whichever scope currently holds the
    /// credential pair, preserving the refresh token.
    pub async fn replace_access_token(&self, access_token: &str) -> AppResult<()> {
        let scope = if self
            .get(StorageScope::Persistent, REFRESH_TOKEN_KEY)
            .await?
            .is_some()
        {
            StorageScope::Persistent
        } else if self
            .get(StorageScope::Session, REFRESH_TOKEN_KEY)
            .await?
            .is_some()
        {
            StorageScope::Session
        } else {
            return Err(AppError::SessionExpired);
        };

        self.set(scope, ACCESS_TOKEN_KEY, access_token).await?;
        self.bump_generation();
        log::debug!("Access token replaced in {:?} scope", scope);
        Ok(())
    }

    /// Purge credentials from both scopes.
    pub async fn clear_all(&self) -> AppResult<()> {
        self.remove_all(StorageScope::Persistent).await?;
        self.remove_all(StorageScope::Session).await?;
        self.bump_generation();
        log::info!("Cleared all stored credentials");
        Ok(())
    }

    /// Wipe a single scope. Mirrors the browser clearing session storage on
    /// tab close (or the user clearing site data).
    pub async fn clear_scope(&self, scope: StorageScope) -> AppResult<()> {
        self.remove_all(scope).await?;
        self.bump_generation();
        Ok(())
    }
}
