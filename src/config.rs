use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{AppError, AppResult};

/// Limits applied to a selected avatar image before any network work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarLimits {
    /// Hard ceiling on the selected file size, in bytes.
    pub max_file_bytes: u64,
    /// Declared MIME types accepted by the picker / drop zone.
    pub allowed_types: Vec<String>,
    /// Neither output dimension may exceed this after compression.
    pub max_dimension: u32,
    /// JPEG re-encode quality (1-100).
    pub jpeg_quality: u8,
}

impl Default for AvatarLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: 5 * 1024 * 1024, // 5MB
            allowed_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
            ],
            max_dimension: 1200,
            jpeg_quality: 80,
        }
    }
}

/// Settings for the generic exponential-backoff retry helper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 120_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Versioned JSON API root, e.g. `https://gigdesk.example.com/api`.
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub avatar: AvatarLimits,
    pub retry: RetrySettings,
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            request_timeout_secs: 30,
            avatar: AvatarLimits::default(),
            retry: RetrySettings::default(),
            log_level: "info".to_string(),
        }
    }
}

fn get_config_path() -> AppResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AppError::Config("Could not find config directory".to_string()))?
        .join("GigDesk");

    fs::create_dir_all(&config_dir)?;
    Ok(config_dir.join("config.json"))
}

pub fn load_config() -> AppResult<ClientConfig> {
    load_config_from(&get_config_path()?)
}

pub fn load_config_from(config_path: &Path) -> AppResult<ClientConfig> {
    if config_path.exists() {
        let config_str = fs::read_to_string(config_path)?;
        let config: ClientConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
            log::warn!("Failed to parse config file: {}. Using defaults.", e);
            ClientConfig::default()
        });

        validate_config(&config)?;

        Ok(config)
    } else {
        // First run: persist the defaults so they are editable
        let config = ClientConfig::default();
        save_config_to(&config, config_path)?;
        Ok(config)
    }
}

pub fn save_config(config: &ClientConfig) -> AppResult<()> {
    save_config_to(config, &get_config_path()?)
}

pub fn save_config_to(config: &ClientConfig, config_path: &Path) -> AppResult<()> {
    validate_config(config)?;

    if config_path.exists() {
        let backup_path = config_path.with_extension("json.bak");
        if let Err(e) = fs::copy(config_path, &backup_path) {
            log::warn!("Failed to create config backup: {}", e);
        }
    }

    let config_str = serde_json::to_string_pretty(config)?;
    fs::write(config_path, config_str)?;

    log::info!("Configuration saved successfully");
    Ok(())
}

pub fn get_data_directory() -> AppResult<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| AppError::Config("Could not find data directory".to_string()))?
        .join("GigDesk");

    fs::create_dir_all(&data_dir)?;
    Ok(data_dir)
}

pub fn validate_config(config: &ClientConfig) -> AppResult<()> {
    if config.api_base_url.trim().is_empty() {
        return Err(AppError::validation("api_base_url", "Must not be empty"));
    }

    if config.request_timeout_secs == 0 {
        return Err(AppError::validation(
            "request_timeout_secs",
            "Must be greater than 0",
        ));
    }

    if config.avatar.max_file_bytes == 0 {
        return Err(AppError::validation(
            "avatar.max_file_bytes",
            "Must be greater than 0",
        ));
    }

    if config.avatar.allowed_types.is_empty() {
        return Err(AppError::validation(
            "avatar.allowed_types",
            "At least one MIME type must be allowed",
        ));
    }

    if config.avatar.jpeg_quality == 0 || config.avatar.jpeg_quality > 100 {
        return Err(AppError::validation(
            "avatar.jpeg_quality",
            "Must be between 1 and 100",
        ));
    }

    if config.avatar.max_dimension == 0 {
        return Err(AppError::validation(
            "avatar.max_dimension",
            "Must be greater than 0",
        ));
    }

    if config.retry.max_attempts > 10 {
        return Err(AppError::validation("retry.max_attempts", "Must be 10 or fewer"));
    }

    if config.retry.base_delay_ms < 100 {
        return Err(AppError::validation(
            "retry.base_delay_ms",
            "Must be at least 100ms",
        ));
    }

    let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
    if !valid_log_levels.contains(&config.log_level.as_str()) {
        return Err(AppError::validation("log_level", "Must be a valid log level"));
    }

    Ok(())
}
