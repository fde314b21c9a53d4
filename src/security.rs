use regex::Regex;

use crate::config::AvatarLimits;
use crate::errors::{AppError, AppResult};

pub struct InputValidator;

impl InputValidator {
    /// Validate a selected avatar file against the configured allow-list and
    /// size ceiling. Runs before any decoding or network work, so rejected
    /// files never leave the selection stage.
    pub fn validate_avatar_file(
        name: &str,
        content_type: &str,
        size: u64,
        limits: &AvatarLimits,
    ) -> AppResult<()> {
        if name.trim().is_empty() {
            return Err(AppError::validation("avatar", "File name cannot be empty"));
        }

        let declared = content_type.trim().to_ascii_lowercase();
        if !limits
            .allowed_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&declared))
        {
            return Err(AppError::invalid_file_type(&declared, &limits.allowed_types));
        }

        if size == 0 {
            return Err(AppError::validation("avatar", "File is empty"));
        }

        if size > limits.max_file_bytes {
            return Err(AppError::file_too_large(size, limits.max_file_bytes));
        }

        Ok(())
    }

    pub fn validate_email(email: &str) -> AppResult<()> {
        let trimmed = email.trim();

        if trimmed.is_empty() {
            return Err(AppError::validation("email", "Email cannot be empty"));
        }

        if trimmed.len() > 254 {
            return Err(AppError::validation("email", "Email too long"));
        }

        let email_pattern = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
        if !email_pattern.is_match(trimmed) {
            return Err(AppError::validation("email", "Invalid email address"));
        }

        Ok(())
    }

    pub fn validate_username(username: &str) -> AppResult<()> {
        let trimmed = username.trim();

        if trimmed.is_empty() {
            return Err(AppError::validation("username", "Username cannot be empty"));
        }

        if trimmed.len() < 3 || trimmed.len() > 30 {
            return Err(AppError::validation(
                "username",
                "Username must be between 3 and 30 characters",
            ));
        }

        let safe_chars = Regex::new(r"^[a-zA-Z0-9_\-\.]+$").unwrap();
        if !safe_chars.is_match(trimmed) {
            return Err(AppError::validation(
                "username",
                "Username contains invalid characters",
            ));
        }

        Ok(())
    }

    pub fn validate_password(password: &str) -> AppResult<()> {
        if password.len() < 8 {
            return Err(AppError::validation(
                "password",
                "Password must be at least 8 characters",
            ));
        }

        if password.len() > 128 {
            return Err(AppError::validation("password", "Password too long"));
        }

        Ok(())
    }

    pub fn sanitize_filename(filename: &str) -> String {
        // Remove or replace unsafe characters in filenames
        let unsafe_chars = Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).unwrap();
        let sanitized = unsafe_chars.replace_all(filename.trim(), "_");

        // Limit length
        if sanitized.len() > 255 {
            format!("{}...", &sanitized[..252])
        } else {
            sanitized.to_string()
        }
    }
}
