//! Client-side core for the GigDesk freelance marketplace.
//!
//! The backend owns every business rule; this crate owns what the client is
//! responsible for:
//!
//! - the session-token lifecycle (login, bearer/CSRF decoration, one-shot
//!   refresh-and-retry on 401, terminal sign-out on refresh failure)
//! - the avatar upload pipeline (validate, compress, multipart upload with
//!   transfer progress)
//! - a thin typed REST client for the content listing endpoints
//! - the pure view-model math behind list, pagination and dashboard widgets

pub mod api;
pub mod config;
pub mod errors;
pub mod image_processor;
pub mod policy;
pub mod security;
pub mod storage;
pub mod uploader;
pub mod views;

pub use api::{ApiClient, AuthState, LOGIN_ROUTE};
pub use config::ClientConfig;
pub use errors::{AppError, AppResult};
pub use storage::{StorageScope, TokenStore};
pub use uploader::{AvatarUploader, SelectedFile, UploadStage};
