use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::types::{AvatarUploadResponse, UploadedImage};
use crate::api::ApiClient;
use crate::config::AvatarLimits;
use crate::errors::{AppError, AppResult};
use crate::image_processor::{self, CropRegion};
use crate::security::InputValidator;

use super::progress::ProgressTracker;

const AVATAR_UPLOAD_PATH: &str = "/users/me/avatar/";
const AVATAR_FIELD: &str = "avatar";

/// An image handed over by the file picker or drop zone. `content_type` is
/// the type the source declared, which is what the allow-list is checked
/// against.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Load from disk, deriving the declared type from the extension the
    /// way a picker would.
    pub async fn from_path(path: &Path) -> AppResult<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| InputValidator::sanitize_filename(&n.to_string_lossy()))
            .unwrap_or_else(|| "avatar".to_string());

        let content_type = match path.extension().and_then(|e| e.to_str()) {
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("webp") => "image/webp",
            Some("gif") => "image/gif",
            _ => "application/octet-stream",
        };

        Ok(Self::new(name, content_type, bytes))
    }
}

/// Pipeline states. Failure at any point keeps the previous avatar: nothing
/// partial is ever committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Idle,
    Selected,
    Compressing,
    Uploading,
    Done,
    Failed,
}

/// Turns a user-selected image into a stored avatar URL with bounded size
/// and dimensions.
pub struct AvatarUploader {
    limits: AvatarLimits,
    stage: UploadStage,
    selected: Option<SelectedFile>,
    avatar_url: Option<String>,
    last_upload: Option<UploadedImage>,
    last_error: Option<String>,
}

impl AvatarUploader {
    pub fn new(limits: AvatarLimits) -> Self {
        Self {
            limits,
            stage: UploadStage::Idle,
            selected: None,
            avatar_url: None,
            last_upload: None,
            last_error: None,
        }
    }

    /// Seed the uploader with the avatar currently on the profile.
    pub fn with_current_avatar(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    pub fn stage(&self) -> UploadStage {
        self.stage
    }

    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar_url.as_deref()
    }

    pub fn last_upload(&self) -> Option<&UploadedImage> {
        self.last_upload.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Errors are dismissible; dismissing a failed upload returns to `Idle`.
    pub fn dismiss_error(&mut self) {
        self.last_error = None;
        if self.stage == UploadStage::Failed {
            self.stage = UploadStage::Idle;
        }
    }

    /// Accept a file from the picker or drop zone. Files outside the
    /// allow-list or over the size ceiling are rejected with a field-level
    /// error before any decoding or network work, and no later stage is
    /// entered.
    pub fn select(&mut self, file: SelectedFile) -> AppResult<()> {
        if let Err(e) = InputValidator::validate_avatar_file(
            &file.name,
            &file.content_type,
            file.bytes.len() as u64,
            &self.limits,
        ) {
            log::warn!("Rejected avatar selection {}: {}", file.name, e);
            self.last_error = Some(e.to_string());
            return Err(e);
        }

        log::debug!(
            "Selected avatar {} ({}, {} bytes)",
            file.name,
            file.content_type,
            file.bytes.len()
        );
        self.selected = Some(file);
        self.last_error = None;
        self.stage = UploadStage::Selected;
        Ok(())
    }

    pub fn cancel_selection(&mut self) {
        self.selected = None;
        self.stage = UploadStage::Idle;
    }

    /// Run the confirmed selection through compression and upload.
    ///
    /// `crop` is the region confirmed in the crop dialog (`None` keeps the
    /// full frame). Progress callbacks carry a monotonically increasing
    /// percentage driven by the transfer itself. On success the avatar URL
    /// is replaced and an upload record returned; on failure the previous
    /// avatar stays untouched and the selection is kept for another try.
    pub async fn upload<F>(
        &mut self,
        client: &ApiClient,
        crop: Option<CropRegion>,
        on_progress: F,
    ) -> AppResult<UploadedImage>
    where
        F: Fn(f32) + Send + Sync + 'static,
    {
        let file = self
            .selected
            .clone()
            .ok_or_else(|| AppError::validation("avatar", "No file selected"))?;

        self.stage = UploadStage::Compressing;
        log::info!("Compressing avatar {} ({} bytes)", file.name, file.bytes.len());

        let compressed = match image_processor::prepare_avatar(
            &file.bytes,
            crop,
            self.limits.max_dimension,
            self.limits.jpeg_quality,
        ) {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.fail(e)),
        };

        self.stage = UploadStage::Uploading;

        let tracker = Arc::new(ProgressTracker::new());
        let callback = Arc::new(on_progress);
        let progress: Arc<dyn Fn(f32) + Send + Sync> = {
            let tracker = Arc::clone(&tracker);
            let callback = Arc::clone(&callback);
            Arc::new(move |percent: f32| callback(tracker.observe(percent)))
        };

        let upload_name = upload_file_name(&file.name);
        let response: AvatarUploadResponse = match client
            .post_multipart_with_progress(
                AVATAR_UPLOAD_PATH,
                AVATAR_FIELD,
                &upload_name,
                "image/jpeg",
                &compressed,
                &[("type", "avatar")],
                progress,
                "Avatar upload failed",
            )
            .await
        {
            Ok(response) => response,
            Err(e) => return Err(self.fail(e)),
        };

        let record = UploadedImage {
            id: Uuid::new_v4().to_string(),
            url: response.url.clone(),
            name: file.name,
            size: compressed.len() as u64,
            uploaded_at: Utc::now(),
        };

        self.avatar_url = Some(response.url);
        self.last_upload = Some(record.clone());
        self.selected = None;
        self.last_error = None;
        self.stage = UploadStage::Done;

        log::info!("Avatar uploaded: {} ({} bytes)", record.url, record.size);
        Ok(record)
    }

    fn fail(&mut self, error: AppError) -> AppError {
        log::error!("Avatar upload failed: {}", error);
        self.last_error = Some(error.to_string());
        self.stage = UploadStage::Failed;
        error
    }

    /// Removal is immediate and local: clears the stored URL and hands the
    /// previous value back so the caller can update its own state. No
    /// backend round-trip.
    pub fn remove(&mut self) -> Option<String> {
        let previous = self.avatar_url.take();
        self.last_upload = None;
        self.stage = UploadStage::Idle;

        if previous.is_some() {
            log::info!("Avatar removed");
        }
        previous
    }
}

/// The payload is always re-encoded JPEG, so the uploaded name carries a
/// matching extension regardless of what was selected.
fn upload_file_name(original: &str) -> String {
    let stem = Path::new(original)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "avatar".to_string());

    format!("{}.jpg", InputValidator::sanitize_filename(&stem))
}
