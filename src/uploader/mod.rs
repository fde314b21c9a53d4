// Avatar upload pipeline: validate a selected image, compress it
// client-side, ship it as multipart and report transfer progress.

pub mod avatar;
pub mod progress;

pub use avatar::{AvatarUploader, SelectedFile, UploadStage};
pub use progress::ProgressTracker;
