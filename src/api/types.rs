use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub user_type: Role,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
    pub remember_me: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterData {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

/// Login/register/social response: token pair plus the signed-in profile.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access: String,
    pub refresh: String,
    pub user: User,
}

/// Refresh response: only the access token is reissued.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialProvider {
    WeChat,
    Qq,
}

impl SocialProvider {
    pub fn endpoint(&self) -> &'static str {
        match self {
            SocialProvider::WeChat => "/auth/wechat/",
            SocialProvider::Qq => "/auth/qq/",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SocialProvider::WeChat => "WeChat",
            SocialProvider::Qq => "QQ",
        }
    }
}

/// DRF-style page envelope used by every listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Paginated<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub rating: u8,
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub helpful_count: u32,
    pub reviewer: ActorRef,
    /// Seller response, if any.
    #[serde(default)]
    pub response: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
    Message,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Order,
    Review,
    Message,
    Payment,
    Service,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub actor: Option<ActorRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSummary {
    pub id: String,
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub total_orders: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderSummary {
    pub id: String,
    pub service: String,
    pub status: String,
    pub total: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub participants: Vec<ActorRef>,
    #[serde(default)]
    pub unread_count: u32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageItem {
    pub id: String,
    pub sender: ActorRef,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Response from the avatar upload endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AvatarUploadResponse {
    pub url: String,
}

/// Record of a completed avatar upload. Created only after the backend
/// confirms the stored URL; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedImage {
    pub id: String,
    pub url: String,
    pub name: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
}
