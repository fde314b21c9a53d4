use reqwest::Method;

use crate::api::client::ApiClient;
use crate::api::types::{
    ConversationSummary, MessageItem, NotificationItem, OrderSummary, Paginated, Review,
    ServiceSummary,
};
use crate::errors::AppResult;

/// Listing filters for the services catalog. All server-side; the client
/// only forwards them as query parameters.
#[derive(Debug, Clone, Default)]
pub struct ServiceQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
}

impl ServiceQuery {
    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_opt(&mut pairs, "page", self.page.map(|v| v.to_string()));
        push_opt(&mut pairs, "page_size", self.page_size.map(|v| v.to_string()));
        push_opt(&mut pairs, "category", self.category.clone());
        push_opt(&mut pairs, "min_price", self.min_price.map(|v| v.to_string()));
        push_opt(&mut pairs, "max_price", self.max_price.map(|v| v.to_string()));
        push_opt(&mut pairs, "search", self.search.clone());
        push_opt(&mut pairs, "sort_by", self.sort_by.clone());
        pairs
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub status: Option<String>,
    /// `buyer` or `seller`.
    pub role: Option<String>,
}

impl OrderQuery {
    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_opt(&mut pairs, "page", self.page.map(|v| v.to_string()));
        push_opt(&mut pairs, "page_size", self.page_size.map(|v| v.to_string()));
        push_opt(&mut pairs, "status", self.status.clone());
        push_opt(&mut pairs, "role", self.role.clone());
        pairs
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReviewQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub user: Option<String>,
    pub service: Option<String>,
    pub rating: Option<u8>,
}

impl ReviewQuery {
    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_opt(&mut pairs, "page", self.page.map(|v| v.to_string()));
        push_opt(&mut pairs, "page_size", self.page_size.map(|v| v.to_string()));
        push_opt(&mut pairs, "user", self.user.clone());
        push_opt(&mut pairs, "service", self.service.clone());
        push_opt(&mut pairs, "rating", self.rating.map(|v| v.to_string()));
        pairs
    }
}

fn push_opt(pairs: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<String>) {
    if let Some(value) = value {
        pairs.push((key, value));
    }
}

/// Thin pass-throughs to the content listing endpoints. The backend owns
/// filtering, ordering and pagination; nothing here post-processes results.
impl ApiClient {
    pub async fn list_services(
        &self,
        query: &ServiceQuery,
    ) -> AppResult<Paginated<ServiceSummary>> {
        self.request_json(
            Method::GET,
            "/services/",
            &query.to_pairs(),
            None,
            "Failed to load services",
        )
        .await
    }

    pub async fn get_service(&self, id: &str) -> AppResult<ServiceSummary> {
        self.request_json(
            Method::GET,
            &format!("/services/{}/", id),
            &[],
            None,
            "Failed to load service",
        )
        .await
    }

    pub async fn list_orders(&self, query: &OrderQuery) -> AppResult<Paginated<OrderSummary>> {
        self.request_json(
            Method::GET,
            "/orders/",
            &query.to_pairs(),
            None,
            "Failed to load orders",
        )
        .await
    }

    pub async fn list_reviews(&self, query: &ReviewQuery) -> AppResult<Paginated<Review>> {
        self.request_json(
            Method::GET,
            "/reviews/",
            &query.to_pairs(),
            None,
            "Failed to load reviews",
        )
        .await
    }

    pub async fn mark_review_helpful(&self, review_id: &str) -> AppResult<()> {
        self.request_empty(
            Method::POST,
            &format!("/reviews/{}/helpful/", review_id),
            None,
            "Failed to record vote",
        )
        .await
    }

    pub async fn list_notifications(
        &self,
        page: Option<u32>,
    ) -> AppResult<Paginated<NotificationItem>> {
        let mut pairs = Vec::new();
        push_opt(&mut pairs, "page", page.map(|v| v.to_string()));

        self.request_json(
            Method::GET,
            "/notifications/",
            &pairs,
            None,
            "Failed to load notifications",
        )
        .await
    }

    pub async fn mark_notification_read(&self, notification_id: &str) -> AppResult<()> {
        self.request_empty(
            Method::POST,
            &format!("/notifications/{}/mark-read/", notification_id),
            None,
            "Failed to mark notification read",
        )
        .await
    }

    pub async fn mark_all_notifications_read(&self) -> AppResult<()> {
        self.request_empty(
            Method::POST,
            "/notifications/mark-all-read/",
            None,
            "Failed to mark notifications read",
        )
        .await
    }

    pub async fn list_conversations(&self) -> AppResult<Paginated<ConversationSummary>> {
        self.request_json(
            Method::GET,
            "/messages/conversations/",
            &[],
            None,
            "Failed to load conversations",
        )
        .await
    }

    pub async fn list_messages(
        &self,
        conversation_id: &str,
        page: Option<u32>,
    ) -> AppResult<Paginated<MessageItem>> {
        let mut pairs = Vec::new();
        push_opt(&mut pairs, "page", page.map(|v| v.to_string()));

        self.request_json(
            Method::GET,
            &format!("/messages/conversations/{}/messages/", conversation_id),
            &pairs,
            None,
            "Failed to load messages",
        )
        .await
    }

    pub async fn mark_conversation_read(&self, conversation_id: &str) -> AppResult<()> {
        self.request_empty(
            Method::POST,
            &format!("/messages/conversations/{}/read/", conversation_id),
            None,
            "Failed to mark conversation read",
        )
        .await
    }
}
