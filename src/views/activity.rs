//! Activity feed view model.

use crate::api::types::{ActivityItem, ActivityKind};

pub fn kind_label(kind: ActivityKind) -> &'static str {
    match kind {
        ActivityKind::Order => "Order",
        ActivityKind::Review => "Review",
        ActivityKind::Message => "Message",
        ActivityKind::Payment => "Payment",
        ActivityKind::Service => "Service",
        ActivityKind::System => "System",
    }
}

/// Most recent activity first, truncated to the widget's row limit.
pub fn recent_activity<'a>(items: &'a [ActivityItem], max_items: usize) -> Vec<&'a ActivityItem> {
    let mut rows: Vec<&ActivityItem> = items.iter().collect();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows.truncate(max_items);
    rows
}

/// One line per row: actor (when known), then the title.
pub fn row_headline(item: &ActivityItem) -> String {
    match &item.actor {
        Some(actor) => format!("{} · {}", actor.name, item.title),
        None => item.title.clone(),
    }
}
