//! Notification panel view model.
//!
//! The read/unread flag is the only local mutation; changes are returned to
//! the caller so they can be echoed to the backend. Nothing is persisted
//! here.

use crate::api::types::{NotificationItem, NotificationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationFilter {
    #[default]
    All,
    Unread,
}

/// Items to render, newest first, truncated to `max_items`.
pub fn visible_notifications<'a>(
    items: &'a [NotificationItem],
    filter: NotificationFilter,
    max_items: usize,
) -> Vec<&'a NotificationItem> {
    let mut visible: Vec<&NotificationItem> = items
        .iter()
        .filter(|item| match filter {
            NotificationFilter::All => true,
            NotificationFilter::Unread => !item.read,
        })
        .collect();

    visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    visible.truncate(max_items);
    visible
}

pub fn unread_count(items: &[NotificationItem]) -> usize {
    items.iter().filter(|item| !item.read).count()
}

/// Flip a single notification to read. Returns whether anything changed so
/// the caller knows to notify the backend.
pub fn mark_read(items: &mut [NotificationItem], id: &str) -> bool {
    for item in items.iter_mut() {
        if item.id == id && !item.read {
            item.read = true;
            return true;
        }
    }
    false
}

/// Mark everything read and return the ids that changed.
pub fn mark_all_read(items: &mut [NotificationItem]) -> Vec<String> {
    let mut changed = Vec::new();
    for item in items.iter_mut() {
        if !item.read {
            item.read = true;
            changed.push(item.id.clone());
        }
    }
    changed
}

/// Badge label for the panel header.
pub fn badge_label(items: &[NotificationItem]) -> Option<String> {
    match unread_count(items) {
        0 => None,
        n if n > 99 => Some("99+".to_string()),
        n => Some(n.to_string()),
    }
}

pub fn kind_label(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Info => "Info",
        NotificationKind::Success => "Success",
        NotificationKind::Warning => "Warning",
        NotificationKind::Error => "Error",
        NotificationKind::Message => "Message",
    }
}
