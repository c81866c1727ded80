//! Free-text notification payload parsing.
//!
//! Notification endpoints embed the referenced record id in the message as
//! `(ID: <digits>)` and signal the kind of notification by its leading words.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::models::{NotificationCategory, NotificationIcon};

static ID_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(ID: (\d+)\)").unwrap());

/// Ordered prefix table; first match wins. Case-sensitive, as sent by the API.
const CATEGORY_PREFIXES: &[(&str, NotificationCategory)] = &[
    ("New Message", NotificationCategory::Message),
    ("New Recommendation", NotificationCategory::Recommendation),
    ("New Request", NotificationCategory::Request),
    ("New Information", NotificationCategory::Information),
    ("New appointment", NotificationCategory::Appointment),
];

/// Icon keywords, matched anywhere in the message.
const ICON_KEYWORDS: &[(&str, NotificationIcon)] = &[
    ("Message", NotificationIcon::Message),
    ("Appointment", NotificationIcon::Calendar),
    ("Recommendation", NotificationIcon::Activity),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedMessage {
    pub category: NotificationCategory,
    /// Empty when the message carries no marker.
    pub ref_id: String,
    pub display_text: String,
    /// Presentation only. Does not feed category or link resolution.
    pub icon: NotificationIcon,
}

pub fn parse(raw: &str) -> ParsedMessage {
    ParsedMessage {
        category: categorize(raw),
        ref_id: extract_ref_id(raw),
        display_text: strip_markers(raw),
        icon: icon_for(raw),
    }
}

/// Digits of the first marker, or an empty string.
pub fn extract_ref_id(raw: &str) -> String {
    ID_MARKER
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Remove every marker and trim. Stripping all of them (not only the first)
/// keeps the output free of markers, so a second pass changes nothing.
pub fn strip_markers(raw: &str) -> String {
    ID_MARKER.replace_all(raw, "").trim().to_string()
}

pub fn categorize(raw: &str) -> NotificationCategory {
    CATEGORY_PREFIXES
        .iter()
        .find(|(prefix, _)| raw.starts_with(prefix))
        .map(|(_, category)| *category)
        .unwrap_or(NotificationCategory::Unclassified)
}

pub fn icon_for(raw: &str) -> NotificationIcon {
    ICON_KEYWORDS
        .iter()
        .find(|(keyword, _)| raw.contains(keyword))
        .map(|(_, icon)| *icon)
        .unwrap_or(NotificationIcon::Bell)
}
