// Built-in report scripts

mod documents;
mod groups;
mod inheritance;
mod lists;
mod permissions;
mod sites;
mod users;

pub use documents::DocumentSearchReport;
pub use groups::GroupsReport;
pub use inheritance::UniquePermissionsReport;
pub use lists::ListInventoryReport;
pub use permissions::PermissionsReport;
pub use sites::SiteInventoryReport;
pub use users::UsersReport;

use crate::script::ReportScript;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

/// Dashboard order
pub fn all() -> Vec<Arc<dyn ReportScript>> {
    vec![
        Arc::new(SiteInventoryReport),
        Arc::new(ListInventoryReport),
        Arc::new(UniquePermissionsReport),
        Arc::new(PermissionsReport),
        Arc::new(GroupsReport),
        Arc::new(UsersReport),
        Arc::new(DocumentSearchReport),
    ]
}

fn text(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn integer(value: &Value, key: &str) -> Option<i64> {
    match value.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn flag(value: &Value, key: &str) -> bool {
    match value.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Items of an expanded collection, bare array or `{"results": [...]}`
fn items<'a>(value: &'a Value, key: &str) -> Vec<&'a Value> {
    match value.get(key) {
        Some(Value::Array(arr)) => arr.iter().collect(),
        Some(Value::Object(obj)) => obj
            .get("results")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Rows of a collection endpoint: `{"value": [...]}`, a bare array or the
/// verbose `{"d": {"results": [...]}}`
fn response_items(body: &Value) -> Vec<&Value> {
    match body {
        Value::Array(arr) => arr.iter().collect(),
        _ => match body.get("value") {
            Some(Value::Array(arr)) => arr.iter().collect(),
            _ => items(body, "d"),
        },
    }
}

fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// `true` when `value` is a timestamp older than `days` days
fn older_than(value: &str, days: i64, now: DateTime<Utc>) -> bool {
    parse_date(value)
        .map(|date| now.signed_duration_since(date).num_days() >= days)
        .unwrap_or(false)
}

/// Cell formatter rendering ISO timestamps as dates
fn format_date(value: &Value) -> String {
    match value.as_str() {
        Some(s) => parse_date(s)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| s.to_string()),
        None => String::new(),
    }
}
