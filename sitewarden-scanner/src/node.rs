use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A site or web discovered by the enumerator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: Option<String>,
    /// Absolute URL of the web
    pub url: String,
    pub server_relative_url: String,
    pub title: String,
    /// `None` marks the root web of a site collection
    pub parent_id: Option<String>,
    /// Child web URLs, only populated when child webs were expanded
    pub children: Vec<String>,
    /// Raw web payload, kept for report projections
    #[serde(skip_serializing_if = "Value::is_null", default)]
    pub payload: Value,
}

impl Node {
    /// Build a node from a web payload.
    ///
    /// Accepts `odata=nometadata` bodies as well as the `odata=verbose` shape
    /// (`{"d": {...}}` with `results` collections).
    pub fn from_payload(requested_url: &str, payload: Value) -> Result<Self> {
        let payload = unwrap_verbose(payload);
        if !payload.is_object() {
            return Err(ScanError::ParseError(format!(
                "web payload for {} is not an object",
                requested_url
            )));
        }

        let url = string_field(&payload, "Url").unwrap_or_else(|| requested_url.to_string());
        let server_relative_url = string_field(&payload, "ServerRelativeUrl")
            .unwrap_or_else(|| server_relative_from(&url));
        let title = string_field(&payload, "Title").unwrap_or_default();
        let id = string_field(&payload, "Id");

        let parent_id = payload
            .get("ParentWeb")
            .filter(|p| p.is_object())
            .and_then(|p| string_field(p, "Id"));

        let children = collection(&payload, "Webs")
            .iter()
            .filter_map(|web| string_field(web, "Url"))
            .collect();

        Ok(Self {
            id,
            url,
            server_relative_url,
            title,
            parent_id,
            children,
            payload,
        })
    }

    pub fn is_site_collection_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Items of an expanded collection on the raw payload (e.g. `Lists`)
    pub fn collection(&self, name: &str) -> Vec<&Value> {
        collection(&self.payload, name)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name).filter(|v| !v.is_null())
    }
}

/// A URL that could not be enumerated, and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeFailure {
    pub url: String,
    pub reason: String,
}

impl NodeFailure {
    pub fn new(url: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// Nodes in discovery order plus the URLs that failed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnumerationResult {
    pub nodes: Vec<Node>,
    pub errors: Vec<NodeFailure>,
}

impl EnumerationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failed(failure: NodeFailure) -> Self {
        Self {
            nodes: Vec::new(),
            errors: vec![failure],
        }
    }

    /// Append another result after this one, keeping order
    pub fn extend(&mut self, other: EnumerationResult) {
        self.nodes.extend(other.nodes);
        self.errors.extend(other.errors);
    }

    pub fn error_urls(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.url.as_str()).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

fn unwrap_verbose(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) if map.len() == 1 && map.contains_key("d") => {
            map.remove("d").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Expanded collections come back either as a bare array or, in verbose
/// mode, as `{"results": [...]}`.
pub(crate) fn collection<'a>(value: &'a Value, key: &str) -> Vec<&'a Value> {
    match value.get(key) {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(obj)) => obj
            .get("results")
            .and_then(Value::as_array)
            .map(|items| items.iter().collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn server_relative_from(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.path().trim_end_matches('/').to_string())
        .map(|p| if p.is_empty() { "/".to_string() } else { p })
        .unwrap_or_else(|_| url.to_string())
}
