// Report script contract and the startup registry

use crate::error::ReportError;
use crate::remediation::{RemediationAction, RemediationTarget};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sitewarden_scanner::{Node, QuerySpec, ScanError, SiteClient};
use std::sync::Arc;

/// Report-specific knobs the operator can set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportParams {
    pub recursive: bool,
    pub search_term: Option<String>,
    pub older_than_days: Option<i64>,
    pub include_hidden: bool,
}

/// Editable input of one report run: target URLs plus parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportForm {
    pub urls: Vec<String>,
    pub params: ReportParams,
}

impl ReportForm {
    pub fn new(seed_urls: Vec<String>) -> Self {
        let mut form = Self::default();
        for url in seed_urls {
            form.add_url(url);
        }
        form
    }

    /// Blank entries are ignored; duplicates are kept on purpose
    pub fn add_url(&mut self, url: impl Into<String>) -> &mut Self {
        let url = url.into().trim().to_string();
        if !url.is_empty() {
            self.urls.push(url);
        }
        self
    }

    pub fn remove_url(&mut self, url: &str) -> bool {
        let before = self.urls.len();
        self.urls.retain(|u| u != url.trim());
        self.urls.len() != before
    }

    pub fn recursive(&mut self, recursive: bool) -> &mut Self {
        self.params.recursive = recursive;
        self
    }

    pub fn search_term(&mut self, term: Option<String>) -> &mut Self {
        self.params.search_term = term.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        self
    }

    pub fn older_than_days(&mut self, days: Option<i64>) -> &mut Self {
        self.params.older_than_days = days;
        self
    }

    pub fn include_hidden(&mut self, include: bool) -> &mut Self {
        self.params.include_hidden = include;
        self
    }
}

pub type CellFormatter = fn(&Value) -> String;

/// One column of a report table
#[derive(Clone, Copy)]
pub struct Column {
    pub key: &'static str,
    pub title: &'static str,
    pub format: Option<CellFormatter>,
}

impl Column {
    pub const fn new(key: &'static str, title: &'static str) -> Self {
        Self { key, title, format: None }
    }

    pub const fn formatted(key: &'static str, title: &'static str, format: CellFormatter) -> Self {
        Self {
            key,
            title,
            format: Some(format),
        }
    }

    pub fn render(&self, value: &Value) -> String {
        match self.format {
            Some(format) => format(value),
            None => plain_text(value),
        }
    }
}

impl std::fmt::Debug for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("key", &self.key)
            .field("title", &self.title)
            .field("formatted", &self.format.is_some())
            .finish()
    }
}

/// Default cell rendering: strings verbatim, null as empty
pub fn plain_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => (if *b { "Yes" } else { "No" }).to_string(),
        other => other.to_string(),
    }
}

/// A flat record produced by a report script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Web the row was collected from
    pub web_url: String,
    pub cells: Map<String, Value>,
    /// What a remediation action on this row would act upon
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target: Option<RemediationTarget>,
}

impl ReportRow {
    pub fn new(web_url: impl Into<String>) -> Self {
        Self {
            web_url: web_url.into(),
            cells: Map::new(),
            target: None,
        }
    }

    pub fn cell(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.cells.insert(key.to_string(), value.into());
        self
    }

    pub fn target(mut self, target: RemediationTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn get(&self, key: &str) -> &Value {
        self.cells.get(key).unwrap_or(&Value::Null)
    }
}

/// One administrative report.
///
/// Execution enumerates every target URL with [`ReportScript::customize_query`]
/// applied, then calls [`ReportScript::collect`] once per node, one node at a
/// time.
#[async_trait]
pub trait ReportScript: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn columns(&self) -> Vec<Column>;

    /// Seed the operator-editable form
    fn initialize(&self, seed_urls: Vec<String>) -> ReportForm {
        ReportForm::new(seed_urls)
    }

    fn validate(&self, form: &ReportForm) -> Result<(), ReportError> {
        if form.urls.is_empty() {
            return Err(ReportError::NoUrls);
        }
        Ok(())
    }

    /// Add the fields this report projects to the node query
    fn customize_query(&self, _query: &mut QuerySpec, _params: &ReportParams) {}

    /// `false` skips the node without an error
    fn applies_to(&self, _node: &Node, _params: &ReportParams) -> bool {
        true
    }

    async fn collect(
        &self,
        client: &SiteClient,
        node: &Node,
        params: &ReportParams,
    ) -> Result<Vec<ReportRow>, ScanError>;

    fn action(&self) -> Option<RemediationAction> {
        None
    }
}

/// Ordered set of report scripts, built once at startup
#[derive(Clone, Default)]
pub struct ReportRegistry {
    scripts: Vec<Arc<dyn ReportScript>>,
}

impl ReportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in report, in dashboard order
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for script in crate::scripts::all() {
            registry.register(script);
        }
        registry
    }

    /// Later registrations with an existing name replace the earlier one in
    /// place.
    pub fn register(&mut self, script: Arc<dyn ReportScript>) -> &mut Self {
        match self.scripts.iter().position(|s| s.name() == script.name()) {
            Some(idx) => self.scripts[idx] = script,
            None => self.scripts.push(script),
        }
        self
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn ReportScript>, ReportError> {
        let name = name.trim();
        self.scripts
            .iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| ReportError::UnknownReport(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ReportScript>> {
        self.scripts.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.scripts.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}
