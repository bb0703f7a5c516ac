use super::{format_date, integer, older_than, text};
use crate::error::ReportError;
use crate::remediation::{RemediationAction, RemediationTarget};
use crate::script::{Column, ReportForm, ReportParams, ReportRow, ReportScript};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sitewarden_scanner::{Node, ScanError, SiteClient};

const SEARCH_PROPERTIES: &[&str] = &[
    "Title",
    "Path",
    "Author",
    "LastModifiedTime",
    "Size",
    "SPWebUrl",
];
const ROW_LIMIT: u32 = 500;

/// Documents matching a search term, one search per web
pub struct DocumentSearchReport;

fn same_web(a: &str, b: &str) -> bool {
    a.trim_end_matches('/').eq_ignore_ascii_case(b.trim_end_matches('/'))
}

/// `https://host/sites/a/doc.docx` -> `/sites/a/doc.docx`
fn server_relative(path: &str) -> String {
    match path.split_once("://") {
        Some((_, rest)) => match rest.find('/') {
            Some(idx) => rest[idx..].to_string(),
            None => "/".to_string(),
        },
        None => path.to_string(),
    }
}

#[async_trait]
impl ReportScript for DocumentSearchReport {
    fn name(&self) -> &'static str {
        "documents"
    }

    fn description(&self) -> &'static str {
        "Search documents by keyword, optionally only stale ones"
    }

    fn columns(&self) -> Vec<Column> {
        vec![
            Column::new("title", "Title"),
            Column::new("path", "Path"),
            Column::new("author", "Author"),
            Column::new("size", "Size"),
            Column::formatted("last_modified", "Last Modified", format_date),
        ]
    }

    fn validate(&self, form: &ReportForm) -> Result<(), ReportError> {
        if form.urls.is_empty() {
            return Err(ReportError::NoUrls);
        }
        if form.params.search_term.is_none() {
            return Err(ReportError::MissingParameter {
                report: "documents",
                parameter: "search term",
            });
        }
        Ok(())
    }

    async fn collect(
        &self,
        client: &SiteClient,
        node: &Node,
        params: &ReportParams,
    ) -> Result<Vec<ReportRow>, ScanError> {
        let Some(term) = params.search_term.as_deref() else {
            return Ok(Vec::new());
        };

        let query = format!("{} path:\"{}\"", term, node.url);
        let hits = client
            .search(&node.url, &query, SEARCH_PROPERTIES, ROW_LIMIT)
            .await?;
        let now = Utc::now();

        let rows = hits
            .into_iter()
            .map(Value::Object)
            // Sub-webs are visited on their own in a recursive run
            .filter(|hit| !params.recursive || same_web(&text(hit, "SPWebUrl"), &node.url))
            .filter(|hit| match params.older_than_days {
                Some(days) => older_than(&text(hit, "LastModifiedTime"), days, now),
                None => true,
            })
            .map(|hit| {
                let path = text(&hit, "Path");
                let mut row = ReportRow::new(node.url.clone())
                    .cell("title", text(&hit, "Title"))
                    .cell("path", path.clone())
                    .cell("author", text(&hit, "Author"))
                    .cell("size", integer(&hit, "Size").unwrap_or(0))
                    .cell("last_modified", text(&hit, "LastModifiedTime"));

                if !path.is_empty() {
                    row = row.target(RemediationTarget::File {
                        web_url: node.url.clone(),
                        server_relative_url: server_relative(&path),
                    });
                }
                row
            })
            .collect();

        Ok(rows)
    }

    fn action(&self) -> Option<RemediationAction> {
        Some(RemediationAction::DeleteFile)
    }
}
