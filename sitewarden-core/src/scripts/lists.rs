use super::{flag, format_date, integer, older_than, text};
use crate::remediation::{RemediationAction, RemediationTarget};
use crate::script::{Column, ReportParams, ReportRow, ReportScript};
use async_trait::async_trait;
use chrono::Utc;
use sitewarden_scanner::{Node, QuerySpec, ScanError, SiteClient};

/// One row per list or library, optionally only the stale ones
pub struct ListInventoryReport;

#[async_trait]
impl ReportScript for ListInventoryReport {
    fn name(&self) -> &'static str {
        "lists"
    }

    fn description(&self) -> &'static str {
        "Lists and libraries with item counts and last activity"
    }

    fn columns(&self) -> Vec<Column> {
        vec![
            Column::new("web", "Web"),
            Column::new("title", "List"),
            Column::new("items", "Items"),
            Column::new("template", "Template"),
            Column::new("hidden", "Hidden"),
            Column::formatted("last_modified", "Last Modified", format_date),
        ]
    }

    fn customize_query(&self, query: &mut QuerySpec, _params: &ReportParams) {
        query
            .select_all([
                "Lists/Id",
                "Lists/Title",
                "Lists/ItemCount",
                "Lists/BaseTemplate",
                "Lists/Hidden",
                "Lists/LastItemModifiedDate",
            ])
            .expand("Lists");
    }

    fn applies_to(&self, node: &Node, _params: &ReportParams) -> bool {
        !node.collection("Lists").is_empty()
    }

    async fn collect(
        &self,
        _client: &SiteClient,
        node: &Node,
        params: &ReportParams,
    ) -> Result<Vec<ReportRow>, ScanError> {
        let now = Utc::now();

        let rows = node
            .collection("Lists")
            .into_iter()
            .filter(|list| params.include_hidden || !flag(list, "Hidden"))
            .filter(|list| match params.older_than_days {
                Some(days) => older_than(&text(list, "LastItemModifiedDate"), days, now),
                None => true,
            })
            .map(|list| {
                let mut row = ReportRow::new(node.url.clone())
                    .cell("web", node.title.clone())
                    .cell("title", text(list, "Title"))
                    .cell("items", integer(list, "ItemCount").unwrap_or(0))
                    .cell("template", integer(list, "BaseTemplate").unwrap_or(0))
                    .cell("hidden", flag(list, "Hidden"))
                    .cell("last_modified", text(list, "LastItemModifiedDate"));

                let list_id = text(list, "Id");
                if !list_id.is_empty() {
                    row = row.target(RemediationTarget::List {
                        web_url: node.url.clone(),
                        list_id,
                    });
                }
                row
            })
            .collect();

        Ok(rows)
    }

    fn action(&self) -> Option<RemediationAction> {
        Some(RemediationAction::DeleteList)
    }
}
