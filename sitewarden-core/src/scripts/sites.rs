use super::{format_date, text};
use crate::script::{Column, ReportParams, ReportRow, ReportScript};
use async_trait::async_trait;
use sitewarden_scanner::{Node, QuerySpec, ScanError, SiteClient};

/// One row per web: what exists and where it sits in the hierarchy
pub struct SiteInventoryReport;

#[async_trait]
impl ReportScript for SiteInventoryReport {
    fn name(&self) -> &'static str {
        "sites"
    }

    fn description(&self) -> &'static str {
        "Inventory of site collections and sub-sites"
    }

    fn columns(&self) -> Vec<Column> {
        vec![
            Column::new("title", "Title"),
            Column::new("url", "URL"),
            Column::new("kind", "Type"),
            Column::new("subsites", "Sub-sites"),
            Column::new("template", "Template"),
            Column::formatted("created", "Created", format_date),
            Column::formatted("last_modified", "Last Modified", format_date),
        ]
    }

    fn customize_query(&self, query: &mut QuerySpec, _params: &ReportParams) {
        query
            .select_all(["Created", "LastItemModifiedDate", "WebTemplate", "Webs/Id"])
            .expand("Webs");
    }

    async fn collect(
        &self,
        _client: &SiteClient,
        node: &Node,
        _params: &ReportParams,
    ) -> Result<Vec<ReportRow>, ScanError> {
        let kind = if node.is_site_collection_root() {
            "Site collection"
        } else {
            "Sub-site"
        };

        let row = ReportRow::new(node.url.clone())
            .cell("title", node.title.clone())
            .cell("url", node.url.clone())
            .cell("kind", kind)
            .cell("subsites", node.collection("Webs").len() as u64)
            .cell("template", text(&node.payload, "WebTemplate"))
            .cell("created", text(&node.payload, "Created"))
            .cell("last_modified", text(&node.payload, "LastItemModifiedDate"));

        Ok(vec![row])
    }
}
