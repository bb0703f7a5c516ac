use super::{integer, items, response_items, text};
use crate::remediation::{RemediationAction, RemediationTarget};
use crate::script::{Column, ReportParams, ReportRow, ReportScript};
use async_trait::async_trait;
use sitewarden_scanner::{Node, QuerySpec, ScanError, SiteClient};

/// SharePoint groups of each site collection with their member counts
pub struct GroupsReport;

#[async_trait]
impl ReportScript for GroupsReport {
    fn name(&self) -> &'static str {
        "groups"
    }

    fn description(&self) -> &'static str {
        "Site groups, owners and member counts"
    }

    fn columns(&self) -> Vec<Column> {
        vec![
            Column::new("site", "Site"),
            Column::new("title", "Group"),
            Column::new("owner", "Owner"),
            Column::new("members", "Members"),
            Column::new("description", "Description"),
        ]
    }

    /// Groups live on the site collection, so a recursive walk only asks the root
    fn applies_to(&self, node: &Node, params: &ReportParams) -> bool {
        !params.recursive || node.is_site_collection_root()
    }

    async fn collect(
        &self,
        client: &SiteClient,
        node: &Node,
        _params: &ReportParams,
    ) -> Result<Vec<ReportRow>, ScanError> {
        let mut query = QuerySpec::new();
        query
            .select_all(["Id", "Title", "OwnerTitle", "Description", "Users/Id"])
            .expand("Users");

        let body = client.get_json(&node.url, "web/sitegroups", &query).await?;
        let rows = response_items(&body)
            .into_iter()
            .map(|group| {
                let mut row = ReportRow::new(node.url.clone())
                    .cell("site", node.title.clone())
                    .cell("title", text(group, "Title"))
                    .cell("owner", text(group, "OwnerTitle"))
                    .cell("members", items(group, "Users").len() as u64)
                    .cell("description", text(group, "Description"));

                if let Some(group_id) = integer(group, "Id") {
                    row = row.target(RemediationTarget::Group {
                        web_url: node.url.clone(),
                        group_id,
                    });
                }
                row
            })
            .collect();

        Ok(rows)
    }

    fn action(&self) -> Option<RemediationAction> {
        Some(RemediationAction::DeleteGroup)
    }
}
