use super::{flag, text};
use crate::remediation::{RemediationAction, RemediationTarget};
use crate::script::{Column, ReportParams, ReportRow, ReportScript};
use async_trait::async_trait;
use sitewarden_scanner::{Node, QuerySpec, ScanError, SiteClient};

/// Webs and lists that stopped inheriting permissions from their parent
pub struct UniquePermissionsReport;

#[async_trait]
impl ReportScript for UniquePermissionsReport {
    fn name(&self) -> &'static str {
        "unique-permissions"
    }

    fn description(&self) -> &'static str {
        "Sub-sites and lists with broken permission inheritance"
    }

    fn columns(&self) -> Vec<Column> {
        vec![
            Column::new("web", "Web"),
            Column::new("scope", "Scope"),
            Column::new("title", "Title"),
            Column::new("url", "URL"),
        ]
    }

    fn customize_query(&self, query: &mut QuerySpec, _params: &ReportParams) {
        query
            .select_all([
                "HasUniqueRoleAssignments",
                "Lists/Id",
                "Lists/Title",
                "Lists/Hidden",
                "Lists/HasUniqueRoleAssignments",
            ])
            .expand("Lists");
    }

    async fn collect(
        &self,
        _client: &SiteClient,
        node: &Node,
        params: &ReportParams,
    ) -> Result<Vec<ReportRow>, ScanError> {
        let mut rows = Vec::new();

        // A site collection root always has its own permissions
        if !node.is_site_collection_root() && flag(&node.payload, "HasUniqueRoleAssignments") {
            rows.push(
                ReportRow::new(node.url.clone())
                    .cell("web", node.title.clone())
                    .cell("scope", "Web")
                    .cell("title", node.title.clone())
                    .cell("url", node.url.clone())
                    .target(RemediationTarget::WebInheritance {
                        web_url: node.url.clone(),
                    }),
            );
        }

        for list in node.collection("Lists") {
            if !flag(list, "HasUniqueRoleAssignments") {
                continue;
            }
            if flag(list, "Hidden") && !params.include_hidden {
                continue;
            }

            let mut row = ReportRow::new(node.url.clone())
                .cell("web", node.title.clone())
                .cell("scope", "List")
                .cell("title", text(list, "Title"))
                .cell("url", node.url.clone());

            let list_id = text(list, "Id");
            if !list_id.is_empty() {
                row = row.target(RemediationTarget::ListInheritance {
                    web_url: node.url.clone(),
                    list_id,
                });
            }
            rows.push(row);
        }

        Ok(rows)
    }

    fn action(&self) -> Option<RemediationAction> {
        Some(RemediationAction::ResetInheritance)
    }
}
