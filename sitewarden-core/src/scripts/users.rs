use super::{flag, integer, response_items, text};
use crate::remediation::{RemediationAction, RemediationTarget};
use crate::script::{Column, ReportParams, ReportRow, ReportScript};
use async_trait::async_trait;
use sitewarden_scanner::{Node, QuerySpec, ScanError, SiteClient};

/// Principals registered in each site collection's user information list
pub struct UsersReport;

#[async_trait]
impl ReportScript for UsersReport {
    fn name(&self) -> &'static str {
        "users"
    }

    fn description(&self) -> &'static str {
        "Users known to each site collection, site admins flagged"
    }

    fn columns(&self) -> Vec<Column> {
        vec![
            Column::new("site", "Site"),
            Column::new("title", "Name"),
            Column::new("login", "Login"),
            Column::new("email", "Email"),
            Column::new("admin", "Site Admin"),
        ]
    }

    fn applies_to(&self, node: &Node, params: &ReportParams) -> bool {
        !params.recursive || node.is_site_collection_root()
    }

    async fn collect(
        &self,
        client: &SiteClient,
        node: &Node,
        params: &ReportParams,
    ) -> Result<Vec<ReportRow>, ScanError> {
        let mut query = QuerySpec::new();
        query.select_all(["Id", "Title", "LoginName", "Email", "IsSiteAdmin", "PrincipalType"]);

        let body = client.get_json(&node.url, "web/siteusers", &query).await?;
        let needle = params.search_term.as_ref().map(|t| t.to_lowercase());

        let rows = response_items(&body)
            .into_iter()
            .filter(|user| match &needle {
                Some(needle) => [text(user, "Title"), text(user, "LoginName"), text(user, "Email")]
                    .iter()
                    .any(|field| field.to_lowercase().contains(needle)),
                None => true,
            })
            .map(|user| {
                let mut row = ReportRow::new(node.url.clone())
                    .cell("site", node.title.clone())
                    .cell("title", text(user, "Title"))
                    .cell("login", text(user, "LoginName"))
                    .cell("email", text(user, "Email"))
                    .cell("admin", flag(user, "IsSiteAdmin"));

                if let Some(user_id) = integer(user, "Id") {
                    row = row.target(RemediationTarget::User {
                        web_url: node.url.clone(),
                        user_id,
                    });
                }
                row
            })
            .collect();

        Ok(rows)
    }

    fn action(&self) -> Option<RemediationAction> {
        Some(RemediationAction::RemoveUser)
    }
}
