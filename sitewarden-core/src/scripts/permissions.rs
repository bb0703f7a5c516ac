use super::{flag, integer, items, text};
use crate::remediation::{RemediationAction, RemediationTarget};
use crate::script::{Column, ReportParams, ReportRow, ReportScript};
use async_trait::async_trait;
use serde_json::Value;
use sitewarden_scanner::{Node, QuerySpec, ScanError, SiteClient};

/// One row per principal holding permissions on a web
pub struct PermissionsReport;

fn principal_type(value: &Value) -> String {
    match value.as_i64() {
        Some(1) => "User".to_string(),
        Some(2) => "Distribution list".to_string(),
        Some(4) => "Security group".to_string(),
        Some(8) => "SharePoint group".to_string(),
        Some(other) => format!("Other ({})", other),
        None => String::new(),
    }
}

#[async_trait]
impl ReportScript for PermissionsReport {
    fn name(&self) -> &'static str {
        "permissions"
    }

    fn description(&self) -> &'static str {
        "Who holds which permission levels on each web"
    }

    fn columns(&self) -> Vec<Column> {
        vec![
            Column::new("web", "Web"),
            Column::new("principal", "Principal"),
            Column::new("login", "Login"),
            Column::formatted("principal_type", "Type", principal_type),
            Column::new("roles", "Permission Levels"),
        ]
    }

    fn customize_query(&self, query: &mut QuerySpec, _params: &ReportParams) {
        query
            .select_all([
                "HasUniqueRoleAssignments",
                "RoleAssignments/PrincipalId",
                "RoleAssignments/Member/Title",
                "RoleAssignments/Member/LoginName",
                "RoleAssignments/Member/PrincipalType",
                "RoleAssignments/RoleDefinitionBindings/Name",
            ])
            .expand_all([
                "RoleAssignments",
                "RoleAssignments/Member",
                "RoleAssignments/RoleDefinitionBindings",
            ]);
    }

    /// A sub-web that inherits shows its parent's assignments, which it does not own
    fn applies_to(&self, node: &Node, _params: &ReportParams) -> bool {
        node.is_site_collection_root() || flag(&node.payload, "HasUniqueRoleAssignments")
    }

    async fn collect(
        &self,
        _client: &SiteClient,
        node: &Node,
        params: &ReportParams,
    ) -> Result<Vec<ReportRow>, ScanError> {
        let needle = params.search_term.as_ref().map(|t| t.to_lowercase());
        let mut rows = Vec::new();

        for assignment in node.collection("RoleAssignments") {
            let member = assignment.get("Member").cloned().unwrap_or(Value::Null);
            let title = text(&member, "Title");
            let login = text(&member, "LoginName");

            if let Some(ref needle) = needle
                && !title.to_lowercase().contains(needle)
                && !login.to_lowercase().contains(needle)
            {
                continue;
            }

            let roles: Vec<String> = items(assignment, "RoleDefinitionBindings")
                .into_iter()
                .map(|binding| text(binding, "Name"))
                .filter(|name| !name.is_empty())
                .collect();

            let mut row = ReportRow::new(node.url.clone())
                .cell("web", node.title.clone())
                .cell("principal", title)
                .cell("login", login)
                .cell("principal_type", member.get("PrincipalType").cloned().unwrap_or(Value::Null))
                .cell("roles", roles.join(", "));

            let principal_id = integer(assignment, "PrincipalId").or_else(|| integer(&member, "Id"));
            if let Some(principal_id) = principal_id {
                row = row.target(RemediationTarget::RoleAssignment {
                    web_url: node.url.clone(),
                    principal_id,
                });
            }
            rows.push(row);
        }

        Ok(rows)
    }

    fn action(&self) -> Option<RemediationAction> {
        Some(RemediationAction::RemoveRoleAssignment)
    }
}
