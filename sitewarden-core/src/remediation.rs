// Row-level remediation: one confirmed mutating call per row, no retry

use crate::script::ReportRow;
use serde::{Deserialize, Serialize};
use sitewarden_scanner::{ScanError, Settled, SiteClient, run_sequential};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemediationAction {
    DeleteList,
    DeleteFile,
    DeleteGroup,
    RemoveUser,
    RemoveRoleAssignment,
    ResetInheritance,
}

impl RemediationAction {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "delete-list" => Some(RemediationAction::DeleteList),
            "delete-file" | "delete-document" => Some(RemediationAction::DeleteFile),
            "delete-group" => Some(RemediationAction::DeleteGroup),
            "remove-user" => Some(RemediationAction::RemoveUser),
            "remove-role-assignment" | "remove-permission" => {
                Some(RemediationAction::RemoveRoleAssignment)
            }
            "reset-inheritance" | "restore-inheritance" => Some(RemediationAction::ResetInheritance),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RemediationAction::DeleteList => "Delete list",
            RemediationAction::DeleteFile => "Delete document",
            RemediationAction::DeleteGroup => "Delete group",
            RemediationAction::RemoveUser => "Remove user",
            RemediationAction::RemoveRoleAssignment => "Remove permissions",
            RemediationAction::ResetInheritance => "Restore permission inheritance",
        }
    }
}

/// The object a remediation acts upon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemediationTarget {
    List { web_url: String, list_id: String },
    ListInheritance { web_url: String, list_id: String },
    WebInheritance { web_url: String },
    File { web_url: String, server_relative_url: String },
    Group { web_url: String, group_id: i64 },
    User { web_url: String, user_id: i64 },
    RoleAssignment { web_url: String, principal_id: i64 },
}

impl RemediationTarget {
    pub fn action(&self) -> RemediationAction {
        match self {
            RemediationTarget::List { .. } => RemediationAction::DeleteList,
            RemediationTarget::ListInheritance { .. } | RemediationTarget::WebInheritance { .. } => {
                RemediationAction::ResetInheritance
            }
            RemediationTarget::File { .. } => RemediationAction::DeleteFile,
            RemediationTarget::Group { .. } => RemediationAction::DeleteGroup,
            RemediationTarget::User { .. } => RemediationAction::RemoveUser,
            RemediationTarget::RoleAssignment { .. } => RemediationAction::RemoveRoleAssignment,
        }
    }

    pub fn web_url(&self) -> &str {
        match self {
            RemediationTarget::List { web_url, .. }
            | RemediationTarget::ListInheritance { web_url, .. }
            | RemediationTarget::WebInheritance { web_url }
            | RemediationTarget::File { web_url, .. }
            | RemediationTarget::Group { web_url, .. }
            | RemediationTarget::User { web_url, .. }
            | RemediationTarget::RoleAssignment { web_url, .. } => web_url,
        }
    }

    /// API path and `X-HTTP-Method` override for the call
    pub fn request(&self) -> (String, Option<&'static str>) {
        match self {
            RemediationTarget::List { list_id, .. } => {
                (format!("web/lists(guid'{}')", list_id), Some("DELETE"))
            }
            RemediationTarget::ListInheritance { list_id, .. } => (
                format!("web/lists(guid'{}')/resetroleinheritance", list_id),
                None,
            ),
            RemediationTarget::WebInheritance { .. } => ("web/resetroleinheritance".to_string(), None),
            RemediationTarget::File {
                server_relative_url, ..
            } => (
                format!(
                    "web/GetFileByServerRelativeUrl('{}')",
                    server_relative_url.replace('\'', "''")
                ),
                Some("DELETE"),
            ),
            RemediationTarget::Group { group_id, .. } => {
                (format!("web/sitegroups/removebyid({})", group_id), None)
            }
            RemediationTarget::User { user_id, .. } => {
                (format!("web/siteusers/removebyid({})", user_id), None)
            }
            RemediationTarget::RoleAssignment { principal_id, .. } => (
                format!("web/roleassignments/getbyprincipalid({})", principal_id),
                Some("DELETE"),
            ),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            RemediationTarget::List { web_url, list_id }
            | RemediationTarget::ListInheritance { web_url, list_id } => {
                format!("list {} on {}", list_id, web_url)
            }
            RemediationTarget::WebInheritance { web_url } => format!("web {}", web_url),
            RemediationTarget::File {
                server_relative_url, ..
            } => server_relative_url.clone(),
            RemediationTarget::Group { web_url, group_id } => {
                format!("group #{} on {}", group_id, web_url)
            }
            RemediationTarget::User { web_url, user_id } => format!("user #{} on {}", user_id, web_url),
            RemediationTarget::RoleAssignment { web_url, principal_id } => {
                format!("principal #{} on {}", principal_id, web_url)
            }
        }
    }
}

/// Perform one remediation call. Attempted once; nothing is rolled back.
pub async fn remediate(client: &SiteClient, target: &RemediationTarget) -> Result<(), ScanError> {
    let (path, method) = target.request();
    info!("{}: {}", target.action().label(), target.describe());
    client.post_action(target.web_url(), &path, method).await
}

/// Outcome of a remediation pass over report rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemediationReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
    pub declined: usize,
}

impl RemediationReport {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Offer `action` for every row that carries a matching target.
///
/// `confirm` is asked once per row and may block on operator input. Declined
/// rows are skipped. Rows are processed one at a time and a failure does not
/// stop the pass; every failure is reported back with its reason.
pub async fn remediate_rows<F>(
    client: &SiteClient,
    action: RemediationAction,
    rows: &[ReportRow],
    mut confirm: F,
) -> RemediationReport
where
    F: FnMut(&RemediationTarget) -> bool,
{
    let targets: Vec<&RemediationTarget> = rows
        .iter()
        .filter_map(|row| row.target.as_ref())
        .filter(|target| target.action() == action)
        .collect();

    let settled = run_sequential(targets.iter().copied(), |target| {
        if confirm(target) {
            Some(async move {
                match remediate(client, target).await {
                    Ok(()) => Ok(target.describe()),
                    Err(e) => Err((target.describe(), e.to_string())),
                }
            })
        } else {
            None
        }
    })
    .await;

    let mut report = RemediationReport::default();
    for outcome in settled {
        match outcome {
            Settled::Completed(label) => report.succeeded.push(label),
            Settled::Failed((label, reason)) => {
                warn!("{} failed for {}: {}", action.label(), label, reason);
                report.failed.push((label, reason));
            }
            Settled::Skipped => report.declined += 1,
        }
    }
    report
}
