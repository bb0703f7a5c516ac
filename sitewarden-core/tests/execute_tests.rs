// Tests for report execution against a mocked tenant

use serde_json::json;
use sitewarden_core::remediation::RemediationTarget;
use sitewarden_core::scripts::{
    DocumentSearchReport, GroupsReport, ListInventoryReport, PermissionsReport,
    SiteInventoryReport, UniquePermissionsReport, UsersReport,
};
use sitewarden_core::{ReportError, ReportForm, ReportScript, execute_report};
use sitewarden_scanner::{ClientSettings, SiteClient};
use std::sync::{Arc, Mutex};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

// ============================================================================
// Helpers
// ============================================================================

fn client_for(server: &MockServer) -> SiteClient {
    SiteClient::new(ClientSettings {
        base_url: Some(server.uri()),
        ..ClientSettings::default()
    })
    .unwrap()
}

fn web(server: &MockServer, relative: &str, title: &str, root: bool, children: &[&str]) -> serde_json::Value {
    let webs: Vec<_> = children
        .iter()
        .map(|c| json!({"Url": format!("{}{}", server.uri(), c), "Title": c}))
        .collect();
    json!({
        "Id": format!("id-{}", title),
        "Title": title,
        "Url": format!("{}{}", server.uri(), relative),
        "ServerRelativeUrl": relative,
        "ParentWeb": if root { json!(null) } else { json!({"Id": "parent"}) },
        "Webs": webs,
        "Created": "2020-01-02T03:04:05Z",
        "WebTemplate": "STS",
    })
}

async fn mount_json(server: &MockServer, api_path: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(api_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn form(urls: &[&str]) -> ReportForm {
    ReportForm::new(urls.iter().map(|u| u.to_string()).collect())
}

/// One search result row as the search endpoint returns it
fn search_hit(title: &str, web: String) -> serde_json::Value {
    json!({"Cells": [
        {"Key": "Title", "Value": title},
        {"Key": "Path", "Value": format!("{}/Shared Documents/{}.docx", web, title)},
        {"Key": "Size", "Value": "2048"},
        {"Key": "SPWebUrl", "Value": web}
    ]})
}

fn titles(outcome: &sitewarden_core::ReportOutcome, key: &str) -> Vec<String> {
    outcome
        .rows
        .iter()
        .map(|r| r.get(key).as_str().unwrap_or_default().to_string())
        .collect()
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_empty_form_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let result = execute_report(&client, Arc::new(SiteInventoryReport), &form(&[]), None, false).await;

    assert!(matches!(result, Err(ReportError::NoUrls)));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_documents_without_search_term_is_rejected() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let result = execute_report(
        &client,
        Arc::new(DocumentSearchReport),
        &form(&["/sites/a"]),
        None,
        false,
    )
    .await;

    assert!(matches!(result, Err(ReportError::MissingParameter { .. })));
}

// ============================================================================
// Enumeration + collection
// ============================================================================

#[tokio::test]
async fn test_recursive_site_inventory_visits_every_web() {
    let server = MockServer::start().await;
    mount_json(&server, "/sites/a/_api/web", web(&server, "/sites/a", "A", true, &["/sites/a/b"])).await;
    mount_json(&server, "/sites/a/b/_api/web", web(&server, "/sites/a/b", "B", false, &[])).await;
    let client = client_for(&server);

    let mut input = form(&["/sites/a"]);
    input.recursive(true);
    let outcome = execute_report(&client, Arc::new(SiteInventoryReport), &input, None, false)
        .await
        .unwrap();

    assert_eq!(outcome.nodes_visited, 2);
    assert!(outcome.errors.is_empty());
    let titles: Vec<&str> = outcome.rows.iter().map(|r| r.get("title").as_str().unwrap()).collect();
    assert_eq!(titles, vec!["A", "B"]);
    assert_eq!(outcome.rows[0].get("kind"), "Site collection");
    assert_eq!(outcome.rows[1].get("kind"), "Sub-site");
}

#[tokio::test]
async fn test_unreachable_url_is_reported_and_others_continue() {
    let server = MockServer::start().await;
    mount_json(&server, "/sites/a/_api/web", web(&server, "/sites/a", "A", true, &[])).await;
    Mock::given(method("GET"))
        .and(path("/sites/missing/_api/web"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let client = client_for(&server);

    let outcome = execute_report(
        &client,
        Arc::new(SiteInventoryReport),
        &form(&["/sites/missing", "/sites/a"]),
        None,
        false,
    )
    .await
    .unwrap();

    assert_eq!(outcome.rows.len(), 1);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].url, "/sites/missing");
}

#[tokio::test]
async fn test_query_customization_reaches_the_request() {
    let server = MockServer::start().await;
    let mut payload = web(&server, "/sites/a", "A", true, &[]);
    payload["Lists"] = json!([
        {"Id": "l1", "Title": "Documents", "ItemCount": 4, "BaseTemplate": 101, "Hidden": false},
        {"Id": "l2", "Title": "Workflow History", "ItemCount": 0, "BaseTemplate": 140, "Hidden": true}
    ]);
    Mock::given(method("GET"))
        .and(path("/sites/a/_api/web"))
        .and(query_param("$expand", "ParentWeb,Lists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(payload))
        .mount(&server)
        .await;
    let client = client_for(&server);

    let outcome = execute_report(
        &client,
        Arc::new(ListInventoryReport),
        &form(&["/sites/a"]),
        None,
        false,
    )
    .await
    .unwrap();

    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.rows.len(), 1);
    assert_eq!(outcome.rows[0].get("title"), "Documents");
}

#[tokio::test]
async fn test_collection_failure_becomes_node_error() {
    let server = MockServer::start().await;
    mount_json(&server, "/sites/a/_api/web", web(&server, "/sites/a", "A", true, &[])).await;
    mount_json(&server, "/sites/b/_api/web", web(&server, "/sites/b", "B", true, &[])).await;
    Mock::given(method("GET"))
        .and(path("/sites/a/_api/web/sitegroups"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    mount_json(
        &server,
        "/sites/b/_api/web/sitegroups",
        json!({"value": [{"Id": 3, "Title": "B Owners", "OwnerTitle": "B Owners", "Users": [{"Id": 1}, {"Id": 2}]}]}),
    )
    .await;
    let client = client_for(&server);

    let outcome = execute_report(
        &client,
        Arc::new(GroupsReport),
        &form(&["/sites/a", "/sites/b"]),
        None,
        false,
    )
    .await
    .unwrap();

    assert_eq!(outcome.rows.len(), 1);
    assert_eq!(outcome.rows[0].get("members"), 2);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].url.ends_with("/sites/a"));
    assert!(outcome.errors[0].reason.contains("403"));
}

#[tokio::test]
async fn test_site_collection_reports_skip_subwebs() {
    let server = MockServer::start().await;
    mount_json(&server, "/sites/a/_api/web", web(&server, "/sites/a", "A", true, &["/sites/a/b"])).await;
    mount_json(&server, "/sites/a/b/_api/web", web(&server, "/sites/a/b", "B", false, &[])).await;
    mount_json(
        &server,
        "/sites/a/_api/web/siteusers",
        json!({"value": [
            {"Id": 7, "Title": "Ada", "LoginName": "i:0#.f|membership|ada@c.com", "Email": "ada@c.com", "IsSiteAdmin": true},
            {"Id": 8, "Title": "Bob", "LoginName": "i:0#.f|membership|bob@c.com", "Email": "bob@c.com", "IsSiteAdmin": false}
        ]}),
    )
    .await;
    let client = client_for(&server);

    let mut input = form(&["/sites/a"]);
    input.recursive(true).search_term(Some("ada".to_string()));
    let outcome = execute_report(&client, Arc::new(UsersReport), &input, None, false)
        .await
        .unwrap();

    assert_eq!(outcome.nodes_visited, 2);
    assert_eq!(outcome.rows.len(), 1);
    assert_eq!(outcome.rows[0].get("admin"), true);
    let requests = server.received_requests().await.unwrap_or_default();
    assert!(!requests.iter().any(|r| r.url.path() == "/sites/a/b/_api/web/siteusers"));
}

#[tokio::test]
async fn test_recursive_document_search_keeps_hits_of_the_web_itself() {
    let server = MockServer::start().await;
    mount_json(&server, "/sites/a/_api/web", web(&server, "/sites/a", "A", true, &[])).await;
    mount_json(
        &server,
        "/sites/a/_api/search/query",
        json!({"PrimaryQueryResult": {"RelevantResults": {"Table": {"Rows": [
            search_hit("Budget", format!("{}/sites/a", server.uri())),
            search_hit("Other", format!("{}/sites/a/sub", server.uri()))
        ]}}}}),
    )
    .await;
    let client = client_for(&server);

    let mut input = form(&["/sites/a"]);
    input.recursive(true).search_term(Some("budget".to_string()));
    let outcome = execute_report(&client, Arc::new(DocumentSearchReport), &input, None, false)
        .await
        .unwrap();

    assert_eq!(outcome.rows.len(), 1);
    assert_eq!(outcome.rows[0].get("size"), 2048);
    match &outcome.rows[0].target {
        Some(RemediationTarget::File {
            server_relative_url, ..
        }) => assert_eq!(server_relative_url, "/sites/a/Shared Documents/Budget.docx"),
        other => panic!("unexpected target {:?}", other),
    }
}

#[tokio::test]
async fn test_document_search_on_single_web_keeps_subweb_hits() {
    let server = MockServer::start().await;
    mount_json(&server, "/sites/a/_api/web", web(&server, "/sites/a", "A", true, &["/sites/a/sub"])).await;
    mount_json(
        &server,
        "/sites/a/_api/search/query",
        json!({"PrimaryQueryResult": {"RelevantResults": {"Table": {"Rows": [
            search_hit("Budget", format!("{}/sites/a", server.uri())),
            search_hit("Budget 2024", format!("{}/sites/a/sub", server.uri()))
        ]}}}}),
    )
    .await;
    let client = client_for(&server);

    let mut input = form(&["/sites/a"]);
    input.search_term(Some("budget".to_string()));
    let outcome = execute_report(&client, Arc::new(DocumentSearchReport), &input, None, false)
        .await
        .unwrap();

    assert_eq!(outcome.nodes_visited, 1);
    assert_eq!(titles(&outcome, "title"), vec!["Budget", "Budget 2024"]);
    match &outcome.rows[1].target {
        Some(RemediationTarget::File {
            server_relative_url, ..
        }) => assert_eq!(server_relative_url, "/sites/a/sub/Shared Documents/Budget 2024.docx"),
        other => panic!("unexpected target {:?}", other),
    }
}

#[tokio::test]
async fn test_users_report_on_explicit_subweb() {
    let server = MockServer::start().await;
    mount_json(&server, "/sites/a/sub/_api/web", web(&server, "/sites/a/sub", "Sub", false, &[])).await;
    mount_json(
        &server,
        "/sites/a/sub/_api/web/siteusers",
        json!({"value": [
            {"Id": 9, "Title": "Cy", "LoginName": "i:0#.f|membership|cy@c.com", "Email": "cy@c.com", "IsSiteAdmin": false}
        ]}),
    )
    .await;
    let client = client_for(&server);

    let outcome = execute_report(&client, Arc::new(UsersReport), &form(&["/sites/a/sub"]), None, false)
        .await
        .unwrap();

    assert!(outcome.errors.is_empty());
    assert_eq!(titles(&outcome, "title"), vec!["Cy"]);
    assert!(matches!(
        outcome.rows[0].target,
        Some(RemediationTarget::User { user_id: 9, .. })
    ));
}

#[tokio::test]
async fn test_groups_report_on_explicit_subweb() {
    let server = MockServer::start().await;
    mount_json(&server, "/sites/a/sub/_api/web", web(&server, "/sites/a/sub", "Sub", false, &[])).await;
    mount_json(
        &server,
        "/sites/a/sub/_api/web/sitegroups",
        json!({"value": [{"Id": 4, "Title": "Sub Members", "OwnerTitle": "A Owners", "Users": [{"Id": 1}]}]}),
    )
    .await;
    let client = client_for(&server);

    let outcome = execute_report(&client, Arc::new(GroupsReport), &form(&["/sites/a/sub"]), None, false)
        .await
        .unwrap();

    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.rows.len(), 1);
    assert_eq!(outcome.rows[0].get("members"), 1);
}

// ============================================================================
// Permissions
// ============================================================================

fn assignments() -> serde_json::Value {
    json!([
        {
            "PrincipalId": 3,
            "Member": {"Title": "A Owners", "LoginName": "A Owners", "PrincipalType": 8},
            "RoleDefinitionBindings": [{"Name": "Full Control"}]
        },
        {
            "Member": {"Id": 11, "Title": "Ada", "LoginName": "i:0#.f|membership|ada@c.com", "PrincipalType": 1},
            "RoleDefinitionBindings": [{"Name": "Read"}, {"Name": "Contribute"}]
        }
    ])
}

#[tokio::test]
async fn test_permissions_projects_each_role_assignment() {
    let server = MockServer::start().await;
    let mut payload = web(&server, "/sites/a", "A", true, &[]);
    payload["RoleAssignments"] = assignments();
    mount_json(&server, "/sites/a/_api/web", payload).await;
    let client = client_for(&server);

    let outcome = execute_report(
        &client,
        Arc::new(PermissionsReport),
        &form(&["/sites/a"]),
        None,
        false,
    )
    .await
    .unwrap();

    assert_eq!(titles(&outcome, "principal"), vec!["A Owners", "Ada"]);
    assert_eq!(outcome.rows[0].get("principal_type"), 8);
    assert_eq!(outcome.rows[1].get("roles"), "Read, Contribute");
    assert_eq!(outcome.rows[1].get("web"), "A");

    let principal_ids: Vec<i64> = outcome
        .rows
        .iter()
        .map(|r| match &r.target {
            Some(RemediationTarget::RoleAssignment { principal_id, .. }) => *principal_id,
            other => panic!("unexpected target {:?}", other),
        })
        .collect();
    // The second assignment has no PrincipalId and falls back to Member/Id
    assert_eq!(principal_ids, vec![3, 11]);
}

#[tokio::test]
async fn test_permissions_search_matches_title_or_login() {
    let server = MockServer::start().await;
    let mut payload = web(&server, "/sites/a", "A", true, &[]);
    payload["RoleAssignments"] = assignments();
    mount_json(&server, "/sites/a/_api/web", payload).await;
    let client = client_for(&server);

    let mut input = form(&["/sites/a"]);
    input.search_term(Some("ADA@C.COM".to_string()));
    let outcome = execute_report(&client, Arc::new(PermissionsReport), &input, None, false)
        .await
        .unwrap();

    assert_eq!(titles(&outcome, "principal"), vec!["Ada"]);
}

#[tokio::test]
async fn test_permissions_skip_subwebs_that_inherit() {
    let server = MockServer::start().await;
    let mut root = web(&server, "/sites/a", "A", true, &["/sites/a/b", "/sites/a/c"]);
    root["RoleAssignments"] = assignments();
    let mut inheriting = web(&server, "/sites/a/b", "B", false, &[]);
    inheriting["HasUniqueRoleAssignments"] = json!(false);
    inheriting["RoleAssignments"] = assignments();
    let mut unique = web(&server, "/sites/a/c", "C", false, &[]);
    unique["HasUniqueRoleAssignments"] = json!(true);
    unique["RoleAssignments"] = json!([{
        "PrincipalId": 21,
        "Member": {"Title": "C Visitors", "LoginName": "C Visitors", "PrincipalType": 8},
        "RoleDefinitionBindings": [{"Name": "Read"}]
    }]);
    mount_json(&server, "/sites/a/_api/web", root).await;
    mount_json(&server, "/sites/a/b/_api/web", inheriting).await;
    mount_json(&server, "/sites/a/c/_api/web", unique).await;
    let client = client_for(&server);

    let mut input = form(&["/sites/a"]);
    input.recursive(true);
    let outcome = execute_report(&client, Arc::new(PermissionsReport), &input, None, false)
        .await
        .unwrap();

    assert_eq!(outcome.nodes_visited, 3);
    assert_eq!(titles(&outcome, "web"), vec!["A", "A", "C"]);
    assert!(outcome.rows.iter().all(|r| !r.web_url.ends_with("/sites/a/b")));
}

// ============================================================================
// Unique permissions
// ============================================================================

#[tokio::test]
async fn test_unique_permissions_reports_subwebs_and_lists() {
    let server = MockServer::start().await;
    let mut root = web(&server, "/sites/a", "A", true, &["/sites/a/b"]);
    root["HasUniqueRoleAssignments"] = json!(true);
    root["Lists"] = json!([
        {"Id": "l1", "Title": "Contracts", "Hidden": false, "HasUniqueRoleAssignments": true},
        {"Id": "l2", "Title": "Documents", "Hidden": false, "HasUniqueRoleAssignments": false},
        {"Id": "l3", "Title": "Access Requests", "Hidden": true, "HasUniqueRoleAssignments": true}
    ]);
    let mut sub = web(&server, "/sites/a/b", "B", false, &[]);
    sub["HasUniqueRoleAssignments"] = json!(true);
    sub["Lists"] = json!([]);
    mount_json(&server, "/sites/a/_api/web", root).await;
    mount_json(&server, "/sites/a/b/_api/web", sub).await;
    let client = client_for(&server);

    let mut input = form(&["/sites/a"]);
    input.recursive(true);
    let outcome = execute_report(&client, Arc::new(UniquePermissionsReport), &input, None, false)
        .await
        .unwrap();

    // The root always owns its permissions and gets no web row
    assert_eq!(titles(&outcome, "title"), vec!["Contracts", "B"]);
    assert_eq!(
        outcome.rows[0].target,
        Some(RemediationTarget::ListInheritance {
            web_url: format!("{}/sites/a", server.uri()),
            list_id: "l1".to_string(),
        })
    );
    assert_eq!(outcome.rows[1].get("scope"), "Web");
    assert_eq!(
        outcome.rows[1].target,
        Some(RemediationTarget::WebInheritance {
            web_url: format!("{}/sites/a/b", server.uri()),
        })
    );
}

#[tokio::test]
async fn test_unique_permissions_include_hidden_lists_on_request() {
    let server = MockServer::start().await;
    let mut root = web(&server, "/sites/a", "A", true, &[]);
    root["Lists"] = json!([
        {"Id": "l3", "Title": "Access Requests", "Hidden": true, "HasUniqueRoleAssignments": true}
    ]);
    mount_json(&server, "/sites/a/_api/web", root).await;
    let client = client_for(&server);

    let mut input = form(&["/sites/a"]);
    input.include_hidden(true);
    let outcome = execute_report(&client, Arc::new(UniquePermissionsReport), &input, None, false)
        .await
        .unwrap();

    assert_eq!(titles(&outcome, "title"), vec!["Access Requests"]);
    assert_eq!(outcome.rows[0].get("scope"), "List");
}

// ============================================================================
// Lists
// ============================================================================

fn dated_lists() -> serde_json::Value {
    let recent = (chrono::Utc::now() - chrono::Duration::days(3)).to_rfc3339();
    json!([
        {"Id": "l1", "Title": "Archive", "ItemCount": 40, "BaseTemplate": 101, "Hidden": false,
         "LastItemModifiedDate": "2015-06-01T00:00:00Z"},
        {"Id": "l2", "Title": "Tasks", "ItemCount": 3, "BaseTemplate": 171, "Hidden": false,
         "LastItemModifiedDate": recent},
        {"Id": "l3", "Title": "Workflow History", "ItemCount": 0, "BaseTemplate": 140, "Hidden": true,
         "LastItemModifiedDate": "2016-01-01T00:00:00Z"}
    ])
}

#[tokio::test]
async fn test_lists_older_than_keeps_stale_lists_only() {
    let server = MockServer::start().await;
    let mut payload = web(&server, "/sites/a", "A", true, &[]);
    payload["Lists"] = dated_lists();
    mount_json(&server, "/sites/a/_api/web", payload).await;
    let client = client_for(&server);

    let mut input = form(&["/sites/a"]);
    input.older_than_days(Some(365));
    let outcome = execute_report(&client, Arc::new(ListInventoryReport), &input, None, false)
        .await
        .unwrap();

    assert_eq!(titles(&outcome, "title"), vec!["Archive"]);
    assert_eq!(
        outcome.rows[0].target,
        Some(RemediationTarget::List {
            web_url: format!("{}/sites/a", server.uri()),
            list_id: "l1".to_string(),
        })
    );
}

#[tokio::test]
async fn test_lists_include_hidden_with_age_filter() {
    let server = MockServer::start().await;
    let mut payload = web(&server, "/sites/a", "A", true, &[]);
    payload["Lists"] = dated_lists();
    mount_json(&server, "/sites/a/_api/web", payload).await;
    let client = client_for(&server);

    let mut input = form(&["/sites/a"]);
    input.include_hidden(true);
    let all = execute_report(&client, Arc::new(ListInventoryReport), &input, None, false)
        .await
        .unwrap();
    assert_eq!(titles(&all, "title"), vec!["Archive", "Tasks", "Workflow History"]);
    assert_eq!(all.rows[2].get("hidden"), true);

    input.older_than_days(Some(365));
    let stale = execute_report(&client, Arc::new(ListInventoryReport), &input, None, false)
        .await
        .unwrap();
    assert_eq!(titles(&stale, "title"), vec!["Archive", "Workflow History"]);
}

#[tokio::test]
async fn test_progress_callback_receives_summary() {
    let server = MockServer::start().await;
    mount_json(&server, "/sites/a/_api/web", web(&server, "/sites/a", "A", true, &[])).await;
    let client = client_for(&server);

    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();
    let callback: sitewarden_core::ReportProgressCallback =
        Arc::new(move |msg: String| sink.lock().unwrap().push(msg));

    let script: Arc<dyn ReportScript> = Arc::new(SiteInventoryReport);
    execute_report(&client, script, &form(&["/sites/a"]), Some(callback), false)
        .await
        .unwrap();

    let messages = messages.lock().unwrap();
    assert!(messages.iter().any(|m| m.contains("[1/1]")));
    assert!(messages.last().unwrap().contains("1 row(s), 0 failure(s)"));
}
