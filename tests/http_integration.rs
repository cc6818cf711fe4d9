//! Integration tests for the resource helpers using wiremock
//!
//! Every API is routed to one mock server through `Endpoints::with_base`,
//! and requests carry a static bearer token.

use gcpadm::gcp::auth::GcpCredentials;
use gcpadm::gcp::client::{Endpoints, GcpClient};
use gcpadm::gcp::operations::OperationOptions;
use gcpadm::gcp::pager::list_all;
use gcpadm::types::{BillingRef, Container, Folder, Organization, Project, NO_BILLING_ACCOUNT, NO_ORG};
use gcpadm::GcpError;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{
    bearer_token, body_json, body_partial_json, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> GcpClient {
    let endpoints = Endpoints::with_base(&server.uri()).unwrap();
    GcpClient::with_credentials(GcpCredentials::from_static_token("test-token"), endpoints).unwrap()
}

fn fast_options() -> OperationOptions {
    OperationOptions::default()
        .with_timeout(Duration::from_millis(300))
        .with_polling_interval(Duration::from_millis(10))
}

fn acme() -> Container {
    Organization::new("1", "acme.io").into()
}

async fn mount_get(server: &MockServer, at: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

mod pagination_tests {
    use super::*;

    #[tokio::test]
    async fn test_list_all_follows_next_page_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v3/folders"))
            .and(query_param_is_missing("pageToken"))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "folders": [{"name": "folders/1"}, {"name": "folders/2"}],
                "nextPageToken": "page-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v3/folders"))
            .and(query_param("pageToken", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "folders": [{"name": "folders/3"}],
                "nextPageToken": ""
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let items = list_all(&client, &client.crm_v3_url("folders"), "folders")
            .await
            .unwrap();

        let names: Vec<&str> = items.iter().filter_map(|f| f["name"].as_str()).collect();
        assert_eq!(names, vec!["folders/1", "folders/2", "folders/3"]);
    }

    #[tokio::test]
    async fn test_missing_items_key_is_empty() {
        let server = MockServer::start().await;
        mount_get(&server, "/v3/folders", json!({})).await;

        let client = client_for(&server);
        let items = list_all(&client, &client.crm_v3_url("folders"), "folders")
            .await
            .unwrap();
        assert!(items.is_empty());
    }
}

mod container_tests {
    use super::*;

    async fn mount_acme_hierarchy(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/v3/folders"))
            .and(query_param("parent", "organizations/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "folders": [{"name": "folders/10", "displayName": "eng", "parent": "organizations/1"}]
            })))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v3/folders"))
            .and(query_param("parent", "folders/10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v3/projects"))
            .and(query_param("parent", "organizations/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "projects": [{
                    "name": "projects/100",
                    "projectId": "root-proj",
                    "displayName": "Root",
                    "state": "ACTIVE",
                    "parent": "organizations/1"
                }]
            })))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v3/projects"))
            .and(query_param("parent", "folders/10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "projects": [
                    {
                        "name": "projects/200",
                        "projectId": "eng-app",
                        "state": "ACTIVE",
                        "parent": "folders/10"
                    },
                    {
                        "name": "projects/201",
                        "projectId": "eng-old",
                        "state": "DELETE_REQUESTED",
                        "parent": "folders/10"
                    }
                ]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_tree_renders_folders_before_projects() {
        let server = MockServer::start().await;
        mount_acme_hierarchy(&server).await;
        let client = client_for(&server);

        let tree = acme().tree(&client).await.unwrap();
        let expected = "🌺 acme.io (organizations/1)\n\
                        ├── 🎸 eng (folders/10)\n\
                        │   ├── 🎵 eng-app (ACTIVE)\n\
                        │   └── 🎵 eng-old (DELETE_REQUESTED)\n\
                        └── 🎵 root-proj (ACTIVE)\n";
        assert_eq!(tree, expected);
    }

    #[tokio::test]
    async fn test_walk_projects_active_only() {
        let server = MockServer::start().await;
        mount_acme_hierarchy(&server).await;
        let client = client_for(&server);

        let all = acme().walk_projects(&client, false).await.unwrap();
        assert_eq!(all.len(), 3);

        let active: Vec<String> = acme()
            .walk_projects(&client, true)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(active, vec!["root-proj", "eng-app"]);
    }

    #[tokio::test]
    async fn test_cd_walks_display_names() {
        let server = MockServer::start().await;
        mount_acme_hierarchy(&server).await;
        let client = client_for(&server);

        let folder = acme().cd(&client, "/eng/").await.unwrap();
        assert_eq!(folder.resource_name, "folders/10");
        assert_eq!(folder.parent_resource_name, "organizations/1");

        match acme().cd(&client, "eng/missing").await {
            Err(GcpError::InvalidArgument(msg)) => {
                assert!(msg.contains("'missing'"));
                assert!(msg.contains("(none)"));
            },
            other => panic!("unexpected: {:?}", other),
        }

        match acme().cd(&client, "nope").await {
            Err(GcpError::InvalidArgument(msg)) => assert!(msg.contains("eng")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_folder_waits_for_operation() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v3/folders"))
            .and(body_partial_json(json!({"displayName": "Automation", "parent": "organizations/1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "operations/cf.1",
                "done": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        mount_get(
            &server,
            "/v3/operations/cf.1",
            json!({
                "name": "operations/cf.1",
                "done": true,
                "response": {"name": "folders/77", "displayName": "Automation"}
            }),
        )
        .await;

        let client = client_for(&server);
        let folder = acme().create_folder(&client, "Automation").await.unwrap();
        assert_eq!(folder.id, "77");
        assert_eq!(folder.display_name, "Automation");
        assert_eq!(folder.parent_resource_name, "organizations/1");
    }

    #[tokio::test]
    async fn test_no_org_projects_filters_parented_projects() {
        let server = MockServer::start().await;
        mount_get(
            &server,
            "/v1/projects",
            json!({
                "projects": [
                    {"projectId": "solo-1", "projectNumber": "1", "lifecycleState": "ACTIVE"},
                    {"projectId": "in-org", "projectNumber": "2", "lifecycleState": "ACTIVE",
                     "parent": {"type": "organization", "id": "1"}},
                    {"projectId": "in-folder", "projectNumber": "3", "lifecycleState": "ACTIVE",
                     "parent": {"type": "folder", "id": "10"}}
                ]
            }),
        )
        .await;

        let client = client_for(&server);
        let projects = NO_ORG.projects(&client).await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, "solo-1");
        assert_eq!(projects[0].parent, NO_ORG);
    }

    #[tokio::test]
    async fn test_create_project_links_billing_and_looks_up() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v3/projects"))
            .and(body_partial_json(json!({"projectId": "new-proj-123", "parent": "organizations/1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "operations/cp.1",
                "done": true,
                "response": {"projectId": "new-proj-123"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        mount_get(&server, "/v3/projects/new-proj-123", json!({"projectId": "new-proj-123"})).await;

        Mock::given(method("PUT"))
            .and(path("/v1/projects/new-proj-123/billingInfo"))
            .and(body_partial_json(json!({"billingAccountName": "billingAccounts/AAAAAA-BBBBBB-CCCCCC"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"billingEnabled": true})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v3/projects:search"))
            .and(query_param("query", "id:new-proj-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "projects": [{
                    "name": "projects/555",
                    "projectId": "new-proj-123",
                    "displayName": "New",
                    "state": "ACTIVE",
                    "parent": "organizations/1"
                }]
            })))
            .mount(&server)
            .await;

        mount_get(
            &server,
            "/v3/organizations/1",
            json!({"name": "organizations/1", "displayName": "acme.io"}),
        )
        .await;

        let client = client_for(&server);
        let project = acme()
            .create_project(&client, "new-proj-123", "New", "AAAAAA-BBBBBB-CCCCCC", &fast_options())
            .await
            .unwrap();

        assert_eq!(project.id, "new-proj-123");
        assert_eq!(project.project_number, "555");
        assert_eq!(project.parent.display_name(), "acme.io");
    }

    #[tokio::test]
    async fn test_create_project_surfaces_operation_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v3/projects"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "operations/cp.2",
                "done": true,
                "error": {"code": 6, "message": "project id already in use"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = NO_ORG
            .create_project(&client, "taken-proj", "Taken", NO_BILLING_ACCOUNT, &fast_options())
            .await;

        match result {
            Err(GcpError::OperationFailed { code, message }) => {
                assert_eq!(code, 6);
                assert!(message.contains("already in use"));
            },
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_project_times_out_on_stuck_operation() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v3/projects"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "operations/cp.3",
                "done": false
            })))
            .mount(&server)
            .await;
        mount_get(&server, "/v3/operations/cp.3", json!({"name": "operations/cp.3", "done": false})).await;

        let client = client_for(&server);
        let result = NO_ORG
            .create_project(&client, "slow-proj", "Slow", NO_BILLING_ACCOUNT, &fast_options())
            .await;
        assert!(matches!(result, Err(GcpError::Timeout(_))));
    }

    async fn mount_created_project(server: &MockServer, project_id: &str) {
        Mock::given(method("POST"))
            .and(path("/v3/projects"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "operations/cp.4",
                "done": true
            })))
            .expect(1)
            .mount(server)
            .await;
        mount_get(server, &format!("/v3/projects/{}", project_id), json!({"projectId": project_id})).await;
    }

    #[tokio::test]
    async fn test_create_project_search_error_is_returned() {
        let server = MockServer::start().await;
        mount_created_project(&server, "p-123456").await;

        Mock::given(method("GET"))
            .and(path("/v3/projects:search"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": 403, "message": "caller lacks resourcemanager.projects.list"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = acme()
            .create_project(&client, "p-123456", "P", NO_BILLING_ACCOUNT, &fast_options())
            .await;

        assert!(matches!(result, Err(GcpError::Api { status: 403, .. })), "got {:?}", result);
    }

    #[tokio::test]
    async fn test_create_project_not_yet_searchable_returns_placeholder() {
        let server = MockServer::start().await;
        mount_created_project(&server, "p-654321").await;

        Mock::given(method("GET"))
            .and(path("/v3/projects:search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let project = acme()
            .create_project(&client, "p-654321", "Fresh", NO_BILLING_ACCOUNT, &fast_options())
            .await
            .unwrap();

        assert_eq!(project.id, "p-654321");
        assert_eq!(project.name, "Fresh");
        assert_eq!(project.project_number, "");
        assert_eq!(project.lifecycle_state, "");
        assert_eq!(project.parent, acme());
    }

    #[tokio::test]
    async fn test_list_roles_resolves_titles() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v3/organizations/1:getIamPolicy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "bindings": [
                    {"role": "roles/viewer", "members": ["user:me@example.com"]},
                    {"role": "roles/owner", "members": ["user:other@example.com"]},
                    {"role": "organizations/1/roles/deployer", "members": ["user:me@example.com"]},
                    {"role": "organizations/1/roles/retired", "members": ["user:me@example.com"]}
                ]
            })))
            .mount(&server)
            .await;

        mount_get(
            &server,
            "/v1/roles",
            json!({"roles": [
                {"name": "roles/viewer", "title": "Viewer", "description": "Read access"},
                {"name": "roles/owner", "title": "Owner", "description": "Full access"}
            ]}),
        )
        .await;
        mount_get(
            &server,
            "/v1/organizations/1/roles/deployer",
            json!({"name": "organizations/1/roles/deployer", "title": "Deployer", "description": "Ships code"}),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/v1/organizations/1/roles/retired"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": 404, "message": "role not found"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let roles = acme().list_roles(&client, Some("me@example.com")).await.unwrap();

        let summary: Vec<(&str, &str)> = roles.iter().map(|r| (r.name.as_str(), r.title.as_str())).collect();
        assert_eq!(
            summary,
            vec![
                ("roles/viewer", "Viewer"),
                ("organizations/1/roles/deployer", "Deployer"),
                ("organizations/1/roles/retired", ""),
            ]
        );
        assert_eq!(roles[0].description, "Read access");
    }

    #[tokio::test]
    async fn test_list_roles_without_bindings_skips_catalog() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v3/organizations/1:getIamPolicy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"bindings": []})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/roles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(acme().list_roles(&client, Some("me@example.com")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_folder_parent_resolves_folder_then_organization() {
        let server = MockServer::start().await;
        mount_get(
            &server,
            "/v3/folders/10",
            json!({"name": "folders/10", "displayName": "eng", "parent": "organizations/1"}),
        )
        .await;
        mount_get(
            &server,
            "/v3/organizations/1",
            json!({"name": "organizations/1", "displayName": "acme.io"}),
        )
        .await;

        let client = client_for(&server);
        let team = Folder {
            id: "20".to_string(),
            resource_name: "folders/20".to_string(),
            display_name: "team".to_string(),
            parent_resource_name: "folders/10".to_string(),
        };

        let eng = match team.parent(&client).await.unwrap() {
            Some(Container::Folder(folder)) => folder,
            other => panic!("unexpected parent: {:?}", other),
        };
        assert_eq!(eng.display_name, "eng");
        assert_eq!(eng.parent_resource_name, "organizations/1");

        let org = Container::Folder(eng).parent(&client).await.unwrap().unwrap();
        assert_eq!(org.resource_name(), "organizations/1");
        assert_eq!(org.display_name(), "acme.io");
        assert_eq!(acme().parent(&client).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_organization_billing_accounts() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/billingAccounts"))
            .and(query_param("parent", "organizations/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "billingAccounts": [
                    {"name": "billingAccounts/AAA", "displayName": "Main", "open": true},
                    {"name": "billingAccounts/BBB", "displayName": "Old", "open": false}
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let all = acme().billing_accounts(&client, false).await.unwrap();
        assert_eq!(all.len(), 2);

        let open = acme().billing_accounts(&client, true).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, "AAA");
    }
}

mod iam_tests {
    use super::*;

    #[tokio::test]
    async fn test_add_user_as_owner_is_idempotent() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v3/projects/my-proj-1:getIamPolicy"))
            .and(body_partial_json(json!({"options": {"requestedPolicyVersion": 3}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "version": 3,
                "etag": "BwX=",
                "bindings": [{"role": "roles/owner", "members": ["user:me@example.com"]}]
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v3/projects/my-proj-1:setIamPolicy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let project = Project::placeholder("my-proj-1", "Mine", NO_ORG);
        let policy = project.add_user_as_owner(&client, "me@example.com").await.unwrap();
        assert_eq!(policy["etag"], "BwX=");
    }

    #[tokio::test]
    async fn test_add_user_roles_writes_merged_policy() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v3/organizations/1:getIamPolicy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "version": 1,
                "bindings": [{"role": "roles/viewer", "members": ["user:other@example.com"]}]
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v3/organizations/1:setIamPolicy"))
            .and(body_partial_json(json!({
                "policy": {
                    "version": 3,
                    "bindings": [
                        {"role": "roles/viewer", "members": ["user:other@example.com", "user:me@example.com"]},
                        {"role": "roles/browser", "members": ["user:me@example.com"]}
                    ]
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": 3})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let org = Organization::new("1", "acme.io");
        org.add_user_roles(&client, "me@example.com", &["roles/viewer", "roles/browser"])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_add_user_roles_rejects_bad_input_before_any_call() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        let org = Organization::new("1", "acme.io");

        assert!(matches!(
            org.add_user_roles(&client, "not-an-email", &["roles/viewer"]).await,
            Err(GcpError::InvalidArgument(_))
        ));
        assert!(matches!(
            org.add_user_roles(&client, "me@example.com", &[]).await,
            Err(GcpError::InvalidArgument(_))
        ));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }
}

mod project_tests {
    use super::*;

    #[tokio::test]
    async fn test_enabled_apis() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/projects/my-proj-1/services"))
            .and(query_param("filter", "state:ENABLED"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "services": [
                    {"name": "projects/1/services/iam.googleapis.com", "config": {"name": "iam.googleapis.com"}},
                    {"name": "projects/1/services/compute.googleapis.com", "config": {"name": "compute.googleapis.com"}}
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let project = Project::placeholder("my-proj-1", "Mine", NO_ORG);
        let apis = project.enabled_apis(&client).await.unwrap();
        assert_eq!(apis, vec!["iam.googleapis.com", "compute.googleapis.com"]);
    }

    #[tokio::test]
    async fn test_bootstrap_quota_project_is_noop_when_enabled() {
        let server = MockServer::start().await;

        mount_get(
            &server,
            "/v1/projects/my-proj-1/services",
            json!({"services": [{"config": {"name": "iam.googleapis.com"}}]}),
        )
        .await;

        Mock::given(method("POST"))
            .and(path("/v1/projects/my-proj-1/services:batchEnable"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let project = Project::placeholder("my-proj-1", "Mine", NO_ORG);
        let result = project
            .bootstrap_quota_project(&client, Some(&["iam.googleapis.com"]), &fast_options())
            .await
            .unwrap();
        assert_eq!(result["result"], "no-op");
    }

    #[tokio::test]
    async fn test_bootstrap_quota_project_enables_missing() {
        let server = MockServer::start().await;

        mount_get(&server, "/v1/projects/my-proj-1/services", json!({})).await;

        Mock::given(method("POST"))
            .and(path("/v1/projects/my-proj-1/services:batchEnable"))
            .and(body_partial_json(json!({"serviceIds": ["iam.googleapis.com"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "operations/acf.1",
                "done": false
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_get(&server, "/v1/operations/acf.1", json!({"name": "operations/acf.1", "done": true})).await;

        let client = client_for(&server);
        let project = Project::placeholder("my-proj-1", "Mine", NO_ORG);
        let result = project
            .bootstrap_quota_project(&client, Some(&["iam.googleapis.com"]), &fast_options())
            .await
            .unwrap();
        assert_eq!(result["done"], true);
    }

    #[tokio::test]
    async fn test_billing_account_disabled_is_sentinel() {
        let server = MockServer::start().await;
        mount_get(
            &server,
            "/v1/projects/my-proj-1/billingInfo",
            json!({"billingEnabled": false, "billingAccountName": ""}),
        )
        .await;

        let client = client_for(&server);
        let project = Project::placeholder("my-proj-1", "Mine", NO_ORG);
        let billing = project.billing_account(&client).await.unwrap();
        assert_eq!(billing, NO_BILLING_ACCOUNT);
        assert!(!billing.is_linked());
    }

    #[tokio::test]
    async fn test_update_billing_account_unlinks_with_sentinel() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/v1/projects/old-proj-1/billingInfo"))
            .and(body_json(json!({"billingAccountName": ""})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"billingEnabled": false})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let project = Project::placeholder("old-proj-1", "Old", NO_ORG);
        let info = project.update_billing_account(&client, NO_BILLING_ACCOUNT).await.unwrap();
        assert_eq!(info["billingEnabled"], false);
    }

    #[tokio::test]
    async fn test_billing_account_linked() {
        let server = MockServer::start().await;
        mount_get(
            &server,
            "/v1/projects/my-proj-1/billingInfo",
            json!({"billingEnabled": true, "billingAccountName": "billingAccounts/AAA"}),
        )
        .await;
        mount_get(
            &server,
            "/v1/billingAccounts/AAA",
            json!({"name": "billingAccounts/AAA", "displayName": "Main", "open": false}),
        )
        .await;

        let client = client_for(&server);
        let project = Project::placeholder("my-proj-1", "Mine", NO_ORG);
        match project.billing_account(&client).await.unwrap() {
            BillingRef::Account(account) => {
                assert_eq!(account.id, "AAA");
                assert_eq!(account.display_name, "Main");
                assert!(!account.is_open());
            },
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lookup_not_found_and_ambiguous() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v3/projects:search"))
            .and(query_param("query", "id:ghost-proj"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v3/projects:search"))
            .and(query_param("query", "id:twin-proj"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "projects": [{"projectId": "twin-proj"}, {"projectId": "twin-proj"}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(matches!(
            Project::lookup(&client, "ghost-proj").await,
            Err(GcpError::NotFound(_))
        ));
        assert!(matches!(
            Project::lookup(&client, "twin-proj").await,
            Err(GcpError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_lookup_resolves_folder_parent() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v3/projects:search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "projects": [{
                    "name": "projects/42",
                    "projectId": "eng-app",
                    "state": "ACTIVE",
                    "parent": "folders/10"
                }]
            })))
            .mount(&server)
            .await;
        mount_get(
            &server,
            "/v3/folders/10",
            json!({"name": "folders/10", "displayName": "eng", "parent": "organizations/1"}),
        )
        .await;

        let client = client_for(&server);
        let project = Project::lookup(&client, "eng-app").await.unwrap();
        match &project.parent {
            Container::Folder(folder) => {
                assert_eq!(folder.display_name, "eng");
                assert_eq!(folder.parent_resource_name, "organizations/1");
            },
            other => panic!("unexpected parent: {:?}", other),
        }
    }
}

mod survey_tests {
    use super::*;
    use gcpadm::survey::{get_email, list_organizations};

    #[tokio::test]
    async fn test_get_email_from_tokeninfo() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/tokeninfo"))
            .and(query_param("access_token", "test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "email": "me@example.com",
                "scope": "openid"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(get_email(&client).await.unwrap(), "me@example.com");
    }

    #[tokio::test]
    async fn test_get_email_without_email_scope() {
        let server = MockServer::start().await;
        mount_get(&server, "/tokeninfo", json!({"scope": "cloud-platform"})).await;

        let client = client_for(&server);
        assert!(matches!(get_email(&client).await, Err(GcpError::Auth(_))));
    }

    #[tokio::test]
    async fn test_list_organizations_appends_no_org() {
        let server = MockServer::start().await;
        mount_get(
            &server,
            "/v3/organizations:search",
            json!({"organizations": [{"name": "organizations/1", "displayName": "acme.io"}]}),
        )
        .await;
        mount_get(
            &server,
            "/v1/projects",
            json!({"projects": [{"projectId": "solo-1", "lifecycleState": "ACTIVE"}]}),
        )
        .await;

        let client = client_for(&server);
        let orgs = list_organizations(&client).await.unwrap();
        assert_eq!(orgs.len(), 2);
        assert_eq!(orgs[0].display_name(), "acme.io");
        assert_eq!(orgs[1], NO_ORG);
    }

    #[tokio::test]
    async fn test_list_organizations_without_orphans() {
        let server = MockServer::start().await;
        mount_get(&server, "/v3/organizations:search", json!({})).await;
        mount_get(&server, "/v1/projects", json!({})).await;

        let client = client_for(&server);
        assert!(list_organizations(&client).await.unwrap().is_empty());
    }
}

mod error_tests {
    use super::*;

    #[tokio::test]
    async fn test_api_error_carries_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v3/organizations/9"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": 403, "message": "The caller does not have permission"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = Organization::lookup(&client, "9").await.unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert!(err.is_absent());
    }
}
