//! Read-only helpers for surveying what the current credentials can see

use crate::error::{GcpError, Result};
use crate::gcp::auth::get_default_project;
use crate::gcp::client::GcpClient;
use crate::gcp::iam;
use crate::gcp::pager::list_all;
use crate::types::{Container, Organization, Project, NO_ORG};
use serde_json::Value;

/// Email of the identity behind the client's credentials
///
/// Service-account credentials know their email locally; anything else is
/// resolved through the OAuth2 tokeninfo endpoint.
pub async fn get_email(client: &GcpClient) -> Result<String> {
    if let Some(email) = client.credentials.service_account_email() {
        return Ok(email.to_string());
    }

    let token = client.get_token().await?;
    let info = client.get(&client.tokeninfo_url(&token)).await?;

    info.get("email")
        .and_then(|v| v.as_str())
        .filter(|e| !e.is_empty())
        .map(String::from)
        .ok_or_else(|| {
            GcpError::Auth(
                "Could not determine the account email; the token has no email scope".to_string(),
            )
        })
}

/// Every organization visible to the caller
///
/// `NO_ORG` is appended when at least one project has no organization or
/// folder parent.
pub async fn list_organizations(client: &GcpClient) -> Result<Vec<Container>> {
    let items = list_all(client, &client.crm_v3_url("organizations:search"), "organizations").await?;

    let mut containers: Vec<Container> = items
        .iter()
        .map(|o| Container::Organization(Organization::from(o)))
        .collect();

    if !NO_ORG.projects(client).await?.is_empty() {
        containers.push(NO_ORG);
    }

    Ok(containers)
}

/// The project gcloud is configured to use as quota project
pub async fn quota_project(client: &GcpClient) -> Result<Project> {
    let project_id = get_default_project().ok_or_else(|| {
        GcpError::NotFound(
            "No default project configured. Run 'gcloud config set project PROJECT_ID'".to_string(),
        )
    })?;
    tracing::debug!("Quota project from gcloud config: {}", project_id);
    Project::lookup(client, &project_id).await
}

/// Every project in every visible organization (and `NO_ORG`)
pub async fn walk_projects(client: &GcpClient, active_only: bool) -> Result<Vec<Project>> {
    let mut projects = Vec::new();
    for container in list_organizations(client).await? {
        projects.extend(container.walk_projects(client, active_only).await?);
    }
    Ok(projects)
}

/// IAM policy of a project, folder, or organization resource name
pub async fn get_iam_policy(client: &GcpClient, resource_name: &str) -> Result<Value> {
    iam::get_iam_policy(client, resource_name).await
}
