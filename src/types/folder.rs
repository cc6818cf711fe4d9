//! Folder containers

use super::container::Container;
use super::project::{list_child_projects, Project};
use crate::error::{GcpError, Result};
use crate::gcp::client::GcpClient;
use crate::gcp::operations::{wait_for_operation, OperationOptions};
use crate::gcp::pager::{add_query_params, list_all, short_name};
use serde_json::{json, Value};
use std::time::Duration;

/// Information about a GCP folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    /// Numeric folder id
    pub id: String,
    /// `folders/{id}`
    pub resource_name: String,
    pub display_name: String,
    /// `organizations/{id}` or `folders/{id}`
    pub parent_resource_name: String,
}

impl Folder {
    /// Build a folder from a CRM v3 folder resource
    ///
    /// `fallback_parent` is used when the response omits `parent`.
    pub fn from_api(value: &Value, fallback_parent: &str) -> Self {
        let resource_name = value
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Self {
            id: short_name(&resource_name).to_string(),
            display_name: value
                .get("displayName")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            parent_resource_name: value
                .get("parent")
                .and_then(|v| v.as_str())
                .unwrap_or(fallback_parent)
                .to_string(),
            resource_name,
        }
    }

    /// Fetch a folder by resource name (`folders/{id}`)
    pub async fn get(client: &GcpClient, resource_name: &str) -> Result<Self> {
        let value = client.get(&client.crm_v3_url(resource_name)).await?;
        Ok(Self::from_api(&value, ""))
    }

    /// The organization or folder this folder lives in
    pub async fn parent(&self, client: &GcpClient) -> Result<Option<Container>> {
        if self.parent_resource_name.is_empty() {
            return Ok(None);
        }
        match Container::resolve(client, &self.parent_resource_name).await? {
            Container::NoOrg => Ok(None),
            other => Ok(Some(other)),
        }
    }

    /// Direct child folders
    pub async fn folders(&self, client: &GcpClient) -> Result<Vec<Folder>> {
        list_child_folders(client, &self.resource_name).await
    }

    /// Direct child projects
    pub async fn projects(&self, client: &GcpClient) -> Result<Vec<Project>> {
        list_child_projects(client, &Container::Folder(self.clone())).await
    }

    /// Create a folder directly under this folder
    pub async fn create_folder(&self, client: &GcpClient, display_name: &str) -> Result<Folder> {
        create_folder_under(client, &self.resource_name, display_name).await
    }
}

/// List the folders whose parent is `parent_resource_name`
pub(crate) async fn list_child_folders(
    client: &GcpClient,
    parent_resource_name: &str,
) -> Result<Vec<Folder>> {
    let url = add_query_params(
        &client.crm_v3_url("folders"),
        &[("parent", parent_resource_name)],
    );
    let items = list_all(client, &url, "folders").await?;

    Ok(items
        .iter()
        .map(|f| Folder::from_api(f, parent_resource_name))
        .collect())
}

/// Create a folder and wait for the operation to finish
pub(crate) async fn create_folder_under(
    client: &GcpClient,
    parent_resource_name: &str,
    display_name: &str,
) -> Result<Folder> {
    tracing::info!("Creating folder '{}' under {}", display_name, parent_resource_name);

    let body = json!({
        "displayName": display_name,
        "parent": parent_resource_name,
    });
    let operation = client.post(&client.crm_v3_url("folders"), Some(&body)).await?;

    let options = OperationOptions::default().with_polling_interval(Duration::from_secs(1));
    let operation =
        wait_for_operation(client, operation, |name| client.crm_v3_url(name), &options).await?;

    let resource_name = operation
        .get("response")
        .and_then(|r| r.get("name"))
        .and_then(|n| n.as_str())
        .ok_or_else(|| {
            GcpError::NotFound(format!(
                "folder create operation for '{}' returned no folder name",
                display_name
            ))
        })?
        .to_string();

    Ok(Folder {
        id: short_name(&resource_name).to_string(),
        resource_name,
        display_name: display_name.to_string(),
        parent_resource_name: parent_resource_name.to_string(),
    })
}
