//! Resource containers and hierarchy traversal
//!
//! A [`Container`] is anything that can hold projects: an organization, a
//! folder, or the [`NO_ORG`] sentinel standing in for "no parent at all".
//! Traversal and rendering recurse through folders with boxed futures.

use super::billing_account::{list_billing_accounts, BillingAccount, BillingRef};
use super::folder::{create_folder_under, list_child_folders, Folder};
use super::organization::Organization;
use super::project::{list_child_projects, Project};
use super::role::Role;
use crate::error::{GcpError, Result};
use crate::gcp::client::GcpClient;
use crate::gcp::iam;
use crate::gcp::operations::{poll_until_ok, poll_while, wait_for_operation, OperationOptions};
use crate::survey;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::json;
use std::fmt;

const NO_ORG_RESOURCE_NAME: &str = "NO_ORG";

const NO_ORG_CREATE_FOLDER: &str = "NO_ORG cannot have folders. Projects without an organization \
     parent cannot contain folders. Create the folder under an organization or folder instead.";

const NO_ORG_CD: &str = "NO_ORG cannot have folders. Projects without an organization parent \
     cannot contain folders. Use cd on an organization or folder instead.";

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

const ORGANIZATION_MARKER: &str = "🌺";
const FOLDER_MARKER: &str = "🎸";
const NO_ORG_MARKER: &str = "🐞";
const PROJECT_MARKER: &str = "🎵";

/// Something that can contain projects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Container {
    Organization(Organization),
    Folder(Folder),
    /// Parent of projects that belong to no organization (personal accounts)
    NoOrg,
}

/// Sentinel container for projects without an organization or folder parent
pub const NO_ORG: Container = Container::NoOrg;

impl Container {
    /// Numeric id; empty for `NO_ORG`
    pub fn id(&self) -> &str {
        match self {
            Container::Organization(org) => &org.id,
            Container::Folder(folder) => &folder.id,
            Container::NoOrg => "",
        }
    }

    pub fn resource_name(&self) -> &str {
        match self {
            Container::Organization(org) => &org.resource_name,
            Container::Folder(folder) => &folder.resource_name,
            Container::NoOrg => NO_ORG_RESOURCE_NAME,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Container::Organization(org) => &org.display_name,
            Container::Folder(folder) => &folder.display_name,
            Container::NoOrg => "No Organization",
        }
    }

    pub fn is_no_org(&self) -> bool {
        matches!(self, Container::NoOrg)
    }

    fn marker(&self) -> &'static str {
        match self {
            Container::Organization(_) => ORGANIZATION_MARKER,
            Container::Folder(_) => FOLDER_MARKER,
            Container::NoOrg => NO_ORG_MARKER,
        }
    }

    /// Resolve a parent resource name into a container
    ///
    /// Anything that is neither an organization nor a folder maps to `NO_ORG`.
    pub async fn resolve(client: &GcpClient, parent_resource_name: &str) -> Result<Container> {
        if parent_resource_name.starts_with("organizations/") {
            Ok(Container::Organization(
                Organization::lookup(client, parent_resource_name).await?,
            ))
        } else if parent_resource_name.starts_with("folders/") {
            Ok(Container::Folder(
                Folder::get(client, parent_resource_name).await?,
            ))
        } else {
            Ok(NO_ORG)
        }
    }

    /// Container for a parent resource name without any API calls
    ///
    /// Display names are left empty; use [`Container::resolve`] to fill them.
    pub fn from_resource_name(parent_resource_name: &str) -> Container {
        if let Some(id) = parent_resource_name.strip_prefix("organizations/") {
            Container::Organization(Organization::new(id, ""))
        } else if let Some(id) = parent_resource_name.strip_prefix("folders/") {
            Container::Folder(Folder {
                id: id.to_string(),
                resource_name: parent_resource_name.to_string(),
                display_name: String::new(),
                parent_resource_name: String::new(),
            })
        } else {
            NO_ORG
        }
    }

    /// The container one level up, if any
    pub async fn parent(&self, client: &GcpClient) -> Result<Option<Container>> {
        match self {
            Container::Folder(folder) => folder.parent(client).await,
            Container::Organization(_) | Container::NoOrg => Ok(None),
        }
    }

    /// Direct child folders; always empty for `NO_ORG`
    pub async fn folders(&self, client: &GcpClient) -> Result<Vec<Folder>> {
        match self {
            Container::NoOrg => Ok(Vec::new()),
            other => list_child_folders(client, other.resource_name()).await,
        }
    }

    /// Direct child projects
    pub async fn projects(&self, client: &GcpClient) -> Result<Vec<Project>> {
        list_child_projects(client, self).await
    }

    /// Create a folder directly under this container
    pub async fn create_folder(&self, client: &GcpClient, display_name: &str) -> Result<Folder> {
        match self {
            Container::NoOrg => Err(GcpError::Unsupported(NO_ORG_CREATE_FOLDER.to_string())),
            other => create_folder_under(client, other.resource_name(), display_name).await,
        }
    }

    /// Roles bound directly to a user on this container
    ///
    /// Without `user_email` the caller's own identity is used.
    pub async fn list_roles(&self, client: &GcpClient, user_email: Option<&str>) -> Result<Vec<Role>> {
        let email = match user_email {
            Some(email) => email.to_string(),
            None => survey::get_email(client).await?,
        };
        iam::list_roles(client, self.resource_name(), &email).await
    }

    /// Billing accounts associated with this container
    pub async fn billing_accounts(
        &self,
        client: &GcpClient,
        open_only: bool,
    ) -> Result<Vec<BillingAccount>> {
        match self {
            Container::Organization(org) => org.billing_accounts(client, open_only).await,
            Container::NoOrg => list_billing_accounts(client, None, open_only).await,
            Container::Folder(folder) => Err(GcpError::Unsupported(format!(
                "billing accounts are owned by organizations, not folders ({})",
                folder.resource_name
            ))),
        }
    }

    /// Create a project under this container and optionally link billing
    ///
    /// Waits for the create operation, then for the project to become
    /// readable. If the project never shows up in search before the timeout,
    /// a minimally populated [`Project`] is returned; any other search error
    /// is returned as is. [`OperationOptions::for_project_create`] gives the
    /// usual timeouts.
    pub async fn create_project(
        &self,
        client: &GcpClient,
        project_id: &str,
        display_name: &str,
        billing: impl Into<BillingRef>,
        options: &OperationOptions,
    ) -> Result<Project> {
        let billing = billing.into();

        let mut body = json!({
            "projectId": project_id,
            "displayName": display_name,
        });
        if !self.is_no_org() {
            body["parent"] = json!(self.resource_name());
        }

        tracing::info!("Creating project {} under {}", project_id, self.resource_name());
        let operation = client.post(&client.crm_v3_url("projects"), Some(&body)).await?;
        wait_for_operation(client, operation, |name| client.crm_v3_url(name), options).await?;

        let project_url = client.crm_v3_url(&format!("projects/{}", project_id));
        poll_until_ok("project", options, || client.get(&project_url)).await?;

        if billing.is_linked() {
            Project::update_billing_account_for_id(client, project_id, &billing).await?;
        }

        let searched = poll_while(
            "project search",
            options,
            |e| matches!(e, GcpError::NotFound(_)),
            || Project::lookup(client, project_id),
        )
        .await;
        match searched {
            Ok(project) => Ok(project),
            Err(GcpError::Timeout(_)) => {
                tracing::warn!("Project {} not yet searchable, returning placeholder", project_id);
                Ok(Project::placeholder(project_id, display_name, self.clone()))
            },
            Err(e) => Err(e),
        }
    }

    /// Every project in this container and its subfolders, depth first
    pub async fn walk_projects(&self, client: &GcpClient, active_only: bool) -> Result<Vec<Project>> {
        walk(client, self.clone(), active_only).await
    }

    /// Render this container and everything below it as a text tree
    pub async fn tree(&self, client: &GcpClient) -> Result<String> {
        let mut out = format!(
            "{} {} ({})\n",
            self.marker(),
            self.display_name(),
            self.resource_name()
        );
        out.push_str(&render_children(client, self.clone(), String::new()).await?);
        Ok(out)
    }

    /// Navigate to a descendant folder by a slash-separated display-name path
    pub async fn cd(&self, client: &GcpClient, path: &str) -> Result<Folder> {
        if self.is_no_org() {
            return Err(GcpError::Unsupported(NO_ORG_CD.to_string()));
        }

        let clean = path.trim_matches('/');
        if clean.is_empty() {
            return Err(GcpError::InvalidArgument("Path cannot be empty".to_string()));
        }

        let mut current = self.clone();
        for component in clean.split('/') {
            let folders = current.folders(client).await?;
            let Some(found) = folders.iter().find(|f| f.display_name == component) else {
                let available = folders
                    .iter()
                    .map(|f| f.display_name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(GcpError::InvalidArgument(format!(
                    "Folder '{}' not found in {}. Available folders: {}",
                    component,
                    current.display_name(),
                    if available.is_empty() { "(none)" } else { &available }
                )));
            };
            current = Container::Folder(found.clone());
        }

        match current {
            Container::Folder(folder) => Ok(folder),
            _ => Err(GcpError::InvalidArgument(format!("'{}' is not a folder path", path))),
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Container::NoOrg => f.write_str(NO_ORG_RESOURCE_NAME),
            other => write!(f, "{} ({})", other.display_name(), other.resource_name()),
        }
    }
}

impl From<Organization> for Container {
    fn from(org: Organization) -> Self {
        Container::Organization(org)
    }
}

impl From<Folder> for Container {
    fn from(folder: Folder) -> Self {
        Container::Folder(folder)
    }
}

fn walk(client: &GcpClient, container: Container, active_only: bool) -> BoxFuture<'_, Result<Vec<Project>>> {
    async move {
        let mut found: Vec<Project> = container
            .projects(client)
            .await?
            .into_iter()
            .filter(|p| !active_only || p.is_active())
            .collect();

        for folder in container.folders(client).await? {
            found.extend(walk(client, Container::Folder(folder), active_only).await?);
        }
        Ok(found)
    }
    .boxed()
}

/// One line of the tree, e.g. `│   ├── 🎵 my-project (ACTIVE)`
pub(crate) fn tree_line(prefix: &str, is_last: bool, marker: &str, label: &str) -> String {
    let branch = if is_last { LAST_BRANCH } else { BRANCH };
    format!("{}{}{} {}\n", prefix, branch, marker, label)
}

fn render_children(client: &GcpClient, container: Container, prefix: String) -> BoxFuture<'_, Result<String>> {
    async move {
        let folders = container.folders(client).await?;
        let projects = container.projects(client).await?;
        let total = folders.len() + projects.len();

        let mut out = String::new();
        let mut index = 0;

        for folder in folders {
            index += 1;
            let is_last = index == total;
            out.push_str(&tree_line(
                &prefix,
                is_last,
                FOLDER_MARKER,
                &format!("{} ({})", folder.display_name, folder.resource_name),
            ));
            let child_prefix = format!("{}{}", prefix, if is_last { SPACE } else { PIPE });
            out.push_str(&render_children(client, Container::Folder(folder), child_prefix).await?);
        }

        for project in projects {
            index += 1;
            out.push_str(&tree_line(
                &prefix,
                index == total,
                PROJECT_MARKER,
                &format!("{} ({})", project.id, project.lifecycle_state),
            ));
        }

        Ok(out)
    }
    .boxed()
}
