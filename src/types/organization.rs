//! Organizations

use super::billing_account::{list_billing_accounts, BillingAccount};
use super::container::Container;
use super::folder::{create_folder_under, list_child_folders, Folder};
use super::project::{list_child_projects, Project};
use crate::error::{GcpError, Result};
use crate::gcp::client::GcpClient;
use crate::gcp::iam;
use crate::gcp::pager::short_name;
use serde_json::Value;

/// Roles that make a human a full administrator of an organization
pub const ORGANIZATION_OWNER_ROLES: &[&str] = &[
    "roles/billing.admin",
    "roles/billing.costsManager",
    "roles/billing.projectManager",
    "roles/iam.securityAdmin",
    "roles/orgpolicy.policyAdmin",
    "roles/resourcemanager.folderAdmin",
    "roles/resourcemanager.organizationAdmin",
    "roles/resourcemanager.projectCreator",
    "roles/resourcemanager.projectDeleter",
    "roles/resourcemanager.projectIamAdmin",
];

/// Information about a GCP organization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    /// Numeric organization id
    pub id: String,
    /// `organizations/{id}`
    pub resource_name: String,
    pub display_name: String,
}

impl Organization {
    pub fn new(id: &str, display_name: &str) -> Self {
        let id = id.strip_prefix("organizations/").unwrap_or(id);
        Self {
            id: id.to_string(),
            resource_name: format!("organizations/{}", id),
            display_name: display_name.to_string(),
        }
    }

    /// Fetch an organization by numeric id or `organizations/{id}`
    pub async fn lookup(client: &GcpClient, org_id: &str) -> Result<Self> {
        let id = org_id.strip_prefix("organizations/").unwrap_or(org_id);
        if id.is_empty() {
            return Err(GcpError::InvalidArgument(
                "organization id must not be empty".to_string(),
            ));
        }
        let value = client
            .get(&client.crm_v3_url(&format!("organizations/{}", id)))
            .await?;
        Ok(Self::from(&value))
    }

    pub async fn folders(&self, client: &GcpClient) -> Result<Vec<Folder>> {
        list_child_folders(client, &self.resource_name).await
    }

    pub async fn projects(&self, client: &GcpClient) -> Result<Vec<Project>> {
        list_child_projects(client, &Container::Organization(self.clone())).await
    }

    pub async fn create_folder(&self, client: &GcpClient, display_name: &str) -> Result<Folder> {
        create_folder_under(client, &self.resource_name, display_name).await
    }

    /// Billing accounts owned by this organization
    pub async fn billing_accounts(
        &self,
        client: &GcpClient,
        open_only: bool,
    ) -> Result<Vec<BillingAccount>> {
        list_billing_accounts(client, Some(&self.resource_name), open_only).await
    }

    /// Grant `user:{email}` each of `roles` at the organization level
    ///
    /// Bindings that already include the user are left as they are, and the
    /// policy is only written when at least one binding changed.
    pub async fn add_user_roles(
        &self,
        client: &GcpClient,
        user_email: &str,
        roles: &[&str],
    ) -> Result<Value> {
        let member = iam::user_member(user_email)?;
        if roles.is_empty() {
            return Err(GcpError::InvalidArgument(
                "roles must contain at least one role".to_string(),
            ));
        }

        let roles: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
        iam::grant_roles(client, &self.resource_name, &member, &roles).await
    }

    /// Grant the full set of [`ORGANIZATION_OWNER_ROLES`]
    pub async fn add_user_as_owner(&self, client: &GcpClient, user_email: &str) -> Result<Value> {
        self.add_user_roles(client, user_email, ORGANIZATION_OWNER_ROLES)
            .await
    }
}

impl From<&Value> for Organization {
    fn from(value: &Value) -> Self {
        let resource_name = value
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        Self::new(
            short_name(resource_name),
            value
                .get("displayName")
                .and_then(|v| v.as_str())
                .unwrap_or_default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_strips_prefix() {
        let org = Organization::new("organizations/123", "example.com");
        assert_eq!(org.id, "123");
        assert_eq!(org.resource_name, "organizations/123");
    }

    #[test]
    fn test_from_api() {
        let org = Organization::from(&json!({"name": "organizations/9", "displayName": "acme.io"}));
        assert_eq!(org, Organization::new("9", "acme.io"));
    }

    #[test]
    fn test_owner_roles() {
        assert_eq!(ORGANIZATION_OWNER_ROLES.len(), 10);
        assert!(ORGANIZATION_OWNER_ROLES.contains(&"roles/resourcemanager.organizationAdmin"));
    }
}
