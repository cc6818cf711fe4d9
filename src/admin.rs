//! Admin bot credentials
//!
//! After `gcpadm bootstrap` (or `gcpadm import`) a profile directory holds the
//! admin bot's service account key and a small YAML config. This module loads
//! and cross-checks the two, and offers the operations the bot is meant for:
//! billing discovery and fully provisioned project creation.

use crate::config::{AdminConfig, ConfigStore, Mode};
use crate::error::{GcpError, Result};
use crate::gcp::auth::GcpCredentials;
use crate::gcp::client::{Endpoints, GcpClient};
use crate::gcp::iam;
use crate::gcp::operations::{wait_for_operation, OperationOptions};
use crate::types::{list_billing_accounts, BillingAccount, Container, Project};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fs;

/// Account id of the admin bot inside its project
pub const BOT_SA_NAME: &str = "admin-robot";

/// Label put on every project the admin bot creates or adopts
pub const MANAGED_BY_LABEL: (&str, &str) = ("managed-by", "gcpadm");

/// APIs enabled on new projects when the caller does not pick any
pub const DEFAULT_PROJECT_APIS: &[&str] = &[
    "firestore.googleapis.com",
    "aiplatform.googleapis.com",
    "container.googleapis.com",
    "storage-api.googleapis.com",
    "storage-component.googleapis.com",
    "bigtable.googleapis.com",
    "bigtableadmin.googleapis.com",
];

/// Email of the admin bot service account in a project
pub fn bot_email(project_id: &str) -> String {
    format!("{}@{}.iam.gserviceaccount.com", BOT_SA_NAME, project_id)
}

/// The fields of a service account key file that gcpadm relies on
#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountKey {
    #[serde(rename = "type")]
    key_type: String,
    #[serde(default)]
    project_id: Option<String>,
    client_email: String,
    #[allow(dead_code)]
    private_key: String,
}

/// Loaded and validated admin bot identity for one profile
#[derive(Clone)]
pub struct AdminCredentials {
    profile: String,
    config: AdminConfig,
    key: ServiceAccountKey,
    key_json: String,
    endpoints: Endpoints,
    client: Option<GcpClient>,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("profile", &self.profile)
            .field("config", &self.config)
            .field("client_email", &self.key.client_email)
            .finish_non_exhaustive()
    }
}

fn remediation(profile: &str) -> String {
    format!(
        "  1. If you haven't bootstrapped yet, run:\n     gcpadm bootstrap --config {profile}\n\n\
         \x20 2. If the admin bot already exists (bootstrapped on another machine), run:\n     gcpadm import --config {profile}\n"
    )
}

/// Load the admin bot credentials of `profile` from `store`
///
/// Every failure is a [`GcpError::AdminCredentials`] whose message explains
/// how to repair the profile.
pub fn load_admin_credentials(store: &ConfigStore, profile: &str) -> Result<AdminCredentials> {
    let dir = store.profile_dir(profile);
    let config_path = store.config_path(profile);
    let key_path = store.key_path(profile);

    if !dir.is_dir() {
        return Err(GcpError::AdminCredentials(format!(
            "Configuration directory not found: {}\n\nTo set up admin credentials for config '{}':\n\n{}",
            dir.display(),
            profile,
            remediation(profile)
        )));
    }

    if !config_path.is_file() {
        return Err(GcpError::AdminCredentials(format!(
            "Configuration file not found: {}\n\n\
             The directory exists but config.yaml is missing. This suggests an incomplete setup.\n\n{}",
            config_path.display(),
            remediation(profile)
        )));
    }

    if !key_path.is_file() {
        return Err(GcpError::AdminCredentials(format!(
            "Service account key not found: {}\n\n\
             The config.yaml exists but admin.json is missing. To download the key, run:\n     \
             gcpadm import --config {}\n\n\
             or create one manually:\n     \
             gcloud iam service-accounts keys create {} --iam-account=<admin-bot-email> --project=<project-id>\n",
            key_path.display(),
            profile,
            key_path.display()
        )));
    }

    let config = read_admin_config(store, profile)?;

    let key_json = fs::read_to_string(&key_path).map_err(|e| {
        GcpError::AdminCredentials(format!(
            "Failed to read service account key file: {}\nError: {}",
            key_path.display(),
            e
        ))
    })?;

    let key: ServiceAccountKey = serde_json::from_str(&key_json).map_err(|e| {
        GcpError::AdminCredentials(format!(
            "Failed to load service account credentials from {}\nError: {}\n\
             The key file may be invalid or corrupted. Consider re-running:\n  gcpadm import --config {}",
            key_path.display(),
            e,
            profile
        ))
    })?;

    if key.key_type != "service_account" {
        return Err(GcpError::AdminCredentials(format!(
            "{} is not a service account key (type: '{}').\nConsider re-running:\n  gcpadm import --config {}",
            key_path.display(),
            key.key_type,
            profile
        )));
    }

    if key.client_email != config.admin_bot {
        return Err(GcpError::AdminCredentials(format!(
            "Credential mismatch detected!\n  config.yaml admin_bot: {}\n  admin.json account:    {}\n\n\
             The service account in admin.json doesn't match the one in config.yaml.\n\
             This suggests the files are out of sync. Consider re-running:\n  gcpadm import --config {}",
            config.admin_bot, key.client_email, profile
        )));
    }

    tracing::info!("Loaded admin credentials for profile '{}' ({})", profile, key.client_email);

    Ok(AdminCredentials {
        profile: profile.to_string(),
        config,
        key,
        key_json,
        endpoints: Endpoints::default(),
        client: None,
    })
}

fn read_admin_config(store: &ConfigStore, profile: &str) -> Result<AdminConfig> {
    let path = store.config_path(profile);

    let content = fs::read_to_string(&path).map_err(|e| {
        GcpError::AdminCredentials(format!("Failed to read config.yaml: {}\nError: {}", path.display(), e))
    })?;

    let value: serde_yaml::Value = serde_yaml::from_str(&content).map_err(|e| {
        GcpError::AdminCredentials(format!(
            "Failed to parse config.yaml: {}\nError: {}\n\
             The file may be corrupted. Consider re-running:\n  gcpadm import --config {}",
            path.display(),
            e,
            profile
        ))
    })?;

    let Some(mapping) = value.as_mapping() else {
        return Err(GcpError::AdminCredentials(format!(
            "Invalid config.yaml format in {}\n\
             Expected a YAML mapping with 'admin_bot' and 'trusted_humans' keys.",
            path.display()
        )));
    };

    if !mapping.contains_key("admin_bot") {
        return Err(GcpError::AdminCredentials(format!(
            "Missing 'admin_bot' key in {}\nThe config.yaml file should contain the admin bot email address.",
            path.display()
        )));
    }

    serde_yaml::from_value(value).map_err(|e| {
        GcpError::AdminCredentials(format!(
            "Failed to parse config.yaml: {}\nError: {}\n\
             The file may be corrupted. Consider re-running:\n  gcpadm import --config {}",
            path.display(),
            e,
            profile
        ))
    })
}

/// Profiles that have both `config.yaml` and `admin.json`
pub fn list_available_configs(store: &ConfigStore) -> Result<Vec<String>> {
    store.list_profiles()
}

impl AdminCredentials {
    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn admin_bot_email(&self) -> &str {
        &self.config.admin_bot
    }

    pub fn trusted_humans(&self) -> &[String] {
        &self.config.trusted_humans
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    /// Project the key was issued in
    pub fn project_id(&self) -> Option<&str> {
        self.key.project_id.as_deref()
    }

    /// Send API calls to other base URLs
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Use a prebuilt client instead of one minted from the key
    pub fn with_client(mut self, client: GcpClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Client authenticated as the admin bot
    pub fn client(&self) -> Result<GcpClient> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }
        let credentials =
            GcpCredentials::from_service_account_json(&self.key_json, &self.key.client_email)?;
        GcpClient::with_credentials(credentials, self.endpoints.clone())
    }

    /// Every billing account the admin bot can see, open or closed
    pub async fn list_billing_accounts(&self) -> Result<Vec<BillingAccount>> {
        list_billing_accounts(&self.client()?, None, false).await
    }

    /// The only open billing account, or an error explaining why there is no default
    pub async fn get_default_billing_account(&self) -> Result<BillingAccount> {
        let mut open: Vec<BillingAccount> = self
            .list_billing_accounts()
            .await?
            .into_iter()
            .filter(|a| a.is_open())
            .collect();

        match open.len() {
            0 => Err(GcpError::AdminCredentials(format!(
                "No open billing accounts found.\n\n\
                 The admin bot needs access to at least one open billing account.\n\
                 To grant access, run:\n  gcpadm manage-billing --config {}",
                self.profile
            ))),
            1 => Ok(open.remove(0)),
            n => {
                let list = open
                    .iter()
                    .map(|a| format!("  - {} ({})", a.display_name, a.id))
                    .collect::<Vec<_>>()
                    .join("\n");
                Err(GcpError::AdminCredentials(format!(
                    "Multiple open billing accounts found ({}):\n\n{}\n\n\
                     Cannot determine default billing account.\n\
                     Please specify which billing account to use explicitly.",
                    n, list
                )))
            },
        }
    }

    /// Create a project with billing, an admin bot, owners, and APIs
    ///
    /// Every step is skipped when already satisfied, so the call can be
    /// repeated safely. `display_name` defaults to the project id, billing to
    /// [`Self::get_default_billing_account`], and APIs to
    /// [`DEFAULT_PROJECT_APIS`]. API enablement is best effort.
    pub async fn create_project(
        &self,
        project_id: &str,
        display_name: Option<&str>,
        billing_account_id: Option<&str>,
        enable_apis: Option<&[String]>,
    ) -> Result<Project> {
        let client = self.client()?;
        let display_name = display_name.unwrap_or(project_id);

        let billing_account_id = match billing_account_id {
            Some(id) => id.to_string(),
            None => self.get_default_billing_account().await?.id,
        };

        let apis: Vec<String> = match enable_apis {
            Some(apis) => apis.to_vec(),
            None => DEFAULT_PROJECT_APIS.iter().map(|s| s.to_string()).collect(),
        };

        let project = create_or_get_project(&client, project_id, display_name).await?;
        link_project_billing(&client, project_id, &billing_account_id).await?;
        let sa_email = create_project_service_account(&client, project_id).await?;
        self.grant_project_owners(&client, project_id, &sa_email).await?;
        enable_project_apis(&client, project_id, &apis).await;

        Ok(project)
    }

    async fn grant_project_owners(&self, client: &GcpClient, project_id: &str, sa_email: &str) -> Result<()> {
        let resource = format!("projects/{}", project_id);

        let mut members = vec![format!("serviceAccount:{}", sa_email)];
        members.extend(self.trusted_humans().iter().map(|h| format!("user:{}", h)));

        let mut policy = iam::get_iam_policy(client, &resource).await.map_err(|e| {
            GcpError::AdminCredentials(format!("Failed to get IAM policy for project {}: {}", project_id, e))
        })?;

        if !iam::merge_binding(&mut policy, "roles/owner", &members) {
            tracing::debug!("Owners of {} already in place", project_id);
            return Ok(());
        }

        iam::set_iam_policy(client, &resource, &policy)
            .await
            .map_err(|e| {
                GcpError::AdminCredentials(format!("Failed to set IAM policy for project {}: {}", project_id, e))
            })?;
        Ok(())
    }
}

fn label_map(project: &Value) -> serde_json::Map<String, Value> {
    project
        .get("labels")
        .and_then(|l| l.as_object())
        .cloned()
        .unwrap_or_default()
}

fn project_from_api(value: &Value) -> Project {
    let parent = value
        .get("parent")
        .and_then(|p| p.as_str())
        .map(Container::from_resource_name)
        .unwrap_or(crate::types::NO_ORG);
    Project::from_api(value, parent)
}

async fn create_or_get_project(client: &GcpClient, project_id: &str, display_name: &str) -> Result<Project> {
    let options = OperationOptions::default();
    let project_url = client.crm_v3_url(&format!("projects/{}", project_id));

    match client.get(&project_url).await {
        Ok(existing) => {
            let state = existing.get("state").and_then(|s| s.as_str()).unwrap_or_default();
            if state != "ACTIVE" {
                return Err(GcpError::AdminCredentials(format!(
                    "Project {} exists but is not ACTIVE (state: {})",
                    project_id, state
                )));
            }

            let mut labels = label_map(&existing);
            if labels.contains_key(MANAGED_BY_LABEL.0) {
                return Ok(project_from_api(&existing));
            }

            tracing::info!("Adopting existing project {}", project_id);
            labels.insert(MANAGED_BY_LABEL.0.to_string(), json!(MANAGED_BY_LABEL.1));
            let url = format!("{}?updateMask=labels", project_url);
            let operation = client.patch(&url, &json!({ "labels": labels })).await?;
            wait_for_operation(client, operation, |name| client.crm_v3_url(name), &options).await?;

            let mut updated = existing;
            updated["labels"] = Value::Object(labels);
            return Ok(project_from_api(&updated));
        },
        // Google answers 403 rather than 404 for projects the caller cannot see
        Err(e) if e.is_absent() => {}
        Err(e) => return Err(e),
    }

    tracing::info!("Creating project {}", project_id);
    let mut labels = serde_json::Map::new();
    labels.insert(MANAGED_BY_LABEL.0.to_string(), json!(MANAGED_BY_LABEL.1));
    let body = json!({
        "projectId": project_id,
        "displayName": display_name,
        "labels": labels,
    });

    let created = async {
        let operation = client.post(&client.crm_v3_url("projects"), Some(&body)).await?;
        wait_for_operation(client, operation, |name| client.crm_v3_url(name), &options).await
    }
    .await
    .map_err(|e| GcpError::AdminCredentials(format!("Failed to create project {}: {}", project_id, e)))?;

    let resource = created
        .get("response")
        .cloned()
        .unwrap_or_else(|| body.clone());
    let mut project = project_from_api(&resource);
    if project.id.is_empty() {
        project = Project::placeholder(project_id, display_name, crate::types::NO_ORG);
    }
    Ok(project)
}

async fn link_project_billing(client: &GcpClient, project_id: &str, billing_account_id: &str) -> Result<()> {
    let url = client.billing_url(&format!("projects/{}/billingInfo", project_id));
    let wanted = format!("billingAccounts/{}", billing_account_id);

    match client.get(&url).await {
        Ok(info) => {
            let current = info.get("billingAccountName").and_then(|v| v.as_str());
            let enabled = info.get("billingEnabled").and_then(|v| v.as_bool()).unwrap_or(false);
            if current == Some(wanted.as_str()) && enabled {
                tracing::debug!("Billing for {} already linked to {}", project_id, wanted);
                return Ok(());
            }
        },
        Err(e) => tracing::debug!("Could not read billing info for {}: {}", project_id, e),
    }

    client
        .put(&url, &json!({ "billingAccountName": wanted }))
        .await
        .map_err(|e| {
            GcpError::AdminCredentials(format!(
                "Failed to link billing account to project {}: {}",
                project_id, e
            ))
        })?;
    Ok(())
}

async fn create_project_service_account(client: &GcpClient, project_id: &str) -> Result<String> {
    let email = bot_email(project_id);
    let url = client.iam_url(&format!("projects/{}/serviceAccounts/{}", project_id, email));

    match client.get(&url).await {
        Ok(_) => return Ok(email),
        Err(e) if e.is_not_found() => {}
        Err(e) => {
            return Err(GcpError::AdminCredentials(format!(
                "Failed to look up service account in project {}: {}",
                project_id, e
            )))
        },
    }

    let body = json!({
        "accountId": BOT_SA_NAME,
        "serviceAccount": { "displayName": "Admin Robot" },
    });
    client
        .post(&client.iam_url(&format!("projects/{}/serviceAccounts", project_id)), Some(&body))
        .await
        .map_err(|e| {
            GcpError::AdminCredentials(format!(
                "Failed to create service account in project {}: {}",
                project_id, e
            ))
        })?;

    Ok(email)
}

async fn enable_project_apis(client: &GcpClient, project_id: &str, apis: &[String]) {
    let options = OperationOptions::default();

    for api in apis {
        let service = format!("projects/{}/services/{}", project_id, api);

        match client.get(&client.service_usage_url(&service)).await {
            Ok(info) if info.get("state").and_then(|s| s.as_str()) == Some("ENABLED") => continue,
            Ok(_) => {}
            Err(e) if e.is_absent() => {}
            Err(e) => {
                tracing::warn!("Skipping {}: {}", api, e);
                continue;
            },
        }

        let result = async {
            let operation = client
                .post(&client.service_usage_url(&format!("{}:enable", service)), None)
                .await?;
            wait_for_operation(client, operation, |name| client.service_usage_url(name), &options).await
        }
        .await;

        if let Err(e) = result {
            tracing::warn!("Failed to enable {} on {}: {}", api, project_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bot_email() {
        assert_eq!(
            bot_email("gcpadm-admin-1a2b3c4d"),
            "admin-robot@gcpadm-admin-1a2b3c4d.iam.gserviceaccount.com"
        );
    }

    #[test]
    fn test_remediation_names_both_commands() {
        let text = remediation("work");
        assert!(text.contains("gcpadm bootstrap --config work"));
        assert!(text.contains("gcpadm import --config work"));
    }

    #[test]
    fn test_project_from_api_uses_parent() {
        let p = project_from_api(&json!({
            "projectId": "x-123456",
            "name": "projects/99",
            "parent": "folders/5",
            "state": "ACTIVE"
        }));
        assert_eq!(p.parent.resource_name(), "folders/5");
        assert_eq!(p.project_number, "99");
    }
}
