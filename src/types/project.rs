//! Projects
//!
//! Projects are read from both Cloud Resource Manager v1 (the only API that
//! lists organization-less projects) and v3, so [`Project::from_api`]
//! accepts either shape.

use super::billing_account::{BillingAccount, BillingRef, NO_BILLING_ACCOUNT};
use super::container::{Container, NO_ORG};
use super::role::Role;
use crate::error::{GcpError, Result};
use crate::gcp::client::GcpClient;
use crate::gcp::iam;
use crate::gcp::operations::{wait_for_operation, OperationOptions};
use crate::gcp::pager::{add_query_params, list_all, list_page, short_name};
use crate::survey;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

/// APIs a project needs before it can act as a quota project for admin work
pub const REQUIRED_APIS: &[&str] = &[
    "cloudresourcemanager.googleapis.com",
    "iam.googleapis.com",
    "serviceusage.googleapis.com",
    "cloudbilling.googleapis.com",
    "firestore.googleapis.com",
];

pub const ACTIVE: &str = "ACTIVE";

const MIN_PROJECT_ID_LEN: usize = 6;
const MAX_PROJECT_ID_LEN: usize = 30;
const MAX_RANDOM_DIGITS: usize = 10;

const SLUG_ADJECTIVES: &[&str] = &[
    "amber", "ancient", "bold", "brave", "bright", "calm", "clever", "cosmic", "crimson",
    "curious", "daring", "eager", "electric", "emerald", "fancy", "fearless", "gentle",
    "golden", "happy", "hidden", "humble", "jolly", "keen", "lively", "lucky", "mellow",
    "mighty", "misty", "noble", "olive", "patient", "polished", "quiet", "rapid", "rustic",
    "silent", "silver", "smooth", "sunny", "swift", "tidy", "vivid", "wandering", "witty",
];

const SLUG_NOUNS: &[&str] = &[
    "badger", "beacon", "bison", "canyon", "comet", "coral", "crane", "falcon", "fern",
    "fjord", "glacier", "harbor", "heron", "island", "jaguar", "lagoon", "lantern", "lynx",
    "maple", "meadow", "mesa", "nebula", "orchid", "otter", "panda", "pebble", "pelican",
    "pine", "prairie", "quartz", "raven", "reef", "river", "sparrow", "summit", "tundra",
    "walrus", "willow", "wombat", "zephyr",
];

/// Information about a GCP project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Project id (e.g. `my-project-123`)
    pub id: String,
    /// Display name
    pub name: String,
    pub project_number: String,
    /// `ACTIVE`, `DELETE_REQUESTED`, ...
    pub lifecycle_state: String,
    pub labels: BTreeMap<String, String>,
    pub create_time: Option<DateTime<Utc>>,
    pub parent: Container,
}

impl Project {
    /// Build a project from a CRM v1 or v3 project resource
    pub fn from_api(value: &Value, parent: Container) -> Self {
        let str_field = |key: &str| {
            value
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };

        // v3 uses `name` for `projects/{number}`; v1 uses it for the display name
        let raw_name = str_field("name");
        let (display_name, number_from_name) = match raw_name.strip_prefix("projects/") {
            Some(number) => (str_field("displayName"), number.to_string()),
            None => (raw_name.clone(), String::new()),
        };

        let project_number = match value.get("projectNumber") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => number_from_name,
        };

        let lifecycle_state = Some(str_field("state"))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| str_field("lifecycleState"));

        let labels = value
            .get("labels")
            .and_then(|l| l.as_object())
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        let create_time = value
            .get("createTime")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Self {
            id: str_field("projectId"),
            name: display_name,
            project_number,
            lifecycle_state,
            labels,
            create_time,
            parent,
        }
    }

    /// A project known only by id and display name
    pub fn placeholder(project_id: &str, display_name: &str, parent: Container) -> Self {
        Self {
            id: project_id.to_string(),
            name: display_name.to_string(),
            project_number: String::new(),
            lifecycle_state: String::new(),
            labels: BTreeMap::new(),
            create_time: None,
            parent,
        }
    }

    /// `projects/{id}`
    pub fn full_resource_name(&self) -> String {
        format!("projects/{}", self.id)
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle_state == ACTIVE
    }

    /// Service names of every enabled API
    pub async fn enabled_apis(&self, client: &GcpClient) -> Result<Vec<String>> {
        let url = add_query_params(
            &client.service_usage_url(&format!("projects/{}/services", self.id)),
            &[("filter", "state:ENABLED")],
        );
        let services = list_all(client, &url, "services").await?;

        Ok(services
            .iter()
            .filter_map(|s| s.get("config")?.get("name")?.as_str())
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect())
    }

    /// Enable APIs in one batch and wait for the operation
    pub async fn enable_apis(
        &self,
        client: &GcpClient,
        apis: &[String],
        options: &OperationOptions,
    ) -> Result<Value> {
        tracing::info!("Enabling {} APIs for project {}", apis.len(), self.id);
        if options.verbose {
            eprint!("Enabling {} APIs for project {}... ", apis.len(), self.id);
        }

        let url = client.service_usage_url(&format!("projects/{}/services:batchEnable", self.id));
        let body = json!({ "serviceIds": apis });
        let operation = client.post(&url, Some(&body)).await?;

        wait_for_operation(client, operation, |name| client.service_usage_url(name), options).await
    }

    /// The linked billing account, or `NO_BILLING_ACCOUNT`
    pub async fn billing_account(&self, client: &GcpClient) -> Result<BillingRef> {
        let info = client
            .get(&client.billing_url(&format!("projects/{}/billingInfo", self.id)))
            .await?;

        let enabled = info
            .get("billingEnabled")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let account_name = info
            .get("billingAccountName")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        if !enabled || account_name.is_empty() {
            return Ok(NO_BILLING_ACCOUNT);
        }

        let account = client.get(&client.billing_url(account_name)).await?;
        let mut account = BillingAccount::from(&account);
        if account.id.is_empty() {
            account = BillingAccount::from_id(short_name(account_name));
        }
        Ok(BillingRef::Account(account))
    }

    /// Enable whatever part of `required_apis` (default [`REQUIRED_APIS`]) is missing
    pub async fn bootstrap_quota_project(
        &self,
        client: &GcpClient,
        required_apis: Option<&[&str]>,
        options: &OperationOptions,
    ) -> Result<Value> {
        let current: BTreeSet<String> = self.enabled_apis(client).await?.into_iter().collect();
        let to_enable: Vec<String> = required_apis
            .unwrap_or(REQUIRED_APIS)
            .iter()
            .map(|s| s.to_string())
            .collect::<BTreeSet<_>>()
            .difference(&current)
            .cloned()
            .collect();

        if to_enable.is_empty() {
            return Ok(json!({
                "done": true,
                "result": "no-op",
                "enabled": current.into_iter().collect::<Vec<_>>(),
            }));
        }

        self.enable_apis(client, &to_enable, options).await
    }

    /// Link (or with `NO_BILLING_ACCOUNT`, unlink) billing for this project
    pub async fn update_billing_account(
        &self,
        client: &GcpClient,
        billing: impl Into<BillingRef>,
    ) -> Result<Value> {
        Self::update_billing_account_for_id(client, &self.id, &billing.into()).await
    }

    /// Link billing for a project known only by id
    pub async fn update_billing_account_for_id(
        client: &GcpClient,
        project_id: &str,
        billing: &BillingRef,
    ) -> Result<Value> {
        tracing::info!("Setting billing for {} to {}", project_id, billing);
        let url = client.billing_url(&format!("projects/{}/billingInfo", project_id));
        let body = json!({ "billingAccountName": billing.resource_name() });
        client.put(&url, &body).await
    }

    /// Find a project by id with CRM v3 search and resolve its parent
    pub async fn lookup(client: &GcpClient, project_id: &str) -> Result<Project> {
        let query = format!("id:{}", project_id);
        let url = add_query_params(&client.crm_v3_url("projects:search"), &[("query", query.as_str())]);
        let page = list_page(client, &url, "projects", None).await?;

        let resource = match page.items.as_slice() {
            [] => {
                return Err(GcpError::NotFound(format!(
                    "Project with ID '{}' not found.",
                    project_id
                )))
            },
            [one] => one,
            _ => {
                return Err(GcpError::InvalidArgument(format!(
                    "Found multiple projects with ID '{}'.",
                    project_id
                )))
            },
        };

        let parent_name = resource
            .get("parent")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let parent = Container::resolve(client, parent_name).await?;

        Ok(Project::from_api(resource, parent))
    }

    /// Suggest a valid project id: `{prefix}-{digits}`
    ///
    /// Without a prefix a random two-word slug is used. The result is always
    /// between 6 and 30 characters or an error is returned.
    pub fn suggest_name(prefix: Option<&str>, random_digits: usize) -> Result<String> {
        if random_digits > MAX_RANDOM_DIGITS {
            return Err(GcpError::InvalidArgument(format!(
                "random_digits must be between 0 and {}",
                MAX_RANDOM_DIGITS
            )));
        }

        let mut rng = rand::thread_rng();
        let prefix = match prefix {
            Some(p) => {
                if !p.chars().next().map(|c| c.is_ascii_lowercase()).unwrap_or(false) {
                    return Err(GcpError::InvalidArgument(
                        "prefix must start with a lowercase letter".to_string(),
                    ));
                }
                p.to_string()
            },
            None => {
                let adjective = SLUG_ADJECTIVES.choose(&mut rng).copied().unwrap_or("bold");
                let noun = SLUG_NOUNS.choose(&mut rng).copied().unwrap_or("otter");
                format!("{}-{}", adjective, noun)
            },
        };

        let name = if random_digits > 0 {
            let digits: String = (0..random_digits)
                .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
                .collect();
            format!("{}-{}", prefix, digits)
        } else {
            prefix
        };

        let len = name.chars().count();
        if !(MIN_PROJECT_ID_LEN..=MAX_PROJECT_ID_LEN).contains(&len) {
            return Err(GcpError::InvalidArgument(format!(
                "Generated name '{}' is {} characters, but GCP project IDs must be {}-{} characters long",
                name, len, MIN_PROJECT_ID_LEN, MAX_PROJECT_ID_LEN
            )));
        }
        Ok(name)
    }

    /// Roles bound directly to a user on this project
    pub async fn list_roles(&self, client: &GcpClient, user_email: Option<&str>) -> Result<Vec<Role>> {
        let email = match user_email {
            Some(email) => email.to_string(),
            None => survey::get_email(client).await?,
        };
        iam::list_roles(client, &self.full_resource_name(), &email).await
    }

    /// Add `user:{email}` to the `roles/owner` binding
    pub async fn add_user_as_owner(&self, client: &GcpClient, user_email: &str) -> Result<Value> {
        let member = iam::user_member(user_email)?;
        iam::grant_roles(
            client,
            &self.full_resource_name(),
            &member,
            &["roles/owner".to_string()],
        )
        .await
    }
}

/// List the direct child projects of a container
///
/// Organizations and folders use CRM v3. `NO_ORG` has to scan the v1 listing
/// for projects whose parent is neither an organization nor a folder.
pub(crate) async fn list_child_projects(client: &GcpClient, container: &Container) -> Result<Vec<Project>> {
    if container.is_no_org() {
        let items = list_all(client, &client.crm_v1_url("projects"), "projects").await?;
        return Ok(items
            .iter()
            .filter(|p| {
                let parent_type = p
                    .get("parent")
                    .and_then(|parent| parent.get("type"))
                    .and_then(|t| t.as_str())
                    .unwrap_or_default();
                parent_type != "organization" && parent_type != "folder"
            })
            .map(|p| Project::from_api(p, NO_ORG))
            .collect());
    }

    let url = add_query_params(
        &client.crm_v3_url("projects"),
        &[("parent", container.resource_name())],
    );
    let items = list_all(client, &url, "projects").await?;

    Ok(items
        .iter()
        .map(|p| Project::from_api(p, container.clone()))
        .collect())
}
