//! Command implementations for gcpadm.

pub mod bootstrap;
pub mod import;
pub mod inspect;
pub mod manage_billing;
pub mod profile;
pub mod prompt;

pub use bootstrap::{bootstrap, BootstrapOptions, BootstrapReport};
pub use import::{import_config, ImportReport};
pub use inspect::{print_api_lookup, print_tree};
pub use manage_billing::manage_billing_access;

use serde::Deserialize;

use crate::error::Result;
use crate::gcp::iam;
use crate::gcp::pager::short_name;
use crate::shell::{run_json, Gcloud};

/// Bot projects are named `<prefix>-<8 hex digits>`
pub const BOT_PROJECT_PREFIX: &str = "gcpadm-admin";

/// Folder holding the bot project in organization mode
pub const AUTOMATION_FOLDER: &str = "Automation";

pub const BILLING_ADMIN_ROLE: &str = "roles/billing.admin";

/// Print a step banner
pub(crate) fn step(title: &str) {
    println!("\n--- {} ---", title);
}

/// An organization as reported by `gcloud organizations list`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcloudOrganization {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
}

impl GcloudOrganization {
    pub fn id(&self) -> &str {
        short_name(&self.name)
    }
}

/// A billing account as reported by `gcloud billing accounts list`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcloudBillingAccount {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub open: bool,
}

impl GcloudBillingAccount {
    pub fn id(&self) -> &str {
        short_name(&self.name)
    }
}

pub fn list_organizations(gcloud: &dyn Gcloud) -> Result<Vec<GcloudOrganization>> {
    run_json(gcloud, &["organizations", "list", "--format=json"])
}

/// Every billing account the gcloud account can see, open or not
pub fn list_billing_accounts(gcloud: &dyn Gcloud) -> Result<Vec<GcloudBillingAccount>> {
    run_json(gcloud, &["billing", "accounts", "list", "--format=json"])
}

/// Project id of an existing bot project, if any
pub fn find_bot_project(gcloud: &dyn Gcloud) -> Result<Option<String>> {
    let filter = format!("--filter=projectId ~ ^{}-.*", BOT_PROJECT_PREFIX);
    let found = gcloud.output(&[
        "projects",
        "list",
        filter.as_str(),
        "--limit=1",
        "--format=value(projectId)",
    ])?;
    Ok(found.filter(|id| !id.is_empty()))
}

/// Whether a service account holds `role` on a billing account
///
/// A policy that cannot be read counts as "no".
pub fn billing_account_has_role(gcloud: &dyn Gcloud, billing_id: &str, sa_email: &str, role: &str) -> bool {
    let policy = match gcloud.output(&["billing", "accounts", "get-iam-policy", billing_id, "--format=json"]) {
        Ok(Some(out)) if !out.is_empty() => out,
        Ok(_) => return false,
        Err(e) => {
            tracing::debug!("Could not read IAM policy of billing account {}: {}", billing_id, e);
            return false;
        },
    };

    match serde_json::from_str::<serde_json::Value>(&policy) {
        Ok(policy) => iam::has_role(&policy, role, &format!("serviceAccount:{}", sa_email)),
        Err(e) => {
            tracing::warn!("Unparsable IAM policy for billing account {}: {}", billing_id, e);
            false
        },
    }
}

/// Grant `roles/billing.admin` on a billing account to a service account
pub fn grant_billing_admin(gcloud: &dyn Gcloud, billing_id: &str, sa_email: &str) -> Result<()> {
    let member = format!("--member=serviceAccount:{}", sa_email);
    let role = format!("--role={}", BILLING_ADMIN_ROLE);
    gcloud
        .output(&[
            "billing",
            "accounts",
            "add-iam-policy-binding",
            billing_id,
            member.as_str(),
            role.as_str(),
        ])
        .map(|_| ())
}
