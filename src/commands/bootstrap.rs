//! Bootstrap command implementation.
//!
//! Creates (or finds) the admin bot: a dedicated project, the `admin-robot`
//! service account inside it, the org-level and billing roles it needs, and
//! the local profile directory holding its key. Every step checks before it
//! acts, so bootstrap can be re-run safely; in dry-run mode only read-only
//! gcloud commands are executed.

use std::path::PathBuf;

use rand::Rng;

use super::profile::{download_service_account_key, save_config_file};
use super::prompt::{choose_billing_account, choose_config, choose_organization};
use super::{
    billing_account_has_role, find_bot_project, grant_billing_admin, step, AUTOMATION_FOLDER,
    BILLING_ADMIN_ROLE, BOT_PROJECT_PREFIX,
};
use crate::admin::{bot_email, BOT_SA_NAME};
use crate::config::{AdminConfig, ConfigStore, Mode};
use crate::error::{GcpError, Result};
use crate::gcp::iam;
use crate::gcp::pager::short_name;
use crate::shell::{get_current_account_email, is_permission_error, Gcloud};

/// APIs the bot project needs before the bot can do anything
const BOT_PROJECT_APIS: &[(&str, &str)] = &[
    ("serviceusage.googleapis.com", "Service Usage API"),
    ("cloudresourcemanager.googleapis.com", "Cloud Resource Manager API"),
    ("iam.googleapis.com", "IAM API"),
    ("cloudbilling.googleapis.com", "Cloud Billing API"),
];

/// Roles the bot receives on the organization
const ORG_ADMIN_ROLES: &[(&str, &str)] = &[
    ("roles/resourcemanager.organizationAdmin", "Organization Admin"),
    (BILLING_ADMIN_ROLE, "Billing Admin"),
];

/// Bootstrap inputs; anything left `None` is asked for interactively
#[derive(Debug, Clone, Default)]
pub struct BootstrapOptions {
    pub config: Option<String>,
    pub billing: Option<String>,
    pub org: Option<String>,
    pub dry_run: bool,
}

/// What bootstrap set up
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapReport {
    pub config: String,
    pub project_id: String,
    pub sa_email: String,
    pub mode: Mode,
    pub org_id: Option<String>,
    pub folder_id: Option<String>,
    pub billing_id: String,
    pub config_file: PathBuf,
    pub key_file: Option<PathBuf>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

/// Run the whole bootstrap sequence
pub fn bootstrap(gcloud: &dyn Gcloud, store: &ConfigStore, options: &BootstrapOptions) -> Result<BootstrapReport> {
    let config = match non_empty(&options.config) {
        Some(c) => c,
        None => choose_config(gcloud)?,
    };
    let org_id = match non_empty(&options.org) {
        Some(o) => Some(o),
        None => choose_organization(gcloud)?,
    };
    let billing_id = match non_empty(&options.billing) {
        Some(b) => b,
        None => choose_billing_account(gcloud)?,
    };
    let mode = if org_id.is_some() { Mode::Organization } else { Mode::Personal };
    let dry_run = options.dry_run;

    tracing::info!(
        "Bootstrapping config={} mode={} org={:?} billing={} dry_run={}",
        config,
        mode,
        org_id,
        billing_id,
        dry_run
    );
    println!(
        "GCP Bootstrap - Super Admin Service Account{}",
        if dry_run { " [DRY RUN]" } else { "" }
    );
    println!("  Config: {}", config);
    println!("  Mode: {}", mode);
    println!("  Organization: {}", org_id.as_deref().unwrap_or("None (personal account)"));
    println!("  Billing: {}", billing_id);

    let folder_id = match &org_id {
        Some(org) => get_or_create_automation_folder(gcloud, org, dry_run)?,
        None => {
            println!("No organization - skipping {} folder creation.", AUTOMATION_FOLDER);
            None
        },
    };

    let project_id = determine_bot_project_id(gcloud)?;
    let sa_email = bot_email(&project_id);
    let current_user = get_current_account_email(gcloud)?;

    create_project(gcloud, &project_id, org_id.as_deref(), folder_id.as_deref(), dry_run)?;
    add_project_owner(gcloud, &project_id, &current_user, dry_run)?;
    link_billing_account(gcloud, &project_id, &billing_id, dry_run)?;
    enable_required_apis(gcloud, &project_id, dry_run)?;
    create_service_account(gcloud, &project_id, dry_run)?;
    grant_iam_roles(gcloud, org_id.as_deref(), &sa_email, dry_run)?;
    grant_billing_account_access(gcloud, &billing_id, &sa_email, dry_run)?;

    step("Saving Configuration");
    let admin_config = AdminConfig {
        mode,
        admin_bot: sa_email.clone(),
        trusted_humans: vec![current_user],
    };
    let config_file = save_config_file(store, &config, &admin_config, dry_run)?;

    step("Step 5: Download Service Account Key");
    let key_file = download_service_account_key(gcloud, store, &config, &sa_email, &project_id, dry_run)?;

    let report = BootstrapReport {
        config,
        project_id,
        sa_email,
        mode,
        org_id,
        folder_id,
        billing_id,
        config_file,
        key_file,
    };
    print_summary(&report, dry_run);
    Ok(report)
}

fn print_summary(report: &BootstrapReport, dry_run: bool) {
    println!();
    println!("{}", if dry_run { "Dry Run Complete!" } else { "Bootstrap Successful!" });
    println!("  Project ID: {}", report.project_id);
    println!("  Service Account: {}", report.sa_email);
    println!("  Mode: {}", report.mode);
    println!("  Organization: {}", report.org_id.as_deref().unwrap_or("N/A (personal account)"));
    println!("  Folder: {}", report.folder_id.as_deref().unwrap_or("N/A"));
    println!("  Config File: {}", report.config_file.display());
    if let Some(key) = &report.key_file {
        if !dry_run {
            println!("  Key File: {}", key.display());
        }
    }
}

/// Folder id of the `Automation` folder, creating it when missing
///
/// `None` in dry-run mode when the folder does not exist yet, and whenever
/// the caller lacks folder permissions (the project then lands directly in
/// the organization).
pub fn get_or_create_automation_folder(gcloud: &dyn Gcloud, org_id: &str, dry_run: bool) -> Result<Option<String>> {
    println!("Checking for {} folder...", AUTOMATION_FOLDER);

    let org_flag = format!("--organization={}", org_id);
    let filter = format!("--filter=displayName:{}", AUTOMATION_FOLDER);
    let listed = gcloud.output(&[
        "resource-manager",
        "folders",
        "list",
        org_flag.as_str(),
        filter.as_str(),
        "--format=json",
    ]);

    match listed {
        Ok(Some(out)) if !out.is_empty() => {
            let folders: Vec<serde_json::Value> = serde_json::from_str(&out)?;
            if let Some(name) = folders.first().and_then(|f| f.get("name")).and_then(|n| n.as_str()) {
                let folder_id = short_name(name).to_string();
                println!("Found existing {} folder: {}", AUTOMATION_FOLDER, folder_id);
                return Ok(Some(folder_id));
            }
        },
        Ok(_) => {},
        Err(e) if is_permission_error(&e) => {
            println!("No permission to list folders. Skipping {} folder - will create project directly in org.", AUTOMATION_FOLDER);
            return Ok(None);
        },
        Err(e) => return Err(e),
    }

    if dry_run {
        println!("[DRY RUN] Would create {} folder", AUTOMATION_FOLDER);
        return Ok(None);
    }

    println!("Creating {} folder...", AUTOMATION_FOLDER);
    let display = format!("--display-name={}", AUTOMATION_FOLDER);
    let created = gcloud.output(&[
        "resource-manager",
        "folders",
        "create",
        display.as_str(),
        org_flag.as_str(),
        "--format=json",
    ]);

    match created {
        Ok(Some(out)) if !out.is_empty() => {
            let folder: serde_json::Value = serde_json::from_str(&out)?;
            let folder_id = folder
                .get("name")
                .and_then(|n| n.as_str())
                .map(|n| short_name(n).to_string())
                .filter(|id| !id.is_empty())
                .ok_or_else(|| GcpError::GCloud(format!("Failed to create {} folder", AUTOMATION_FOLDER)))?;
            println!("Created {} folder: {}", AUTOMATION_FOLDER, folder_id);
            Ok(Some(folder_id))
        },
        Ok(_) => Err(GcpError::GCloud(format!("Failed to create {} folder", AUTOMATION_FOLDER))),
        Err(e) if is_permission_error(&e) => {
            println!("No permission to create folders. Will create project directly in org.");
            Ok(None)
        },
        Err(e) => Err(e),
    }
}

/// A fresh `gcpadm-admin-xxxxxxxx` project id
pub fn generate_bot_project_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..4).map(|_| format!("{:02x}", rng.gen::<u8>())).collect();
    format!("{}-{}", BOT_PROJECT_PREFIX, suffix)
}

/// Reuse an existing bot project, or pick a new id
pub fn determine_bot_project_id(gcloud: &dyn Gcloud) -> Result<String> {
    step("Step 0: Determine Bot Project ID");
    println!("Searching for existing project with prefix '{}-*'", BOT_PROJECT_PREFIX);

    if let Some(existing) = find_bot_project(gcloud)? {
        println!("Found existing project: {}", existing);
        return Ok(existing);
    }

    println!("No existing project found. Generating new ID.");
    let project_id = generate_bot_project_id();
    println!("Generated project ID: {}", project_id);
    Ok(project_id)
}

pub fn project_exists(gcloud: &dyn Gcloud, project_id: &str) -> bool {
    gcloud.probe(&["projects", "describe", project_id, "--quiet"]).is_some()
}

pub fn create_project(
    gcloud: &dyn Gcloud,
    project_id: &str,
    org_id: Option<&str>,
    folder_id: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    step("Step 1: Project");

    if project_exists(gcloud, project_id) {
        println!("Project {} already exists. Skipping creation.", project_id);
        return Ok(());
    }

    let parent_flag = match (folder_id, org_id) {
        (Some(folder), _) => Some(format!("--folder={}", folder)),
        (None, Some(org)) => Some(format!("--organization={}", org)),
        (None, None) => None,
    };

    if dry_run {
        match (folder_id, org_id) {
            (Some(folder), _) => println!("[DRY RUN] Would create project: {} in folder {}", project_id, folder),
            (None, Some(org)) => println!("[DRY RUN] Would create project: {} in org {}", project_id, org),
            (None, None) => println!("[DRY RUN] Would create project: {} (no org)", project_id),
        }
        return Ok(());
    }

    println!("Creating project: {}...", project_id);
    let mut args = vec!["projects", "create", project_id, "--name=Admin Service Bots"];
    if let Some(flag) = &parent_flag {
        args.push(flag.as_str());
    }
    gcloud.exec(&args)?;

    println!("Project created.");
    Ok(())
}

/// Make `email` an owner of the project unless it already is
pub fn add_project_owner(gcloud: &dyn Gcloud, project_id: &str, email: &str, dry_run: bool) -> Result<()> {
    step("Step 1.5: Add Project Owner");

    if dry_run {
        println!("[DRY RUN] Would add {} as owner of {}", email, project_id);
        return Ok(());
    }

    println!("Checking if {} is already an owner...", email);
    let member = format!("user:{}", email);
    match gcloud.output(&["projects", "get-iam-policy", project_id, "--format=json"]) {
        Ok(Some(out)) if !out.is_empty() => {
            let policy: serde_json::Value = serde_json::from_str(&out)?;
            if iam::has_role(&policy, "roles/owner", &member) {
                println!("{} is already an owner of {}. Skipping.", email, project_id);
                return Ok(());
            }
        },
        Ok(_) => {},
        Err(e) => {
            tracing::warn!("Could not read IAM policy of {}: {}", project_id, e);
            println!("Could not check existing policy, will attempt to add owner role.");
        },
    }

    let member_flag = format!("--member={}", member);
    gcloud.output(&[
        "projects",
        "add-iam-policy-binding",
        project_id,
        member_flag.as_str(),
        "--role=roles/owner",
    ])?;

    println!("{} added as owner of {}.", email, project_id);
    Ok(())
}

pub fn link_billing_account(gcloud: &dyn Gcloud, project_id: &str, billing_id: &str, dry_run: bool) -> Result<()> {
    step("Step 2: Billing");

    if dry_run {
        println!("[DRY RUN] Would link project {} to billing account {}", project_id, billing_id);
        return Ok(());
    }

    let account_name = format!("billingAccounts/{}", billing_id);
    if project_exists(gcloud, project_id) {
        let current = gcloud.output(&[
            "billing",
            "projects",
            "describe",
            project_id,
            "--format=value(billingAccountName)",
        ])?;
        let enabled = gcloud.output(&[
            "billing",
            "projects",
            "describe",
            project_id,
            "--format=value(billingEnabled)",
        ])?;

        if current.as_deref() == Some(account_name.as_str()) && enabled.as_deref() == Some("True") {
            println!("Project {} is already linked to billing account {}.", project_id, billing_id);
            return Ok(());
        }
    }

    println!("Linking project {} to billing account {}...", project_id, billing_id);
    let billing_flag = format!("--billing-account={}", billing_id);
    gcloud.exec(&["billing", "projects", "link", project_id, billing_flag.as_str()])?;

    println!("Billing account linked.");
    Ok(())
}

pub fn api_is_enabled(gcloud: &dyn Gcloud, project_id: &str, api: &str) -> bool {
    let project = format!("--project={}", project_id);
    let filter = format!("--filter=config.name:{}", api);
    gcloud
        .probe(&[
            "services",
            "list",
            project.as_str(),
            filter.as_str(),
            "--format=value(config.name)",
        ])
        .as_deref()
        == Some(api)
}

pub fn enable_api(gcloud: &dyn Gcloud, project_id: &str, api: &str, display_name: &str, dry_run: bool) -> Result<()> {
    if api_is_enabled(gcloud, project_id, api) {
        println!("API {} is already enabled. Skipping.", display_name);
        return Ok(());
    }

    if dry_run {
        println!("[DRY RUN] Would enable API: {}", display_name);
        return Ok(());
    }

    println!("Enabling {}...", display_name);
    let project = format!("--project={}", project_id);
    gcloud.output(&["services", "enable", api, project.as_str()])?;
    println!("API {} enabled.", display_name);
    Ok(())
}

pub fn enable_required_apis(gcloud: &dyn Gcloud, project_id: &str, dry_run: bool) -> Result<()> {
    step("Step 2.5: Enable Required APIs");
    for (api, display_name) in BOT_PROJECT_APIS {
        enable_api(gcloud, project_id, api, display_name, dry_run)?;
    }
    Ok(())
}

pub fn service_account_exists(gcloud: &dyn Gcloud, sa_email: &str, project_id: &str) -> bool {
    let project = format!("--project={}", project_id);
    gcloud
        .probe(&["iam", "service-accounts", "describe", sa_email, project.as_str(), "--quiet"])
        .is_some()
}

/// Create the `admin-robot` service account, returning its email
pub fn create_service_account(gcloud: &dyn Gcloud, project_id: &str, dry_run: bool) -> Result<String> {
    step("Step 3: Service Account");
    let sa_email = bot_email(project_id);

    if service_account_exists(gcloud, &sa_email, project_id) {
        println!("Service account {} already exists. Skipping creation.", sa_email);
        return Ok(sa_email);
    }

    if dry_run {
        println!("[DRY RUN] Would create service account: {}", BOT_SA_NAME);
        return Ok(sa_email);
    }

    println!("Creating service account: {}...", BOT_SA_NAME);
    let project = format!("--project={}", project_id);
    gcloud.exec(&[
        "iam",
        "service-accounts",
        "create",
        BOT_SA_NAME,
        project.as_str(),
        "--display-name=Organization Admin Robot",
    ])?;

    println!("Service account created.");
    Ok(sa_email)
}

/// Grant the organization-level admin roles (organization mode only)
pub fn grant_iam_roles(gcloud: &dyn Gcloud, org_id: Option<&str>, sa_email: &str, dry_run: bool) -> Result<()> {
    step("Step 4: IAM Permissions (at Organization Level)");

    let Some(org_id) = org_id else {
        println!("No organization - skipping org-level IAM roles. Service account will have no special permissions.");
        return Ok(());
    };

    println!("WARNING: Granting Organization Administrator and Billing Admin roles.");

    if dry_run {
        for (_, role_name) in ORG_ADMIN_ROLES {
            println!("[DRY RUN] Would grant {} to {}", role_name, sa_email);
        }
        return Ok(());
    }

    let member = format!("--member=serviceAccount:{}", sa_email);
    for (role, role_name) in ORG_ADMIN_ROLES {
        println!("Granting {}...", role_name);
        let role_flag = format!("--role={}", role);
        gcloud.output(&[
            "organizations",
            "add-iam-policy-binding",
            org_id,
            member.as_str(),
            role_flag.as_str(),
            "--condition=None",
        ])?;
    }

    println!("All roles granted.");
    Ok(())
}

pub fn grant_billing_account_access(gcloud: &dyn Gcloud, billing_id: &str, sa_email: &str, dry_run: bool) -> Result<()> {
    step("Step 4.5: Grant Billing Account Access");

    if billing_account_has_role(gcloud, billing_id, sa_email, BILLING_ADMIN_ROLE) {
        println!("Service account already has billing admin access to {}. Skipping.", billing_id);
        return Ok(());
    }

    if dry_run {
        println!(
            "[DRY RUN] Would grant billing admin access for billing account {} to {}",
            billing_id, sa_email
        );
        return Ok(());
    }

    println!("Granting billing admin access for billing account {}...", billing_id);
    grant_billing_admin(gcloud, billing_id, sa_email)?;
    println!("Billing admin access granted for {}.", billing_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_bot_project_id() {
        let id = generate_bot_project_id();
        let suffix = id.strip_prefix("gcpadm-admin-").unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(crate::gcp::auth::validate_project_id(&id));
    }

    #[test]
    fn test_non_empty_option() {
        assert_eq!(non_empty(&Some(String::new())), None);
        assert_eq!(non_empty(&Some("x".into())), Some("x".to_string()));
        assert_eq!(non_empty(&None), None);
    }
}
