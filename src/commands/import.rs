//! Import command implementation.
//!
//! Sets up an additional machine with access to an admin bot that was
//! bootstrapped elsewhere: finds the bot project and service account, then
//! writes the local profile (config and a freshly created key).

use std::path::PathBuf;

use super::profile::{download_service_account_key, save_config_file};
use super::prompt::choose_config;
use super::{find_bot_project, step, BOT_PROJECT_PREFIX};
use crate::admin::BOT_SA_NAME;
use crate::config::{AdminConfig, ConfigStore, Mode};
use crate::error::{GcpError, Result};
use crate::shell::{get_current_account_email, Gcloud};

#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    pub config: String,
    pub project_id: String,
    pub sa_email: String,
    pub config_file: PathBuf,
    pub key_file: Option<PathBuf>,
}

/// Email of the `admin-robot` service account in the bot project
pub fn get_service_account_email(gcloud: &dyn Gcloud, project_id: &str) -> Result<String> {
    println!("Looking for service account in project {}...", project_id);

    let project = format!("--project={}", project_id);
    let filter = format!("--filter=email:{}@*", BOT_SA_NAME);
    let found = gcloud.output(&[
        "iam",
        "service-accounts",
        "list",
        project.as_str(),
        filter.as_str(),
        "--format=value(email)",
    ])?;

    let sa_email = found
        .as_deref()
        .and_then(|out| out.lines().next())
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| {
            GcpError::GCloud(format!(
                "No service account with name '{}' found in project {}",
                BOT_SA_NAME, project_id
            ))
        })?
        .to_string();

    println!("Found service account: {}", sa_email);
    Ok(sa_email)
}

/// Import an existing bootstrap into the local profile store
pub fn import_config(gcloud: &dyn Gcloud, store: &ConfigStore, config: Option<&str>) -> Result<ImportReport> {
    let config = match config.filter(|c| !c.is_empty()) {
        Some(c) => c.to_string(),
        None => choose_config(gcloud)?,
    };

    println!("Import Bootstrap Configuration");
    println!("  Config: {}", config);

    println!("Searching for bot project with prefix '{}-*'", BOT_PROJECT_PREFIX);
    let project_id = find_bot_project(gcloud)?.ok_or_else(|| {
        GcpError::GCloud(format!(
            "No bot project found with prefix '{}-*'. You need to run 'bootstrap' first on another machine.",
            BOT_PROJECT_PREFIX
        ))
    })?;
    println!("Found bot project: {}", project_id);

    let sa_email = get_service_account_email(gcloud, &project_id)?;
    let current_user = get_current_account_email(gcloud)?;

    step("Saving Configuration");
    // The mode is not recorded remotely; the bot project's parent is the best hint.
    let mode = if project_has_organization(gcloud, &project_id) {
        Mode::Organization
    } else {
        Mode::Personal
    };
    let admin_config = AdminConfig {
        mode,
        admin_bot: sa_email.clone(),
        trusted_humans: vec![current_user],
    };
    let config_file = save_config_file(store, &config, &admin_config, false)?;
    let key_file = download_service_account_key(gcloud, store, &config, &sa_email, &project_id, false)?;

    println!();
    println!("Import Successful!");
    println!("  Project ID: {}", project_id);
    println!("  Service Account: {}", sa_email);
    println!("  Config File: {}", config_file.display());
    if let Some(key) = &key_file {
        println!("  Key File: {}", key.display());
    }

    Ok(ImportReport {
        config,
        project_id,
        sa_email,
        config_file,
        key_file,
    })
}

/// Whether the project sits under an organization (directly or via folders)
fn project_has_organization(gcloud: &dyn Gcloud, project_id: &str) -> bool {
    gcloud
        .probe(&["projects", "describe", project_id, "--format=value(parent.type)"])
        .map(|parent_type| parent_type == "organization" || parent_type == "folder")
        .unwrap_or(false)
}
