//! Writing a profile directory: `config.yaml` and the bot's key

use std::fs;
use std::path::PathBuf;

use crate::config::{validate_profile_name, AdminConfig, ConfigStore};
use crate::error::Result;
use crate::shell::Gcloud;

/// Save `config.yaml` for a profile (only describes it in dry-run mode)
pub fn save_config_file(
    store: &ConfigStore,
    profile: &str,
    config: &AdminConfig,
    dry_run: bool,
) -> Result<PathBuf> {
    let path = store.config_path(profile);

    if dry_run {
        println!("[DRY RUN] Would create config directory: {}", store.profile_dir(profile).display());
        println!("[DRY RUN] Would save config to: {}", path.display());
        println!(
            "[DRY RUN] Config data: mode={}, admin_bot={}, trusted_humans={:?}",
            config.mode, config.admin_bot, config.trusted_humans
        );
        return Ok(path);
    }

    let path = store.save_config(profile, config)?;
    println!("Saved configuration to: {}", path.display());
    Ok(path)
}

/// Create a key for the bot and store it as `admin.json`
///
/// An existing key file is left alone; `None` in dry-run mode.
pub fn download_service_account_key(
    gcloud: &dyn Gcloud,
    store: &ConfigStore,
    profile: &str,
    sa_email: &str,
    project_id: &str,
    dry_run: bool,
) -> Result<Option<PathBuf>> {
    validate_profile_name(profile)?;
    let key_path = store.key_path(profile);

    if dry_run {
        println!("[DRY RUN] Would download SA key to: {}", key_path.display());
        return Ok(None);
    }

    fs::create_dir_all(store.profile_dir(profile))?;

    if key_path.exists() {
        println!(
            "Key file already exists at {}. Delete it manually if you want to regenerate.",
            key_path.display()
        );
        return Ok(Some(key_path));
    }

    println!("Downloading service account key...");
    let key_arg = key_path.to_string_lossy().into_owned();
    let account = format!("--iam-account={}", sa_email);
    let project = format!("--project={}", project_id);
    gcloud.exec(&[
        "iam",
        "service-accounts",
        "keys",
        "create",
        key_arg.as_str(),
        account.as_str(),
        project.as_str(),
    ])?;

    tracing::info!("Service account key for {} written to {}", sa_email, key_path.display());
    println!("Service account key saved to: {}", key_path.display());
    println!("WARNING: Keep this key file secure! It grants admin access to your GCP organization.");
    Ok(Some(key_path))
}
