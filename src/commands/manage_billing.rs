//! Manage-billing command implementation.
//!
//! Shows which billing accounts the admin bot administers and grants
//! `roles/billing.admin` on the ones the user picks.

use super::prompt::{choose_config, multi_select};
use super::{
    billing_account_has_role, find_bot_project, grant_billing_admin, list_billing_accounts, step,
    BILLING_ADMIN_ROLE,
};
use crate::admin::bot_email;
use crate::config::ConfigStore;
use crate::error::{GcpError, Result};
use crate::shell::Gcloud;

/// A billing account and whether the bot already administers it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingAccess {
    pub id: String,
    pub display_name: String,
    pub open: bool,
    pub has_access: bool,
}

/// Admin bot email for a profile
///
/// Taken from the profile's `config.yaml` when there is one, otherwise
/// derived from the bot project found through gcloud.
pub fn get_admin_bot_email(gcloud: &dyn Gcloud, store: &ConfigStore, config: &str) -> Result<String> {
    println!("Looking up admin bot for config '{}'...", config);

    if let Some(saved) = store.load_config(config)? {
        println!("Found admin bot: {}", saved.admin_bot);
        return Ok(saved.admin_bot);
    }

    let project_id = find_bot_project(gcloud)?.ok_or_else(|| {
        GcpError::GCloud(format!(
            "No admin bot project found for config '{}'. Run 'gcpadm bootstrap' first.",
            config
        ))
    })?;
    let sa_email = bot_email(&project_id);
    println!("Found admin bot: {}", sa_email);
    Ok(sa_email)
}

/// Current access of `sa_email` to every visible billing account
pub fn billing_access_status(gcloud: &dyn Gcloud, sa_email: &str) -> Result<Vec<BillingAccess>> {
    Ok(list_billing_accounts(gcloud)?
        .into_iter()
        .map(|account| BillingAccess {
            has_access: billing_account_has_role(gcloud, account.id(), sa_email, BILLING_ADMIN_ROLE),
            id: account.id().to_string(),
            display_name: account.display_name,
            open: account.open,
        })
        .collect())
}

fn print_status_table(accounts: &[BillingAccess]) {
    let name_width = accounts
        .iter()
        .map(|a| a.display_name.len())
        .chain(["Billing Account".len()])
        .max()
        .unwrap_or(0);
    let id_width = accounts
        .iter()
        .map(|a| a.id.len())
        .chain(["Account ID".len()])
        .max()
        .unwrap_or(0);

    println!(
        "{:<nw$}  {:<iw$}  {:<6}  Admin Bot Access",
        "Billing Account",
        "Account ID",
        "Status",
        nw = name_width,
        iw = id_width
    );
    for a in accounts {
        println!(
            "{:<nw$}  {:<iw$}  {:<6}  {}",
            a.display_name,
            a.id,
            if a.open { "Open" } else { "Closed" },
            if a.has_access { "Yes" } else { "No" },
            nw = name_width,
            iw = id_width
        );
    }
}

/// Grant billing admin on each account, reporting failures without stopping
///
/// Returns the ids that were granted.
pub fn grant_access(gcloud: &dyn Gcloud, sa_email: &str, accounts: &[&BillingAccess]) -> Vec<String> {
    let mut granted = Vec::new();
    for account in accounts {
        println!("\nGranting access to {} ({})...", account.display_name, account.id);
        match grant_billing_admin(gcloud, &account.id, sa_email) {
            Ok(()) => {
                println!("✓ Access granted to {}", account.display_name);
                granted.push(account.id.clone());
            },
            Err(e) => {
                tracing::warn!("Granting billing admin on {} failed: {}", account.id, e);
                println!("✗ Failed to grant access to {}: {}", account.display_name, e);
            },
        }
    }
    granted
}

/// Interactive billing access management for the admin bot
pub fn manage_billing_access(gcloud: &dyn Gcloud, store: &ConfigStore, config: Option<&str>) -> Result<()> {
    let config = match config.filter(|c| !c.is_empty()) {
        Some(c) => c.to_string(),
        None => choose_config(gcloud)?,
    };

    println!("Manage Billing Account Access");
    println!("  Config: {}", config);

    let sa_email = get_admin_bot_email(gcloud, store, &config)?;

    println!("\nFetching billing accounts...");
    let accounts = billing_access_status(gcloud, &sa_email)?;
    if accounts.is_empty() {
        println!("No billing accounts found.");
        return Ok(());
    }

    println!("\nCurrent Billing Account Access:");
    print_status_table(&accounts);

    let without_access: Vec<&BillingAccess> = accounts.iter().filter(|a| !a.has_access).collect();
    if without_access.is_empty() {
        println!("\nAdmin bot already has access to all billing accounts!");
        return Ok(());
    }

    let labels: Vec<String> = without_access
        .iter()
        .map(|a| {
            let status = if a.open { "✓ Open" } else { "✗ Closed" };
            format!("{} ({}) - {}", a.display_name, a.id, status)
        })
        .collect();
    let picked = multi_select("Select billing accounts (space to select, enter to confirm)", &labels)?;
    if picked.is_empty() {
        println!("No accounts selected. Exiting.");
        return Ok(());
    }

    step("Granting Access");
    let selected: Vec<&BillingAccess> = picked.into_iter().map(|i| without_access[i]).collect();
    let granted = grant_access(gcloud, &sa_email, &selected);

    println!("\nAccess Management Complete!");
    println!("  Granted access to {} billing account(s)", granted.len());
    Ok(())
}
