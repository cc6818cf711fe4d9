//! Interactive choices for the CLI flows
//!
//! A list with a single entry is auto-selected without prompting, so the
//! flows stay scriptable on accounts with one configuration, one
//! organization, or one billing account.

use dialoguer::{theme::ColorfulTheme, MultiSelect, Select};

use super::{list_billing_accounts, list_organizations, GcloudBillingAccount};
use crate::error::{GcpError, Result};
use crate::shell::{list_configurations, Gcloud};

/// Pick one of `labels`, returning its index
fn select(prompt: &str, labels: &[String], default: usize) -> Result<usize> {
    Ok(Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default)
        .items(labels)
        .interact()?)
}

/// Pick any number of `labels`, returning their indices
pub fn multi_select(prompt: &str, labels: &[String]) -> Result<Vec<usize>> {
    Ok(MultiSelect::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(labels)
        .interact()?)
}

/// Choose a gcloud configuration, defaulting to the active one
pub fn choose_config(gcloud: &dyn Gcloud) -> Result<String> {
    let configs = list_configurations(gcloud)?;
    if configs.is_empty() {
        return Err(GcpError::GCloud(
            "No gcloud configurations found. Please create one first.".to_string(),
        ));
    }

    if let [only] = configs.as_slice() {
        println!(
            "Using only available config: {} ({})",
            only.name,
            only.account().unwrap_or("no account")
        );
        return Ok(only.name.clone());
    }

    let labels: Vec<String> = configs
        .iter()
        .map(|c| {
            let active = if c.is_active { " [ACTIVE]" } else { "" };
            format!("{} ({}){}", c.name, c.account().unwrap_or("no account"), active)
        })
        .collect();
    let default = configs.iter().position(|c| c.is_active).unwrap_or(0);

    let index = select("Select gcloud configuration", &labels, default)?;
    Ok(configs[index].name.clone())
}

/// Choose an organization id; `None` means personal-account mode
pub fn choose_organization(gcloud: &dyn Gcloud) -> Result<Option<String>> {
    let orgs = list_organizations(gcloud)?;
    if orgs.is_empty() {
        println!("No organizations found. Continuing without organization (personal account mode).");
        return Ok(None);
    }

    if let [only] = orgs.as_slice() {
        println!("Using only available organization: {} ({})", only.display_name, only.id());
        return Ok(Some(only.id().to_string()));
    }

    let labels: Vec<String> = orgs
        .iter()
        .map(|o| format!("{} ({})", o.display_name, o.id()))
        .collect();
    let index = select("Select organization", &labels, 0)?;
    Ok(Some(orgs[index].id().to_string()))
}

/// Choose one of the open billing accounts
pub fn choose_billing_account(gcloud: &dyn Gcloud) -> Result<String> {
    let accounts: Vec<GcloudBillingAccount> =
        list_billing_accounts(gcloud)?.into_iter().filter(|a| a.open).collect();

    match accounts.as_slice() {
        [] => Err(GcpError::GCloud(
            "No open billing accounts found. You need at least one open billing account.".to_string(),
        )),
        [only] => {
            println!("Using only available billing account: {} ({})", only.display_name, only.id());
            Ok(only.id().to_string())
        },
        several => {
            let labels: Vec<String> = several
                .iter()
                .map(|a| format!("{} ({})", a.display_name, a.id()))
                .collect();
            let index = select("Select billing account", &labels, 0)?;
            Ok(several[index].id().to_string())
        },
    }
}
