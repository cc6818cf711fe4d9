//! Billing accounts and the `NO_BILLING_ACCOUNT` sentinel

use crate::error::Result;
use crate::gcp::client::GcpClient;
use crate::gcp::pager::{add_query_params, list_all, short_name};
use serde_json::Value;
use std::fmt;

/// Whether a billing account can be charged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingStatus {
    Open,
    Closed,
}

impl BillingStatus {
    pub fn from_open(open: bool) -> Self {
        if open {
            BillingStatus::Open
        } else {
            BillingStatus::Closed
        }
    }

    pub fn is_open(self) -> bool {
        self == BillingStatus::Open
    }
}

impl fmt::Display for BillingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillingStatus::Open => f.write_str("OPEN"),
            BillingStatus::Closed => f.write_str("CLOSED"),
        }
    }
}

/// Information about a GCP billing account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingAccount {
    /// Billing account ID (e.g. `012345-567890-ABCDEF`)
    pub id: String,
    pub display_name: String,
    pub status: BillingStatus,
    /// Parent account for subaccounts, empty otherwise
    pub master_billing_account: String,
}

impl BillingAccount {
    /// A billing account known only by id, assumed open
    pub fn from_id(id: &str) -> Self {
        let id = id.strip_prefix("billingAccounts/").unwrap_or(id);
        Self {
            id: id.to_string(),
            display_name: id.to_string(),
            status: BillingStatus::Open,
            master_billing_account: String::new(),
        }
    }

    /// `billingAccounts/{id}`
    pub fn resource_name(&self) -> String {
        format!("billingAccounts/{}", self.id)
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}

impl From<&Value> for BillingAccount {
    fn from(value: &Value) -> Self {
        let name = value
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let id = short_name(name).to_string();

        Self {
            display_name: value
                .get("displayName")
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .unwrap_or_else(|| id.clone()),
            status: BillingStatus::from_open(
                value.get("open").and_then(|v| v.as_bool()).unwrap_or(false),
            ),
            master_billing_account: value
                .get("masterBillingAccount")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            id,
        }
    }
}

/// The billing account of a project, or the explicit absence of one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingRef {
    Account(BillingAccount),
    NoBillingAccount,
}

/// Sentinel for projects without a linked billing account
pub const NO_BILLING_ACCOUNT: BillingRef = BillingRef::NoBillingAccount;

impl BillingRef {
    /// False only for `NO_BILLING_ACCOUNT`; a closed account is still linked
    pub fn is_linked(&self) -> bool {
        matches!(self, BillingRef::Account(_))
    }

    pub fn account(&self) -> Option<&BillingAccount> {
        match self {
            BillingRef::Account(account) => Some(account),
            BillingRef::NoBillingAccount => None,
        }
    }

    /// Value for `billingAccountName`; empty unlinks billing
    pub fn resource_name(&self) -> String {
        self.account()
            .map(|a| a.resource_name())
            .unwrap_or_default()
    }

    pub fn display_name(&self) -> &str {
        match self {
            BillingRef::Account(account) => &account.display_name,
            BillingRef::NoBillingAccount => "No Billing Account",
        }
    }
}

impl fmt::Display for BillingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillingRef::Account(a) => write!(f, "{} ({})", a.display_name, a.id),
            BillingRef::NoBillingAccount => f.write_str("NO_BILLING_ACCOUNT"),
        }
    }
}

impl From<BillingAccount> for BillingRef {
    fn from(account: BillingAccount) -> Self {
        BillingRef::Account(account)
    }
}

impl From<Option<BillingAccount>> for BillingRef {
    fn from(account: Option<BillingAccount>) -> Self {
        account.map(BillingRef::Account).unwrap_or(NO_BILLING_ACCOUNT)
    }
}

impl From<&str> for BillingRef {
    fn from(id: &str) -> Self {
        if id.is_empty() {
            NO_BILLING_ACCOUNT
        } else {
            BillingRef::Account(BillingAccount::from_id(id))
        }
    }
}

/// List billing accounts visible to the caller
///
/// `parent` narrows the listing to one organization (`organizations/{id}`).
pub async fn list_billing_accounts(
    client: &GcpClient,
    parent: Option<&str>,
    open_only: bool,
) -> Result<Vec<BillingAccount>> {
    let mut url = client.billing_url("billingAccounts");
    if let Some(parent) = parent {
        url = add_query_params(&url, &[("parent", parent)]);
    }

    let accounts = list_all(client, &url, "billingAccounts")
        .await?
        .iter()
        .map(BillingAccount::from)
        .filter(|a| !open_only || a.is_open())
        .collect();

    Ok(accounts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_billing_account_from_api() {
        let v = json!({
            "name": "billingAccounts/012345-567890-ABCDEF",
            "displayName": "Main",
            "open": true,
            "masterBillingAccount": ""
        });
        let account = BillingAccount::from(&v);
        assert_eq!(account.id, "012345-567890-ABCDEF");
        assert_eq!(account.display_name, "Main");
        assert!(account.is_open());
        assert_eq!(account.resource_name(), "billingAccounts/012345-567890-ABCDEF");
    }

    #[test]
    fn test_billing_account_display_name_defaults_to_id() {
        let v = json!({"name": "billingAccounts/AAA", "open": false});
        let account = BillingAccount::from(&v);
        assert_eq!(account.display_name, "AAA");
        assert_eq!(account.status, BillingStatus::Closed);
    }

    #[test]
    fn test_no_billing_account_sentinel() {
        assert!(!NO_BILLING_ACCOUNT.is_linked());
        assert_eq!(NO_BILLING_ACCOUNT.resource_name(), "");
        assert_eq!(NO_BILLING_ACCOUNT.to_string(), "NO_BILLING_ACCOUNT");
        assert_eq!(NO_BILLING_ACCOUNT.display_name(), "No Billing Account");
        assert!(NO_BILLING_ACCOUNT.account().is_none());
    }

    #[test]
    fn test_closed_account_is_still_linked() {
        let closed = BillingAccount {
            id: "X".into(),
            display_name: "Old".into(),
            status: BillingStatus::Closed,
            master_billing_account: String::new(),
        };
        assert!(BillingRef::from(closed).is_linked());
    }

    #[test]
    fn test_billing_ref_from_str() {
        assert_eq!(BillingRef::from(""), NO_BILLING_ACCOUNT);
        let linked = BillingRef::from("billingAccounts/ABC");
        assert_eq!(linked.resource_name(), "billingAccounts/ABC");
    }
}
