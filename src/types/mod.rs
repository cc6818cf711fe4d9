//! Resource model for the GCP hierarchy
//!
//! - [`Container`] - organization, folder, or [`NO_ORG`]
//! - [`Project`] - a project and its billing / API / IAM helpers
//! - [`BillingAccount`] and [`BillingRef`] with [`NO_BILLING_ACCOUNT`]
//! - [`Role`], [`Region`], [`MultiRegion`]

pub mod billing_account;
pub mod container;
pub mod folder;
pub mod organization;
pub mod project;
pub mod region;
pub mod role;

pub use billing_account::{
    list_billing_accounts, BillingAccount, BillingRef, BillingStatus, NO_BILLING_ACCOUNT,
};
pub use container::{Container, NO_ORG};
pub use folder::Folder;
pub use organization::{Organization, ORGANIZATION_OWNER_ROLES};
pub use project::{Project, REQUIRED_APIS};
pub use region::{MultiRegion, Region};
pub use role::Role;
