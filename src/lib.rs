//! # gcpadm - GCP organization admin helpers
//!
//! Navigate, survey, and bootstrap Google Cloud resource hierarchies.
//!
//! - [`types`] models organizations, folders, and projects as one navigable
//!   tree, with `NO_ORG` standing in for projects outside any organization.
//! - [`survey`] answers read-only questions: who am I, what can I see.
//! - [`admin`] loads a bootstrapped admin bot profile and provisions
//!   projects with it.
//! - [`commands`] are the `gcpadm` CLI flows built on `gcloud`.
//!
//! Every remote operation takes a [`gcp::client::GcpClient`] explicitly.

pub mod admin;
pub mod commands;
pub mod config;
pub mod error;
pub mod gcp;
pub mod lookup;
pub mod shell;
pub mod survey;
pub mod types;

pub use error::{GcpError, Result};
pub use gcp::client::GcpClient;
pub use lookup::lookup_api;
pub use types::{BillingRef, Container, NO_BILLING_ACCOUNT, NO_ORG};
