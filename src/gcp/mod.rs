//! GCP API interaction module
//!
//! This module provides the plumbing every higher-level helper is built on:
//! authentication, the HTTP client, pagination, long-running operations,
//! and IAM policy manipulation.
//!
//! # Module Structure
//!
//! - [`auth`] - Credentials (ADC, service account key, static token) and gcloud defaults
//! - [`client`] - Main GCP client and per-API URL builders
//! - [`http`] - HTTP utilities for REST API calls
//! - [`pager`] - `nextPageToken` following for list endpoints
//! - [`operations`] - Long-running operation polling
//! - [`iam`] - IAM policy fetch, merge, and role listing
//!
//! # Example
//!
//! ```ignore
//! use gcpadm::gcp::client::GcpClient;
//!
//! async fn example() -> gcpadm::Result<()> {
//!     let client = GcpClient::new().await?;
//!     let folders = client.get(&client.crm_v3_url("folders?parent=organizations/123")).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
pub mod iam;
pub mod operations;
pub mod pager;
