//! GCP Client
//!
//! Main client for interacting with GCP APIs, combining authentication,
//! HTTP functionality, and the base URLs of every API gcpadm talks to.

use super::auth::GcpCredentials;
use super::http::GcpHttpClient;
use crate::error::{GcpError, Result};
use serde_json::Value;

/// Base URLs of the Google APIs in use
///
/// Each URL is the service root without a version segment; the URL builders
/// on [`GcpClient`] append `/v1/...` or `/v3/...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub resource_manager: String,
    pub billing: String,
    pub iam: String,
    pub service_usage: String,
    pub oauth2: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            resource_manager: "https://cloudresourcemanager.googleapis.com".to_string(),
            billing: "https://cloudbilling.googleapis.com".to_string(),
            iam: "https://iam.googleapis.com".to_string(),
            service_usage: "https://serviceusage.googleapis.com".to_string(),
            oauth2: "https://oauth2.googleapis.com".to_string(),
        }
    }
}

impl Endpoints {
    /// Route every API to the same base URL (used against local mock servers)
    pub fn with_base(base: &str) -> Result<Self> {
        let parsed = url::Url::parse(base)
            .map_err(|e| GcpError::InvalidArgument(format!("invalid base URL '{base}': {e}")))?;
        let base = parsed.as_str().trim_end_matches('/').to_string();

        Ok(Self {
            resource_manager: base.clone(),
            billing: base.clone(),
            iam: base.clone(),
            service_usage: base.clone(),
            oauth2: base,
        })
    }
}

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    pub credentials: GcpCredentials,
    pub http: GcpHttpClient,
    pub endpoints: Endpoints,
}

impl GcpClient {
    /// Create a new GCP client using Application Default Credentials
    pub async fn new() -> Result<Self> {
        let credentials = GcpCredentials::new().await?;
        Self::with_credentials(credentials, Endpoints::default())
    }

    /// Create a client from explicit credentials and endpoints
    pub fn with_credentials(credentials: GcpCredentials, endpoints: Endpoints) -> Result<Self> {
        let http = GcpHttpClient::new()?;

        Ok(Self {
            credentials,
            http,
            endpoints,
        })
    }

    /// Get the current access token
    pub async fn get_token(&self) -> Result<String> {
        self.credentials.get_token().await
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &str) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.get(url, &token).await
    }

    /// Make a POST request to a GCP API
    pub async fn post(&self, url: &str, body: Option<&Value>) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.post(url, &token, body).await
    }

    /// Make a PUT request to a GCP API
    pub async fn put(&self, url: &str, body: &Value) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.put(url, &token, body).await
    }

    /// Make a PATCH request to a GCP API
    pub async fn patch(&self, url: &str, body: &Value) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.patch(url, &token, body).await
    }

    // =========================================================================
    // Resource Manager API helpers
    // =========================================================================

    /// Build Resource Manager v1 API URL
    pub fn crm_v1_url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.endpoints.resource_manager, path)
    }

    /// Build Resource Manager v3 API URL
    pub fn crm_v3_url(&self, path: &str) -> String {
        format!("{}/v3/{}", self.endpoints.resource_manager, path)
    }

    // =========================================================================
    // Billing, IAM and Service Usage helpers
    // =========================================================================

    /// Build Cloud Billing API URL
    pub fn billing_url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.endpoints.billing, path)
    }

    /// Build IAM API URL
    pub fn iam_url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.endpoints.iam, path)
    }

    /// Build Service Usage API URL
    pub fn service_usage_url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.endpoints.service_usage, path)
    }

    /// Build OAuth2 token info URL for the given access token
    pub fn tokeninfo_url(&self, token: &str) -> String {
        format!(
            "{}/tokeninfo?access_token={}",
            self.endpoints.oauth2,
            urlencoding::encode(token)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GcpClient {
        GcpClient::with_credentials(
            GcpCredentials::from_static_token("t"),
            Endpoints::with_base("http://127.0.0.1:9999/").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_with_base_trims_trailing_slash() {
        let endpoints = Endpoints::with_base("http://localhost:8080/").unwrap();
        assert_eq!(endpoints.billing, "http://localhost:8080");
        assert_eq!(endpoints.resource_manager, endpoints.iam);
    }

    #[test]
    fn test_with_base_rejects_garbage() {
        assert!(Endpoints::with_base("not a url").is_err());
    }

    #[test]
    fn test_url_builders() {
        let c = client();
        assert_eq!(c.crm_v3_url("folders"), "http://127.0.0.1:9999/v3/folders");
        assert_eq!(c.crm_v1_url("projects"), "http://127.0.0.1:9999/v1/projects");
        assert_eq!(
            c.billing_url("billingAccounts"),
            "http://127.0.0.1:9999/v1/billingAccounts"
        );
        assert_eq!(
            c.tokeninfo_url("a/b"),
            "http://127.0.0.1:9999/tokeninfo?access_token=a%2Fb"
        );
    }

    #[test]
    fn test_default_endpoints_are_google() {
        let e = Endpoints::default();
        assert!(e.resource_manager.starts_with("https://cloudresourcemanager"));
        assert!(e.service_usage.ends_with("googleapis.com"));
    }
}
