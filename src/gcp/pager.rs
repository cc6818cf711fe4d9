//! Pagination helpers for Google list endpoints
//!
//! List responses carry their items under a resource-specific key
//! (`projects`, `folders`, `billingAccounts`, ...) and a `nextPageToken`
//! while more pages remain.

use super::client::GcpClient;
use crate::error::Result;
use serde_json::Value;

/// Result of paginated fetch
pub struct PaginatedResult {
    pub items: Vec<Value>,
    pub next_token: Option<String>,
}

/// Fetch all items (auto-paginate)
pub async fn list_all(client: &GcpClient, url: &str, items_key: &str) -> Result<Vec<Value>> {
    let mut all_items = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let result = list_page(client, url, items_key, page_token.as_deref()).await?;
        all_items.extend(result.items);

        match result.next_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    tracing::debug!("Fetched {} {} from {}", all_items.len(), items_key, url);
    Ok(all_items)
}

/// Fetch one page of items
pub async fn list_page(
    client: &GcpClient,
    url: &str,
    items_key: &str,
    page_token: Option<&str>,
) -> Result<PaginatedResult> {
    let url = match page_token {
        Some(token) => add_query_params(url, &[("pageToken", token)]),
        None => url.to_string(),
    };

    let response = client.get(&url).await?;

    let items = response
        .get(items_key)
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    // An empty token means the last page on some APIs
    let next_token = response
        .get("nextPageToken")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());

    Ok(PaginatedResult { items, next_token })
}

/// Append URL-encoded query parameters to a URL
pub fn add_query_params(url: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return url.to_string();
    }

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    if url.contains('?') {
        format!("{}&{}", url, query)
    } else {
        format!("{}?{}", url, query)
    }
}

/// Last path segment of a resource name
/// e.g., "folders/1234" -> "1234"
pub fn short_name(resource_name: &str) -> &str {
    resource_name.rsplit('/').next().unwrap_or(resource_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_query_params_encodes_values() {
        assert_eq!(
            add_query_params("https://x/v3/folders", &[("parent", "organizations/1")]),
            "https://x/v3/folders?parent=organizations%2F1"
        );
    }

    #[test]
    fn test_add_query_params_appends_to_existing_query() {
        assert_eq!(
            add_query_params("https://x/v1/s?filter=a", &[("pageToken", "t 1")]),
            "https://x/v1/s?filter=a&pageToken=t%201"
        );
    }

    #[test]
    fn test_add_query_params_empty() {
        assert_eq!(add_query_params("https://x", &[]), "https://x");
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("billingAccounts/ABC-123"), "ABC-123");
        assert_eq!(short_name("plain"), "plain");
    }
}
