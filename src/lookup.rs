//! API name lookup
//!
//! Resolves human API names such as "Compute Engine API" to service ids
//! (`compute.googleapis.com`) using a catalog compiled into the binary.

use crate::error::{GcpError, Result};
use std::sync::OnceLock;

/// Embedded catalog: `display name<TAB>service id`, `#` starts a comment
const CATALOG_TSV: &str = include_str!("../data/api_catalog.tsv");

static CATALOG: OnceLock<Vec<ApiEntry>> = OnceLock::new();

/// Words that carry no meaning when matching API names
const NOISE_WORDS: &[&str] = &["google", "cloud"];

/// One catalog row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEntry {
    pub display_name: String,
    pub service: String,
    normalized: String,
}

/// Get the parsed catalog (parsed on first use)
pub fn catalog() -> &'static [ApiEntry] {
    CATALOG.get_or_init(|| parse_catalog(CATALOG_TSV))
}

fn parse_catalog(text: &str) -> Vec<ApiEntry> {
    let mut entries = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((display_name, service)) = line.split_once('\t') else {
            tracing::warn!("Skipping malformed API catalog line {}: {}", lineno + 1, line);
            continue;
        };
        let display_name = display_name.trim().to_string();
        entries.push(ApiEntry {
            normalized: normalize(&display_name),
            service: service.trim().to_string(),
            display_name,
        });
    }
    entries
}

/// Lowercase, drop "google"/"cloud" and a trailing "api"
pub fn normalize(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut words: Vec<&str> = lowered
        .split_whitespace()
        .filter(|w| !NOISE_WORDS.contains(w))
        .collect();
    if words.last() == Some(&"api") {
        words.pop();
    }
    words.join(" ")
}

fn describe(entries: &[&ApiEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{} ({})", e.display_name, e.service))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pick the single entry whose `key` is strictly shortest
fn unique_shortest<'a>(entries: &[&'a ApiEntry], key: impl Fn(&ApiEntry) -> usize) -> Option<&'a ApiEntry> {
    let min = entries.iter().map(|e| key(e)).min()?;
    let mut shortest = entries.iter().filter(|e| key(e) == min);
    let first = shortest.next()?;
    match shortest.next() {
        Some(_) => None,
        None => Some(*first),
    }
}

/// Resolve an API name to its service id
///
/// Exact (case-insensitive) matches on the display name or service id win.
/// Otherwise names are compared after normalization, then by substring; a
/// tie that cannot be broken by length is an error listing the candidates.
pub fn lookup_api(name: &str) -> Result<String> {
    let entries = catalog();
    let query = name.trim();

    if let Some(entry) = entries.iter().find(|e| {
        e.display_name.eq_ignore_ascii_case(query) || e.service.eq_ignore_ascii_case(query)
    }) {
        return Ok(entry.service.clone());
    }

    let normalized = normalize(query);
    if normalized.is_empty() {
        return Err(GcpError::ApiResolution(format!(
            "'{}' is too generic to identify an API",
            name
        )));
    }

    let exact: Vec<&ApiEntry> = entries.iter().filter(|e| e.normalized == normalized).collect();
    match exact.as_slice() {
        [one] => return Ok(one.service.clone()),
        [] => {}
        several => {
            return unique_shortest(several, |e| e.display_name.len())
                .map(|e| e.service.clone())
                .ok_or_else(|| {
                    GcpError::ApiResolution(format!(
                        "'{}' matches several APIs: {}",
                        name,
                        describe(several)
                    ))
                });
        },
    }

    let candidates: Vec<&ApiEntry> = entries
        .iter()
        .filter(|e| e.normalized.contains(&normalized) || e.service.contains(&normalized))
        .collect();

    match candidates.as_slice() {
        [] => Err(GcpError::ApiResolution(format!("No API matches '{}'", name))),
        [one] => Ok(one.service.clone()),
        several => unique_shortest(several, |e| e.normalized.len())
            .map(|e| e.service.clone())
            .ok_or_else(|| {
                GcpError::ApiResolution(format!(
                    "'{}' is ambiguous; candidates: {}",
                    name,
                    describe(several)
                ))
            }),
    }
}
