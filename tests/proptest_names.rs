//! Property-based tests using proptest
//!
//! Project id suggestions, API name lookup, and resource name parsing
//! checked against randomized inputs.

use gcpadm::gcp::auth::validate_project_id;
use gcpadm::gcp::pager::short_name;
use gcpadm::lookup::catalog;
use gcpadm::types::Project;
use gcpadm::lookup_api;
use proptest::prelude::*;

proptest! {
    /// Slug-based suggestions are always valid project ids
    #[test]
    fn slug_suggestions_are_valid(digits in 0usize..=10) {
        let name = Project::suggest_name(None, digits).unwrap();
        prop_assert!(validate_project_id(&name), "invalid id: {}", name);
        if digits > 0 {
            let suffix = name.rsplit('-').next().unwrap();
            prop_assert_eq!(suffix.len(), digits);
            prop_assert!(suffix.chars().all(|c| c.is_ascii_digit()));
        }
    }

    /// A prefix is kept verbatim and the length bounds decide success
    #[test]
    fn prefix_is_respected(prefix in "[a-z][a-z0-9-]{0,24}", digits in 0usize..=10) {
        let expected_len = prefix.len() + if digits > 0 { digits + 1 } else { 0 };
        match Project::suggest_name(Some(&prefix), digits) {
            Ok(name) => {
                prop_assert!((6..=30).contains(&expected_len));
                prop_assert_eq!(name.len(), expected_len);
                prop_assert!(name.starts_with(&prefix));
                prop_assert!(name[prefix.len()..].chars().all(|c| c == '-' || c.is_ascii_digit()));
            },
            Err(_) => prop_assert!(!(6..=30).contains(&expected_len)),
        }
    }

    /// Prefixes must start with a lowercase letter
    #[test]
    fn bad_prefix_is_rejected(prefix in "[A-Z0-9-][a-z0-9]{5,10}") {
        prop_assert!(Project::suggest_name(Some(&prefix), 4).is_err());
    }

    /// More than ten random digits is never accepted
    #[test]
    fn too_many_digits_is_rejected(digits in 11usize..64) {
        prop_assert!(Project::suggest_name(Some("team"), digits).is_err());
        prop_assert!(Project::suggest_name(None, digits).is_err());
    }

    /// Lookup ignores case and surrounding whitespace
    #[test]
    fn lookup_ignores_case_and_padding(name in "[a-zA-Z ]{1,24}") {
        let plain = lookup_api(&name).ok();
        let shouted = lookup_api(&format!("  {}  ", name.to_uppercase())).ok();
        prop_assert_eq!(plain, shouted);
    }

    /// Every successful lookup names a service from the catalog
    #[test]
    fn lookup_returns_catalog_services(name in "[a-z]{2,12}( [a-z]{2,8})?") {
        if let Ok(service) = lookup_api(&name) {
            prop_assert!(catalog().iter().any(|e| e.service == service));
        }
    }

    /// The short name is the last path segment
    #[test]
    fn short_name_is_last_segment(kind in "[a-zA-Z]{1,20}", id in "[a-z0-9-]{1,30}") {
        let full = format!("{}/{}", kind, id);
        prop_assert_eq!(short_name(&full), id.as_str());
        prop_assert_eq!(short_name(&id), id.as_str());
    }
}

#[test]
fn test_catalog_lookup_by_service_id() {
    for entry in catalog().iter().take(50) {
        assert_eq!(lookup_api(&entry.service).unwrap(), entry.service);
    }
}
