//! IAM policy helpers
//!
//! Policies are fetched and written through Cloud Resource Manager v3 for
//! projects, folders, and organizations. Binding updates are merges: members
//! already present are left alone, and a policy is only written back when
//! something actually changed.

use super::client::GcpClient;
use super::pager::list_all;
use crate::error::{GcpError, Result};
use crate::types::Role;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Policy version needed to round-trip conditional bindings
pub const POLICY_VERSION: i64 = 3;

fn policy_url(client: &GcpClient, resource_name: &str, verb: &str) -> Result<String> {
    let supported = ["projects/", "folders/", "organizations/"];
    if !supported.iter().any(|p| resource_name.starts_with(p)) {
        return Err(GcpError::InvalidArgument(format!(
            "Unsupported resource_name: {}",
            resource_name
        )));
    }
    Ok(client.crm_v3_url(&format!("{}:{}", resource_name, verb)))
}

/// Fetch the IAM policy of a project, folder, or organization
pub async fn get_iam_policy(client: &GcpClient, resource_name: &str) -> Result<Value> {
    let url = policy_url(client, resource_name, "getIamPolicy")?;
    let body = json!({ "options": { "requestedPolicyVersion": POLICY_VERSION } });
    client.post(&url, Some(&body)).await
}

/// Replace the IAM policy of a project, folder, or organization
pub async fn set_iam_policy(client: &GcpClient, resource_name: &str, policy: &Value) -> Result<Value> {
    let url = policy_url(client, resource_name, "setIamPolicy")?;
    let body = json!({ "policy": policy });
    client.post(&url, Some(&body)).await
}

/// Merge `members` into the binding for `role`, creating the binding if needed
///
/// Returns `true` when the policy was modified. The policy version is raised
/// to [`POLICY_VERSION`] as a side effect.
pub fn merge_binding(policy: &mut Value, role: &str, members: &[String]) -> bool {
    if !policy.is_object() {
        *policy = json!({});
    }

    let version = policy.get("version").and_then(|v| v.as_i64()).unwrap_or(0);
    if version < POLICY_VERSION {
        policy["version"] = json!(POLICY_VERSION);
    }

    if !policy.get("bindings").map(|b| b.is_array()).unwrap_or(false) {
        policy["bindings"] = json!([]);
    }

    let Some(bindings) = policy.get_mut("bindings").and_then(|b| b.as_array_mut()) else {
        return false;
    };

    let position = bindings
        .iter()
        .position(|b| b.get("role").and_then(|r| r.as_str()) == Some(role));

    match position {
        None => {
            bindings.push(json!({ "role": role, "members": members }));
            !members.is_empty()
        },
        Some(idx) => {
            let binding = &mut bindings[idx];
            if !binding.get("members").map(|m| m.is_array()).unwrap_or(false) {
                binding["members"] = json!([]);
            }
            let Some(current) = binding.get_mut("members").and_then(|m| m.as_array_mut()) else {
                return false;
            };

            let mut changed = false;
            for member in members {
                if !current.iter().any(|m| m.as_str() == Some(member.as_str())) {
                    current.push(Value::String(member.clone()));
                    changed = true;
                }
            }
            changed
        },
    }
}

/// Roles bound directly to `member` in a policy
pub fn roles_for_member(policy: &Value, member: &str) -> Vec<String> {
    policy
        .get("bindings")
        .and_then(|b| b.as_array())
        .map(|bindings| {
            bindings
                .iter()
                .filter(|b| {
                    b.get("members")
                        .and_then(|m| m.as_array())
                        .map(|m| m.iter().any(|x| x.as_str() == Some(member)))
                        .unwrap_or(false)
                })
                .filter_map(|b| b.get("role").and_then(|r| r.as_str()).map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Whether `member` holds `role` directly in a policy
pub fn has_role(policy: &Value, role: &str, member: &str) -> bool {
    roles_for_member(policy, member).iter().any(|r| r == role)
}

/// Grant `member` every role in `roles` on a resource
///
/// Reads the current policy, merges, and writes it back only if it changed.
/// Returns the effective policy.
pub async fn grant_roles(
    client: &GcpClient,
    resource_name: &str,
    member: &str,
    roles: &[String],
) -> Result<Value> {
    let mut policy = get_iam_policy(client, resource_name).await?;

    let members = vec![member.to_string()];
    let mut changed = false;
    for role in roles {
        changed |= merge_binding(&mut policy, role, &members);
    }

    if !changed {
        tracing::info!("{} already holds requested roles on {}", member, resource_name);
        return Ok(policy);
    }

    tracing::info!("Granting {} role(s) to {} on {}", roles.len(), member, resource_name);
    set_iam_policy(client, resource_name, &policy).await
}

/// Validate a user email the way the grant helpers expect it
pub fn user_member(user_email: &str) -> Result<String> {
    let email = user_email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(GcpError::InvalidArgument(
            "user_email must be a valid email address".to_string(),
        ));
    }
    Ok(format!("user:{}", email))
}

fn role_from_value(value: &Value, fallback_name: &str) -> Role {
    Role {
        name: value
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or(fallback_name)
            .to_string(),
        title: value
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        description: value
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
    }
}

/// List roles bound directly to `user:{email}` on a resource, with titles
///
/// Predefined roles are resolved from the IAM roles catalog; custom roles
/// are fetched one by one, and roles that cannot be described are returned
/// with only their name.
pub async fn list_roles(client: &GcpClient, resource_name: &str, email: &str) -> Result<Vec<Role>> {
    let policy = get_iam_policy(client, resource_name).await?;
    let user_roles = roles_for_member(&policy, &format!("user:{}", email));

    if user_roles.is_empty() {
        return Ok(Vec::new());
    }

    let predefined: HashMap<String, Value> = list_all(client, &client.iam_url("roles"), "roles")
        .await?
        .into_iter()
        .filter_map(|r| {
            let name = r.get("name").and_then(|n| n.as_str())?.to_string();
            Some((name, r))
        })
        .collect();

    let mut roles = Vec::with_capacity(user_roles.len());
    for role_name in user_roles {
        if let Some(info) = predefined.get(&role_name) {
            roles.push(role_from_value(info, &role_name));
            continue;
        }

        match client.get(&client.iam_url(&role_name)).await {
            Ok(info) => roles.push(role_from_value(&info, &role_name)),
            Err(e) => {
                tracing::debug!("Could not describe role {}: {}", role_name, e);
                roles.push(Role {
                    name: role_name,
                    title: String::new(),
                    description: String::new(),
                });
            },
        }
    }

    Ok(roles)
}
