//! IAM role description

use serde::{Deserialize, Serialize};

/// Information about an IAM role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role resource name (e.g. `roles/owner`)
    pub name: String,
    pub title: String,
    pub description: String,
}
