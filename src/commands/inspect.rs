//! Read-only commands: `tree` and `lookup-api`

use crate::error::Result;
use crate::gcp::client::GcpClient;
use crate::lookup::lookup_api;
use crate::survey::list_organizations;
use crate::types::{Container, Organization};

/// Print the resource hierarchy of one organization, or of everything visible
pub async fn print_tree(client: &GcpClient, org_id: Option<&str>) -> Result<()> {
    let roots = match org_id {
        Some(id) => vec![Container::from(Organization::lookup(client, id).await?)],
        None => list_organizations(client).await?,
    };

    if roots.is_empty() {
        println!("No organizations or projects visible to this account.");
        return Ok(());
    }

    for root in roots {
        print!("{}", root.tree(client).await?);
    }
    Ok(())
}

/// Print the service id an API name resolves to
pub fn print_api_lookup(name: &str) -> Result<()> {
    let service = lookup_api(name)?;
    println!("{}", service);
    Ok(())
}
