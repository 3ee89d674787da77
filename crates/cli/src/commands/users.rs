//! Registry user management commands.
//!
//! # Environment Variables
//!
//! - `ORDER_DESK_REGISTRY_PATH` - User registry file (default: employees.json)

use std::io::Write;

use order_desk_core::{Page, UnknownPage};
use order_desk_dashboard::access::{AccessError, Registry};
use order_desk_dashboard::config::{ConfigError, DashboardConfig};
use thiserror::Error;

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UsersError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Registry operation failed.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// A `--pages` entry is not a page name.
    #[error("{0}. Valid pages: Home, Orders, Search, Dashboard, Settings")]
    InvalidPage(#[from] UnknownPage),

    /// Writing the listing failed.
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

async fn open_registry() -> Result<Registry, UsersError> {
    let config = DashboardConfig::from_env()?;
    tracing::info!(path = %config.registry_path.display(), "Opening user registry");
    Ok(Registry::open(&config.registry_path).await?)
}

/// Parse `--pages`; none given means the default grants.
fn parse_pages(raw: &[String]) -> Result<Vec<Page>, UsersError> {
    if raw.is_empty() {
        return Ok(Page::DEFAULT_GRANTS.to_vec());
    }
    raw.iter()
        .map(|name| name.parse::<Page>().map_err(UsersError::from))
        .collect()
}

/// Write one line per user: name, role, pages and device count.
async fn write_listing(registry: &Registry, out: &mut impl Write) -> Result<(), UsersError> {
    for (name, record) in registry.users().await {
        let pages: Vec<&str> = record.permitted_pages().iter().map(Page::as_str).collect();
        writeln!(
            out,
            "{name}\t{}\t{}\t{} device(s)",
            if record.is_manager { "manager" } else { "staff" },
            if pages.is_empty() { "-".to_string() } else { pages.join(",") },
            record.devices.len(),
        )?;
    }
    Ok(())
}

/// Print every user.
pub async fn list() -> Result<(), UsersError> {
    let registry = open_registry().await?;
    let stdout = std::io::stdout();
    write_listing(&registry, &mut stdout.lock()).await
}

/// Create a user.
pub async fn add(username: &str, code: &str, manager: bool, pages: &[String]) -> Result<(), UsersError> {
    let pages = parse_pages(pages)?;
    let registry = open_registry().await?;
    registry.add_user(username, code, manager, &pages).await?;

    tracing::info!("User {} created with pages {:?}", username.trim(), pages);
    Ok(())
}

/// Reset a user's access code.
pub async fn passwd(username: &str, code: &str) -> Result<(), UsersError> {
    let registry = open_registry().await?;
    registry.reset_code(username, code).await?;

    tracing::info!("Access code updated for {}", username);
    Ok(())
}

/// Delete a user.
pub async fn delete(username: &str) -> Result<(), UsersError> {
    let registry = open_registry().await?;
    registry.delete_user(username).await?;

    tracing::info!("User {} deleted", username);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pages() {
        assert_eq!(parse_pages(&[]).unwrap(), Page::DEFAULT_GRANTS.to_vec());
        assert_eq!(
            parse_pages(&["Home".to_string(), "Settings".to_string()]).unwrap(),
            vec![Page::Home, Page::Settings]
        );
        assert!(matches!(
            parse_pages(&["Reports".to_string()]),
            Err(UsersError::InvalidPage(_))
        ));
    }

    #[tokio::test]
    async fn test_listing_shows_role_and_pages() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(dir.path().join("employees.json")).await.unwrap();
        registry
            .add_user("sara", "1111", false, &[Page::Search])
            .await
            .unwrap();

        let mut out = Vec::new();
        write_listing(&registry, &mut out).await.unwrap();
        let listing = String::from_utf8(out).unwrap();

        assert!(listing.contains("admin\tmanager\tHome,Orders,Search,Dashboard,Settings\t0 device(s)"));
        assert!(listing.contains("sara\tstaff\tSearch\t0 device(s)"));
    }
}
