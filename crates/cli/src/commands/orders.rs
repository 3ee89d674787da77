//! Record store commands.
//!
//! # Environment Variables
//!
//! Same as the dashboard: `ORDER_DESK_STORE`, `GOOGLE_SHEET_NAME`,
//! `GOOGLE_SHEET_ID` and the service-account key variables.

use std::io::Write;
use std::path::Path;

use order_desk_dashboard::config::{ConfigError, DashboardConfig};
use order_desk_dashboard::state::open_store;
use order_desk_dashboard::store::{RecordStore, StoreError};
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrdersError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Record store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// JSON encoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing the output failed.
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetch every row straight from the store and write it as a JSON array.
///
/// Returns the number of orders written.
async fn export_to(store: &dyn RecordStore, out: &mut impl Write) -> Result<usize, OrdersError> {
    let orders = store.fetch().await?;
    serde_json::to_writer_pretty(&mut *out, &orders)?;
    writeln!(out)?;
    Ok(orders.len())
}

/// Export every stored order to `out`, or stdout.
pub async fn export(out: Option<&Path>) -> Result<(), OrdersError> {
    let config = DashboardConfig::from_env()?;
    let store = open_store(&config.store)?;
    tracing::info!("Exporting orders from {}", store.describe());

    let count = match out {
        Some(path) => {
            let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
            let count = export_to(store.as_ref(), &mut file).await?;
            file.flush()?;
            tracing::info!("Wrote {} orders to {}", count, path.display());
            count
        }
        None => {
            let stdout = std::io::stdout();
            export_to(store.as_ref(), &mut stdout.lock()).await?
        }
    };

    tracing::info!("Export complete ({} orders)", count);
    Ok(())
}
