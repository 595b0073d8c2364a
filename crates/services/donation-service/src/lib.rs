//! Donation Service Library
//!
//! Meal donation allocation and fulfillment: identity resolution, the
//! donation ledger with its atomic claim, the request queue and the matching
//! engine that pairs them up. Adapters build one [`DonationEngine`] at start
//! and call into it.

pub mod config;
pub mod crypto;
pub mod engine;
pub mod infra;
pub mod policy;
pub mod repository;
pub mod service;

use tracing::info;

use common::AppResult;

pub use crate::config::DonationServiceConfig;
pub use crate::engine::DonationEngine;

use crate::infra::Database;

/// Build the engine from environment configuration.
pub async fn connect_from_env() -> AppResult<DonationEngine> {
    let config = DonationServiceConfig::from_env()?;
    DonationEngine::connect(&config).await
}

/// Check that the configured store is reachable.
pub async fn check_health() -> AppResult<()> {
    let config = DonationServiceConfig::from_env()?;
    let db = Database::connect_without_migrations(&config.database).await?;
    db.ping().await?;
    info!("Database reachable");
    Ok(())
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(action: MigrateAction) -> AppResult<()> {
    let config = DonationServiceConfig::from_env()?;
    let db = Database::connect_without_migrations(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}
