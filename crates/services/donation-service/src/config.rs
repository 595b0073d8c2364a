//! Donation service configuration.

use std::env;
use std::str::FromStr;

use common::{AppError, AppResult, DatabaseConfig, StorePolicyConfig};

use crate::crypto::FieldCipher;

/// Donation service configuration.
#[derive(Clone)]
pub struct DonationServiceConfig {
    /// Database connection settings
    pub database: DatabaseConfig,
    /// Hex encoded 256-bit secret protecting personal fields
    encryption_key: String,
    /// Users created with this email get the admin flag
    pub admin_email: Option<String>,
    /// Timeout and retry bounds for store calls
    pub store_policy: StorePolicyConfig,
}

impl std::fmt::Debug for DonationServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DonationServiceConfig")
            .field("database", &self.database)
            .field("encryption_key", &"[REDACTED]")
            .field("admin_email", &self.admin_email.as_ref().map(|_| "[REDACTED]"))
            .field("store_policy", &self.store_policy)
            .finish()
    }
}

impl DonationServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_defaults = DatabaseConfig::default();
        let policy_defaults = StorePolicyConfig::default();

        let encryption_key = lookup("DATA_ENCRYPTION_KEY")
            .ok_or_else(|| AppError::config("DATA_ENCRYPTION_KEY environment variable is not set"))?;
        // Fail at startup rather than on the first sealed field
        FieldCipher::from_hex(&encryption_key)?;

        Ok(Self {
            database: DatabaseConfig {
                url: lookup("DONATION_SERVICE_DATABASE_URL")
                    .or_else(|| lookup("DATABASE_URL"))
                    .unwrap_or(database_defaults.url),
                max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS")?
                    .unwrap_or(database_defaults.max_connections),
                min_connections: parse_var(&lookup, "DB_MIN_CONNECTIONS")?
                    .unwrap_or(database_defaults.min_connections),
            },
            encryption_key,
            admin_email: lookup("ADMIN_EMAIL")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            store_policy: StorePolicyConfig {
                timeout_secs: parse_var(&lookup, "STORE_TIMEOUT_SECS")?
                    .unwrap_or(policy_defaults.timeout_secs),
                read_retries: parse_var(&lookup, "STORE_READ_RETRIES")?
                    .unwrap_or(policy_defaults.read_retries),
            },
        })
    }

    /// Build the field cipher from the configured secret.
    pub fn field_cipher(&self) -> AppResult<FieldCipher> {
        FieldCipher::from_hex(&self.encryption_key)
    }
}

/// Parse an optional numeric variable, rejecting values that do not fit `T`.
fn parse_var<T, F>(lookup: &F, key: &str) -> AppResult<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|_| AppError::config(format!("{} must be a non-negative integer in range", key)))
        })
        .transpose()
}
