//! Shared setup for integration tests: an in-memory SQLite store with
//! migrations applied.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use sea_orm::ConnectOptions;

use donation_service_lib::crypto::FieldCipher;
use donation_service_lib::infra::{Database, Persistence};
use donation_service_lib::policy::StorePolicy;
use donation_service_lib::DonationEngine;

pub const TEST_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

/// Fresh in-memory database.
///
/// One pooled connection: every SQLite `:memory:` connection is its own
/// database.
pub async fn connect() -> Database {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    Database::connect_with(options)
        .await
        .expect("in-memory database should start")
}

pub fn cipher() -> FieldCipher {
    FieldCipher::from_hex(TEST_KEY).expect("test key is valid")
}

pub fn persistence(db: &Database) -> Arc<Persistence> {
    Arc::new(Persistence::new(db.get_connection(), cipher()))
}

pub async fn engine() -> (Database, DonationEngine) {
    engine_with_admin(None).await
}

pub async fn engine_with_admin(admin_email: Option<&str>) -> (Database, DonationEngine) {
    let db = connect().await;
    let engine = DonationEngine::new(
        persistence(&db),
        admin_email.map(str::to_string),
        StorePolicy::default(),
    );
    (db, engine)
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).expect("valid date")
}
