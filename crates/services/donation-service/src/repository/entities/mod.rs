//! SeaORM entities, one module per table.

pub mod donation;
pub mod donation_request;
pub mod donation_request_meal;
pub mod meal;
pub mod user;
