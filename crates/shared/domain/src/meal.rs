//! Meal domain entity.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A schedulable meal on a calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meal {
    pub id: i32,
    pub description: String,
    pub date: NaiveDate,
}

/// Meal creation data transfer object
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewMeal {
    /// What is being served
    #[validate(length(min = 1, max = 500, message = "must be between 1 and 500 characters"))]
    pub description: String,
    /// Day the meal is served
    pub date: NaiveDate,
}

impl NewMeal {
    pub fn new(description: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            description: description.into().trim().to_string(),
            date,
        }
    }
}
