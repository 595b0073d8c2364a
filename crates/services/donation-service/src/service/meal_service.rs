//! Meal service - Creates meals and lists them by day.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use common::{AppError, AppResult};
use domain::{Meal, NewMeal};

use crate::repository::MealRepository;

/// Meal service trait for dependency injection.
#[async_trait]
pub trait MealService: Send + Sync {
    /// Add a meal to the catalog
    async fn create_meal(&self, meal: NewMeal) -> AppResult<Meal>;

    /// Meals served on a date
    async fn meals_by_date(&self, date: NaiveDate) -> AppResult<Vec<Meal>>;

    /// Meals served between two dates, both inclusive
    async fn meals_between(&self, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<Meal>>;
}

/// Concrete implementation of MealService using repository.
pub struct MealCatalog {
    repo: Arc<dyn MealRepository>,
}

impl MealCatalog {
    /// Create new meal service instance with repository
    pub fn new(repo: Arc<dyn MealRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl MealService for MealCatalog {
    async fn create_meal(&self, meal: NewMeal) -> AppResult<Meal> {
        meal.validate()?;

        let meal = self.repo.create(meal).await?;
        info!(meal_id = meal.id, date = %meal.date, "Created meal");
        Ok(meal)
    }

    async fn meals_by_date(&self, date: NaiveDate) -> AppResult<Vec<Meal>> {
        self.repo.find_by_date(date).await
    }

    async fn meals_between(&self, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<Meal>> {
        if start > end {
            return Err(AppError::validation(format!(
                "Start date {} is after end date {}",
                start, end
            )));
        }

        self.repo.find_between(start, end).await
    }
}
