//! Meal repository implementation.

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use super::entities::meal::{self, ActiveModel, Entity as MealEntity};
use common::{AppError, AppResult};
use domain::{Meal, NewMeal};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Meal repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait MealRepository: Send + Sync {
    /// Find meal by ID
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Meal>>;

    /// Find all meals whose ID is in `ids`, ordered by ID
    async fn find_by_ids(&self, ids: Vec<i32>) -> AppResult<Vec<Meal>>;

    /// Meals served on a date
    async fn find_by_date(&self, date: NaiveDate) -> AppResult<Vec<Meal>>;

    /// Meals served between two dates, inclusive
    async fn find_between(&self, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<Meal>>;

    /// Create a new meal
    async fn create(&self, meal: NewMeal) -> AppResult<Meal>;
}

/// Concrete implementation of MealRepository
pub struct MealStore {
    db: DatabaseConnection,
}

impl MealStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MealRepository for MealStore {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Meal>> {
        let result = MealEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Meal::from))
    }

    async fn find_by_ids(&self, ids: Vec<i32>) -> AppResult<Vec<Meal>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = MealEntity::find()
            .filter(meal::Column::Id.is_in(ids))
            .order_by_asc(meal::Column::Id)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(Meal::from).collect())
    }

    async fn find_by_date(&self, date: NaiveDate) -> AppResult<Vec<Meal>> {
        let models = MealEntity::find()
            .filter(meal::Column::Date.eq(date))
            .order_by_asc(meal::Column::Id)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(Meal::from).collect())
    }

    async fn find_between(&self, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<Meal>> {
        let models = MealEntity::find()
            .filter(meal::Column::Date.gte(start))
            .filter(meal::Column::Date.lte(end))
            .order_by_asc(meal::Column::Date)
            .order_by_asc(meal::Column::Id)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(Meal::from).collect())
    }

    async fn create(&self, meal: NewMeal) -> AppResult<Meal> {
        let active_model = ActiveModel {
            description: Set(meal.description),
            date: Set(meal.date),
            ..Default::default()
        };

        let model = active_model.insert(&self.db).await.map_err(AppError::from)?;
        Ok(Meal::from(model))
    }
}
