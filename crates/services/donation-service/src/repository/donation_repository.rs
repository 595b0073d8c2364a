//! Donation ledger storage.
//!
//! The claim is a single conditional UPDATE (`... WHERE id = ? AND
//! recipient_id IS NULL`). Exactly one changed row means the caller won the
//! donation; zero rows means it does not exist or someone else has it.

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, Set,
};

use super::entities::donation::{self, ActiveModel, Entity as DonationEntity};
use super::entities::meal::{self, Entity as MealEntity};
use common::{AppError, AppResult};
use domain::{Donation, Meal};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Donation repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait DonationRepository: Send + Sync {
    /// Record a new, unclaimed donation
    async fn create(&self, meal_id: i32, donor_id: i32) -> AppResult<Donation>;

    /// Find donation by ID
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Donation>>;

    /// Assign `recipient_id` if and only if the donation is still unclaimed.
    ///
    /// Returns `true` when exactly one row changed.
    async fn claim(&self, id: i32, recipient_id: i32) -> AppResult<bool>;

    /// Unclaimed donations for meals served on `date`, ordered by donation ID
    async fn find_unclaimed_by_date(&self, date: NaiveDate) -> AppResult<Vec<(Donation, Meal)>>;

    /// All donations for meals served on `date`, ordered by donation ID
    async fn find_by_date(&self, date: NaiveDate) -> AppResult<Vec<(Donation, Meal)>>;

    /// Donation received by `recipient_id` for a meal served on `date`
    async fn find_claimed_by_recipient(
        &self,
        recipient_id: i32,
        date: NaiveDate,
    ) -> AppResult<Option<(Donation, Meal)>>;
}

/// Concrete implementation of DonationRepository
pub struct DonationStore {
    db: DatabaseConnection,
}

impl DonationStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DonationRepository for DonationStore {
    async fn create(&self, meal_id: i32, donor_id: i32) -> AppResult<Donation> {
        let active_model = ActiveModel {
            meal_id: Set(meal_id),
            donor_id: Set(donor_id),
            recipient_id: Set(None),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };

        let model = active_model.insert(&self.db).await.map_err(AppError::from)?;
        Ok(Donation::from(model))
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<Donation>> {
        let result = DonationEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Donation::from))
    }

    async fn claim(&self, id: i32, recipient_id: i32) -> AppResult<bool> {
        claim_on(&self.db, id, recipient_id).await
    }

    async fn find_unclaimed_by_date(&self, date: NaiveDate) -> AppResult<Vec<(Donation, Meal)>> {
        let rows = DonationEntity::find()
            .find_also_related(MealEntity)
            .filter(meal::Column::Date.eq(date))
            .filter(donation::Column::RecipientId.is_null())
            .order_by_asc(donation::Column::Id)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(with_meals(rows))
    }

    async fn find_by_date(&self, date: NaiveDate) -> AppResult<Vec<(Donation, Meal)>> {
        let rows = DonationEntity::find()
            .find_also_related(MealEntity)
            .filter(meal::Column::Date.eq(date))
            .order_by_asc(donation::Column::Id)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(with_meals(rows))
    }

    async fn find_claimed_by_recipient(
        &self,
        recipient_id: i32,
        date: NaiveDate,
    ) -> AppResult<Option<(Donation, Meal)>> {
        let rows = DonationEntity::find()
            .find_also_related(MealEntity)
            .filter(meal::Column::Date.eq(date))
            .filter(donation::Column::RecipientId.eq(recipient_id))
            .order_by_asc(donation::Column::Id)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(with_meals(rows).into_iter().next())
    }
}

/// Transaction-aware donation repository.
///
/// Lets the matching engine compose the conditional claim with the request
/// update in one transaction.
pub struct TxDonationRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxDonationRepository<'a> {
    /// Create new transaction-aware repository
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Conditional claim inside the transaction; see [`DonationRepository::claim`].
    pub async fn claim(&self, id: i32, recipient_id: i32) -> AppResult<bool> {
        claim_on(self.txn, id, recipient_id).await
    }
}

/// Set the recipient only where it is still unset, in one statement.
async fn claim_on<C: ConnectionTrait>(conn: &C, id: i32, recipient_id: i32) -> AppResult<bool> {
    let result = DonationEntity::update_many()
        .col_expr(donation::Column::RecipientId, Expr::value(recipient_id))
        .filter(donation::Column::Id.eq(id))
        .filter(donation::Column::RecipientId.is_null())
        .exec(conn)
        .await
        .map_err(AppError::from)?;

    Ok(result.rows_affected == 1)
}

fn with_meals(rows: Vec<(donation::Model, Option<meal::Model>)>) -> Vec<(Donation, Meal)> {
    rows.into_iter()
        .filter_map(|(d, m)| m.map(|m| (Donation::from(d), Meal::from(m))))
        .collect()
}
