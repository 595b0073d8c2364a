//! Donation request queue storage.
//!
//! Status changes are conditional writes guarded by `status = 'pending'`, so
//! a request can only ever leave the pending state once.

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};

use super::entities::donation_request::{self, ActiveModel, Entity as RequestEntity};
use super::entities::donation_request_meal::{self, Entity as PreferenceEntity};
use super::entities::meal::{self, Entity as MealEntity};
use common::{AppError, AppResult};
use domain::{DonationRequest, Meal, RequestStatus, STATUS_CANCELLED, STATUS_FULFILLED, STATUS_PENDING};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Donation request repository trait for dependency injection.
///
/// Creation and fulfillment are transactional and live on
/// [`TxDonationRequestRepository`].
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait DonationRequestRepository: Send + Sync {
    /// Find request by ID
    async fn find_by_id(&self, id: i32) -> AppResult<Option<DonationRequest>>;

    /// Requests in a status, oldest first (ties broken by ID)
    async fn find_by_status(&self, status: RequestStatus) -> AppResult<Vec<DonationRequest>>;

    /// Requests of one requester, optionally limited to those with a
    /// preferred meal on `date`
    async fn find_by_requester(
        &self,
        requester_id: i32,
        date: Option<NaiveDate>,
    ) -> AppResult<Vec<DonationRequest>>;

    /// Preferred meals of a request, ordered by meal ID
    async fn preferences(&self, request_id: i32) -> AppResult<Vec<Meal>>;

    /// Move a pending request to cancelled. Returns `false` if it was not pending.
    async fn cancel(&self, id: i32) -> AppResult<bool>;
}

/// Concrete implementation of DonationRequestRepository
pub struct DonationRequestStore {
    db: DatabaseConnection,
}

impl DonationRequestStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DonationRequestRepository for DonationRequestStore {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<DonationRequest>> {
        RequestEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?
            .map(DonationRequest::try_from)
            .transpose()
    }

    async fn find_by_status(&self, status: RequestStatus) -> AppResult<Vec<DonationRequest>> {
        let models = RequestEntity::find()
            .filter(donation_request::Column::Status.eq(status.as_str()))
            .order_by_asc(donation_request::Column::CreatedAt)
            .order_by_asc(donation_request::Column::Id)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        models.into_iter().map(DonationRequest::try_from).collect()
    }

    async fn find_by_requester(
        &self,
        requester_id: i32,
        date: Option<NaiveDate>,
    ) -> AppResult<Vec<DonationRequest>> {
        let mut query = RequestEntity::find()
            .filter(donation_request::Column::RequesterId.eq(requester_id));

        if let Some(date) = date {
            query = query
                .join(JoinType::InnerJoin, donation_request::Relation::Preferences.def())
                .join(JoinType::InnerJoin, donation_request_meal::Relation::Meal.def())
                .filter(meal::Column::Date.eq(date))
                .distinct();
        }

        let models = query
            .order_by_asc(donation_request::Column::CreatedAt)
            .order_by_asc(donation_request::Column::Id)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        models.into_iter().map(DonationRequest::try_from).collect()
    }

    async fn preferences(&self, request_id: i32) -> AppResult<Vec<Meal>> {
        let rows = PreferenceEntity::find()
            .find_also_related(MealEntity)
            .filter(donation_request_meal::Column::RequestId.eq(request_id))
            .order_by_asc(donation_request_meal::Column::MealId)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(rows
            .into_iter()
            .filter_map(|(_, meal)| meal.map(Meal::from))
            .collect())
    }

    async fn cancel(&self, id: i32) -> AppResult<bool> {
        let result = RequestEntity::update_many()
            .col_expr(donation_request::Column::Status, Expr::value(STATUS_CANCELLED))
            .filter(donation_request::Column::Id.eq(id))
            .filter(donation_request::Column::Status.eq(STATUS_PENDING))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected == 1)
    }
}

/// Transaction-aware donation request repository.
pub struct TxDonationRequestRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxDonationRequestRepository<'a> {
    /// Create new transaction-aware repository
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Insert a pending request together with its meal preferences.
    pub async fn create(&self, requester_id: i32, meal_ids: &[i32]) -> AppResult<DonationRequest> {
        let active_model = ActiveModel {
            requester_id: Set(requester_id),
            status: Set(STATUS_PENDING.to_string()),
            donation_id: Set(None),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };

        let model = active_model.insert(self.txn).await.map_err(AppError::from)?;

        if !meal_ids.is_empty() {
            let preferences = meal_ids.iter().map(|meal_id| donation_request_meal::ActiveModel {
                request_id: Set(model.id),
                meal_id: Set(*meal_id),
            });

            PreferenceEntity::insert_many(preferences)
                .exec_without_returning(self.txn)
                .await
                .map_err(AppError::from)?;
        }

        DonationRequest::try_from(model)
    }

    /// Mark a still-pending request fulfilled by `donation_id`.
    ///
    /// Returns `false` if the request already left the pending state.
    pub async fn mark_fulfilled(&self, id: i32, donation_id: i32) -> AppResult<bool> {
        let result = RequestEntity::update_many()
            .col_expr(donation_request::Column::Status, Expr::value(STATUS_FULFILLED))
            .col_expr(donation_request::Column::DonationId, Expr::value(donation_id))
            .filter(donation_request::Column::Id.eq(id))
            .filter(donation_request::Column::Status.eq(STATUS_PENDING))
            .exec(self.txn)
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected == 1)
    }
}
