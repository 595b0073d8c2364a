//! Donation request service - The queue of people waiting for a meal.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use common::{AppError, AppResult, OptionExt};
use domain::{
    DonationRequest, DonationRequestView, Identity, NewDonationRequest, RequestStatus,
};

use crate::infra::UnitOfWork;
use crate::service::IdentityService;
use crate::with_transaction;

/// Donation request service trait for dependency injection.
#[async_trait]
pub trait DonationRequestService: Send + Sync {
    /// Register a pending request for any of the listed meals
    async fn create_request(&self, request: NewDonationRequest) -> AppResult<DonationRequest>;

    /// Withdraw a pending request
    async fn cancel_request(&self, request_id: i32) -> AppResult<()>;

    /// All pending requests, oldest first
    async fn pending_requests(&self) -> AppResult<Vec<DonationRequestView>>;

    /// Requests made by a person, optionally only those with a meal on `date`
    async fn requests_by_requester(
        &self,
        requester_name: &str,
        date: Option<NaiveDate>,
    ) -> AppResult<Vec<DonationRequestView>>;
}

/// Concrete implementation of DonationRequestService.
pub struct RequestQueue<U: UnitOfWork> {
    uow: Arc<U>,
    identities: Arc<dyn IdentityService>,
}

impl<U: UnitOfWork> RequestQueue<U> {
    pub fn new(uow: Arc<U>, identities: Arc<dyn IdentityService>) -> Self {
        Self { uow, identities }
    }

    async fn views(&self, requests: Vec<DonationRequest>) -> AppResult<Vec<DonationRequestView>> {
        let requester_ids: HashSet<i32> = requests.iter().map(|r| r.requester_id).collect();
        let names = self
            .uow
            .users()
            .names_by_ids(requester_ids.into_iter().collect())
            .await?;

        let repo = self.uow.requests();
        let mut views = Vec::with_capacity(requests.len());
        for request in requests {
            let description = repo
                .preferences(request.id)
                .await?
                .into_iter()
                .map(|meal| meal.description)
                .collect::<Vec<_>>()
                .join(", ");
            let requester_name = names
                .get(&request.requester_id)
                .cloned()
                .ok_or_not_found(format!("User {}", request.requester_id))?;

            views.push(DonationRequestView {
                id: request.id,
                requester_name,
                description,
                status: request.status,
                donation_id: request.donation_id,
            });
        }

        Ok(views)
    }
}

#[async_trait]
impl<U: UnitOfWork> DonationRequestService for RequestQueue<U> {
    async fn create_request(&self, request: NewDonationRequest) -> AppResult<DonationRequest> {
        request.validate()?;

        let meals = self.uow.meals().find_by_ids(request.meal_ids.clone()).await?;
        let known: HashSet<i32> = meals.iter().map(|m| m.id).collect();
        let missing: Vec<String> = request
            .meal_ids
            .iter()
            .filter(|id| !known.contains(id))
            .map(|id| id.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::validation(format!(
                "Unknown meal ids: {}",
                missing.join(", ")
            )));
        }

        let requester = self
            .identities
            .resolve(Identity::named(request.requester_name))
            .await?;

        let requester_id = requester.id;
        let meal_ids = request.meal_ids;
        let meal_count = meal_ids.len();
        let created = with_transaction!(self.uow, |ctx| {
            ctx.requests().create(requester_id, &meal_ids).await
        })?;

        info!(
            request_id = created.id,
            requester_id,
            meals = meal_count,
            "Created donation request"
        );
        Ok(created)
    }

    async fn cancel_request(&self, request_id: i32) -> AppResult<()> {
        let repo = self.uow.requests();
        let request = repo
            .find_by_id(request_id)
            .await?
            .ok_or_not_found(format!("Donation request {}", request_id))?;

        if !request.status.can_transition_to(RequestStatus::Cancelled) {
            return Err(AppError::conflict(format!(
                "Donation request {} is already {}",
                request.id, request.status
            )));
        }

        // Conditional on pending; a concurrent matching pass may have won
        if !repo.cancel(request_id).await? {
            return Err(AppError::conflict(format!(
                "Donation request {} was resolved before it could be cancelled",
                request_id
            )));
        }

        info!(request_id, "Cancelled donation request");
        Ok(())
    }

    async fn pending_requests(&self) -> AppResult<Vec<DonationRequestView>> {
        let requests = self
            .uow
            .requests()
            .find_by_status(RequestStatus::Pending)
            .await?;
        self.views(requests).await
    }

    async fn requests_by_requester(
        &self,
        requester_name: &str,
        date: Option<NaiveDate>,
    ) -> AppResult<Vec<DonationRequestView>> {
        let requester = self
            .uow
            .users()
            .find_by_name(requester_name.trim())
            .await?
            .ok_or_not_found(format!("User '{}'", requester_name.trim()))?;

        let requests = self
            .uow
            .requests()
            .find_by_requester(requester.id, date)
            .await?;
        self.views(requests).await
    }
}
