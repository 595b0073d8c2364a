//! Matching service - Reconciles pending requests with unclaimed donations.
//!
//! One pass visits every pending request, oldest first. For each request the
//! first unclaimed donation on the request's day whose meal is among the
//! preferences gets claimed for the requester, and the request is marked
//! fulfilled, both in one transaction. Per-request failures end up in the
//! returned [`MatchReport`] and never stop the pass.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use common::{AppError, AppResult};
use domain::{DonationRequest, MatchOutcome, MatchReport, RequestStatus};

use crate::infra::UnitOfWork;
use crate::with_transaction;

/// Matching service trait for dependency injection.
#[async_trait]
pub trait MatchingService: Send + Sync {
    /// Run one matching pass.
    ///
    /// Only a failure to load the pending requests is an error; everything
    /// that goes wrong for a single request is recorded in the report.
    async fn check_and_fulfill(&self) -> AppResult<MatchReport>;
}

/// Result of the claim-and-mark transaction.
enum Settlement {
    Fulfilled,
    LostRace,
}

/// Concrete implementation of MatchingService.
pub struct MatchingEngine<U: UnitOfWork> {
    uow: Arc<U>,
    request_timeout: Option<Duration>,
}

impl<U: UnitOfWork> MatchingEngine<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self {
            uow,
            request_timeout: None,
        }
    }

    /// Bound the work done for any single request
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    async fn visit(&self, request: &DonationRequest) -> MatchOutcome {
        let attempt = self.try_fulfill(request);
        let result = match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, attempt)
                .await
                .unwrap_or_else(|_| {
                    Err(AppError::Timeout(format!("matching request {}", request.id)))
                }),
            None => attempt.await,
        };

        result.unwrap_or_else(|e| MatchOutcome::Failed {
            request_id: request.id,
            error: e.to_string(),
        })
    }

    async fn try_fulfill(&self, request: &DonationRequest) -> AppResult<MatchOutcome> {
        let request_id = request.id;
        let requester_id = request.requester_id;

        let preferences = self.uow.requests().preferences(request_id).await?;
        let Some(first) = preferences.first() else {
            return Ok(MatchOutcome::NoPreferences { request_id });
        };

        let date = first.date;
        if preferences.iter().any(|meal| meal.date != date) {
            warn!(
                request_id,
                %date,
                "Request spans several dates; only the first preference's date is scanned"
            );
        }

        let wanted: HashSet<i32> = preferences.iter().map(|meal| meal.id).collect();
        let unclaimed = self.uow.donations().find_unclaimed_by_date(date).await?;
        let Some(donation_id) = unclaimed
            .iter()
            .map(|(donation, _)| donation)
            .find(|donation| wanted.contains(&donation.meal_id))
            .map(|donation| donation.id)
        else {
            return Ok(MatchOutcome::NoMatch { request_id });
        };

        let settlement = with_transaction!(self.uow, |ctx| {
            if !ctx.donations().claim(donation_id, requester_id).await? {
                return Ok(Settlement::LostRace);
            }
            if !ctx.requests().mark_fulfilled(request_id, donation_id).await? {
                // Rolls back the claim
                return Err(AppError::conflict(format!(
                    "Donation request {} is no longer pending",
                    request_id
                )));
            }
            Ok(Settlement::Fulfilled)
        });

        match settlement {
            Ok(Settlement::Fulfilled) => Ok(MatchOutcome::Fulfilled {
                request_id,
                donation_id,
            }),
            Ok(Settlement::LostRace) => Ok(MatchOutcome::LostRace {
                request_id,
                donation_id,
            }),
            Err(AppError::Conflict(_)) => Ok(MatchOutcome::AlreadyResolved { request_id }),
            Err(e) => Err(e),
        }
    }
}

fn log_outcome(outcome: &MatchOutcome) {
    match outcome {
        MatchOutcome::Fulfilled {
            request_id,
            donation_id,
        } => info!(request_id, donation_id, "Fulfilled donation request"),
        MatchOutcome::NoPreferences { request_id } => {
            debug!(request_id, "Skipping request without meal preferences")
        }
        MatchOutcome::NoMatch { request_id } => {
            debug!(request_id, "No unclaimed donation matches request")
        }
        MatchOutcome::LostRace {
            request_id,
            donation_id,
        } => warn!(request_id, donation_id, "Donation was claimed by someone else first"),
        MatchOutcome::AlreadyResolved { request_id } => {
            debug!(request_id, "Request left the pending state during the pass")
        }
        MatchOutcome::Failed { request_id, error } => {
            error!(request_id, error = %error, "Matching failed for request")
        }
    }
}

#[async_trait]
impl<U: UnitOfWork> MatchingService for MatchingEngine<U> {
    async fn check_and_fulfill(&self) -> AppResult<MatchReport> {
        let pending = self
            .uow
            .requests()
            .find_by_status(RequestStatus::Pending)
            .await?;

        let mut report = MatchReport::default();
        for request in &pending {
            let outcome = self.visit(request).await;
            log_outcome(&outcome);
            report.push(outcome);
        }

        if !report.is_noop() {
            info!(
                visited = pending.len(),
                fulfilled = report.fulfilled_count(),
                lost_race = report.lost_race_count(),
                failed = report.failed_count(),
                "Matching pass finished"
            );
        }
        Ok(report)
    }
}
