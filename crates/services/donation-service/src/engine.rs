//! Donation engine facade.
//!
//! The single entry point adapters talk to. Built once at process start and
//! shared; every operation runs under the configured [`StorePolicy`].
//! Creating a donation or a request is followed by a matching pass whose
//! errors are logged and never fail the creation itself.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{error, info};

use common::AppResult;
use domain::{
    ClaimedDonation, DonationRequestView, DonationSummary, Identity, MatchReport, Meal,
    NewDonationRequest, NewMeal, UnclaimedDonation, User,
};

use crate::config::DonationServiceConfig;
use crate::infra::{Database, Persistence, UnitOfWork};
use crate::policy::StorePolicy;
use crate::service::{
    DonationLedger, DonationRequestService, DonationService, IdentityResolver, IdentityService,
    MatchingEngine, MatchingService, MealCatalog, MealService, RequestQueue, SummaryProjector,
    SummaryService,
};

/// Donation allocation and fulfillment engine.
pub struct DonationEngine<U: UnitOfWork = Persistence> {
    identities: Arc<IdentityResolver>,
    meals: MealCatalog,
    ledger: DonationLedger,
    requests: RequestQueue<U>,
    matcher: MatchingEngine<U>,
    summary: SummaryProjector,
    policy: StorePolicy,
}

impl DonationEngine<Persistence> {
    /// Connect to the configured store, apply pending migrations and build the engine.
    pub async fn connect(config: &DonationServiceConfig) -> AppResult<Self> {
        let cipher = config.field_cipher()?;
        let db = Database::connect(&config.database).await?;
        let uow = Arc::new(Persistence::new(db.get_connection(), cipher));

        info!(policy = ?config.store_policy, "Donation engine ready");
        Ok(Self::new(
            uow,
            config.admin_email.clone(),
            StorePolicy::from(&config.store_policy),
        ))
    }
}

impl<U: UnitOfWork> DonationEngine<U> {
    pub fn new(uow: Arc<U>, admin_email: Option<String>, policy: StorePolicy) -> Self {
        let identities = Arc::new(IdentityResolver::new(uow.users(), admin_email));

        Self {
            meals: MealCatalog::new(uow.meals()),
            ledger: DonationLedger::new(
                identities.clone(),
                uow.users(),
                uow.meals(),
                uow.donations(),
            ),
            requests: RequestQueue::new(uow.clone(), identities.clone()),
            matcher: MatchingEngine::new(uow.clone()).with_request_timeout(policy.timeout()),
            summary: SummaryProjector::new(uow.users(), uow.donations()),
            identities,
            policy,
        }
    }

    // =========================================================================
    // Identity & meals
    // =========================================================================

    /// Find or create the user behind a login identity
    pub async fn resolve_user(&self, identity: Identity) -> AppResult<User> {
        self.policy
            .write("resolve_user", self.identities.resolve(identity))
            .await
    }

    pub async fn create_meal(&self, description: &str, date: NaiveDate) -> AppResult<Meal> {
        self.policy
            .write("create_meal", self.meals.create_meal(NewMeal::new(description, date)))
            .await
    }

    pub async fn meals_by_date(&self, date: NaiveDate) -> AppResult<Vec<Meal>> {
        self.policy
            .read("meals_by_date", || self.meals.meals_by_date(date))
            .await
    }

    pub async fn meals_between(&self, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<Meal>> {
        self.policy
            .read("meals_between", || self.meals.meals_between(start, end))
            .await
    }

    // =========================================================================
    // Donations
    // =========================================================================

    /// Record a donation and try to hand it to a waiting request.
    pub async fn create_donation(&self, meal_id: i32, donor_name: &str) -> AppResult<i32> {
        let donation = self
            .policy
            .write(
                "create_donation",
                self.ledger.create_donation(meal_id, Identity::named(donor_name)),
            )
            .await?;

        self.reconcile("donation created").await;
        Ok(donation.id)
    }

    /// Claim a donation.
    ///
    /// Fails with `NotFound` if there is no such donation and with `Conflict`
    /// if somebody already has it.
    pub async fn claim_donation(&self, donation_id: i32, claimant_name: &str) -> AppResult<()> {
        self.policy
            .write(
                "claim_donation",
                self.ledger
                    .claim_donation_checked(donation_id, Identity::named(claimant_name)),
            )
            .await
    }

    pub async fn unclaimed_donations_by_date(
        &self,
        date: NaiveDate,
    ) -> AppResult<Vec<UnclaimedDonation>> {
        self.policy
            .read("unclaimed_donations_by_date", || {
                self.summary.unclaimed_by_date(date)
            })
            .await
    }

    pub async fn donations_summary_by_date(
        &self,
        date: NaiveDate,
    ) -> AppResult<Vec<DonationSummary>> {
        self.policy
            .read("donations_summary_by_date", || self.summary.summary_by_date(date))
            .await
    }

    /// The donation `claimant_name` received on `date`, if any
    pub async fn claimed_donation(
        &self,
        claimant_name: &str,
        date: NaiveDate,
    ) -> AppResult<Option<ClaimedDonation>> {
        self.policy
            .read("claimed_donation", || {
                self.ledger.claimed_donation_for(claimant_name, date)
            })
            .await
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Queue a request for any of `meal_ids`, then run a matching pass.
    pub async fn create_donation_request(
        &self,
        requester_name: &str,
        meal_ids: Vec<i32>,
    ) -> AppResult<i32> {
        let request = self
            .policy
            .write(
                "create_donation_request",
                self.requests
                    .create_request(NewDonationRequest::new(requester_name, meal_ids)),
            )
            .await?;

        self.reconcile("request created").await;
        Ok(request.id)
    }

    pub async fn cancel_donation_request(&self, request_id: i32) -> AppResult<()> {
        self.policy
            .write("cancel_donation_request", self.requests.cancel_request(request_id))
            .await
    }

    pub async fn pending_donation_requests(&self) -> AppResult<Vec<DonationRequestView>> {
        self.policy
            .read("pending_donation_requests", || self.requests.pending_requests())
            .await
    }

    pub async fn donation_requests_by_requester(
        &self,
        requester_name: &str,
        date: Option<NaiveDate>,
    ) -> AppResult<Vec<DonationRequestView>> {
        self.policy
            .read("donation_requests_by_requester", || {
                self.requests.requests_by_requester(requester_name, date)
            })
            .await
    }

    // =========================================================================
    // Matching
    // =========================================================================

    /// Run one matching pass; each request is bounded by the store timeout.
    pub async fn check_and_fulfill(&self) -> AppResult<MatchReport> {
        self.matcher.check_and_fulfill().await
    }

    async fn reconcile(&self, trigger: &str) {
        match self.matcher.check_and_fulfill().await {
            Ok(report) => info!(
                trigger,
                visited = report.outcomes.len(),
                fulfilled = report.fulfilled_count(),
                "Triggered matching pass"
            ),
            Err(e) => error!(trigger, error = ?e, "Triggered matching pass failed"),
        }
    }
}
