//! Donation service - Records donations and hands them out.
//!
//! A claim is one conditional UPDATE that only touches a donation without a
//! recipient, so concurrent claimants can never both win.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info};

use common::{AppError, AppResult};
use domain::{ClaimedDonation, Donation, Identity};

use crate::repository::{DonationRepository, MealRepository, UserRepository};
use crate::service::IdentityService;

/// Donation service trait for dependency injection.
#[async_trait]
pub trait DonationService: Send + Sync {
    /// Record a donation of `meal_id` by the donor, unclaimed
    async fn create_donation(&self, meal_id: i32, donor: Identity) -> AppResult<Donation>;

    /// Try to assign the donation to the claimant.
    ///
    /// Returns `false` when the donation does not exist or already has a
    /// recipient; this is an expected outcome, not an error.
    async fn claim_donation(&self, donation_id: i32, claimant: Identity) -> AppResult<bool>;

    /// Like [`DonationService::claim_donation`], but a lost claim becomes
    /// `NotFound` (no such donation) or `Conflict` (already claimed).
    async fn claim_donation_checked(&self, donation_id: i32, claimant: Identity) -> AppResult<()>;

    /// The donation a person received on a date, if any
    async fn claimed_donation_for(
        &self,
        claimant_name: &str,
        date: NaiveDate,
    ) -> AppResult<Option<ClaimedDonation>>;
}

/// Concrete implementation of DonationService.
pub struct DonationLedger {
    identities: Arc<dyn IdentityService>,
    users: Arc<dyn UserRepository>,
    meals: Arc<dyn MealRepository>,
    donations: Arc<dyn DonationRepository>,
}

impl DonationLedger {
    pub fn new(
        identities: Arc<dyn IdentityService>,
        users: Arc<dyn UserRepository>,
        meals: Arc<dyn MealRepository>,
        donations: Arc<dyn DonationRepository>,
    ) -> Self {
        Self {
            identities,
            users,
            meals,
            donations,
        }
    }
}

#[async_trait]
impl DonationService for DonationLedger {
    async fn create_donation(&self, meal_id: i32, donor: Identity) -> AppResult<Donation> {
        if self.meals.find_by_id(meal_id).await?.is_none() {
            return Err(AppError::validation(format!("Meal {} does not exist", meal_id)));
        }

        let donor = self.identities.resolve(donor).await?;
        let donation = self.donations.create(meal_id, donor.id).await?;

        info!(
            donation_id = donation.id,
            meal_id,
            donor_id = donor.id,
            "Created donation"
        );
        Ok(donation)
    }

    async fn claim_donation(&self, donation_id: i32, claimant: Identity) -> AppResult<bool> {
        let claimant = self.identities.resolve(claimant).await?;
        let claimed = self.donations.claim(donation_id, claimant.id).await?;

        if claimed {
            info!(donation_id, recipient_id = claimant.id, "Donation claimed");
        } else {
            debug!(donation_id, recipient_id = claimant.id, "Donation not claimable");
        }
        Ok(claimed)
    }

    async fn claim_donation_checked(&self, donation_id: i32, claimant: Identity) -> AppResult<()> {
        if self.claim_donation(donation_id, claimant).await? {
            return Ok(());
        }

        match self.donations.find_by_id(donation_id).await? {
            None => Err(AppError::not_found(format!("Donation {}", donation_id))),
            Some(_) => Err(AppError::conflict(format!(
                "Donation {} is already claimed",
                donation_id
            ))),
        }
    }

    async fn claimed_donation_for(
        &self,
        claimant_name: &str,
        date: NaiveDate,
    ) -> AppResult<Option<ClaimedDonation>> {
        let Some(recipient) = self.users.find_by_name(claimant_name.trim()).await? else {
            return Ok(None);
        };

        let Some((donation, meal)) = self
            .donations
            .find_claimed_by_recipient(recipient.id, date)
            .await?
        else {
            return Ok(None);
        };

        let names = self.users.names_by_ids(vec![donation.donor_id]).await?;
        let donor_name = names
            .get(&donation.donor_id)
            .cloned()
            .ok_or_else(|| AppError::internal(format!("Donor {} missing", donation.donor_id)))?;

        Ok(Some(ClaimedDonation {
            donation_id: donation.id,
            donor_name,
            meal_description: meal.description,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MockDonationRepository, MockMealRepository, MockUserRepository};
    use crate::service::MockIdentityService;
    use chrono::Utc;
    use domain::{Meal, User, UserRole};

    fn user(id: i32, name: &str) -> User {
        User {
            id,
            name: name.to_string(),
            email: None,
            external_id: None,
            role: UserRole::User,
            created_at: Utc::now(),
        }
    }

    fn donation(id: i32, recipient_id: Option<i32>) -> Donation {
        Donation {
            id,
            meal_id: 5,
            donor_id: 1,
            recipient_id,
            created_at: Utc::now(),
        }
    }

    fn resolving(id: i32) -> MockIdentityService {
        let mut identities = MockIdentityService::new();
        identities
            .expect_resolve()
            .returning(move |identity| Ok(user(id, &identity.display_name)));
        identities
    }

    fn ledger(
        identities: MockIdentityService,
        meals: MockMealRepository,
        donations: MockDonationRepository,
    ) -> DonationLedger {
        DonationLedger::new(
            Arc::new(identities),
            Arc::new(MockUserRepository::new()),
            Arc::new(meals),
            Arc::new(donations),
        )
    }

    #[tokio::test]
    async fn test_create_donation_unknown_meal() {
        let mut meals = MockMealRepository::new();
        meals.expect_find_by_id().returning(|_| Ok(None));
        let mut donations = MockDonationRepository::new();
        donations.expect_create().times(0);

        let mut identities = MockIdentityService::new();
        identities.expect_resolve().times(0);

        let result = ledger(identities, meals, donations)
            .create_donation(42, Identity::named("Alice"))
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_donation_records_donor() {
        let mut meals = MockMealRepository::new();
        meals.expect_find_by_id().returning(|id| {
            Ok(Some(Meal {
                id,
                description: "Pasta".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            }))
        });
        let mut donations = MockDonationRepository::new();
        donations
            .expect_create()
            .withf(|meal_id, donor_id| *meal_id == 5 && *donor_id == 1)
            .times(1)
            .returning(|_, _| Ok(donation(9, None)));

        let created = ledger(resolving(1), meals, donations)
            .create_donation(5, Identity::named("Alice"))
            .await
            .unwrap();

        assert_eq!(created.id, 9);
        assert!(!created.is_claimed());
    }

    #[tokio::test]
    async fn test_lost_claim_on_claimed_donation_is_conflict() {
        let mut donations = MockDonationRepository::new();
        donations.expect_claim().returning(|_, _| Ok(false));
        donations
            .expect_find_by_id()
            .returning(|id| Ok(Some(donation(id, Some(3)))));

        let result = ledger(resolving(2), MockMealRepository::new(), donations)
            .claim_donation_checked(9, Identity::named("Bob"))
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_lost_claim_on_missing_donation_is_not_found() {
        let mut donations = MockDonationRepository::new();
        donations.expect_claim().returning(|_, _| Ok(false));
        donations.expect_find_by_id().returning(|_| Ok(None));

        let result = ledger(resolving(2), MockMealRepository::new(), donations)
            .claim_donation_checked(404, Identity::named("Bob"))
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_successful_claim_skips_lookup() {
        let mut donations = MockDonationRepository::new();
        donations
            .expect_claim()
            .withf(|id, recipient| *id == 9 && *recipient == 2)
            .returning(|_, _| Ok(true));
        donations.expect_find_by_id().times(0);

        ledger(resolving(2), MockMealRepository::new(), donations)
            .claim_donation_checked(9, Identity::named("Bob"))
            .await
            .unwrap();
    }
}
