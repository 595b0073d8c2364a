//! Summary service - Read-only views of a day's donations.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use common::{AppResult, OptionExt};
use domain::{DonationSummary, UnclaimedDonation};

use crate::repository::{DonationRepository, UserRepository};

/// Summary service trait for dependency injection.
#[async_trait]
pub trait SummaryService: Send + Sync {
    /// Donations still up for grabs on a date
    async fn unclaimed_by_date(&self, date: NaiveDate) -> AppResult<Vec<UnclaimedDonation>>;

    /// Every donation on a date with its recipient, or `UNCLAIMED`
    async fn summary_by_date(&self, date: NaiveDate) -> AppResult<Vec<DonationSummary>>;
}

/// Concrete implementation of SummaryService.
pub struct SummaryProjector {
    users: Arc<dyn UserRepository>,
    donations: Arc<dyn DonationRepository>,
}

impl SummaryProjector {
    pub fn new(users: Arc<dyn UserRepository>, donations: Arc<dyn DonationRepository>) -> Self {
        Self { users, donations }
    }

    async fn names_for(&self, ids: impl Iterator<Item = i32>) -> AppResult<HashMap<i32, String>> {
        let ids: HashSet<i32> = ids.collect();
        self.users.names_by_ids(ids.into_iter().collect()).await
    }
}

fn name_of(names: &HashMap<i32, String>, id: i32) -> AppResult<String> {
    names.get(&id).cloned().ok_or_not_found(format!("User {}", id))
}

#[async_trait]
impl SummaryService for SummaryProjector {
    async fn unclaimed_by_date(&self, date: NaiveDate) -> AppResult<Vec<UnclaimedDonation>> {
        let rows = self.donations.find_unclaimed_by_date(date).await?;
        let names = self.names_for(rows.iter().map(|(d, _)| d.donor_id)).await?;

        rows.into_iter()
            .map(|(donation, meal)| {
                Ok(UnclaimedDonation {
                    donation_id: donation.id,
                    donor_name: name_of(&names, donation.donor_id)?,
                    meal_description: meal.description,
                })
            })
            .collect()
    }

    async fn summary_by_date(&self, date: NaiveDate) -> AppResult<Vec<DonationSummary>> {
        let rows = self.donations.find_by_date(date).await?;
        let names = self
            .names_for(
                rows.iter()
                    .flat_map(|(d, _)| std::iter::once(d.donor_id).chain(d.recipient_id)),
            )
            .await?;

        rows.into_iter()
            .map(|(donation, meal)| {
                let recipient_name = donation
                    .recipient_id
                    .map(|id| name_of(&names, id))
                    .transpose()?;
                Ok(DonationSummary::new(
                    donation.id,
                    meal.description,
                    name_of(&names, donation.donor_id)?,
                    recipient_name,
                ))
            })
            .collect()
    }
}
