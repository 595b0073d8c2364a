//! Donation domain entity and its read projections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::UNCLAIMED_LABEL;

/// A donated meal instance.
///
/// `recipient_id` is `None` until the donation is claimed, after which it
/// never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donation {
    pub id: i32,
    pub meal_id: i32,
    pub donor_id: i32,
    pub recipient_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl Donation {
    /// Check if someone already received this donation
    pub fn is_claimed(&self) -> bool {
        self.recipient_id.is_some()
    }
}

/// Row of the "available today" listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnclaimedDonation {
    pub donation_id: i32,
    pub donor_name: String,
    pub meal_description: String,
}

/// Row of the per-day donation summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationSummary {
    pub donation_id: i32,
    pub claimed: bool,
    pub meal_description: String,
    pub donor_name: String,
    /// Recipient display name, or `UNCLAIMED`
    pub recipient_name: String,
}

impl DonationSummary {
    pub fn new(
        donation_id: i32,
        meal_description: String,
        donor_name: String,
        recipient_name: Option<String>,
    ) -> Self {
        Self {
            donation_id,
            claimed: recipient_name.is_some(),
            meal_description,
            donor_name,
            recipient_name: recipient_name.unwrap_or_else(|| UNCLAIMED_LABEL.to_string()),
        }
    }
}

/// A donation as seen by the person who received it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimedDonation {
    pub donation_id: i32,
    pub donor_name: String,
    pub meal_description: String,
}
