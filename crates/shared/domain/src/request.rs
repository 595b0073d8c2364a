//! Donation request domain entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::constants::{STATUS_CANCELLED, STATUS_FULFILLED, STATUS_PENDING};
use crate::error::DomainError;

/// Lifecycle of a donation request. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Fulfilled,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => STATUS_PENDING,
            RequestStatus::Fulfilled => STATUS_FULFILLED,
            RequestStatus::Cancelled => STATUS_CANCELLED,
        }
    }

    /// Check if a request in this status can still move to `next`
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Fulfilled)
                | (RequestStatus::Pending, RequestStatus::Cancelled)
        )
    }
}

impl TryFrom<&str> for RequestStatus {
    type Error = DomainError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            STATUS_PENDING => Ok(RequestStatus::Pending),
            STATUS_FULFILLED => Ok(RequestStatus::Fulfilled),
            STATUS_CANCELLED => Ok(RequestStatus::Cancelled),
            other => Err(DomainError::internal(format!("Unknown request status '{}'", other))),
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A standing registration of interest in any of a set of meals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationRequest {
    pub id: i32,
    pub requester_id: i32,
    pub status: RequestStatus,
    /// Set only once the request is fulfilled
    pub donation_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Donation request creation data transfer object
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewDonationRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub requester_name: String,
    #[validate(length(min = 1, message = "must list at least one meal"))]
    pub meal_ids: Vec<i32>,
}

impl NewDonationRequest {
    /// Build the DTO, collapsing duplicate meal ids while keeping first-seen order.
    pub fn new(requester_name: impl Into<String>, meal_ids: Vec<i32>) -> Self {
        let mut unique = Vec::with_capacity(meal_ids.len());
        for id in meal_ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        Self {
            requester_name: requester_name.into().trim().to_string(),
            meal_ids: unique,
        }
    }
}

/// Donation request as shown to people.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationRequestView {
    pub id: i32,
    pub requester_name: String,
    /// Preferred meal descriptions joined with ", "
    pub description: String,
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub donation_id: Option<i32>,
}
