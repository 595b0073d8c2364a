//! Domain layer - Core business entities and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.
//! All types here are shared between the donation core and its adapters.

pub mod constants;
pub mod donation;
pub mod error;
pub mod matching;
pub mod meal;
pub mod request;
pub mod user;

pub use constants::*;
pub use donation::{ClaimedDonation, Donation, DonationSummary, UnclaimedDonation};
pub use error::{DomainError, DomainResult};
pub use matching::{MatchOutcome, MatchReport};
pub use meal::{Meal, NewMeal};
pub use request::{DonationRequest, DonationRequestView, NewDonationRequest, RequestStatus};
pub use user::{name_candidates, normalize_display_name, Identity, User, UserRole};
