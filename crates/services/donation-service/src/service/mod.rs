//! Service layer - Business logic.

mod donation_service;
mod identity_service;
mod matching;
mod meal_service;
mod request_service;
mod summary_service;

pub use donation_service::{DonationLedger, DonationService};
pub use identity_service::{IdentityResolver, IdentityService};
pub use matching::{MatchingEngine, MatchingService};
pub use meal_service::{MealCatalog, MealService};
pub use request_service::{DonationRequestService, RequestQueue};
pub use summary_service::{SummaryProjector, SummaryService};

#[cfg(any(test, feature = "test-utils"))]
pub use identity_service::MockIdentityService;
