//! Repository layer for data access.

pub mod entities;
mod donation_repository;
mod donation_request_repository;
mod meal_repository;
mod user_repository;

pub use donation_repository::{DonationRepository, DonationStore, TxDonationRepository};
pub use donation_request_repository::{
    DonationRequestRepository, DonationRequestStore, TxDonationRequestRepository,
};
pub use meal_repository::{MealRepository, MealStore};
pub use user_repository::{NewUserRecord, UserChanges, UserRepository, UserStore};

#[cfg(any(test, feature = "test-utils"))]
pub use donation_repository::MockDonationRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use donation_request_repository::MockDonationRequestRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use meal_repository::MockMealRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
