//! Matching passes against a real store.

mod support;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sea_orm::DbErr;

use common::{AppError, AppResult};
use domain::{Identity, MatchOutcome, RequestStatus};
use donation_service_lib::infra::{
    Database, Persistence, TransactionContext, TxFuture, UnitOfWork,
};
use donation_service_lib::policy::StorePolicy;
use donation_service_lib::repository::{
    DonationRepository, DonationRequestRepository, MealRepository, UserRepository,
};
use donation_service_lib::{with_transaction, DonationEngine};
use support::{day, engine};

#[tokio::test]
async fn test_request_is_fulfilled_by_matching_donation() {
    let (_db, engine) = engine().await;
    let pasta = engine.create_meal("Pasta", day(10)).await.unwrap();
    let salad = engine.create_meal("Salad", day(10)).await.unwrap();

    let donation_id = engine.create_donation(pasta.id, "Alice").await.unwrap();
    let request_id = engine
        .create_donation_request("Bob", vec![pasta.id, salad.id])
        .await
        .unwrap();

    let requests = engine
        .donation_requests_by_requester("Bob", None)
        .await
        .unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].id, request_id);
    assert_eq!(requests[0].status, RequestStatus::Fulfilled);
    assert_eq!(requests[0].donation_id, Some(donation_id));

    let summary = engine.donations_summary_by_date(day(10)).await.unwrap();
    assert_eq!(summary[0].recipient_name, "Bob");
    assert!(engine.pending_donation_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_donation_fulfills_waiting_request() {
    let (_db, engine) = engine().await;
    let pasta = engine.create_meal("Pasta", day(10)).await.unwrap();

    let request_id = engine
        .create_donation_request("Bob", vec![pasta.id])
        .await
        .unwrap();
    assert_eq!(engine.pending_donation_requests().await.unwrap().len(), 1);

    let donation_id = engine.create_donation(pasta.id, "Alice").await.unwrap();

    let requests = engine
        .donation_requests_by_requester("Bob", None)
        .await
        .unwrap();
    assert_eq!(requests[0].id, request_id);
    assert_eq!(requests[0].status, RequestStatus::Fulfilled);
    assert_eq!(requests[0].donation_id, Some(donation_id));
}

#[tokio::test]
async fn test_second_pass_changes_nothing() {
    let (_db, engine) = engine().await;
    let pasta = engine.create_meal("Pasta", day(10)).await.unwrap();
    let curry = engine.create_meal("Curry", day(10)).await.unwrap();
    engine.create_donation(pasta.id, "Alice").await.unwrap();
    engine.create_donation_request("Bob", vec![pasta.id]).await.unwrap();
    engine.create_donation_request("Carol", vec![curry.id]).await.unwrap();

    let before = engine.donations_summary_by_date(day(10)).await.unwrap();
    let pending_before = engine.pending_donation_requests().await.unwrap();

    let report = engine.check_and_fulfill().await.unwrap();

    assert!(report.is_noop());
    assert_eq!(engine.donations_summary_by_date(day(10)).await.unwrap(), before);
    assert_eq!(engine.pending_donation_requests().await.unwrap(), pending_before);
}

#[tokio::test]
async fn test_no_match_without_overlapping_donation() {
    let (_db, engine) = engine().await;
    let pasta = engine.create_meal("Pasta", day(10)).await.unwrap();
    let curry = engine.create_meal("Curry", day(10)).await.unwrap();
    let stew = engine.create_meal("Stew", day(11)).await.unwrap();

    engine.create_donation(pasta.id, "Alice").await.unwrap();
    let curry_request = engine
        .create_donation_request("Bob", vec![curry.id])
        .await
        .unwrap();
    let stew_request = engine
        .create_donation_request("Carol", vec![stew.id])
        .await
        .unwrap();

    for _ in 0..2 {
        let report = engine.check_and_fulfill().await.unwrap();
        assert_eq!(
            report.outcome_for(curry_request),
            Some(&MatchOutcome::NoMatch {
                request_id: curry_request
            })
        );
        assert_eq!(
            report.outcome_for(stew_request),
            Some(&MatchOutcome::NoMatch {
                request_id: stew_request
            })
        );
    }

    assert_eq!(engine.pending_donation_requests().await.unwrap().len(), 2);
    assert_eq!(engine.unclaimed_donations_by_date(day(10)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_oldest_request_wins_within_day() {
    let (_db, engine) = engine().await;
    let pasta = engine.create_meal("Pasta", day(10)).await.unwrap();
    let bob = engine
        .create_donation_request("Bob", vec![pasta.id])
        .await
        .unwrap();
    let carol = engine
        .create_donation_request("Carol", vec![pasta.id])
        .await
        .unwrap();

    engine.create_donation(pasta.id, "Alice").await.unwrap();

    let pending = engine.pending_donation_requests().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, carol);

    let bobs = engine
        .donation_requests_by_requester("Bob", None)
        .await
        .unwrap();
    assert_eq!(bobs[0].id, bob);
    assert_eq!(bobs[0].status, RequestStatus::Fulfilled);
}

#[tokio::test]
async fn test_cancelled_request_is_not_matched() {
    let (_db, engine) = engine().await;
    let pasta = engine.create_meal("Pasta", day(10)).await.unwrap();
    let request_id = engine
        .create_donation_request("Bob", vec![pasta.id])
        .await
        .unwrap();
    engine.cancel_donation_request(request_id).await.unwrap();

    engine.create_donation(pasta.id, "Alice").await.unwrap();

    assert_eq!(engine.unclaimed_donations_by_date(day(10)).await.unwrap().len(), 1);
    let requests = engine
        .donation_requests_by_requester("Bob", None)
        .await
        .unwrap();
    assert_eq!(requests[0].status, RequestStatus::Cancelled);
    assert_eq!(requests[0].donation_id, None);
}

#[tokio::test]
async fn test_only_first_preference_date_is_scanned() {
    let (_db, engine) = engine().await;
    let pasta = engine.create_meal("Pasta", day(10)).await.unwrap();
    let curry = engine.create_meal("Curry", day(11)).await.unwrap();
    let request_id = engine
        .create_donation_request("Bob", vec![curry.id, pasta.id])
        .await
        .unwrap();

    engine.create_donation(curry.id, "Alice").await.unwrap();

    let report = engine.check_and_fulfill().await.unwrap();
    assert_eq!(
        report.outcome_for(request_id),
        Some(&MatchOutcome::NoMatch { request_id })
    );
}

#[tokio::test]
async fn test_concurrent_passes_fulfill_once() {
    let db = support::connect().await;
    let uow = support::persistence(&db);
    let engine = DonationEngine::new(uow.clone(), None, StorePolicy::default());

    let pasta = engine.create_meal("Pasta", day(10)).await.unwrap();
    engine.create_donation_request("Bob", vec![pasta.id]).await.unwrap();
    engine.create_donation_request("Carol", vec![pasta.id]).await.unwrap();
    let alice = engine.resolve_user(Identity::named("Alice")).await.unwrap();

    // Straight into the ledger so no pass runs yet
    uow.donations().create(pasta.id, alice.id).await.unwrap();

    let (first, second) = tokio::join!(engine.check_and_fulfill(), engine.check_and_fulfill());
    let fulfilled = first.unwrap().fulfilled_count() + second.unwrap().fulfilled_count();

    assert_eq!(fulfilled, 1);
    assert_eq!(engine.pending_donation_requests().await.unwrap().len(), 1);
}

/// Something that happens right before the next transaction starts.
enum Interference {
    Claim { donation_id: i32, claimant_id: i32 },
    Cancel { request_id: i32 },
    Outage,
}

struct InterferingUnitOfWork {
    inner: Persistence,
    next: Mutex<Option<Interference>>,
}

impl InterferingUnitOfWork {
    fn new(db: &Database, interference: Interference) -> Arc<Self> {
        Arc::new(Self {
            inner: Persistence::new(db.get_connection(), support::cipher()),
            next: Mutex::new(Some(interference)),
        })
    }
}

#[async_trait]
impl UnitOfWork for InterferingUnitOfWork {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.inner.users()
    }

    fn meals(&self) -> Arc<dyn MealRepository> {
        self.inner.meals()
    }

    fn donations(&self) -> Arc<dyn DonationRepository> {
        self.inner.donations()
    }

    fn requests(&self) -> Arc<dyn DonationRequestRepository> {
        self.inner.requests()
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        let interference = self.next.lock().unwrap().take();
        match interference {
            Some(Interference::Claim {
                donation_id,
                claimant_id,
            }) => assert!(self.inner.donations().claim(donation_id, claimant_id).await?),
            Some(Interference::Cancel { request_id }) => {
                assert!(self.inner.requests().cancel(request_id).await?)
            }
            Some(Interference::Outage) => {
                return Err(AppError::from(DbErr::Custom("connection reset".into())))
            }
            None => {}
        }
        self.inner.transaction(f).await
    }
}

/// Two waiting requests (Bob for pasta, then Carol for curry) and one
/// unclaimed donation of each meal, stored without running a pass.
struct Scenario {
    bob: i32,
    carol: i32,
    pasta_donation: i32,
    curry_donation: i32,
}

async fn two_waiting_requests(db: &Database) -> Scenario {
    let setup = DonationEngine::new(support::persistence(db), None, StorePolicy::default());

    let pasta = setup.create_meal("Pasta", day(10)).await.unwrap();
    let curry = setup.create_meal("Curry", day(10)).await.unwrap();
    let bob = setup
        .create_donation_request("Bob", vec![pasta.id])
        .await
        .unwrap();
    let carol = setup
        .create_donation_request("Carol", vec![curry.id])
        .await
        .unwrap();
    let alice = setup.resolve_user(Identity::named("Alice")).await.unwrap();

    let ledger = support::persistence(db).donations();
    let pasta_donation = ledger.create(pasta.id, alice.id).await.unwrap().id;
    let curry_donation = ledger.create(curry.id, alice.id).await.unwrap().id;

    Scenario {
        bob,
        carol,
        pasta_donation,
        curry_donation,
    }
}

#[tokio::test]
async fn test_lost_race_is_reported_and_does_not_block() {
    let db = support::connect().await;
    let scenario = two_waiting_requests(&db).await;
    let thief = DonationEngine::new(support::persistence(&db), None, StorePolicy::default())
        .resolve_user(Identity::named("Mallory"))
        .await
        .unwrap();

    let uow = InterferingUnitOfWork::new(
        &db,
        Interference::Claim {
            donation_id: scenario.pasta_donation,
            claimant_id: thief.id,
        },
    );
    let engine = DonationEngine::new(uow, None, StorePolicy::default());

    let report = engine.check_and_fulfill().await.unwrap();

    assert_eq!(
        report.outcome_for(scenario.bob),
        Some(&MatchOutcome::LostRace {
            request_id: scenario.bob,
            donation_id: scenario.pasta_donation
        })
    );
    assert_eq!(
        report.outcome_for(scenario.carol),
        Some(&MatchOutcome::Fulfilled {
            request_id: scenario.carol,
            donation_id: scenario.curry_donation
        })
    );
    assert_eq!(report.lost_race_count(), 1);
    assert_eq!(report.failed_count(), 0);

    let pending = engine.pending_donation_requests().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, scenario.bob);

    let summary = engine.donations_summary_by_date(day(10)).await.unwrap();
    assert_eq!(summary[0].recipient_name, "Mallory");
    assert_eq!(summary[1].recipient_name, "Carol");
}

#[tokio::test]
async fn test_request_resolved_mid_pass_rolls_back_claim() {
    let db = support::connect().await;
    let scenario = two_waiting_requests(&db).await;

    let uow = InterferingUnitOfWork::new(
        &db,
        Interference::Cancel {
            request_id: scenario.bob,
        },
    );
    let engine = DonationEngine::new(uow, None, StorePolicy::default());

    let report = engine.check_and_fulfill().await.unwrap();

    assert_eq!(
        report.outcome_for(scenario.bob),
        Some(&MatchOutcome::AlreadyResolved {
            request_id: scenario.bob
        })
    );
    assert!(report.outcome_for(scenario.carol).unwrap().is_fulfilled());

    // The claim made before the failed mark did not survive
    let unclaimed = engine.unclaimed_donations_by_date(day(10)).await.unwrap();
    assert_eq!(unclaimed.len(), 1);
    assert_eq!(unclaimed[0].donation_id, scenario.pasta_donation);

    let bobs = engine
        .donation_requests_by_requester("Bob", None)
        .await
        .unwrap();
    assert_eq!(bobs[0].status, RequestStatus::Cancelled);
    assert_eq!(bobs[0].donation_id, None);
}

#[tokio::test]
async fn test_store_failure_is_recorded_and_pass_continues() {
    let db = support::connect().await;
    let scenario = two_waiting_requests(&db).await;

    let uow = InterferingUnitOfWork::new(&db, Interference::Outage);
    let engine = DonationEngine::new(uow, None, StorePolicy::default());

    let report = engine.check_and_fulfill().await.unwrap();

    match report.outcome_for(scenario.bob) {
        Some(MatchOutcome::Failed { request_id, error }) => {
            assert_eq!(*request_id, scenario.bob);
            assert!(error.contains("connection reset"), "cause missing: {error}");
        }
        other => panic!("expected a failed outcome, got {:?}", other),
    }
    assert!(report.outcome_for(scenario.carol).unwrap().is_fulfilled());
    assert_eq!(report.failed_count(), 1);

    let unclaimed = engine.unclaimed_donations_by_date(day(10)).await.unwrap();
    assert_eq!(unclaimed.len(), 1);
    assert_eq!(unclaimed[0].donation_id, scenario.pasta_donation);

    // The outage is over; the next pass picks Bob up
    let retry = engine.check_and_fulfill().await.unwrap();
    assert_eq!(
        retry.outcome_for(scenario.bob),
        Some(&MatchOutcome::Fulfilled {
            request_id: scenario.bob,
            donation_id: scenario.pasta_donation
        })
    );
}

#[tokio::test]
async fn test_request_without_preferences_is_skipped() {
    let db = support::connect().await;
    let uow = support::persistence(&db);
    let engine = DonationEngine::new(uow.clone(), None, StorePolicy::default());

    let pasta = engine.create_meal("Pasta", day(10)).await.unwrap();
    let bob_id = engine.resolve_user(Identity::named("Bob")).await.unwrap().id;
    let empty = with_transaction!(uow, |ctx| {
        ctx.requests().create(bob_id, &[]).await
    })
    .unwrap();
    let carol = engine
        .create_donation_request("Carol", vec![pasta.id])
        .await
        .unwrap();
    let alice = engine.resolve_user(Identity::named("Alice")).await.unwrap();
    let donation = uow.donations().create(pasta.id, alice.id).await.unwrap();

    let report = engine.check_and_fulfill().await.unwrap();

    assert_eq!(report.outcomes[0], MatchOutcome::NoPreferences { request_id: empty.id });
    assert_eq!(
        report.outcome_for(carol),
        Some(&MatchOutcome::Fulfilled {
            request_id: carol,
            donation_id: donation.id
        })
    );

    let pending = engine.pending_donation_requests().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, empty.id);
    assert_eq!(pending[0].description, "");
}
