//! Request queue behavior against a real store.

mod support;

use common::AppError;
use domain::RequestStatus;
use support::{day, engine};

#[tokio::test]
async fn test_empty_preference_list_rejected() {
    let (_db, engine) = engine().await;

    let result = engine.create_donation_request("Bob", vec![]).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_unknown_meal_rejected() {
    let (_db, engine) = engine().await;
    let pasta = engine.create_meal("Pasta", day(10)).await.unwrap();

    let result = engine
        .create_donation_request("Bob", vec![pasta.id, 999])
        .await;

    match result {
        Err(AppError::Validation(msg)) => assert!(msg.contains("999")),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(engine.pending_donation_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_blank_requester_rejected() {
    let (_db, engine) = engine().await;
    let pasta = engine.create_meal("Pasta", day(10)).await.unwrap();

    let result = engine.create_donation_request("   ", vec![pasta.id]).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_pending_view_joins_descriptions() {
    let (_db, engine) = engine().await;
    let pasta = engine.create_meal("Pasta", day(10)).await.unwrap();
    let salad = engine.create_meal("Salad", day(10)).await.unwrap();

    let request_id = engine
        .create_donation_request("Bob", vec![salad.id, pasta.id, salad.id])
        .await
        .unwrap();

    let pending = engine.pending_donation_requests().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, request_id);
    assert_eq!(pending[0].requester_name, "Bob");
    assert_eq!(pending[0].description, "Pasta, Salad");
    assert_eq!(pending[0].status, RequestStatus::Pending);
    assert_eq!(pending[0].donation_id, None);
}

#[tokio::test]
async fn test_cancellation_is_forward_only() {
    let (_db, engine) = engine().await;
    let pasta = engine.create_meal("Pasta", day(10)).await.unwrap();
    let curry = engine.create_meal("Curry", day(10)).await.unwrap();

    let waiting = engine
        .create_donation_request("Bob", vec![curry.id])
        .await
        .unwrap();
    engine.cancel_donation_request(waiting).await.unwrap();
    let again = engine.cancel_donation_request(waiting).await;
    assert!(matches!(again, Err(AppError::Conflict(msg)) if msg.ends_with("already cancelled")));

    engine.create_donation(pasta.id, "Alice").await.unwrap();
    let fulfilled = engine
        .create_donation_request("Carol", vec![pasta.id])
        .await
        .unwrap();
    let too_late = engine.cancel_donation_request(fulfilled).await;
    assert!(matches!(too_late, Err(AppError::Conflict(msg)) if msg.ends_with("already fulfilled")));

    let carols = engine
        .donation_requests_by_requester("Carol", None)
        .await
        .unwrap();
    assert_eq!(carols[0].status, RequestStatus::Fulfilled);
}

#[tokio::test]
async fn test_cancel_missing_request_is_not_found() {
    let (_db, engine) = engine().await;

    let result = engine.cancel_donation_request(404).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_requests_by_requester_filters_by_date() {
    let (_db, engine) = engine().await;
    let pasta = engine.create_meal("Pasta", day(10)).await.unwrap();
    let curry = engine.create_meal("Curry", day(11)).await.unwrap();
    let stew = engine.create_meal("Stew", day(11)).await.unwrap();

    let tenth = engine
        .create_donation_request("Bob", vec![pasta.id])
        .await
        .unwrap();
    let eleventh = engine
        .create_donation_request("Bob", vec![curry.id, stew.id])
        .await
        .unwrap();
    engine
        .create_donation_request("Carol", vec![pasta.id])
        .await
        .unwrap();

    let all: Vec<i32> = engine
        .donation_requests_by_requester("Bob", None)
        .await
        .unwrap()
        .iter()
        .map(|v| v.id)
        .collect();
    assert_eq!(all, vec![tenth, eleventh]);

    let on_eleventh = engine
        .donation_requests_by_requester("Bob", Some(day(11)))
        .await
        .unwrap();
    assert_eq!(on_eleventh.len(), 1);
    assert_eq!(on_eleventh[0].id, eleventh);
    assert_eq!(on_eleventh[0].description, "Curry, Stew");

    assert!(engine
        .donation_requests_by_requester("Bob", Some(day(12)))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_requests_of_unknown_person_not_found() {
    let (_db, engine) = engine().await;

    let result = engine.donation_requests_by_requester("Nobody", None).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}
