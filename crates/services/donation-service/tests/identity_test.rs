//! Identity resolution against a real store.

mod support;

use sea_orm::EntityTrait;

use common::AppError;
use domain::{Identity, MAX_NAME_SUFFIX_ATTEMPTS};
use donation_service_lib::repository::entities::user;
use support::{engine, engine_with_admin};

#[tokio::test]
async fn test_same_name_different_identities_get_suffixes() {
    let (_db, engine) = engine().await;

    let first = engine
        .resolve_user(Identity::external("sub-1", None, "Sam"))
        .await
        .unwrap();
    let second = engine
        .resolve_user(Identity::external("sub-2", None, "Sam"))
        .await
        .unwrap();
    let third = engine
        .resolve_user(Identity::external("sub-3", None, "Sam"))
        .await
        .unwrap();

    assert_eq!(first.name, "Sam");
    assert_eq!(second.name, "Sam1");
    assert_eq!(third.name, "Sam2");
}

#[tokio::test]
async fn test_same_identity_resolves_to_same_user() {
    let (_db, engine) = engine().await;

    let first = engine
        .resolve_user(Identity::external("sub-1", None, "Sam"))
        .await
        .unwrap();
    let again = engine
        .resolve_user(Identity::external("sub-1", None, "Sam"))
        .await
        .unwrap();

    assert_eq!(first.id, again.id);
    assert_eq!(again.name, "Sam");
    assert_eq!(again.external_id.as_deref(), Some("sub-1"));
}

#[tokio::test]
async fn test_name_space_exhaustion() {
    let (_db, engine) = engine().await;

    for i in 0..=MAX_NAME_SUFFIX_ATTEMPTS {
        engine
            .resolve_user(Identity::external(format!("sub-{}", i), None, "Sam"))
            .await
            .unwrap();
    }

    let result = engine
        .resolve_user(Identity::external("sub-overflow", None, "Sam"))
        .await;

    assert!(matches!(result, Err(AppError::NameExhausted { .. })));
}

#[tokio::test]
async fn test_name_only_identity_reuses_user() {
    let (_db, engine) = engine().await;

    let first = engine.resolve_user(Identity::named("Alice")).await.unwrap();
    let second = engine.resolve_user(Identity::named(" Alice ")).await.unwrap();

    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn test_lookup_by_email_links_external_identity() {
    let (_db, engine) = engine().await;

    let created = engine
        .resolve_user(Identity {
            external_id: None,
            email: Some("dana@example.com".to_string()),
            display_name: "Dana".to_string(),
        })
        .await
        .unwrap();
    let linked = engine
        .resolve_user(Identity::external(
            "sub-dana",
            Some("dana@example.com".to_string()),
            "Dana",
        ))
        .await
        .unwrap();
    let by_subject = engine
        .resolve_user(Identity::external("sub-dana", None, "Dana"))
        .await
        .unwrap();

    assert_eq!(created.id, linked.id);
    assert_eq!(linked.external_id.as_deref(), Some("sub-dana"));
    assert_eq!(by_subject.id, created.id);
}

#[tokio::test]
async fn test_rename_avoids_taken_name() {
    let (_db, engine) = engine().await;

    engine.resolve_user(Identity::named("Robin")).await.unwrap();
    let user = engine
        .resolve_user(Identity::external("sub-r", None, "Rob"))
        .await
        .unwrap();
    let renamed = engine
        .resolve_user(Identity::external("sub-r", None, "Robin"))
        .await
        .unwrap();

    assert_eq!(renamed.id, user.id);
    assert_eq!(renamed.name, "Robin1");
}

#[tokio::test]
async fn test_admin_email_sets_admin_flag() {
    let (_db, engine) = engine_with_admin(Some("boss@example.com")).await;

    let boss = engine
        .resolve_user(Identity::external(
            "sub-boss",
            Some("boss@example.com".to_string()),
            "Boss",
        ))
        .await
        .unwrap();
    let staff = engine
        .resolve_user(Identity::external(
            "sub-staff",
            Some("staff@example.com".to_string()),
            "Staff",
        ))
        .await
        .unwrap();

    assert!(boss.is_admin());
    assert!(!staff.is_admin());
}

#[tokio::test]
async fn test_sensitive_fields_not_stored_in_plaintext() {
    let (db, engine) = engine().await;

    engine
        .resolve_user(Identity::external(
            "oauth-subject-42",
            Some("erin@example.com".to_string()),
            "Erin",
        ))
        .await
        .unwrap();

    let rows = user::Entity::find().all(db.connection()).await.unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];

    let email_ct = row.email_encrypted.as_deref().unwrap();
    let subject_ct = row.external_id_encrypted.as_deref().unwrap();
    assert!(!email_ct.contains("erin@example.com"));
    assert!(!subject_ct.contains("oauth-subject-42"));

    let email_hash = row.email_hash.as_deref().unwrap();
    assert_eq!(email_hash.len(), 64);
    assert_ne!(email_hash, "erin@example.com");

    let cipher = support::cipher();
    assert_eq!(cipher.decrypt(email_ct).unwrap(), "erin@example.com");
    assert_eq!(email_hash, cipher.blind_index("erin@example.com").unwrap());
}

#[tokio::test]
async fn test_blank_name_rejected() {
    let (_db, engine) = engine().await;

    let result = engine.resolve_user(Identity::named("  ")).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}
