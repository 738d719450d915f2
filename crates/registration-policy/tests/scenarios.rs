//! End-to-end policy scenarios through the admin adapter and the engine.

use registration_policy::{
    AdminConfig, EngineStatus, InMemoryPolicyStore, PolicyAdmin, PolicyEngine, PolicyError,
    PolicyStore,
};
use std::sync::Arc;

fn setup() -> PolicyAdmin {
    let store: Arc<dyn PolicyStore> = Arc::new(InMemoryPolicyStore::new());
    let engine = Arc::new(PolicyEngine::new(store.clone()));
    PolicyAdmin::new(store, engine, AdminConfig::default())
}

async fn apply(admin: &PolicyAdmin, pairs: &[(&str, &str)]) {
    for (key, value) in pairs {
        admin.upsert_by_key(key, value).await.unwrap();
    }
}

/// Lengths 8..30, at least one of every class, `-.#&` allowed.
async fn strict_defaults() -> PolicyAdmin {
    let admin = setup();
    apply(
        &admin,
        &[
            ("password.min.length", "8"),
            ("password.max.length", "30"),
            ("password.min.uppercase", "1"),
            ("password.min.lowercase", "1"),
            ("password.min.digits", "1"),
            ("password.min.special", "1"),
            ("password.allowed.special", "-.#&"),
        ],
    )
    .await;
    admin
}

async fn check(admin: &PolicyAdmin, cases: &[(&str, bool)]) {
    for (password, expected) in cases {
        assert_eq!(
            admin.engine().validate(password).await.unwrap(),
            *expected,
            "password {:?}",
            password
        );
    }
}

const STRICT_CASES: &[(&str, bool)] = &[
    ("Password1#", true),
    ("Abcdef1&", true),
    ("StrongP4$$w0rd", false),
    ("Pass1-", false),
    ("ALLCAPS123#", false),
    ("alllowercase123#", false),
    ("Password#", false),
    ("Password12", false),
    (
        "ThisPasswordIsWayTooLongForTheMaximumAllowedLength1234567890#",
        false,
    ),
];

#[tokio::test]
async fn strict_defaults_accept_and_reject_literal_passwords() {
    let admin = strict_defaults().await;
    check(&admin, STRICT_CASES).await;
}

#[tokio::test]
async fn only_min_length_configured() {
    let admin = setup();
    apply(&admin, &[("password.min.length", "6")]).await;
    check(&admin, &[("simple", true), ("short", false)]).await;
}

#[tokio::test]
async fn min_length_and_min_digits() {
    let admin = setup();
    apply(
        &admin,
        &[("password.min.length", "4"), ("password.min.digits", "2")],
    )
    .await;
    check(&admin, &[("test12", true), ("test1", false)]).await;
}

#[tokio::test]
async fn upsert_then_validate_uses_the_new_minimum() {
    let admin = strict_defaults().await;
    check(&admin, &[("Passwd1#", true)]).await;

    admin
        .upsert_by_key("password.min.length", "10")
        .await
        .unwrap();

    check(&admin, &[("Password1#", true), ("Passwd1#", false)]).await;
    assert!(admin.describe().await.unwrap().contains("{10,30}"));
}

#[tokio::test]
async fn inconsistent_upsert_keeps_the_previous_matcher() {
    let admin = strict_defaults().await;
    check(&admin, &[("Password1#", true)]).await;

    let err = admin
        .upsert_by_key("password.min.length", "40")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PolicyError::Inconsistent {
            min_len: 40,
            max_len: 30
        }
    ));

    assert_eq!(admin.engine().status(), EngineStatus::Failing);
    check(&admin, STRICT_CASES).await;
}

#[tokio::test]
async fn unknown_key_does_not_change_verdicts() {
    let admin = strict_defaults().await;
    let view = admin.upsert_by_key("some.other.key", "xyz").await.unwrap();
    assert_eq!(view.key, "some.other.key");
    assert_eq!(view.value, "xyz");

    check(&admin, STRICT_CASES).await;
    assert_eq!(admin.get_all().await.unwrap().len(), 8);
}

#[tokio::test]
async fn repeated_upsert_is_idempotent() {
    let admin = setup();
    let first = admin
        .upsert_by_key("password.min.digits", "2")
        .await
        .unwrap();
    let second = admin
        .upsert_by_key("password.min.digits", "2")
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.value, second.value);
    assert_eq!(first.created_at, second.created_at);
    assert_eq!(admin.get_all().await.unwrap().len(), 1);
    assert_eq!(admin.list_types().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn validators_only_see_committed_policies() {
    let admin = Arc::new(strict_defaults().await);
    // Valid under min.length 8 and 9, never under anything else.
    let lengths = ["9", "8"];

    let writer = {
        let admin = admin.clone();
        tokio::spawn(async move {
            for i in 0..50 {
                admin
                    .upsert_by_key("password.min.length", lengths[i % 2])
                    .await
                    .unwrap();
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..4 {
        let admin = admin.clone();
        readers.push(tokio::spawn(async move {
            for _ in 0..200 {
                // Length 10 passes under both committed policies.
                assert!(admin.engine().validate("Password1#").await.unwrap());
                // Length 7 fails under both.
                assert!(!admin.engine().validate("Passw1#").await.unwrap());
            }
        }));
    }

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
}
