//! End-to-end login lifecycle: account rows in sqlite, tokens in the
//! cache, and the validation pipeline between them.

use std::time::Duration;

use server::auth::{clear_token, create_token, validate_token, ClientInfo, TokenError};
use server::cache::MemoryCache;
use server::database::create::{init_schema, open_pool};
use server::database::users;
use server::database::utils::{hash_password, verify_password};

const SECRET: &str = "integration-test-secret-0123456789ab";

fn phone() -> ClientInfo {
    ClientInfo {
        user_agent: Some("MyApp/2.1 (iPhone; iOS 17)".to_string()),
        ident: Some("appstore-ios-device-aaaa".to_string()),
    }
}

fn tablet() -> ClientInfo {
    ClientInfo {
        user_agent: Some("MyApp/2.1 (iPad; iPadOS 17)".to_string()),
        ident: Some("appstore-ios-device-bbbb".to_string()),
    }
}

async fn fresh_db() -> sqlx::SqlitePool {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("auth_flow.db");
    std::mem::forget(dir);
    let pool = open_pool(path.to_str().unwrap(), 4).await.unwrap();
    init_schema(&pool).await.unwrap();
    pool
}

#[tokio::test]
async fn register_login_validate_round_trip() {
    let db = fresh_db().await;
    let cache = MemoryCache::new();

    let hash = hash_password("s3cretpw").unwrap();
    let user = users::create(&db, "15800881234", &hash).await.unwrap();
    assert!(verify_password("s3cretpw", &user.password_hash));

    let token = create_token(&cache, SECRET, user.id, &user.password_hash, &phone(), 3600)
        .await
        .unwrap();

    let session = validate_token(&cache, SECRET, &token, &phone())
        .await
        .unwrap();
    assert_eq!(session.user_id, user.id);

    // The session resolves back to the stored account.
    let resolved = users::get_by_id(&db, session.user_id).await.unwrap().unwrap();
    assert_eq!(resolved.account, "15800881234");
    assert!(resolved.is_active());
}

#[tokio::test]
async fn token_from_another_device_is_rejected() {
    let cache = MemoryCache::new();
    let token = create_token(&cache, SECRET, 7, "hash", &phone(), 3600)
        .await
        .unwrap();

    let err = validate_token(&cache, SECRET, &token, &tablet())
        .await
        .unwrap_err();
    assert!(matches!(err, TokenError::Changed { user_id: 7 }));
}

#[tokio::test]
async fn logout_kills_the_session_and_is_idempotent() {
    let cache = MemoryCache::new();
    let token = create_token(&cache, SECRET, 7, "hash", &phone(), 3600)
        .await
        .unwrap();

    clear_token(&cache, 7).await.unwrap();
    clear_token(&cache, 7).await.unwrap();

    let err = validate_token(&cache, SECRET, &token, &phone())
        .await
        .unwrap_err();
    assert!(matches!(err, TokenError::Invalid { user_id: 7 }));
}

#[tokio::test]
async fn new_login_evicts_the_old_one() {
    let cache = MemoryCache::new();
    let first = create_token(&cache, SECRET, 7, "hash", &phone(), 3600)
        .await
        .unwrap();

    // Tokens minted in the same second tie on issued_at and both stay
    // valid; wait so the second login is strictly newer.
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let second = create_token(&cache, SECRET, 7, "hash", &tablet(), 3600)
        .await
        .unwrap();

    assert!(validate_token(&cache, SECRET, &second, &tablet()).await.is_ok());
    let err = validate_token(&cache, SECRET, &first, &phone())
        .await
        .unwrap_err();
    assert!(matches!(err, TokenError::Invalid { user_id: 7 }));
}

#[tokio::test]
async fn password_change_plus_relogin_invalidates_old_token() {
    let db = fresh_db().await;
    let cache = MemoryCache::new();

    let old_hash = hash_password("old-password").unwrap();
    let user = users::create(&db, "15800881234", &old_hash).await.unwrap();

    let old_token = create_token(&cache, SECRET, user.id, &user.password_hash, &phone(), 3600)
        .await
        .unwrap();

    // update_password handler: store new hash, clear the slot.
    let new_hash = hash_password("new-password").unwrap();
    users::update_password(&db, user.id, &new_hash).await.unwrap();
    clear_token(&cache, user.id).await.unwrap();

    let err = validate_token(&cache, SECRET, &old_token, &phone())
        .await
        .unwrap_err();
    assert!(matches!(err, TokenError::Invalid { .. }));

    // Re-login on the same device with the new hash.
    let user = users::get_by_id(&db, user.id).await.unwrap().unwrap();
    assert!(verify_password("new-password", &user.password_hash));
    let new_token = create_token(&cache, SECRET, user.id, &user.password_hash, &phone(), 3600)
        .await
        .unwrap();
    assert!(validate_token(&cache, SECRET, &new_token, &phone()).await.is_ok());

    // The pre-change token still loses, now on the hash comparison.
    let err = validate_token(&cache, SECRET, &old_token, &phone())
        .await
        .unwrap_err();
    assert!(matches!(err, TokenError::Invalid { .. }));
}

#[tokio::test]
async fn idle_session_expires_but_active_session_survives() {
    let cache = MemoryCache::new();

    // 2-second lifetime.  An idle token dies...
    let idle = create_token(&cache, SECRET, 7, "hash", &phone(), 2)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(2300)).await;
    let err = validate_token(&cache, SECRET, &idle, &phone())
        .await
        .unwrap_err();
    assert!(matches!(err, TokenError::Invalid { user_id: 7 }));

    // ...while one that keeps validating has its TTL renewed each time.
    let active = create_token(&cache, SECRET, 7, "hash", &phone(), 2)
        .await
        .unwrap();
    for _ in 0..3 {
        tokio::time::sleep(Duration::from_millis(1200)).await;
        validate_token(&cache, SECRET, &active, &phone())
            .await
            .expect("active session should stay alive past the original TTL");
    }
}
