use petadopt::{
    cache::KeyValueStore,
    error::ErrorKind,
    services::Confirmation,
    test_utils::test_helpers::{self, RecordingEmailService},
};
use std::sync::Arc;

#[tokio::test]
async fn test_request_then_confirm_verifies_account() {
    let mailer = Arc::new(RecordingEmailService::new());
    let (state, store) = test_helpers::create_test_state(mailer.clone())
        .await
        .unwrap();
    let account_id = test_helpers::insert_test_account(&state.pool, "user@x.com", "password123", false)
        .await
        .unwrap();

    let account = state.account_service.get_account(account_id).await.unwrap();
    let token = state
        .verification_service
        .request_verification(&account)
        .await
        .unwrap();

    let token_key = format!("verification:token:{}", token);
    assert_eq!(
        store.get(&token_key).await.unwrap().as_deref(),
        Some("user@x.com")
    );

    // Delivery runs in the background
    let sent = mailer.wait_for(1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "user@x.com");
    assert!(sent[0]
        .html_body
        .contains(&format!("https://app.petadopt.test/verify-email?token={}", token)));

    let outcome = state
        .verification_service
        .confirm_verification(&token, &account)
        .await
        .unwrap();
    assert_eq!(outcome, Confirmation::Verified);

    let reloaded = state.account_service.get_account(account_id).await.unwrap();
    assert!(reloaded.is_verified);
    assert!(!store.contains_key(&token_key).await);
}

#[tokio::test]
async fn test_confirming_twice_succeeds_both_times() {
    let mailer = Arc::new(RecordingEmailService::new());
    let (state, _store) = test_helpers::create_test_state(mailer).await.unwrap();
    let account_id = test_helpers::insert_test_account(&state.pool, "twice@x.com", "password123", false)
        .await
        .unwrap();

    let account = state.account_service.get_account(account_id).await.unwrap();
    let token = state
        .verification_service
        .request_verification(&account)
        .await
        .unwrap();

    let first = state
        .verification_service
        .confirm_verification(&token, &account)
        .await
        .unwrap();

    let account = state.account_service.get_account(account_id).await.unwrap();
    let second = state
        .verification_service
        .confirm_verification(&token, &account)
        .await
        .unwrap();

    assert_eq!(first, Confirmation::Verified);
    assert_eq!(second, Confirmation::AlreadyVerified);
}

#[tokio::test]
async fn test_token_of_another_account_is_refused() {
    let mailer = Arc::new(RecordingEmailService::new());
    let (state, _store) = test_helpers::create_test_state(mailer).await.unwrap();
    let owner_id = test_helpers::insert_test_account(&state.pool, "owner@x.com", "password123", false)
        .await
        .unwrap();
    let other_id = test_helpers::insert_test_account(&state.pool, "other@x.com", "password123", true)
        .await
        .unwrap();

    let owner = state.account_service.get_account(owner_id).await.unwrap();
    let other = state.account_service.get_account(other_id).await.unwrap();

    let token = state
        .verification_service
        .request_verification(&owner)
        .await
        .unwrap();

    // Even an already verified account may not consume someone else's token
    let err = state
        .verification_service
        .confirm_verification(&token, &other)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authentication);

    let owner = state.account_service.get_account(owner_id).await.unwrap();
    assert!(!owner.is_verified);
}

#[tokio::test]
async fn test_fourth_request_in_window_is_rate_limited() {
    let mailer = Arc::new(RecordingEmailService::new());
    let (state, _store) = test_helpers::create_test_state(mailer).await.unwrap();
    let account_id = test_helpers::insert_test_account(&state.pool, "busy@x.com", "password123", false)
        .await
        .unwrap();
    let account = state.account_service.get_account(account_id).await.unwrap();

    for _ in 0..3 {
        state
            .verification_service
            .request_verification(&account)
            .await
            .unwrap();
    }

    let err = state
        .verification_service
        .request_verification(&account)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TooManyRequests);
}

#[tokio::test]
async fn test_failed_delivery_leaves_token_valid() {
    let mailer = Arc::new(RecordingEmailService::failing());
    let (state, store) = test_helpers::create_test_state(mailer).await.unwrap();
    let account_id = test_helpers::insert_test_account(&state.pool, "bounce@x.com", "password123", false)
        .await
        .unwrap();
    let account = state.account_service.get_account(account_id).await.unwrap();

    let token = state
        .verification_service
        .request_verification(&account)
        .await
        .unwrap();

    // Give the background send time to fail
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert!(store
        .contains_key(&format!("verification:token:{}", token))
        .await);
    let outcome = state
        .verification_service
        .confirm_verification(&token, &account)
        .await
        .unwrap();
    assert_eq!(outcome, Confirmation::Verified);
}
