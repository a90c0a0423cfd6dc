use petadopt::{
    error::ErrorKind,
    models::ProfileType,
    repositories::SqliteAccountRepository,
    services::{
        account_service::{AccountService, RegisterRequest},
        auth_service::{AuthService, LoginRequest},
    },
    test_utils::test_helpers,
};
use std::sync::Arc;

fn register_request(email: &str, password: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: password.to_string(),
        password_confirm: None,
        is_verified: true,
    }
}

fn login(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn test_authenticate_success() {
    // Create isolated test database
    let pool = test_helpers::create_test_db().await.unwrap();
    let repository = Arc::new(SqliteAccountRepository::new(pool));
    let account_service = AccountService::new(repository.clone());
    let auth_service = AuthService::new(repository);

    let (created, _) = account_service
        .register(register_request("auth@example.com", "correctpassword"))
        .await
        .unwrap();

    let authenticated = auth_service
        .authenticate(login("auth@example.com", "correctpassword"))
        .await
        .unwrap();

    assert_eq!(authenticated.account.id, created.id);
    assert_eq!(authenticated.authorities(), vec!["USER".to_string()]);

    // Last login is stamped
    let reloaded = account_service.get_account(created.id).await.unwrap();
    assert!(reloaded.last_login_at.is_some());
}

#[tokio::test]
async fn test_authenticate_wrong_password_and_unknown_email_look_the_same() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let repository = Arc::new(SqliteAccountRepository::new(pool));
    let account_service = AccountService::new(repository.clone());
    let auth_service = AuthService::new(repository);

    account_service
        .register(register_request("wrongpass@example.com", "correctpassword"))
        .await
        .unwrap();

    let wrong_password = auth_service
        .authenticate(login("wrongpass@example.com", "wrongpassword"))
        .await
        .unwrap_err();
    let unknown_email = auth_service
        .authenticate(login("nobody@example.com", "correctpassword"))
        .await
        .unwrap_err();

    assert_eq!(wrong_password.kind, ErrorKind::Authentication);
    assert_eq!(unknown_email.kind, ErrorKind::Authentication);
    assert_eq!(wrong_password.message, unknown_email.message);
    assert_eq!(wrong_password.field, unknown_email.field);
}

#[tokio::test]
async fn test_blocked_and_deleted_accounts_cannot_authenticate() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let repository = Arc::new(SqliteAccountRepository::new(pool));
    let account_service = AccountService::new(repository.clone());
    let auth_service = AuthService::new(repository);

    let (blocked, _) = account_service
        .register(register_request("blocked@example.com", "correctpassword"))
        .await
        .unwrap();
    let (deleted, _) = account_service
        .register(register_request("deleted@example.com", "correctpassword"))
        .await
        .unwrap();

    account_service.set_blocked(blocked.id, true).await.unwrap();
    account_service.soft_delete(deleted.id).await.unwrap();

    for email in ["blocked@example.com", "deleted@example.com"] {
        let err = auth_service
            .authenticate(login(email, "correctpassword"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
    }

    // Refresh tells the two situations apart from bad credentials
    let err = auth_service.refresh("blocked@example.com").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccountUnavailable);
    let err = auth_service.refresh("deleted@example.com").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccountUnavailable);
}

#[tokio::test]
async fn test_admin_profile_is_never_issued_through_login() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let repository = Arc::new(SqliteAccountRepository::new(pool));
    let account_service = AccountService::new(repository.clone());
    let auth_service = AuthService::new(repository);

    let (account, _) = account_service
        .register(register_request("staff@example.com", "correctpassword"))
        .await
        .unwrap();
    account_service
        .grant_profile(account.id, "Happy Paws", ProfileType::Shelter)
        .await
        .unwrap();
    account_service
        .grant_profile(account.id, "Staff", ProfileType::Admin)
        .await
        .unwrap();

    let authenticated = auth_service
        .authenticate(login("staff@example.com", "correctpassword"))
        .await
        .unwrap();

    assert_eq!(
        authenticated.authorities(),
        vec!["USER".to_string(), "SHELTER".to_string()]
    );

    let refreshed = auth_service.refresh("staff@example.com").await.unwrap();
    assert!(!refreshed.authorities().contains(&"ADMIN".to_string()));
}

#[tokio::test]
async fn test_load_principal_requires_live_account() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let repository = Arc::new(SqliteAccountRepository::new(pool));
    let account_service = AccountService::new(repository.clone());
    let auth_service = AuthService::new(repository);

    let (account, _) = account_service
        .register(register_request("principal@example.com", "correctpassword"))
        .await
        .unwrap();

    let current = auth_service
        .load_principal("principal@example.com")
        .await
        .unwrap();
    assert_eq!(current.account_id, account.id);
    assert_eq!(current.authorities, vec!["USER".to_string()]);

    account_service.set_blocked(account.id, true).await.unwrap();
    let err = auth_service
        .load_principal("principal@example.com")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccountUnavailable);
}

#[tokio::test]
async fn test_load_principal_reflects_current_profiles() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let repository = Arc::new(SqliteAccountRepository::new(pool.clone()));
    let account_service = AccountService::new(repository.clone());
    let auth_service = AuthService::new(repository);

    let account_id = test_helpers::insert_test_account(&pool, "staff@x.com", "password123", true)
        .await
        .unwrap();

    let shelter = account_service
        .grant_profile(account_id, "Happy Paws", ProfileType::Shelter)
        .await
        .unwrap();
    account_service
        .grant_profile(account_id, "ops", ProfileType::Admin)
        .await
        .unwrap();

    let current = auth_service.load_principal("staff@x.com").await.unwrap();
    assert_eq!(
        current.authorities,
        vec!["USER".to_string(), "SHELTER".to_string()]
    );

    sqlx::query("UPDATE profiles SET is_deleted = TRUE WHERE id = ?")
        .bind(shelter.id)
        .execute(&pool)
        .await
        .unwrap();

    let current = auth_service.load_principal("staff@x.com").await.unwrap();
    assert_eq!(current.authorities, vec!["USER".to_string()]);
}
