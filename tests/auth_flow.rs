mod common;

use storefront_api::{
    dto::auth::{LoginRequest, RegisterRequest, UpdateProfileRequest},
    error::AppError,
    middleware::auth::{AuthUser, decode_token},
    services::auth_service,
};
use uuid::Uuid;

fn register_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        name: "Ada Lovelace".into(),
        email: email.into(),
        password: "password123".into(),
        phone: None,
    }
}

#[tokio::test]
async fn register_login_and_profile() {
    let Some(state) = common::db_state().await else { return };
    let email = format!("Ada.{}@Example.com", Uuid::new_v4().simple());

    let registered = auth_service::register_user(&state, register_request(&email))
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(registered.user.email, email.to_lowercase());
    let claims = decode_token(&registered.token, common::JWT_SECRET).unwrap();
    assert_eq!(claims.sub, registered.user.id.to_string());
    assert_eq!(claims.role, "user");

    let duplicate = auth_service::register_user(&state, register_request(&email)).await;
    assert!(matches!(duplicate, Err(AppError::BadRequest(_))));

    let logged_in = auth_service::login_user(
        &state,
        LoginRequest {
            email: email.clone(),
            password: "password123".into(),
        },
    )
    .await
    .unwrap()
    .data
    .unwrap();
    assert_eq!(logged_in.user.id, registered.user.id);

    let wrong = auth_service::login_user(
        &state,
        LoginRequest {
            email: email.clone(),
            password: "password124".into(),
        },
    )
    .await;
    match wrong {
        Err(AppError::Unauthorized(message)) => assert_eq!(message, "Invalid credentials"),
        _ => panic!("expected unauthorized"),
    }

    let me = AuthUser {
        user_id: registered.user.id,
        email: registered.user.email.clone(),
        role: registered.user.role,
    };
    let updated = auth_service::update_profile(
        &state,
        &me,
        UpdateProfileRequest {
            name: Some("Ada King".into()),
            phone: Some("555-0100".into()),
        },
    )
    .await
    .unwrap()
    .data
    .unwrap();
    assert_eq!(updated.name, "Ada King");
    assert_eq!(updated.phone.as_deref(), Some("555-0100"));
}

#[tokio::test]
async fn unknown_email_is_invalid_credentials() {
    let Some(state) = common::db_state().await else { return };
    let result = auth_service::login_user(
        &state,
        LoginRequest {
            email: format!("{}@example.com", Uuid::new_v4().simple()),
            password: "whatever".into(),
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));
}
