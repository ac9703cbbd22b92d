mod common;

use axum::{http::StatusCode, routing::post, Json, Router};
use common::{token_with, TestContext};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use skillchecker::{
    endpoints::{self, LoginError},
    types::Registration,
    PersistedSession, Role, Session, SessionStore, Storage, User, SESSION_KEY,
};

fn login_answers(body: Value) -> Router {
    Router::new().route(
        "/auth/login",
        post(move |Json(credentials): Json<Value>| {
            let body = body.clone();
            async move {
                assert_eq!(credentials["email"], "kim@school.edu");
                assert_eq!(credentials["password"], "hunter22");
                Json(body)
            }
        }),
    )
}

#[tokio::test]
async fn log_in_with_a_full_user() {
    let ctx = TestContext::new(login_answers(json!({
        "token": "abc",
        "user": {
            "id": 4,
            "email": "kim@school.edu",
            "name": "Kim Lee",
            "role": "ADMIN",
        },
    })))
    .await;

    let user =
        endpoints::login_and_store(&ctx.client, "kim@school.edu", "hunter22")
            .await
            .unwrap();

    let should_be = User {
        id: 4,
        email: String::from("kim@school.edu"),
        name: String::from("Kim Lee"),
        role: Role::Admin,
    };
    assert_eq!(user, should_be);
    assert_eq!(ctx.session.token(), Some(String::from("abc")));
    assert!(ctx.session.is_admin());
    assert!(!ctx.session.is_loading());
}

#[tokio::test]
async fn fill_in_the_user_from_the_token() {
    let token = token_with(json!({ "id": "7", "name": "Kim From Token" }));
    let ctx = TestContext::new(login_answers(json!({
        "token": token,
        "role": "STUDENT",
    })))
    .await;

    let user =
        endpoints::login_and_store(&ctx.client, "kim@school.edu", "hunter22")
            .await
            .unwrap();

    assert_eq!(user.id, 7);
    assert_eq!(user.name, "Kim From Token");
    assert_eq!(user.email, "kim@school.edu");
    assert_eq!(user.role, Role::Student);
    assert!(ctx.session.is_student());
}

#[tokio::test]
async fn an_opaque_token_still_gives_a_usable_user() {
    let ctx = TestContext::new(login_answers(json!({
        "token": "not-a-jwt",
        "role": "ADMIN",
    })))
    .await;

    let user =
        endpoints::login_and_store(&ctx.client, "kim@school.edu", "hunter22")
            .await
            .unwrap();

    assert_eq!(user.id, 0);
    assert_eq!(user.name, "kim");
    assert_eq!(user.role, Role::Admin);
    assert!(ctx.session.is_authenticated());
}

#[tokio::test]
async fn a_missing_token_is_an_error() {
    let ctx = TestContext::new(login_answers(json!({ "role": "ADMIN" }))).await;

    let err =
        endpoints::login_and_store(&ctx.client, "kim@school.edu", "hunter22")
            .await
            .unwrap_err();

    assert!(matches!(err, LoginError::MissingToken(_)), "{:?}", err);
    assert_eq!(ctx.session.snapshot(), Session::default());
    assert_eq!(ctx.storage.get(SESSION_KEY).unwrap(), None);
}

#[tokio::test]
async fn bad_credentials_keep_the_server_message() {
    let app = Router::new().route(
        "/auth/login",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "Invalid email or password" })),
            )
        }),
    );
    let ctx = TestContext::new(app).await;

    let err = endpoints::login_and_store(&ctx.client, "kim@school.edu", "nope")
        .await
        .unwrap_err();

    assert_eq!(err.server_message(), Some("Invalid email or password"));
    assert!(!ctx.session.is_authenticated());
    assert!(!ctx.session.is_loading());
}

#[tokio::test]
async fn rejected_credentials_keep_the_server_message() {
    let app = Router::new().route(
        "/auth/login",
        post(|| async {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Account is locked" })),
            )
        }),
    );
    let ctx = TestContext::new(app).await;

    let err = endpoints::login_and_store(&ctx.client, "kim@school.edu", "nope")
        .await
        .unwrap_err();

    assert_eq!(err.server_message(), Some("Account is locked"));
    assert_eq!(err.user_message(), "Account is locked");
    assert!(!ctx.session.is_authenticated());
    assert!(!ctx.session.is_loading());
    assert_eq!(ctx.navigator.last(), Some(String::from("/login")));
}

#[tokio::test]
async fn a_bare_401_reads_as_bad_credentials() {
    let app = Router::new()
        .route("/auth/login", post(|| async { StatusCode::UNAUTHORIZED }));
    let ctx = TestContext::new(app).await;

    let err = endpoints::login_and_store(&ctx.client, "kim@school.edu", "nope")
        .await
        .unwrap_err();

    assert_eq!(err.server_message(), None);
    assert_eq!(err.user_message(), "Invalid email or password");
}

#[tokio::test]
async fn a_successful_login_survives_a_restart() {
    let ctx = TestContext::new(login_answers(json!({
        "token": "abc",
        "user": {
            "id": 4,
            "email": "kim@school.edu",
            "name": "Kim Lee",
            "role": "STUDENT",
        },
    })))
    .await;

    endpoints::login_and_store(&ctx.client, "kim@school.edu", "hunter22")
        .await
        .unwrap();

    let raw = ctx.storage.get(SESSION_KEY).unwrap().unwrap();
    let record: PersistedSession = serde_json::from_str(&raw).unwrap();
    assert!(record.is_authenticated);
    assert_eq!(record.token.as_deref(), Some("abc"));

    let reloaded = SessionStore::new(ctx.storage.clone());
    assert_eq!(reloaded.snapshot(), ctx.session.snapshot());
}

#[tokio::test]
async fn registering_doesnt_log_you_in() {
    let app = Router::new().route(
        "/auth/register",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["role"], "STUDENT");
            assert_eq!(body["name"], "Kim");
            StatusCode::CREATED
        }),
    );
    let ctx = TestContext::new(app).await;
    let registration = Registration {
        name: String::from("Kim"),
        email: String::from("kim@school.edu"),
        password: String::from("correct horse"),
        role: Some(Role::Student),
    };

    endpoints::register(&ctx.client, &registration)
        .await
        .unwrap();

    assert!(!ctx.session.is_authenticated());
    assert!(ctx.navigator.visited().is_empty());
}

#[tokio::test]
async fn a_taken_email_is_reported() {
    let app = Router::new().route(
        "/auth/register",
        post(|| async {
            (
                StatusCode::CONFLICT,
                Json(json!({ "message": "Email already in use" })),
            )
        }),
    );
    let ctx = TestContext::new(app).await;
    let registration = Registration {
        name: String::from("Kim"),
        email: String::from("kim@school.edu"),
        password: String::from("correct horse"),
        role: Some(Role::Student),
    };

    let err = endpoints::register(&ctx.client, &registration)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Email already in use");
}
