#![allow(dead_code)]

use axum::Router;
use skillchecker::{
    ApiClient, Config, MemoryStorage, RecordingNavigator, Role, SessionStore,
    User,
};
use std::sync::Arc;

/// A client wired up to a throwaway backend.
pub struct TestContext {
    pub client: ApiClient,
    pub session: Arc<SessionStore>,
    pub storage: Arc<MemoryStorage>,
    pub navigator: Arc<RecordingNavigator>,
}

impl TestContext {
    pub async fn new(app: Router) -> Self {
        let base_url = serve(app).await;
        TestContext::with_base_url(&base_url)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        let storage = Arc::new(MemoryStorage::new());
        let session = Arc::new(SessionStore::new(Arc::clone(&storage)));
        let navigator = Arc::new(RecordingNavigator::new());
        let client = ApiClient::new(
            &Config::new(base_url).unwrap(),
            Arc::clone(&session),
            navigator.clone(),
        )
        .unwrap();

        TestContext {
            client,
            session,
            storage,
            navigator,
        }
    }

    pub fn log_in_as(&self, role: Role) {
        self.session.set_auth("test-token", user(role));
    }
}

pub fn user(role: Role) -> User {
    User {
        id: 11,
        email: String::from("kim@school.edu"),
        name: String::from("Kim"),
        role,
    }
}

/// Serve `app` under `/api` on an ephemeral port, returning the base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();
    let app = Router::new().nest("/api", app);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/api", addr)
}

/// A base URL nothing is listening on.
pub async fn dead_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    format!("http://{}/api", addr)
}

/// Build a `header.payload.signature` token around a JSON payload.
pub fn token_with(payload: serde_json::Value) -> String {
    let encode =
        |raw: &[u8]| base64::encode_config(raw, base64::URL_SAFE_NO_PAD);

    format!(
        "{}.{}.sig",
        encode(br#"{"alg":"HS256"}"#),
        encode(payload.to_string().as_bytes())
    )
}
