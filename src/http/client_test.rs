use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::fake_backend::FakeBackend;
use crate::router::{LOGIN_PATH, Location};
use crate::schemas::{Token, User};
use crate::storage::{MemoryStorage, TOKEN_KEY, TokenStorage};

/// Counts how often each hook runs.
#[derive(Default)]
struct Probe {
    requests: AtomicUsize,
    responses: AtomicUsize,
}

impl Middleware for Arc<Probe> {
    fn on_request(&self, _request: &mut reqwest::Request) -> Result<(), ClientError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_response(&self, _response: &ResponseMeta) {
        self.responses.fetch_add(1, Ordering::SeqCst);
    }
}

struct Refuse;

impl Middleware for Refuse {
    fn on_request(&self, _request: &mut reqwest::Request) -> Result<(), ClientError> {
        Err(ClientError::HttpClientBuild("refused".to_owned()))
    }
}

#[test]
fn url_joins_base_and_path() {
    let config = ClientConfig::new("http://localhost:8000/api/v1/", crate::config::Timeouts::default(), "s.json".into())
        .unwrap();
    let client = HttpClient::new(&config).unwrap();
    assert_eq!(client.url("/users/me"), "http://localhost:8000/api/v1/users/me");
}

#[tokio::test]
async fn hooks_run_once_per_call() {
    let backend = FakeBackend::spawn().await;
    backend.seed_user("a@b.com", "x", "tok123");
    let probe = Arc::new(Probe::default());
    let client = HttpClient::new(&backend.config()).unwrap().with_middleware(probe.clone());

    let form = [("username", "a@b.com"), ("password", "x")];
    let token: Token = client.post_form("/login/access-token", &form).await.unwrap();

    assert_eq!(token.access_token, "tok123");
    assert_eq!(probe.requests.load(Ordering::SeqCst), 1);
    assert_eq!(probe.responses.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn request_hook_error_aborts_before_sending() {
    let backend = FakeBackend::spawn().await;
    let client = HttpClient::new(&backend.config()).unwrap().with_middleware(Refuse);

    let result: Result<User, ClientError> = client.get_json("/users/me").await;

    assert!(matches!(result, Err(ClientError::HttpClientBuild(_))));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn session_chain_attaches_bearer_token() {
    let backend = FakeBackend::spawn().await;
    backend.seed_user("a@b.com", "x", "tok123");
    let session = SessionContext::new(Arc::new(MemoryStorage::new()));
    session.set_token("tok123").unwrap();
    let history = History::default();
    let client = HttpClient::for_session(&backend.config(), &session, &history).unwrap();

    let user: User = client.get_json("/users/me").await.unwrap();

    assert_eq!(user.email, "a@b.com");
    let recorded = backend.requests_to("/users/me");
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].authorization.as_deref(), Some("Bearer tok123"));
}

#[tokio::test]
async fn unauthorized_clears_session_and_surfaces_error() {
    let backend = FakeBackend::spawn().await;
    let storage = Arc::new(MemoryStorage::new());
    let session = SessionContext::new(storage.clone());
    session.set_token("stale").unwrap();
    let history = History::new(Location::new("/transactions"));
    let client = HttpClient::for_session(&backend.config(), &session, &history).unwrap();

    let err = client.get_json::<User>("/users/me").await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.status(), Some(401));
    assert!(err.to_string().contains("Could not validate credentials"));
    assert!(!session.has_token());
    assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
    assert!(history.is_at(LOGIN_PATH));
}

#[tokio::test]
async fn other_statuses_carry_detail() {
    let backend = FakeBackend::spawn().await;
    backend.seed_user("a@b.com", "x", "tok123");
    let session = SessionContext::new(Arc::new(MemoryStorage::new()));
    session.set_token("tok123").unwrap();
    let history = History::new(Location::new("/dashboard"));
    let client = HttpClient::for_session(&backend.config(), &session, &history).unwrap();

    let err = client
        .put_json::<_, serde_json::Value>("/expenses/999", &serde_json::json!({ "amount": 1.0 }))
        .await
        .unwrap_err();

    match err {
        ClientError::Status { status, detail } => {
            assert_eq!(status, 404);
            assert_eq!(detail.as_deref(), Some("Expense not found"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(session.has_token());
    assert!(history.is_at("/dashboard"));
}

#[tokio::test]
async fn decode_mismatch_is_reported() {
    let backend = FakeBackend::spawn().await;
    backend.seed_user("a@b.com", "x", "tok123");
    let client = HttpClient::new(&backend.config()).unwrap();

    let form = [("username", "a@b.com"), ("password", "x")];
    let err = client.post_form::<_, User>("/login/access-token", &form).await.unwrap_err();

    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn transport_failure_maps_to_http_error() {
    // Port 9 (discard) is not served by anything in the test environment.
    let config = ClientConfig::new("http://127.0.0.1:9/api/v1", crate::config::Timeouts::default(), "s.json".into())
        .unwrap();
    let client = HttpClient::new(&config).unwrap();

    let err = client.get_json::<User>("/users/me").await.unwrap_err();

    assert!(matches!(err, ClientError::Http(_)));
}
