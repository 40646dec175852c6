use super::*;
use crate::mock_backend::{fake_token, transport_for, unreachable_url, MockBackend};
use axum::http::StatusCode;
use serde_json::json;
use storage::MemoryTokenStore;

fn details_body() -> serde_json::Value {
    json!({
        "user": {
            "isAdmin": false,
            "firstName": "Jane",
            "lastName": "Doe",
            "mobileNo": "09171234567"
        }
    })
}

async fn store_with(
    api: Arc<dyn ApiTransport>,
    tokens: Arc<MemoryTokenStore>,
) -> (SessionStore, broadcast::Receiver<StoreEvent>) {
    let (events, rx) = broadcast::channel(64);
    (SessionStore::new(api, tokens, events).await, rx)
}

#[test]
fn malformed_tokens_keep_token_but_drop_claims() {
    for token in ["garbage", "a.b", "a.!!!.c", "a.b.c", "one.two.three.four"] {
        let state = SessionState::from_token(Some(token.to_string()));
        assert_eq!(state.token.as_deref(), Some(token));
        assert_eq!(state.email, None, "{token}");
        assert_eq!(state.is_admin, None, "{token}");
        assert!(!state.is_loading);
    }
}

#[test]
fn absent_token_yields_anonymous_session() {
    assert_eq!(SessionState::from_token(None), SessionState::default());
    assert!(!SessionState::default().is_authenticated());
}

#[tokio::test]
async fn startup_decodes_persisted_token_claims() {
    let token = fake_token("admin@mail.com", true);
    let (store, _rx) = store_with(
        transport_for(&unreachable_url().await),
        Arc::new(MemoryTokenStore::with_token(token.clone())),
    )
    .await;

    let state = store.state().await;
    assert_eq!(state.token.as_deref(), Some(token.as_str()));
    assert_eq!(state.email.as_deref(), Some("admin@mail.com"));
    assert_eq!(state.is_admin, Some(true));
    assert_eq!(state.first_name, None);
}

#[tokio::test]
async fn login_success_persists_token_and_fetches_profile() {
    let token = fake_token("jane@mail.com", false);
    let backend = MockBackend::new()
        .on_post(
            "/users/login",
            StatusCode::OK,
            json!({ "message": "User logged in successfully", "access": token }),
        )
        .on_get("/users/details", StatusCode::OK, details_body())
        .spawn()
        .await;
    let tokens = Arc::new(MemoryTokenStore::new());
    let (store, _rx) = store_with(backend.transport(), Arc::clone(&tokens)).await;

    let outcome = store.login("jane@mail.com", "secret").await;

    assert_eq!(outcome, LoginOutcome::Success);
    assert_eq!(
        tokens.load_token().await.expect("load").as_deref(),
        Some(token.as_str())
    );

    let state = store.state().await;
    assert_eq!(state.token.as_deref(), Some(token.as_str()));
    assert_eq!(state.email.as_deref(), Some("jane@mail.com"));
    assert_eq!(state.is_admin, Some(false));
    assert_eq!(state.first_name.as_deref(), Some("Jane"));
    assert_eq!(state.last_name.as_deref(), Some("Doe"));
    assert_eq!(state.mobile_no.as_deref(), Some("09171234567"));
    assert!(!state.is_loading);

    let logins = backend.requests_to("/users/login").await;
    assert_eq!(logins.len(), 1);
    assert_eq!(
        logins[0].body,
        json!({ "email": "jane@mail.com", "password": "secret" })
    );
    let details = backend.requests_to("/users/details").await;
    assert_eq!(details.len(), 1);
    assert_eq!(
        details[0].authorization.as_deref(),
        Some(format!("Bearer {token}").as_str())
    );
}

#[tokio::test]
async fn login_with_opaque_token_still_succeeds() {
    let backend = MockBackend::new()
        .on_post(
            "/users/login",
            StatusCode::OK,
            json!({ "message": "User logged in successfully", "access": "a.b.c" }),
        )
        .on_get("/users/details", StatusCode::OK, details_body())
        .spawn()
        .await;
    let tokens = Arc::new(MemoryTokenStore::new());
    let (store, _rx) = store_with(backend.transport(), Arc::clone(&tokens)).await;

    assert!(store.login("jane@mail.com", "secret").await.is_success());
    assert_eq!(tokens.load_token().await.expect("load").as_deref(), Some("a.b.c"));

    let state = store.state().await;
    assert_eq!(state.email, None);
    assert_eq!(state.is_admin, Some(false));
    assert_eq!(state.first_name.as_deref(), Some("Jane"));
    assert_eq!(backend.requests_to("/users/details").await.len(), 1);
}

#[tokio::test]
async fn login_wrong_password_surfaces_server_message() {
    let backend = MockBackend::new()
        .on_post(
            "/users/login",
            StatusCode::UNAUTHORIZED,
            json!({ "message": "Invalid credentials" }),
        )
        .spawn()
        .await;
    let tokens = Arc::new(MemoryTokenStore::new());
    let (store, _rx) = store_with(backend.transport(), Arc::clone(&tokens)).await;

    let outcome = store.login("jane@mail.com", "wrong").await;

    assert_eq!(
        outcome,
        LoginOutcome::Failure {
            message: "Invalid credentials".into()
        }
    );
    assert_eq!(tokens.load_token().await.expect("load"), None);
    assert_eq!(store.state().await, SessionState::default());
    assert!(backend.requests_to("/users/details").await.is_empty());
}

#[tokio::test]
async fn login_not_found_and_bad_request_use_server_message() {
    for (status, message) in [
        (StatusCode::NOT_FOUND, "No Email Found"),
        (StatusCode::BAD_REQUEST, "Email invalid"),
    ] {
        let backend = MockBackend::new()
            .on_post("/users/login", status, json!({ "message": message }))
            .spawn()
            .await;
        let (store, _rx) = store_with(backend.transport(), Arc::new(MemoryTokenStore::new())).await;
        assert_eq!(store.login("x@y.z", "pw").await.message(), Some(message));
    }
}

#[tokio::test]
async fn login_domain_failure_returns_server_message() {
    let backend = MockBackend::new()
        .on_post(
            "/users/login",
            StatusCode::OK,
            json!({ "message": "Email and password do not match" }),
        )
        .spawn()
        .await;
    let (store, _rx) = store_with(backend.transport(), Arc::new(MemoryTokenStore::new())).await;

    let outcome = store.login("x@y.z", "pw").await;
    assert!(!outcome.is_success());
    assert_eq!(outcome.message(), Some("Email and password do not match"));
}

#[tokio::test]
async fn login_server_error_is_generic() {
    let backend = MockBackend::new()
        .on_post(
            "/users/login",
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "message": "stack trace that must not leak" }),
        )
        .spawn()
        .await;
    let (store, _rx) = store_with(backend.transport(), Arc::new(MemoryTokenStore::new())).await;

    assert_eq!(
        store.login("x@y.z", "pw").await.message(),
        Some(LOGIN_FAILED_MESSAGE)
    );
}

#[tokio::test]
async fn login_network_failure_is_generic() {
    let (store, _rx) = store_with(
        transport_for(&unreachable_url().await),
        Arc::new(MemoryTokenStore::new()),
    )
    .await;

    assert_eq!(
        store.login("x@y.z", "pw").await,
        LoginOutcome::Failure {
            message: LOGIN_FAILED_MESSAGE.into()
        }
    );
}

#[tokio::test]
async fn login_success_without_token_is_a_failure() {
    let backend = MockBackend::new()
        .on_post(
            "/users/login",
            StatusCode::OK,
            json!({ "message": "User logged in successfully" }),
        )
        .spawn()
        .await;
    let tokens = Arc::new(MemoryTokenStore::new());
    let (store, _rx) = store_with(backend.transport(), Arc::clone(&tokens)).await;

    assert_eq!(
        store.login("x@y.z", "pw").await.message(),
        Some(LOGIN_FAILED_MESSAGE)
    );
    assert_eq!(tokens.load_token().await.expect("load"), None);
}

#[tokio::test]
async fn reset_clears_every_field_regardless_of_prior_state() {
    let token = fake_token("jane@mail.com", true);
    let backend = MockBackend::new()
        .on_get("/users/details", StatusCode::OK, details_body())
        .spawn()
        .await;
    let (store, _rx) = store_with(
        backend.transport(),
        Arc::new(MemoryTokenStore::with_token(token.clone())),
    )
    .await;
    store.get_user_details(Some(&token)).await;
    assert_eq!(store.state().await.first_name.as_deref(), Some("Jane"));

    store.get_user_details(None).await;

    assert_eq!(store.state().await, SessionState::default());
}

#[tokio::test]
async fn profile_refresh_keeps_token_derived_email() {
    let token = fake_token("claims@mail.com", true);
    let backend = MockBackend::new()
        .on_get(
            "/users/details",
            StatusCode::OK,
            json!({ "user": { "email": "other@mail.com", "isAdmin": false, "firstName": "Jo" } }),
        )
        .spawn()
        .await;
    let (store, _rx) = store_with(
        backend.transport(),
        Arc::new(MemoryTokenStore::with_token(token.clone())),
    )
    .await;

    store.get_user_details(Some(&token)).await;

    let state = store.state().await;
    assert_eq!(state.email.as_deref(), Some("claims@mail.com"));
    assert_eq!(state.is_admin, Some(false));
    assert_eq!(state.first_name.as_deref(), Some("Jo"));
    assert_eq!(state.last_name, None);
}

#[tokio::test]
async fn failed_profile_refresh_keeps_stale_profile() {
    let token = fake_token("jane@mail.com", false);
    let first = MockBackend::new()
        .on_get("/users/details", StatusCode::OK, details_body())
        .spawn()
        .await;
    let (store, mut rx) = store_with(
        first.transport(),
        Arc::new(MemoryTokenStore::with_token(token.clone())),
    )
    .await;
    store.get_user_details(Some(&token)).await;
    let before = store.state().await;

    let failing = MockBackend::new()
        .on_get(
            "/users/details",
            StatusCode::UNAUTHORIZED,
            json!({ "message": "jwt expired" }),
        )
        .spawn()
        .await;
    let store = SessionStore {
        api: failing.transport(),
        ..store
    };
    while rx.try_recv().is_ok() {}

    store.get_user_details(Some(&token)).await;

    assert_eq!(store.state().await, before);
    let Ok(StoreEvent::Session(loading)) = rx.try_recv() else {
        panic!("expected loading snapshot");
    };
    assert!(loading.is_loading);
    let Ok(StoreEvent::Session(settled)) = rx.try_recv() else {
        panic!("expected settled snapshot");
    };
    assert!(!settled.is_loading);
}

#[tokio::test]
async fn failed_refresh_from_anonymous_adopts_no_token() {
    let backend = MockBackend::new().spawn().await;
    let (store, _rx) = store_with(backend.transport(), Arc::new(MemoryTokenStore::new())).await;

    store.get_user_details(Some("x.y.z")).await;

    let state = store.state().await;
    assert_eq!(state, SessionState::default());
    assert!(!state.is_authenticated());
    let requests = backend.requests_to("/users/details").await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer x.y.z"));
}

#[tokio::test]
async fn failed_refresh_with_other_token_keeps_current_one() {
    let token = fake_token("jane@mail.com", false);
    let (store, _rx) = store_with(
        transport_for(&unreachable_url().await),
        Arc::new(MemoryTokenStore::with_token(token.clone())),
    )
    .await;

    store.get_user_details(Some("other.token.value")).await;

    let state = store.state().await;
    assert_eq!(state.token.as_deref(), Some(token.as_str()));
    assert_eq!(state.email.as_deref(), Some("jane@mail.com"));
    assert!(!state.is_loading);
}

#[tokio::test]
async fn logout_clears_persisted_token_and_session() {
    let token = fake_token("jane@mail.com", false);
    let tokens = Arc::new(MemoryTokenStore::with_token(token));
    let (store, _rx) = store_with(transport_for(&unreachable_url().await), Arc::clone(&tokens)).await;
    assert!(store.state().await.is_authenticated());

    store.logout().await;

    assert_eq!(tokens.load_token().await.expect("load"), None);
    assert_eq!(store.state().await, SessionState::default());
}
