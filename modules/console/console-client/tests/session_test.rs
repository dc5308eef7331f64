use console_client::{
    ANONYMOUS_ACTOR, ApiHandle, ClientError, ConsoleClientConfig, ErrorNotifier,
    FileSessionStore, MemorySessionStore, ReqwestTransport, RequestOptions, Session,
    SessionStore,
};
use httpmock::prelude::*;
use serde_json::json;
use std::sync::{Arc, Mutex};

fn alice() -> Session {
    Session {
        id: 42,
        username: "alice".into(),
        display_name: None,
        role: 1,
    }
}

fn handle_for(
    server: &MockServer,
    sessions: Arc<dyn SessionStore>,
) -> (ApiHandle, Arc<Mutex<Vec<ClientError>>>) {
    let config = ConsoleClientConfig::new(server.base_url());
    let transport = ReqwestTransport::from_config(&config).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let notifier: Arc<dyn ErrorNotifier> =
        Arc::new(move |e: &ClientError| sink.lock().unwrap().push(e.clone()));
    let handle = ApiHandle::new(Arc::new(transport), sessions, notifier).unwrap();
    (handle, seen)
}

#[tokio::test]
async fn test_initial_client_uses_stored_session() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/user/self")
            .header("New-API-User", "42");
        then.status(200).json_body(json!({"success": true, "data": {"id": 42}}));
    });

    let (handle, _) = handle_for(&server, Arc::new(MemorySessionStore::with_session(alice())));
    assert_eq!(handle.current().actor_id(), "42");

    handle
        .current()
        .get("/api/user/self", RequestOptions::new())
        .await
        .unwrap();
    mock.assert();
}

#[tokio::test]
async fn test_anonymous_without_session() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/status")
            .header("New-API-User", ANONYMOUS_ACTOR);
        then.status(200).json_body(json!({"success": true, "data": {}}));
    });

    let (handle, _) = handle_for(&server, Arc::new(MemorySessionStore::new()));
    handle
        .current()
        .get("/api/status", RequestOptions::new())
        .await
        .unwrap();
    mock.assert();
}

#[tokio::test]
async fn test_login_swaps_client_and_keeps_old_instance_intact() {
    let server = MockServer::start();
    let store = Arc::new(MemorySessionStore::new());
    let (handle, _) = handle_for(&server, store.clone());

    let before = handle.current();
    let after = handle.login(&alice()).unwrap();

    assert_eq!(before.actor_id(), ANONYMOUS_ACTOR);
    assert_eq!(after.actor_id(), "42");
    assert_eq!(handle.current().actor_id(), "42");
    assert!(!Arc::ptr_eq(&before, &handle.current()));
    assert_eq!(store.load().unwrap(), Some(alice()));
}

#[tokio::test]
async fn test_logout_calls_server_and_clears_session() {
    let server = MockServer::start();
    let logout = server.mock(|when, then| {
        when.method(GET)
            .path("/api/user/logout")
            .header("New-API-User", "42");
        then.status(200).json_body(json!({"success": true, "message": ""}));
    });

    let store = Arc::new(MemorySessionStore::with_session(alice()));
    let (handle, seen) = handle_for(&server, store.clone());

    let next = handle.logout().await.unwrap();

    assert_eq!(next.actor_id(), ANONYMOUS_ACTOR);
    assert_eq!(handle.current().actor_id(), ANONYMOUS_ACTOR);
    assert_eq!(store.load().unwrap(), None);
    assert!(seen.lock().unwrap().is_empty());
    logout.assert();
}

#[tokio::test]
async fn test_logout_server_failure_is_silent() {
    let server = MockServer::start();
    let logout = server.mock(|when, then| {
        when.method(GET).path("/api/user/logout");
        then.status(401).body("unauthorized");
    });

    let store = Arc::new(MemorySessionStore::with_session(alice()));
    let (handle, seen) = handle_for(&server, store.clone());

    let next = handle.logout().await.unwrap();

    assert_eq!(next.actor_id(), ANONYMOUS_ACTOR);
    assert_eq!(store.load().unwrap(), None);
    assert!(seen.lock().unwrap().is_empty());
    logout.assert();
}

#[tokio::test]
async fn test_file_session_survives_new_handle() {
    let server = MockServer::start();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("user.json");

    let (first, _) = handle_for(&server, Arc::new(FileSessionStore::new(&path)));
    first.login(&alice()).unwrap();
    drop(first);

    let (second, _) = handle_for(&server, Arc::new(FileSessionStore::new(&path)));
    assert_eq!(second.current().actor_id(), "42");
}

#[tokio::test]
async fn test_requests_after_rebuild_use_new_identity() {
    let server = MockServer::start();
    let anonymous = server.mock(|when, then| {
        when.method(GET)
            .path("/api/status")
            .header("New-API-User", ANONYMOUS_ACTOR);
        then.status(200).json_body(json!({"success": true, "data": {}}));
    });
    let signed_in = server.mock(|when, then| {
        when.method(GET)
            .path("/api/status")
            .header("New-API-User", "42");
        then.status(200).json_body(json!({"success": true, "data": {}}));
    });

    let (handle, _) = handle_for(&server, Arc::new(MemorySessionStore::new()));
    handle
        .current()
        .get("/api/status", RequestOptions::new())
        .await
        .unwrap();

    handle.login(&alice()).unwrap();
    handle
        .current()
        .get("/api/status", RequestOptions::new())
        .await
        .unwrap();

    anonymous.assert();
    signed_in.assert();
}
