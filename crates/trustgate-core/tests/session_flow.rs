use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use trustgate_core::api::{IDENTITY_PATH, LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH};
use trustgate_core::{
    ApiClient, ApiError, ApiRequest, AuthError, ClientConfig, GuardDecision, Navigator, Role,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.visits.lock().unwrap().push(path.to_string());
    }
}

fn client(server: &MockServer) -> (ApiClient, Arc<RecordingNavigator>) {
    let config = ClientConfig {
        base_url: server.uri(),
        request_timeout_secs: 5,
        ..ClientConfig::default()
    };
    let navigator = Arc::new(RecordingNavigator::default());
    let client = ApiClient::with_navigator(&config, navigator.clone()).expect("client");
    (client, navigator)
}

/// First call to `route` answers 401, the next one answers 200 with `body`.
async fn expire_once(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .expect(1)
        .named(format!("{} expired", route))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .named(format!("{} replay", route))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_concurrent_expiry_refreshes_once_and_replays_each() {
    let server = MockServer::start().await;
    expire_once(&server, "/suppliers/a", json!({ "name": "a" })).await;
    expire_once(&server, "/suppliers/b", json!({ "name": "b" })).await;
    expire_once(&server, "/suppliers/c", json!({ "name": "c" })).await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let (client, navigator) = client(&server);
    let (a, b, c) = tokio::join!(
        client.send(ApiRequest::get("/suppliers/a")),
        client.send(ApiRequest::get("/suppliers/b")),
        client.send(ApiRequest::get("/suppliers/c")),
    );

    for (response, name) in [(a, "a"), (b, "b"), (c, "c")] {
        let body: serde_json::Value = response.expect("replayed").json().expect("json");
        assert_eq!(body["name"], name);
    }
    assert!(navigator.visits().is_empty());
    assert_eq!(client.dispatcher().coordinator().refresh_count(), 1);
}

#[tokio::test]
async fn test_login_then_identity_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .and(body_json(json!({ "username": "alice", "password": "secret" })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "access_token=opaque; Path=/; HttpOnly")
                .set_body_json(json!({ "access_token": "opaque", "token_type": "bearer" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(IDENTITY_PATH))
        .and(header("cookie", "access_token=opaque"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": 3, "username": "alice", "role": "VIEWER" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client(&server);
    assert_eq!(
        client.check_route("/admin/audit"),
        GuardDecision::Redirect("/login".to_string())
    );

    let user = client.session().login("alice", "secret").await.expect("login");
    assert_eq!(user.id, 3);
    assert_eq!(user.role, Role::Viewer);
    assert_eq!(client.session().current_session(), Some(user));
    assert!(client.has_credential());
    assert_eq!(client.check_route("/admin/audit"), GuardDecision::Allow);
}

#[tokio::test]
async fn test_refresh_failure_rejects_queue_and_redirects_once() {
    let server = MockServer::start().await;
    for route in ["/suppliers/d", "/suppliers/e"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let (client, navigator) = client(&server);
    let (d, e) = tokio::join!(
        client.send(ApiRequest::get("/suppliers/d")),
        client.send(ApiRequest::get("/suppliers/e")),
    );

    for result in [d, e] {
        assert!(matches!(
            result,
            Err(ApiError::Auth(AuthError::RefreshFailed { .. }))
        ));
    }
    assert_eq!(navigator.visits(), vec!["/login".to_string()]);
}

#[tokio::test]
async fn test_retried_request_is_not_queued_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/suppliers"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (client, navigator) = client(&server);
    let mut request = ApiRequest::get("/suppliers");
    request.retried = true;

    let err = client.send(request).await.unwrap_err();
    assert!(matches!(err, ApiError::Auth(AuthError::RetryRejected)));
    assert_eq!(client.dispatcher().coordinator().queued(), 0);
    assert!(navigator.visits().is_empty());
}

#[tokio::test]
async fn test_validation_errors_pass_through_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/suppliers"))
        .respond_with(ResponseTemplate::new(422).set_body_string("name is required"))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client(&server);
    let response = client
        .send(ApiRequest::post("/suppliers").json(&json!({})).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 422);
    assert_eq!(response.text(), "name is required");
}

#[tokio::test]
async fn test_logout_clears_session_when_remote_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(IDENTITY_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": 1, "username": "root", "role": "ADMIN" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(LOGOUT_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let (client, navigator) = client(&server);
    client.session().login("root", "pw").await.expect("login");
    assert!(client.session().current_session().is_some());

    assert!(client.session().logout().await.is_err());
    assert_eq!(client.session().current_session(), None);
    assert_eq!(navigator.visits(), vec!["/login".to_string()]);
}

#[tokio::test]
async fn test_network_failure_is_transport_error() {
    let config = ClientConfig {
        // Nothing listens on the discard port
        base_url: "http://127.0.0.1:9".to_string(),
        request_timeout_secs: 2,
        ..ClientConfig::default()
    };
    let client = ApiClient::new(&config).expect("client");

    let err = client.send(ApiRequest::get("/suppliers")).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert_eq!(client.dispatcher().coordinator().refresh_count(), 0);
}

#[tokio::test]
async fn test_each_failed_refresh_batch_redirects_once() {
    let server = MockServer::start().await;
    for route in ["/suppliers/f", "/suppliers/g", "/suppliers/h", "/suppliers/i"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(503).set_delay(Duration::from_millis(300)))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(IDENTITY_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": 2, "username": "bob", "role": "VIEWER" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(LOGOUT_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (client, navigator) = client(&server);

    let (f, g) = tokio::join!(
        client.send(ApiRequest::get("/suppliers/f")),
        client.send(ApiRequest::get("/suppliers/g")),
    );
    assert!(f.is_err() && g.is_err());
    assert_eq!(navigator.visits().len(), 1);

    // The service is reachable again and still knows the user
    let user = client.session().restore().await.expect("restored");
    assert_eq!(user.username, "bob");

    let (h, i) = tokio::join!(
        client.send(ApiRequest::get("/suppliers/h")),
        client.send(ApiRequest::get("/suppliers/i")),
    );
    for result in [h, i] {
        assert!(matches!(
            result,
            Err(ApiError::Auth(AuthError::RefreshFailed { .. }))
        ));
    }
    assert_eq!(navigator.visits().len(), 2);

    client.session().logout().await.expect("logout");
    assert_eq!(
        navigator.visits(),
        vec!["/login".to_string(), "/login".to_string(), "/login".to_string()]
    );
    assert_eq!(client.dispatcher().coordinator().refresh_count(), 2);
}
