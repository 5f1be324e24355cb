use labor_cli::commands;
use labor_cli::{ApiClient, ApiResponse, Config, ConfigStore, Credentials, Session};
use serde_json::json;
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn issued(token: &str) -> Credentials {
    Credentials {
        token_type: "Bearer".into(),
        access_token: token.into(),
        client: "abc".into(),
        uid: "ana@example.com".into(),
    }
}

fn with_credentials(template: ResponseTemplate, token: &str) -> ResponseTemplate {
    template
        .insert_header("token-type", "Bearer")
        .insert_header("access-token", token)
        .insert_header("client", "abc")
        .insert_header("uid", "ana@example.com")
}

#[tokio::test(flavor = "multi_thread")]
async fn login_stores_issued_credentials_on_disk() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/sign_in"))
        .and(body_json(json!({ "email": "ana@example.com", "password": "hunter2" })))
        .respond_with(with_credentials(
            ResponseTemplate::new(200).set_body_json(json!({
                "data": { "id": 42, "email": "ana@example.com", "name": "Ana" }
            })),
            "fresh",
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    let uri = mock_server.uri();
    let store_path = config_path.clone();

    let user = tokio::task::spawn_blocking(move || {
        let session = Session::new(ConfigStore::open(&store_path).unwrap());
        let api = ApiClient::new(uri, session).unwrap();
        commands::login(&api, "ana@example.com", "hunter2")
            .unwrap()
            .into_result()
            .unwrap()
            .data
    })
    .await
    .unwrap();

    assert_eq!(user.email, "ana@example.com");
    assert_eq!(user.name.as_deref(), Some("Ana"));

    let stored = ConfigStore::open(&config_path).unwrap();
    assert_eq!(stored.get().auth, Some(issued("fresh")));
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_login_reports_server_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/sign_in"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "errors": ["Invalid login credentials. Please try again."]
        })))
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();
    let result = tokio::task::spawn_blocking(move || {
        let api = ApiClient::new(uri, Session::in_memory()).unwrap();
        commands::login(&api, "ana@example.com", "wrong").unwrap()
    })
    .await
    .unwrap();

    match result {
        ApiResponse::Failure(err) => {
            assert_eq!(err.to_string(), "Invalid login credentials. Please try again.")
        }
        other => panic!("expected a business failure, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn task_lifecycle_uses_rotated_tokens() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tasks/start"))
        .and(header("access-token", "one"))
        .and(body_json(json!({ "description": "Review PR" })))
        .respond_with(with_credentials(
            ResponseTemplate::new(200).set_body_json(json!({
                "task": { "id": 7, "description": "Review PR", "startedAt": "2026-10-19T09:00:00Z" }
            })),
            "two",
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/tasks/current"))
        .and(header("access-token", "two"))
        .respond_with(with_credentials(
            ResponseTemplate::new(200).set_body_json(json!({
                "task": { "id": 7, "description": "Review PR", "startedAt": "2026-10-19T09:00:00Z" }
            })),
            "three",
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/tasks/stop"))
        .and(header("access-token", "three"))
        .respond_with(with_credentials(
            ResponseTemplate::new(200).set_body_json(json!({ "task": null })),
            "four",
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();
    let session = Session::new(ConfigStore::in_memory(Config {
        auth: Some(issued("one")),
    }));
    let shared = session.clone();

    tokio::task::spawn_blocking(move || {
        let api = ApiClient::new(uri, shared).unwrap();

        let started = commands::start_task(&api, "Review PR")
            .unwrap()
            .into_result()
            .unwrap();
        let task = started.task.unwrap();
        assert_eq!(task.description, "Review PR");
        assert_eq!(task.started_at.as_deref(), Some("2026-10-19T09:00:00Z"));

        let current = commands::current_task(&api).unwrap().into_result().unwrap();
        assert_eq!(current.task.map(|t| t.id), Some(json!(7)));

        let stopped = commands::stop_task(&api).unwrap().into_result().unwrap();
        assert!(stopped.task.is_none());
    })
    .await
    .unwrap();

    assert_eq!(session.credentials(), issued("four"));
}

#[tokio::test(flavor = "multi_thread")]
async fn logout_clears_credentials() {
    let session = Session::new(ConfigStore::in_memory(Config {
        auth: Some(issued("one")),
    }));
    let shared = session.clone();

    tokio::task::spawn_blocking(move || {
        let api = ApiClient::new("http://127.0.0.1:9", shared).unwrap();
        commands::logout(&api).unwrap();
    })
    .await
    .unwrap();

    assert!(!session.is_logged_in());
}
