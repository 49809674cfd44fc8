use markd_core::{AuthError, Credential, MarkdClient};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn login(username: &str, password: &str) -> Credential {
    Credential::Login {
        username: username.to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn login_captures_session_cookie_for_later_requests() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({ "username": "alice", "password": "secret" })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "markd_auth=jwt-123; Path=/; HttpOnly")
                .set_body_json(json!({
                    "success": true,
                    "user": { "username": "alice" }
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/documents/doc-1"))
        .and(header("cookie", "markd_auth=jwt-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "document": { "content": "body" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = MarkdClient::connect(&server.uri(), &login("alice", "secret"))
        .await
        .unwrap();

    assert_eq!(client.session().username(), Some("alice"));
    assert_eq!(client.fetch_content("doc-1").await.unwrap(), "body");
}

#[tokio::test]
async fn login_rejects_non_200_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let err = MarkdClient::connect(&server.uri(), &login("alice", "wrong"))
        .await
        .err()
        .unwrap();

    match err {
        AuthError::Rejected { status, body } => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(body, "bad credentials");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn login_refused_when_success_flag_is_false() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "detail": "account locked"
        })))
        .mount(&server)
        .await;

    let err = MarkdClient::connect(&server.uri(), &login("alice", "secret"))
        .await
        .err()
        .unwrap();

    assert!(matches!(err, AuthError::Refused { detail } if detail == "account locked"));
}

#[tokio::test]
async fn login_without_session_cookie_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "user": { "username": "alice" }
        })))
        .mount(&server)
        .await;

    let err = MarkdClient::connect(&server.uri(), &login("alice", "secret"))
        .await
        .err()
        .unwrap();

    assert!(matches!(err, AuthError::MissingSession));
}

#[tokio::test]
async fn token_credential_skips_login() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/documents/doc-9"))
        .and(header("cookie", "markd_auth=preshared"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = MarkdClient::connect(
        &server.uri(),
        &Credential::Token("preshared".to_string()),
    )
    .await
    .unwrap();

    assert_eq!(client.session().username(), None);
    client.update_document("doc-9", "text", "Nine").await.unwrap();
}
