//! HTTP transport tests against a local wiremock relay.

use futures::StreamExt;
use medchat::api::{ChatClient, ChatError};
use medchat::config::Config;
use medchat::state::ChatController;
use medchat::types::{ChatRequest, Language, Message};
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHAT_PATH: &str = "/functions/v1/medical-chat";

fn sse_body(deltas: &[&str]) -> String {
    let mut body = String::from(": connected\n\n");
    for delta in deltas {
        let frame = serde_json::json!({"choices": [{"delta": {"content": delta}}]});
        body.push_str(&format!("data: {frame}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn client_for(server: &MockServer) -> ChatClient {
    let config = Config {
        chat_url: Some(format!("{}{CHAT_PATH}", server.uri())),
        publishable_key: Some("pk_test_123".to_string()),
        ..Config::default()
    };
    ChatClient::new(&config).expect("valid local config")
}

fn hello_request() -> ChatRequest {
    ChatRequest {
        messages: vec![Message::user("Mujhe bukhar hai")],
        language: Language::Hinglish,
    }
}

async fn collect_body(client: &ChatClient, request: &ChatRequest) -> Result<String, ChatError> {
    let mut stream = client.create_stream(request).await?;
    let mut bytes = Vec::new();
    while let Some(chunk) = stream.next().await {
        bytes.extend_from_slice(&chunk?);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[tokio::test]
async fn create_stream_sends_bearer_key_and_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(header("authorization", "Bearer pk_test_123"))
        .and(header("content-type", "application/json"))
        .and(body_json(serde_json::json!({
            "messages": [{"role": "user", "content": "Mujhe bukhar hai"}],
            "language": "hinglish"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body(&["Theek hai"]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let body = collect_body(&client_for(&server), &hello_request())
        .await
        .expect("stream should open");
    assert!(body.ends_with("data: [DONE]\n\n"));
}

#[tokio::test]
async fn rate_limit_status_carries_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "error": "Rate limit exceeded. Please try again in a moment."
        })))
        .mount(&server)
        .await;

    let err = collect_body(&client_for(&server), &hello_request())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ChatError::RateLimited {
            message: "Rate limit exceeded. Please try again in a moment.".to_string()
        }
    );
}

#[tokio::test]
async fn payment_required_maps_to_quota_exceeded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(402).set_body_json(serde_json::json!({
            "error": "Service temporarily unavailable. Please try again later."
        })))
        .mount(&server)
        .await;

    let err = collect_body(&client_for(&server), &hello_request())
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::QuotaExceeded { .. }));
    assert_eq!(
        err.user_message(),
        "Service temporarily unavailable. Please try again later."
    );
}

#[tokio::test]
async fn server_error_without_json_uses_fallback_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let err = collect_body(&client_for(&server), &hello_request())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ChatError::Status {
            status: 500,
            message: "Failed to get response".to_string()
        }
    );
}

#[tokio::test]
async fn no_content_is_a_missing_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let err = collect_body(&client_for(&server), &hello_request())
        .await
        .unwrap_err();
    assert_eq!(err, ChatError::MissingBody);
}

#[tokio::test]
async fn unreachable_endpoint_is_a_network_error() {
    // Reserve a free port, then release it so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);

    let config = Config {
        chat_url: Some(format!("http://127.0.0.1:{port}{CHAT_PATH}")),
        publishable_key: Some("pk_test_123".to_string()),
        ..Config::default()
    };
    let client = ChatClient::new(&config).expect("valid local config");

    let err = collect_body(&client, &hello_request()).await.unwrap_err();
    assert!(matches!(err, ChatError::Network(_)), "got {err:?}");
}

#[tokio::test]
async fn controller_streams_reply_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body(&["Aaram ", "kijiye ", "aur paani piyein."]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let controller = ChatController::new(Arc::new(client_for(&server)));
    controller
        .send_message("Mujhe bukhar hai", Language::Hinglish)
        .await
        .expect("turn should complete");

    assert_eq!(
        controller.messages(),
        vec![
            Message::user("Mujhe bukhar hai"),
            Message::assistant("Aaram kijiye aur paani piyein."),
        ]
    );
    assert!(!controller.is_loading());
}

#[tokio::test]
async fn controller_rolls_back_turn_on_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
            "error": "AI service error"
        })))
        .mount(&server)
        .await;

    let controller = ChatController::new(Arc::new(client_for(&server)));
    let err = controller
        .send_message("test", Language::English)
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), "AI service error");
    assert!(controller.messages().is_empty());
    assert!(!controller.is_loading());
}
