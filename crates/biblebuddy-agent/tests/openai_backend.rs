#![allow(clippy::unwrap_used, clippy::expect_used)]
//! HTTP-level tests for the OpenAI Assistants backend against a mock server.

use biblebuddy_agent::{
    biblebuddy_assistant, AssistantConfig, OpenAiAssistantsBackend, PollPolicy, TurnCoordinator,
};
use biblebuddy_core::{AssistantService, BuddyError, MessageOrder, Role, RunStatus};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> AssistantConfig {
    AssistantConfig {
        api_key: Some("sk-test".into()),
        api_base_url: Some(format!("{}/", server.uri())),
        ..AssistantConfig::default()
    }
}

fn backend_for(server: &MockServer) -> OpenAiAssistantsBackend {
    OpenAiAssistantsBackend::new(&config_for(server)).unwrap()
}

#[tokio::test]
async fn test_create_assistant_sends_definition_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/assistants"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(header("OpenAI-Beta", "assistants=v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "asst_123",
            "object": "assistant"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let id = backend
        .create_assistant(&biblebuddy_assistant("gpt-4o"))
        .await
        .unwrap();
    assert_eq!(id, "asst_123");

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["name"], "BibleBuddy");
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["tools"], json!([{"type": "file_search"}]));
}

#[tokio::test]
async fn test_create_message_posts_role_and_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/threads/thread_1/messages"))
        .and(body_json(json!({"role": "user", "content": "Who wrote Romans?"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_1"})))
        .expect(1)
        .mount(&server)
        .await;

    let id = backend_for(&server)
        .create_message("thread_1", Role::User, "Who wrote Romans?")
        .await
        .unwrap();
    assert_eq!(id, "msg_1");
}

#[tokio::test]
async fn test_list_messages_requests_newest_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/threads/thread_1/messages"))
        .and(query_param("order", "desc"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                {"id": "msg_1", "role": "user", "created_at": 100,
                 "content": [{"type": "text", "text": {"value": "hi", "annotations": []}}]},
                {"id": "msg_2", "role": "assistant", "created_at": 101,
                 "content": [{"type": "text", "text": {"value": "hello", "annotations": []}}]}
            ]
        })))
        .mount(&server)
        .await;

    let messages = backend_for(&server)
        .list_messages("thread_1", MessageOrder::NewestFirst)
        .await
        .unwrap();
    assert_eq!(messages[0].id, "msg_2");
    assert_eq!(messages[0].text.as_deref(), Some("hello"));
    assert_eq!(messages[1].role, Role::User);
}

#[tokio::test]
async fn test_unauthorized_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/threads"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let err = backend_for(&server).create_thread().await.unwrap_err();
    match err {
        BuddyError::Unauthorized(msg) => assert_eq!(msg, "Incorrect API key provided"),
        other => panic!("expected Unauthorized, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/threads"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = backend_for(&server).create_thread().await.unwrap_err();
    assert!(matches!(err, BuddyError::Http(ref msg) if msg.contains("upstream down")));
}

#[tokio::test]
async fn test_unknown_run_status_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/threads/thread_1/runs/run_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_1",
            "status": "dreaming"
        })))
        .mount(&server)
        .await;

    let err = backend_for(&server)
        .retrieve_run("thread_1", "run_1")
        .await
        .unwrap_err();
    assert!(matches!(err, BuddyError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = backend_for(&server).create_thread().await.unwrap_err();
    assert!(matches!(err, BuddyError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_backend_requires_credential() {
    let result = OpenAiAssistantsBackend::new(&AssistantConfig::default());
    assert!(matches!(result, Err(BuddyError::MissingCredential)));
}

#[tokio::test]
async fn test_full_turn_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/threads/thread_1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_user"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/threads/thread_1/runs"))
        .and(body_json(json!({"assistant_id": "asst_1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_1",
            "status": "queued"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/threads/thread_1/runs/run_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_1",
            "status": "completed"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/threads/thread_1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "msg_reply", "role": "assistant", "created_at": 2,
                 "content": [{"type": "text", "text": {"value": "For God so loved the world...", "annotations": []}}]},
                {"id": "msg_user", "role": "user", "created_at": 1,
                 "content": [{"type": "text", "text": {"value": "What does John 3:16 say?", "annotations": []}}]}
            ]
        })))
        .mount(&server)
        .await;

    let coordinator = TurnCoordinator::new(
        Arc::new(backend_for(&server)),
        biblebuddy_assistant("gpt-4o"),
    )
    .with_poll_policy(PollPolicy {
        initial_delay_ms: 5,
        max_delay_ms: 20,
        max_attempts: 10,
        timeout_secs: 10,
    });

    let reply = coordinator
        .submit_turn(
            "thread_1",
            "asst_1",
            "What does John 3:16 say?",
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(reply, "For God so loved the world...");
}

#[tokio::test]
async fn test_failed_run_over_http_carries_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/threads/thread_1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_user"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/threads/thread_1/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_1",
            "status": "failed",
            "last_error": {"code": "server_error", "message": "Something went wrong"}
        })))
        .mount(&server)
        .await;

    let coordinator = TurnCoordinator::new(
        Arc::new(backend_for(&server)),
        biblebuddy_assistant("gpt-4o"),
    );
    let err = coordinator
        .submit_turn("thread_1", "asst_1", "hi", &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        BuddyError::RunFailed { status, reason } => {
            assert_eq!(status, RunStatus::Failed);
            assert_eq!(reason.as_deref(), Some("server_error: Something went wrong"));
        }
        other => panic!("expected RunFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cancel_run_posts_to_cancel_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/threads/thread_1/runs/run_1/cancel"))
        .and(header("OpenAI-Beta", "assistants=v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_1",
            "status": "cancelling"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let run = backend_for(&server)
        .cancel_run("thread_1", "run_1")
        .await
        .unwrap();
    assert_eq!(run.id, "run_1");
    assert_eq!(run.status, RunStatus::Cancelling);
}

#[tokio::test]
async fn test_timed_out_run_is_cancelled_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/threads/thread_1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_user"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/threads/thread_1/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_1",
            "status": "queued"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/threads/thread_1/runs/run_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_1",
            "status": "in_progress"
        })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/threads/thread_1/runs/run_1/cancel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_1",
            "status": "cancelling"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let coordinator = TurnCoordinator::new(
        Arc::new(backend_for(&server)),
        biblebuddy_assistant("gpt-4o"),
    )
    .with_poll_policy(PollPolicy {
        initial_delay_ms: 5,
        max_delay_ms: 5,
        max_attempts: 2,
        timeout_secs: 10,
    });

    let err = coordinator
        .submit_turn("thread_1", "asst_1", "hi", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, BuddyError::Timeout { attempts: 2, .. }));
}

#[tokio::test]
async fn test_failed_cancel_keeps_timeout_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/threads/thread_1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_user"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/threads/thread_1/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_1",
            "status": "in_progress"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/threads/thread_1/runs/run_1/cancel"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "Cannot cancel run with status 'completed'."}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let coordinator = TurnCoordinator::new(
        Arc::new(backend_for(&server)),
        biblebuddy_assistant("gpt-4o"),
    )
    .with_poll_policy(PollPolicy {
        initial_delay_ms: 5,
        max_delay_ms: 5,
        max_attempts: 0,
        timeout_secs: 10,
    });

    let err = coordinator
        .submit_turn("thread_1", "asst_1", "hi", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, BuddyError::Timeout { attempts: 0, .. }));
}
