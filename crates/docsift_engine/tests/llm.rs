use std::time::Duration;

use docsift_core::LlmSettings;
use docsift_engine::{ChatClient, LlmError, TextGenerator};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer, provider: &str) -> LlmSettings {
    LlmSettings {
        provider: provider.to_string(),
        api_key: Some("sk-test".to_string()),
        base_url: format!("{}/v1", server.uri()),
        ..LlmSettings::default()
    }
}

fn completion(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"message": {"role": "assistant", "content": text}}]
    }))
}

async fn last_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    requests.last().unwrap().body_json().unwrap()
}

#[tokio::test]
async fn chat_request_carries_model_messages_and_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(completion("  {\"decision\": \"include\"}  "))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(settings(&server, "openai/gpt-4o-mini"), Duration::from_secs(5))
        .unwrap()
        .with_max_tokens(500);
    let text = client.generate("system text", "user text").await.unwrap();
    assert_eq!(text, "{\"decision\": \"include\"}");

    let body = last_body(&server).await;
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["max_tokens"], 500);
    assert!(body["temperature"].is_number());
    assert_eq!(
        body["messages"],
        json!([
            {"role": "system", "content": "system text"},
            {"role": "user", "content": "user text"}
        ])
    );
}

#[tokio::test]
async fn reasoning_model_folds_system_prompt_into_user_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion("ok"))
        .mount(&server)
        .await;

    let client = ChatClient::new(settings(&server, "openai/o1-mini"), Duration::from_secs(5))
        .unwrap()
        .with_max_tokens(500);
    client.generate("be brief", "question").await.unwrap();

    let body = last_body(&server).await;
    assert_eq!(body["model"], "o1-mini");
    assert!(body.get("temperature").is_none());
    assert!(body.get("max_tokens").is_none());
    assert_eq!(
        body["messages"],
        json!([{"role": "user", "content": "be brief\n\nquestion"}])
    );
}

#[tokio::test]
async fn empty_system_prompt_sends_only_user_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(completion("ok"))
        .mount(&server)
        .await;

    let client =
        ChatClient::new(settings(&server, "openai/gpt-4o"), Duration::from_secs(5)).unwrap();
    client.generate("", "extract this").await.unwrap();

    let body = last_body(&server).await;
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    assert!(body.get("max_tokens").is_none());
}

#[tokio::test]
async fn error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let client =
        ChatClient::new(settings(&server, "openai/gpt-4o"), Duration::from_secs(5)).unwrap();
    let err = client.generate("s", "u").await.unwrap_err();
    assert_eq!(
        err,
        LlmError::Status {
            status: 429,
            body: "rate limited".to_string()
        }
    );
}

#[tokio::test]
async fn response_without_choices_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let client =
        ChatClient::new(settings(&server, "openai/gpt-4o"), Duration::from_secs(5)).unwrap();
    let err = client.generate("s", "u").await.unwrap_err();
    assert!(matches!(err, LlmError::Parse(_)));
}

#[test]
fn missing_api_key_is_a_config_error() {
    let settings = LlmSettings {
        api_key: Some("   ".to_string()),
        ..LlmSettings::default()
    };
    let err = ChatClient::new(settings, Duration::from_secs(5)).unwrap_err();
    assert!(matches!(err, LlmError::Config(msg) if msg.contains("OPENAI_API_KEY")));
}
