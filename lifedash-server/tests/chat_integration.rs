//! Integration tests for the future-you chat against a mocked
//! chat-completion API.

use std::sync::Arc;

use chrono::Duration;
use lifedash_core::config::ChatSettings;
use lifedash_core::protocol::{ErrorKind, LifedashRequest};
use lifedash_core::{
    Category, ChatBackend, ChatConfig, Horizon, JsonStore, LifedashConfig, OpenAiChatClient, Role,
    Tone,
};
use lifedash_server::router::{handle_request, AppState};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> serde_json::Value {
    json!({
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

fn create_test_backend(mock_server: &MockServer) -> Arc<dyn ChatBackend> {
    let settings = ChatSettings {
        api_key: Some("sk-test".to_string()),
        base_url: mock_server.uri(),
        max_retries: 0,
        retry_delay_ms: 10,
        ..ChatSettings::default()
    };
    Arc::new(OpenAiChatClient::new(ChatConfig::from_settings(&settings)).expect("client"))
}

async fn seeded_state(dir: &tempfile::TempDir, backend: Arc<dyn ChatBackend>) -> AppState {
    let state = AppState::new(
        JsonStore::open(dir.path()).unwrap(),
        LifedashConfig::default(),
        Some(backend),
    );

    let today = state.today();
    let requests = [
        LifedashRequest::AddGoal {
            name: "Run a marathon".to_string(),
            category: Category::Health,
            description: Some("more energy".to_string()),
        },
        LifedashRequest::AddLog {
            goal: "Run a marathon".to_string(),
            date: Some(today - Duration::days(2)),
            note: Some("easy 5k".to_string()),
        },
        LifedashRequest::AddLog {
            goal: "Run a marathon".to_string(),
            date: Some(today - Duration::days(90)),
            note: Some("long ago".to_string()),
        },
    ];
    for request in requests {
        assert!(handle_request(request, &state).await.is_ok());
    }
    state
}

#[tokio::test]
async fn test_ask_future_self_round_trip() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let state = seeded_state(&dir, create_test_backend(&mock_server)).await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("gpt-4o-mini"))
        .and(body_string_contains("future self from 5 years"))
        .and(body_string_contains("Your tone is: Stoic mentor."))
        .and(body_string_contains("- Run a marathon (Category: Health) — more energy"))
        // only the recent log falls inside the 30-day window
        .and(body_string_contains("- Run a marathon: 1 log(s), last activity"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Keep showing up.")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let resp = handle_request(
        LifedashRequest::AskFutureSelf {
            question: "Am I on the right track?".to_string(),
            horizon: Horizon::FiveYears,
            tone: Tone::StoicMentor,
        },
        &state,
    )
    .await;
    assert!(resp.is_ok(), "{:?}", resp.error);
    assert_eq!(resp.data.unwrap()["answer"], "Keep showing up.");

    // Reopen from disk: both turns were persisted
    let reopened = JsonStore::open(dir.path()).unwrap();
    let history = reopened.chat_history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].content, "Am I on the right track?");
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[1].content, "Keep showing up.");
}

#[tokio::test]
async fn test_api_failure_is_reported_and_question_kept() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let state = seeded_state(&dir, create_test_backend(&mock_server)).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided" }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let resp = handle_request(
        LifedashRequest::AskFutureSelf {
            question: "Should I rest?".to_string(),
            horizon: Horizon::default(),
            tone: Tone::default(),
        },
        &state,
    )
    .await;

    assert_eq!(resp.kind, Some(ErrorKind::Upstream));
    assert!(resp.error.unwrap().contains("Incorrect API key provided"));

    let store = state.store.lock().await;
    assert_eq!(store.chat_history().len(), 1);
    assert_eq!(store.chat_history()[0].content, "Should I rest?");
}

#[tokio::test]
async fn test_clear_conversation() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let state = seeded_state(&dir, create_test_backend(&mock_server)).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Rest on Sundays.")))
        .mount(&mock_server)
        .await;

    let ask = LifedashRequest::AskFutureSelf {
        question: "Should I rest?".to_string(),
        horizon: Horizon::default(),
        tone: Tone::default(),
    };
    assert!(handle_request(ask, &state).await.is_ok());

    let resp = handle_request(LifedashRequest::ChatState, &state).await;
    let data = resp.data.unwrap();
    assert_eq!(data["history"].as_array().unwrap().len(), 2);
    assert_eq!(data["ready"], true);
    assert!(data["context"]["progress_text"]
        .as_str()
        .unwrap()
        .starts_with("- Run a marathon: 1 log(s)"));

    assert!(handle_request(LifedashRequest::ClearChat, &state).await.is_ok());
    assert!(JsonStore::open(dir.path()).unwrap().chat_history().is_empty());
}
