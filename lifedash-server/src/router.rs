use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use lifedash_core::future_chat::{self, ChatContext, FutureSelfPrompt, Horizon, Tone};
use lifedash_core::protocol::{ErrorKind, LifedashRequest, LifedashResponse};
use lifedash_core::{
    stats, ChatBackend, ChatConfig, ChatMessage, Goal, JsonStore, LifedashConfig, LifedashError,
    LlmError, LogEntry, OpenAiChatClient,
};
use serde_json::json;
use tokio::sync::Mutex;

/// Shared state for the router, the HTML pages and the JSON API.
pub struct AppState {
    pub store: Mutex<JsonStore>,
    pub config: LifedashConfig,
    pub chat: Option<Arc<dyn ChatBackend>>,
}

impl AppState {
    pub fn new(store: JsonStore, config: LifedashConfig, chat: Option<Arc<dyn ChatBackend>>) -> Self {
        Self {
            store: Mutex::new(store),
            config,
            chat,
        }
    }

    /// Open the data directory and build the chat backend from config.
    /// A missing API key is not fatal: the chat page reports it instead.
    pub fn from_config(config: LifedashConfig) -> anyhow::Result<Self> {
        let store = JsonStore::open(PathBuf::from(&config.storage.data_dir))?;

        let chat: Option<Arc<dyn ChatBackend>> =
            match OpenAiChatClient::new(ChatConfig::from_settings(&config.chat)) {
                Ok(client) => {
                    tracing::info!(model = client.model(), "Chat backend ready");
                    Some(Arc::new(client))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Future-you chat disabled");
                    None
                }
            };

        Ok(Self::new(store, config, chat))
    }

    pub fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

pub async fn handle_request(request: LifedashRequest, state: &AppState) -> LifedashResponse {
    match request {
        LifedashRequest::Health => {
            let store = state.store.lock().await;
            LifedashResponse::ok(json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "data_dir": store.data_dir().display().to_string(),
                "goals": store.goals().len(),
                "logs": store.logs().len(),
                "chat_backend": state.chat.as_ref().map(|c| c.name().to_string()),
            }))
        }
        LifedashRequest::ListGoals => {
            let store = state.store.lock().await;
            LifedashResponse::ok(json!({
                "goals": store.goals(),
                "count": store.goals().len(),
            }))
        }
        LifedashRequest::AddGoal {
            name,
            category,
            description,
        } => {
            let goal = match Goal::new(&name, category, description.as_deref()) {
                Ok(g) => g,
                Err(e) => return error_response(e),
            };
            let mut store = state.store.lock().await;
            match store.add_goal(goal.clone()) {
                Ok(()) => {
                    tracing::info!(goal = %goal.name, category = %goal.category, "Goal added");
                    LifedashResponse::ok(json!({
                        "added": goal,
                        "index": store.goals().len() - 1,
                        "message": format!("Goal '{}' added! Keep going 🚀", goal.name),
                    }))
                }
                Err(e) => error_response(e),
            }
        }
        LifedashRequest::DeleteGoal { index } => {
            let mut store = state.store.lock().await;
            match store.delete_goal(index) {
                Ok(goal) => {
                    tracing::info!(goal = %goal.name, index, "Goal deleted");
                    LifedashResponse::ok(json!({ "deleted": goal }))
                }
                Err(e) => error_response(e),
            }
        }
        LifedashRequest::RecentLogs { limit } => {
            let limit = limit.unwrap_or(state.config.dashboard.recent_entries_limit);
            let store = state.store.lock().await;
            let entries = stats::recent_entries(store.logs(), limit);
            LifedashResponse::ok(json!({
                "count": entries.len(),
                "total": store.logs().len(),
                "entries": entries,
            }))
        }
        LifedashRequest::AddLog { goal, date, note } => {
            let date = date.unwrap_or_else(|| state.today());
            let entry = LogEntry::new(&goal, date, note.as_deref().unwrap_or_default());
            let mut store = state.store.lock().await;
            match store.add_log(entry.clone()) {
                Ok(()) => {
                    tracing::info!(goal = %entry.goal, date = %entry.date, "Progress logged");
                    LifedashResponse::ok(json!({
                        "added": entry,
                        "message": format!("Progress logged for '{}'", entry.goal),
                    }))
                }
                Err(e) => error_response(e),
            }
        }
        LifedashRequest::Overview => {
            let store = state.store.lock().await;
            let overview = stats::overview(store.goals(), store.logs());
            LifedashResponse::ok(json!({
                "active_goals": overview.active_goals,
                "total_logs": overview.total_logs,
                "last_logged": overview.last_logged,
                "last_logged_label": overview.last_logged.label(),
                "categories": overview.categories,
            }))
        }
        LifedashRequest::Dashboard => {
            let store = state.store.lock().await;
            if store.goals().is_empty() {
                return LifedashResponse::err(
                    ErrorKind::Precondition,
                    "You do not have any goals yet. Go to Set Goals to create one before using the dashboard.",
                );
            }
            if store.logs().is_empty() {
                return LifedashResponse::err(
                    ErrorKind::Precondition,
                    "You have not logged any progress yet. Go to Log Today to add your first entries.",
                );
            }
            match serde_json::to_value(stats::dashboard(store.goals(), store.logs())) {
                Ok(data) => LifedashResponse::ok(data),
                Err(e) => LifedashResponse::err(ErrorKind::Internal, e.to_string()),
            }
        }
        LifedashRequest::ChatState => {
            let store = state.store.lock().await;
            let readiness = future_chat::ensure_ready(store.goals(), store.logs());
            let context = readiness.is_ok().then(|| {
                ChatContext::build(
                    store.goals(),
                    store.logs(),
                    state.today(),
                    state.config.dashboard.recent_window_days,
                )
            });
            LifedashResponse::ok(json!({
                "history": store.chat_history(),
                "ready": readiness.is_ok(),
                "notice": readiness.err().map(|e| e.to_string()),
                "chat_available": state.chat.is_some(),
                "context": context,
            }))
        }
        LifedashRequest::AskFutureSelf {
            question,
            horizon,
            tone,
        } => ask_future_self(state, question, horizon, tone).await,
        LifedashRequest::ClearChat => {
            let mut store = state.store.lock().await;
            match store.clear_chat() {
                Ok(()) => LifedashResponse::ok(json!({ "cleared": true })),
                Err(e) => error_response(e),
            }
        }
    }
}

/// Record the question, ask the persona, record the answer.
///
/// The store lock is released while the API call is in flight. The question
/// stays in the history even if the call fails.
async fn ask_future_self(
    state: &AppState,
    question: String,
    horizon: Horizon,
    tone: Tone,
) -> LifedashResponse {
    let Some(backend) = state.chat.clone() else {
        return LifedashResponse::err(ErrorKind::Precondition, LlmError::MissingApiKey.to_string());
    };

    let prompt = {
        let mut store = state.store.lock().await;
        if let Err(e) = future_chat::ensure_ready(store.goals(), store.logs()) {
            return LifedashResponse::err(ErrorKind::Precondition, e.to_string());
        }

        let context = ChatContext::build(
            store.goals(),
            store.logs(),
            state.today(),
            state.config.dashboard.recent_window_days,
        );
        let prompt = match FutureSelfPrompt::build(&context, horizon, tone, &question) {
            Ok(p) => p,
            Err(e) => return error_response(e),
        };

        if let Err(e) = store.append_chat(ChatMessage::user(question.clone())) {
            return error_response(e);
        }
        prompt
    };

    tracing::info!(backend = backend.name(), %horizon, %tone, "Asking future you");

    let answer = match backend.complete(&prompt.system, &prompt.user).await {
        Ok(a) => a,
        Err(e) => {
            tracing::error!(error = %e, "Future-you chat failed");
            return LifedashResponse::err(ErrorKind::Upstream, format!("Chat API error: {}", e));
        }
    };

    let mut store = state.store.lock().await;
    match store.append_chat(ChatMessage::assistant(answer.clone())) {
        Ok(()) => LifedashResponse::ok(json!({
            "answer": answer,
            "history": store.chat_history(),
        })),
        Err(e) => error_response(e),
    }
}

fn error_response(e: LifedashError) -> LifedashResponse {
    let kind = match &e {
        LifedashError::Validation(_) => ErrorKind::Invalid,
        LifedashError::NotFound(_) => ErrorKind::NotFound,
        _ => ErrorKind::Internal,
    };
    LifedashResponse::err(kind, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lifedash_core::Category;

    struct EchoBackend;

    #[async_trait]
    impl ChatBackend for EchoBackend {
        async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
            Ok(format!("{} | {}", system.trim(), user.lines().count()))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl ChatBackend for FailingBackend {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
            Err(LlmError::Api {
                code: 500,
                message: "boom".to_string(),
            })
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn state_with(dir: &tempfile::TempDir, chat: Option<Arc<dyn ChatBackend>>) -> AppState {
        let store = JsonStore::open(dir.path()).unwrap();
        AppState::new(store, LifedashConfig::default(), chat)
    }

    async fn seed(state: &AppState) {
        let add_goal = LifedashRequest::AddGoal {
            name: "Run".to_string(),
            category: Category::Health,
            description: Some("energy".to_string()),
        };
        assert!(handle_request(add_goal, state).await.is_ok());
        let add_log = LifedashRequest::AddLog {
            goal: "Run".to_string(),
            date: None,
            note: Some("5k".to_string()),
        };
        assert!(handle_request(add_log, state).await.is_ok());
    }

    fn ask(question: &str) -> LifedashRequest {
        LifedashRequest::AskFutureSelf {
            question: question.to_string(),
            horizon: Horizon::OneYear,
            tone: Tone::SupportiveCoach,
        }
    }

    #[tokio::test]
    async fn test_chat_state_with_very_wide_window() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = LifedashConfig::default();
        config.dashboard.recent_window_days = 1_000_000_000;
        let state = AppState::new(JsonStore::open(dir.path()).unwrap(), config, None);
        seed(&state).await;

        let resp = handle_request(LifedashRequest::ChatState, &state).await;
        assert!(resp.is_ok());
        let data = resp.data.unwrap();
        assert_eq!(data["ready"], true);
        assert!(data["context"]["progress_text"]
            .as_str()
            .unwrap()
            .starts_with("- Run: 1 log(s)"));
    }

    #[tokio::test]
    async fn test_add_goal_blank_name_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(&dir, None);
        let resp = handle_request(
            LifedashRequest::AddGoal {
                name: " ".to_string(),
                category: Category::Career,
                description: None,
            },
            &state,
        )
        .await;
        assert_eq!(resp.kind, Some(ErrorKind::Invalid));
        assert_eq!(resp.error.as_deref(), Some("Please enter a goal name before adding."));
    }

    #[tokio::test]
    async fn test_add_log_defaults_to_today() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(&dir, None);
        seed(&state).await;

        let store = state.store.lock().await;
        assert_eq!(store.logs()[0].date, state.today().format("%Y-%m-%d").to_string());
    }

    #[tokio::test]
    async fn test_dashboard_preconditions() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(&dir, None);

        let resp = handle_request(LifedashRequest::Dashboard, &state).await;
        assert_eq!(resp.kind, Some(ErrorKind::Precondition));
        assert!(resp.error.unwrap().contains("do not have any goals"));

        handle_request(
            LifedashRequest::AddGoal {
                name: "Run".to_string(),
                category: Category::Health,
                description: None,
            },
            &state,
        )
        .await;
        let resp = handle_request(LifedashRequest::Dashboard, &state).await;
        assert!(resp.error.unwrap().contains("not logged any progress"));
    }

    #[tokio::test]
    async fn test_delete_missing_goal_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(&dir, None);
        let resp = handle_request(LifedashRequest::DeleteGoal { index: 0 }, &state).await;
        assert_eq!(resp.kind, Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_ask_without_backend_reports_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(&dir, None);
        seed(&state).await;

        let resp = handle_request(ask("Am I on track?"), &state).await;
        assert_eq!(resp.kind, Some(ErrorKind::Precondition));
        assert!(resp.error.unwrap().contains("OPENAI_API_KEY"));
    }

    #[tokio::test]
    async fn test_ask_records_both_turns() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(&dir, Some(Arc::new(EchoBackend)));
        seed(&state).await;

        let resp = handle_request(ask("Am I on track?"), &state).await;
        assert!(resp.is_ok(), "{:?}", resp.error);
        let answer = resp.data.unwrap()["answer"].as_str().unwrap().to_string();
        assert!(answer.contains("future self from 1 year"));

        let store = state.store.lock().await;
        let history = store.chat_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], ChatMessage::user("Am I on track?"));
        assert_eq!(history[1].content, answer);
    }

    #[tokio::test]
    async fn test_ask_failure_keeps_question() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(&dir, Some(Arc::new(FailingBackend)));
        seed(&state).await;

        let resp = handle_request(ask("Will I make it?"), &state).await;
        assert_eq!(resp.kind, Some(ErrorKind::Upstream));
        assert!(resp.error.unwrap().starts_with("Chat API error:"));

        let store = state.store.lock().await;
        assert_eq!(store.chat_history(), &[ChatMessage::user("Will I make it?")]);
    }

    #[tokio::test]
    async fn test_ask_blank_question_records_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(&dir, Some(Arc::new(EchoBackend)));
        seed(&state).await;

        let resp = handle_request(ask("   "), &state).await;
        assert_eq!(resp.kind, Some(ErrorKind::Invalid));
        assert_eq!(resp.error.as_deref(), Some("Enter a question first."));
        assert!(state.store.lock().await.chat_history().is_empty());
    }

    #[tokio::test]
    async fn test_chat_state_before_any_logs() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(&dir, Some(Arc::new(EchoBackend)));

        let resp = handle_request(LifedashRequest::ChatState, &state).await;
        let data = resp.data.unwrap();
        assert_eq!(data["ready"], false);
        assert!(data["context"].is_null());
        assert!(data["notice"].as_str().unwrap().contains("at least one goal"));
        assert_eq!(data["chat_available"], true);
    }
}
