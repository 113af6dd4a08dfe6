//! Lifedash HTTP server
//!
//! Axum router serving the form-driven HTML UI and a JSON API under `/api`.
//! Mutations from both surfaces go through [`crate::router::handle_request`];
//! pages read the store directly to render.
//!
//! Pages:
//! - GET  /                      — home, today at a glance
//! - GET  /goals, POST /goals    — list / add goals
//! - POST /goals/:index/delete   — delete a goal
//! - GET  /log, POST /log        — log progress, recent entries
//! - GET  /dashboard             — per-goal statistics
//! - GET  /chat, POST /chat/ask, POST /chat/clear — future-you chat
//!
//! API (JSON, `LifedashResponse` data unwrapped):
//! - GET /api/health, GET /api/version
//! - GET|POST /api/goals, DELETE /api/goals/:index
//! - GET|POST /api/logs
//! - GET /api/overview, GET /api/dashboard
//! - GET|POST|DELETE /api/chat

use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::{delete, get, post};
use axum::{Form, Json, Router};
use chrono::NaiveDate;
use lifedash_core::future_chat::{self, ChatContext, Horizon, Tone};
use lifedash_core::protocol::{ErrorKind, LifedashRequest, LifedashResponse};
use lifedash_core::{stats, Category};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::pages::{self, ChatView, Flash};
use crate::router::{handle_request, AppState};

/// Build the Axum router with all pages and API endpoints
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/goals", get(list_goals_handler).post(add_goal_handler))
        .route("/goals/:index", delete(delete_goal_handler))
        .route("/logs", get(list_logs_handler).post(add_log_handler))
        .route("/overview", get(overview_handler))
        .route("/dashboard", get(dashboard_handler))
        .route(
            "/chat",
            get(chat_state_handler)
                .post(ask_handler)
                .delete(clear_chat_handler),
        );

    Router::new()
        .route("/", get(home_page))
        .route("/goals", get(goals_page).post(add_goal_form))
        .route("/goals/:index/delete", post(delete_goal_form))
        .route("/log", get(log_page).post(add_log_form))
        .route("/dashboard", get(dashboard_page))
        .route("/chat", get(chat_page))
        .route("/chat/ask", post(ask_form))
        .route("/chat/clear", post(clear_chat_form))
        .nest("/api", api)
        .with_state(state)
}

/// Serve until the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: Arc<AppState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Lifedash listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AddGoalBody {
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddLogBody {
    pub goal: String,
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct LogsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct AskBody {
    pub question: String,
    #[serde(default)]
    pub horizon: Horizon,
    #[serde(default)]
    pub tone: Tone,
}

/// HTML forms post every field as text.
#[derive(Debug, Deserialize)]
pub struct GoalForm {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct LogForm {
    pub goal: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub horizon: String,
    #[serde(default)]
    pub tone: String,
}

// ============================================================================
// Inner (directly testable) functions
// ============================================================================

/// Run a request through the router and unwrap the envelope for HTTP.
pub async fn api_inner(state: &AppState, request: LifedashRequest) -> (StatusCode, serde_json::Value) {
    response_to_http(handle_request(request, state).await)
}

pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "api": "lifedash/1",
    })
}

/// Map an envelope to `(status, body)`: `data` on success, `{error, status}` otherwise.
pub fn response_to_http(response: LifedashResponse) -> (StatusCode, serde_json::Value) {
    if response.is_ok() {
        return (
            StatusCode::OK,
            response.data.unwrap_or_else(|| serde_json::json!({})),
        );
    }

    let status = match response.kind {
        Some(ErrorKind::Invalid) => StatusCode::BAD_REQUEST,
        Some(ErrorKind::NotFound) => StatusCode::NOT_FOUND,
        Some(ErrorKind::Precondition) => StatusCode::UNPROCESSABLE_ENTITY,
        Some(ErrorKind::Upstream) => StatusCode::BAD_GATEWAY,
        Some(ErrorKind::Internal) | None => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        serde_json::json!({
            "error": response.error.unwrap_or_else(|| "unknown error".to_string()),
            "status": "error",
        }),
    )
}

/// Extractor failures (unknown category, bad date, malformed JSON) reported
/// in the same `{error, status}` shape as every other API error.
fn invalid_body(detail: String) -> (StatusCode, Json<serde_json::Value>) {
    let (status, body) = response_to_http(LifedashResponse::err(ErrorKind::Invalid, detail));
    (status, Json(body))
}

/// Turn a mutation result into the inline message shown on the page.
pub fn flash_for(response: &LifedashResponse) -> Option<Flash> {
    if response.is_ok() {
        return response
            .data
            .as_ref()
            .and_then(|d| d["message"].as_str())
            .map(|m| Flash::Success(m.to_string()));
    }

    let msg = response.error.clone().unwrap_or_else(|| "unknown error".to_string());
    Some(match response.kind {
        Some(ErrorKind::Invalid) => Flash::Warning(msg),
        Some(ErrorKind::Precondition) => Flash::Info(msg),
        _ => Flash::Error(msg),
    })
}

pub async fn render_home(state: &AppState, flashes: &[Flash]) -> String {
    let store = state.store.lock().await;
    pages::home(&stats::overview(store.goals(), store.logs()), flashes)
}

pub async fn render_goals(state: &AppState, flashes: &[Flash]) -> String {
    let store = state.store.lock().await;
    pages::goals(store.goals(), flashes)
}

pub async fn render_log(state: &AppState, flashes: &[Flash]) -> String {
    let store = state.store.lock().await;
    let recent = stats::recent_entries(store.logs(), state.config.dashboard.recent_entries_limit);
    pages::log_today(store.goals(), &recent, state.today(), flashes)
}

pub async fn render_dashboard(state: &AppState, flashes: &[Flash]) -> String {
    let response = handle_request(LifedashRequest::Dashboard, state).await;
    if !response.is_ok() {
        let notice = response.error.unwrap_or_default();
        return pages::dashboard(Err(notice.as_str()), flashes);
    }

    let store = state.store.lock().await;
    let dashboard = stats::dashboard(store.goals(), store.logs());
    pages::dashboard(Ok(&dashboard), flashes)
}

pub async fn render_chat(state: &AppState, horizon: Horizon, tone: Tone, flashes: &[Flash]) -> String {
    let store = state.store.lock().await;
    let readiness = future_chat::ensure_ready(store.goals(), store.logs()).map(|()| {
        ChatContext::build(
            store.goals(),
            store.logs(),
            state.today(),
            state.config.dashboard.recent_window_days,
        )
    });
    let notice = readiness.as_ref().err().map(|e| e.to_string()).unwrap_or_default();

    let view = ChatView {
        history: store.chat_history(),
        context: readiness.as_ref().map_err(|_| notice.as_str()),
        chat_available: state.chat.is_some(),
        horizon,
        tone,
    };
    pages::chat(&view, flashes)
}

// ============================================================================
// Page handlers
// ============================================================================

pub async fn home_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_home(&state, &[]).await)
}

pub async fn goals_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_goals(&state, &[]).await)
}

pub async fn add_goal_form(
    State(state): State<Arc<AppState>>,
    Form(form): Form<GoalForm>,
) -> Html<String> {
    let flash = match form.category.parse::<Category>() {
        Ok(category) => {
            let request = LifedashRequest::AddGoal {
                name: form.name,
                category,
                description: Some(form.description),
            };
            flash_for(&handle_request(request, &state).await)
        }
        Err(e) => Some(Flash::Warning(e.to_string())),
    };
    Html(render_goals(&state, flash.as_slice()).await)
}

pub async fn delete_goal_form(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Html<String> {
    let response = handle_request(LifedashRequest::DeleteGoal { index }, &state).await;
    let flash = if response.is_ok() { None } else { flash_for(&response) };
    Html(render_goals(&state, flash.as_slice()).await)
}

pub async fn log_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_log(&state, &[]).await)
}

pub async fn add_log_form(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LogForm>,
) -> Html<String> {
    let date = form.date.trim();
    let flash = if date.is_empty() {
        Ok(None)
    } else {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| Flash::Warning(format!("'{}' is not a valid date.", date)))
    };

    let flash = match flash {
        Ok(date) => {
            let request = LifedashRequest::AddLog {
                goal: form.goal,
                date,
                note: Some(form.note),
            };
            flash_for(&handle_request(request, &state).await)
        }
        Err(warning) => Some(warning),
    };
    Html(render_log(&state, flash.as_slice()).await)
}

pub async fn dashboard_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_dashboard(&state, &[]).await)
}

pub async fn chat_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_chat(&state, Horizon::default(), Tone::default(), &[]).await)
}

pub async fn ask_form(
    State(state): State<Arc<AppState>>,
    Form(form): Form<AskForm>,
) -> Html<String> {
    let parsed = form
        .horizon
        .parse::<Horizon>()
        .and_then(|h| form.tone.parse::<Tone>().map(|t| (h, t)));

    let (horizon, tone, flash) = match parsed {
        Ok((horizon, tone)) => {
            let request = LifedashRequest::AskFutureSelf {
                question: form.question,
                horizon,
                tone,
            };
            let response = handle_request(request, &state).await;
            let flash = if response.is_ok() { None } else { flash_for(&response) };
            (horizon, tone, flash)
        }
        Err(e) => (Horizon::default(), Tone::default(), Some(Flash::Warning(e.to_string()))),
    };

    Html(render_chat(&state, horizon, tone, flash.as_slice()).await)
}

pub async fn clear_chat_form(State(state): State<Arc<AppState>>) -> Html<String> {
    let response = handle_request(LifedashRequest::ClearChat, &state).await;
    let flash = if response.is_ok() { None } else { flash_for(&response) };
    Html(render_chat(&state, Horizon::default(), Tone::default(), flash.as_slice()).await)
}

// ============================================================================
// API handlers (thin — delegate to api_inner)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, body) = api_inner(&state, LifedashRequest::Health).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn list_goals_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, body) = api_inner(&state, LifedashRequest::ListGoals).await;
    (status, Json(body))
}

pub async fn add_goal_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AddGoalBody>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match body {
        Ok(b) => b,
        Err(rejection) => return invalid_body(rejection.body_text()),
    };
    let request = LifedashRequest::AddGoal {
        name: req.name,
        category: req.category,
        description: req.description,
    };
    let (status, body) = api_inner(&state, request).await;
    (status, Json(body))
}

pub async fn delete_goal_handler(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> impl IntoResponse {
    let (status, body) = api_inner(&state, LifedashRequest::DeleteGoal { index }).await;
    (status, Json(body))
}

pub async fn list_logs_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<LogsQuery>, QueryRejection>,
) -> impl IntoResponse {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return invalid_body(rejection.body_text()),
    };
    let (status, body) = api_inner(&state, LifedashRequest::RecentLogs { limit: query.limit }).await;
    (status, Json(body))
}

pub async fn add_log_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AddLogBody>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match body {
        Ok(b) => b,
        Err(rejection) => return invalid_body(rejection.body_text()),
    };
    let request = LifedashRequest::AddLog {
        goal: req.goal,
        date: req.date,
        note: req.note,
    };
    let (status, body) = api_inner(&state, request).await;
    (status, Json(body))
}

pub async fn overview_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, body) = api_inner(&state, LifedashRequest::Overview).await;
    (status, Json(body))
}

pub async fn dashboard_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, body) = api_inner(&state, LifedashRequest::Dashboard).await;
    (status, Json(body))
}

pub async fn chat_state_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, body) = api_inner(&state, LifedashRequest::ChatState).await;
    (status, Json(body))
}

pub async fn ask_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AskBody>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match body {
        Ok(b) => b,
        Err(rejection) => return invalid_body(rejection.body_text()),
    };
    let request = LifedashRequest::AskFutureSelf {
        question: req.question,
        horizon: req.horizon,
        tone: req.tone,
    };
    let (status, body) = api_inner(&state, request).await;
    (status, Json(body))
}

pub async fn clear_chat_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, body) = api_inner(&state, LifedashRequest::ClearChat).await;
    (status, Json(body))
}

// ============================================================================
// Unit Tests — pure helpers
// ============================================================================
