//! HTTP API for browser clients.
//!
//! Hosts one conversation session at a time plus the speech endpoints.
//! Session calls are serialized by a mutex held across the LLM request, so a
//! second message can't race the first.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::gateway::tts::{TtsGateway, Voice};
use crate::gateway::llm::LlmGateway;
use crate::gateway::GatewayError;
use crate::journal::{CalendarDay, Journal, JournalEntry};
use crate::reflection::{Reflection, Reflector};
use crate::session::{Message, Session, SessionError, SessionState, SessionStats};
use crate::storage::{StorageError, Store};

#[derive(Clone)]
pub struct ApiState {
    pub gateway: LlmGateway,
    pub tts: Arc<TtsGateway>,
    pub reflector: Arc<Reflector>,
    pub store: Store,
    pub max_duration: Duration,
    pub session: Arc<Mutex<Option<Session>>>,
    /// Stats of the last ended session, for the journal entry.
    pub last_stats: Arc<Mutex<Option<SessionStats>>>,
    pub today: fn() -> NaiveDate,
}

impl ApiState {
    pub fn new(
        gateway: LlmGateway,
        tts: Arc<TtsGateway>,
        reflector: Arc<Reflector>,
        store: Store,
        max_duration: Duration,
    ) -> Self {
        Self {
            gateway,
            tts,
            reflector,
            store,
            max_duration,
            session: Arc::default(),
            last_stats: Arc::default(),
            today: local_today,
        }
    }
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

// --- Request/Response types ---

#[derive(Deserialize)]
struct MessageRequest {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct TtsRequest {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct StatusResponse {
    /// Absent while a session call holds the lock.
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<SessionState>,
    busy: bool,
    messages: usize,
    elapsed_secs: u64,
}

#[derive(Serialize)]
struct EndResponse {
    status: &'static str,
    utterances: usize,
}

#[derive(Serialize)]
struct VoicesResponse {
    voices: Vec<Voice>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioResponse {
    audio_content: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// Error reply with a status code and `{error, details}` body.
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                details: None,
            },
        }
    }

    fn with_details(mut self, details: impl Into<String>) -> Self {
        self.body.details = Some(details.into());
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::EmptyMessage => Self::new(StatusCode::BAD_REQUEST, "Text is required"),
            SessionError::InvalidState { .. } | SessionError::Expired(_) => {
                Self::new(StatusCode::CONFLICT, e.to_string())
            }
            SessionError::Storage(e) => e.into(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        warn!("Storage error: {e}");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Storage failure")
    }
}

impl ApiError {
    fn from_gateway(what: &str, e: GatewayError) -> Self {
        warn!("{what} failed: {e}");
        let status =
            StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, format!("{what} failed: {}", status.as_u16())).with_details(e.to_string())
    }
}

/// Build the axum router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(handle_status))
        .route("/api/session/start", post(handle_start))
        .route("/api/session/message", post(handle_message))
        .route("/api/session/end", post(handle_end))
        .route("/api/summary", get(handle_summary))
        .route("/api/journal", get(handle_journal))
        .route("/api/journal/{date}", get(handle_journal_entry))
        .route("/api/calendar/{year}/{month}", get(handle_calendar))
        .route("/api/tts", post(handle_tts))
        .route("/api/voices", get(handle_voices))
        .with_state(state)
}

/// Serve until the listener fails.
pub async fn serve(state: ApiState, addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP API listening on {addr}");
    axum::serve(listener, router(state)).await
}

// --- Handlers ---

/// Never waits on an in-flight LLM call; reports `busy` instead.
async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    let Ok(guard) = state.session.try_lock() else {
        return Json(StatusResponse {
            state: None,
            busy: true,
            messages: 0,
            elapsed_secs: 0,
        });
    };
    Json(match guard.as_ref() {
        Some(s) => StatusResponse {
            state: Some(s.state()),
            busy: false,
            messages: s.messages().len(),
            elapsed_secs: s.elapsed().as_secs(),
        },
        None => StatusResponse {
            state: Some(SessionState::Idle),
            busy: false,
            messages: 0,
            elapsed_secs: 0,
        },
    })
}

/// Begin a fresh session, discarding any unfinished one.
async fn handle_start(State(state): State<ApiState>) -> Result<Json<Message>, ApiError> {
    let mut guard = state.session.lock().await;
    if let Some(old) = guard.as_ref() {
        if old.state() == SessionState::Active {
            info!("Discarding unfinished session ({} messages)", old.messages().len());
        }
    }

    let mut session = Session::new(state.gateway.clone(), state.max_duration);
    let greeting = session.start().await?;
    *guard = Some(session);
    Ok(Json(greeting))
}

async fn handle_message(
    State(state): State<ApiState>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<Message>, ApiError> {
    let mut guard = state.session.lock().await;
    let session = guard
        .as_mut()
        .ok_or_else(|| ApiError::new(StatusCode::CONFLICT, "No active session"))?;
    Ok(Json(session.send(&req.text).await?))
}

async fn handle_end(State(state): State<ApiState>) -> Result<Json<EndResponse>, ApiError> {
    let mut guard = state.session.lock().await;
    let session = guard
        .as_mut()
        .ok_or_else(|| ApiError::new(StatusCode::CONFLICT, "No active session"))?;

    let stats = session.end(&state.store)?;
    *state.last_stats.lock().await = Some(stats);
    Ok(Json(EndResponse {
        status: "ended",
        utterances: session.transcript().len(),
    }))
}

async fn handle_summary(State(state): State<ApiState>) -> Result<Json<Reflection>, ApiError> {
    let today = (state.today)();
    let mut guard = state.session.lock().await;

    let reflection = match guard.as_mut() {
        Some(session) if session.state() == SessionState::Ending => {
            session.summarize(&state.reflector, &state.store, today).await?
        }
        _ => {
            let stats = *state.last_stats.lock().await;
            state.reflector.reflect(&state.store, today, stats).await?
        }
    };

    reflection
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "No conversation to summarize"))
}

async fn handle_journal(State(state): State<ApiState>) -> Result<Json<Journal>, ApiError> {
    Ok(Json(Journal::load(&state.store)?))
}

async fn handle_journal_entry(
    State(state): State<ApiState>,
    Path(date): Path<String>,
) -> Result<Json<JournalEntry>, ApiError> {
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, "Date must be YYYY-MM-DD"))?;
    let journal = Journal::load(&state.store)?;
    journal
        .get(date)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("No entry for {date}")))
}

async fn handle_calendar(
    State(state): State<ApiState>,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<Json<Vec<Option<CalendarDay>>>, ApiError> {
    let journal = Journal::load(&state.store)?;
    journal
        .month_grid(year, month)
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "Invalid month"))
}

fn require_tts(state: &ApiState) -> Result<(), ApiError> {
    if state.tts.enabled() {
        Ok(())
    } else {
        Err(ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "TTS is disabled"))
    }
}

async fn handle_tts(
    State(state): State<ApiState>,
    Json(req): Json<TtsRequest>,
) -> Result<Json<AudioResponse>, ApiError> {
    require_tts(&state)?;
    if req.text.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Text is required"));
    }
    let audio = state
        .tts
        .synthesize(&req.text)
        .await
        .map_err(|e| ApiError::from_gateway("TTS API request", e))?;
    Ok(Json(AudioResponse {
        audio_content: audio.audio_content,
    }))
}

async fn handle_voices(State(state): State<ApiState>) -> Result<Json<VoicesResponse>, ApiError> {
    require_tts(&state)?;
    let voices = state
        .tts
        .list_voices()
        .await
        .map_err(|e| ApiError::from_gateway("Voices API request", e))?;
    Ok(Json(VoicesResponse { voices }))
}
