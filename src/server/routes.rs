//! HTTP routes of the bridge.
//!
//! | Method | Path | Caller |
//! |--------|------|--------|
//! | GET/POST | `/selenium-server/driver?sessionId=&commandRequest=` | test driver |
//! | GET | `/selenium-server/runner?sessionId=&seleniumStart=true` | runner, first poll |
//! | GET | `/selenium-server/runner?sessionId=&retry=true` | runner, after `retryLast` |
//! | POST | `/selenium-server/runner?sessionId=` (body = result) | runner |
//! | POST | `/selenium-server/sessions` | session management |
//! | GET | `/selenium-server/sessions` | diagnostics |
//! | DELETE | `/selenium-server/sessions/{session_id}` | session management |
//!
//! Rendezvous calls block, so they run on the blocking pool; each HTTP
//! request keeps its own thread for the whole wait. If the client goes away
//! the request future is dropped and the blocked call is cancelled, so it
//! cannot later take a command or hold the driver lock on nobody's behalf.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::task;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::protocol::{Command, RunnerPoll};
use crate::session::SessionRegistry;
use crate::sync::{CancelToken, CommandRendezvous, Deadline, RendezvousStats};

use super::options::BridgeOptions;

// ============================================================================
// State
// ============================================================================

/// Shared handler state.
#[derive(Clone)]
struct BridgeState {
    registry: Arc<SessionRegistry>,
    options: Arc<BridgeOptions>,
}

// ============================================================================
// Router
// ============================================================================

/// Builds the bridge router over `registry`.
///
/// Useful for mounting the bridge inside a larger axum application;
/// [`Bridge`](super::Bridge) uses it to serve standalone.
pub fn router(registry: Arc<SessionRegistry>, options: BridgeOptions) -> Router {
    let state = BridgeState {
        registry,
        options: Arc::new(options),
    };

    Router::new()
        .route(
            "/selenium-server/driver",
            get(driver_command).post(driver_command),
        )
        .route("/selenium-server/runner", get(runner_poll).post(runner_poll))
        .route(
            "/selenium-server/sessions",
            get(list_sessions).post(create_session),
        )
        .route(
            "/selenium-server/sessions/{session_id}",
            delete(delete_session),
        )
        .with_state(state)
}

// ============================================================================
// Request Parameters
// ============================================================================

/// Query parameters of the driver endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriverParams {
    session_id: Option<String>,
    command_request: Option<String>,
}

/// Query parameters of the runner endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunnerParams {
    session_id: Option<String>,
    #[serde(default)]
    selenium_start: bool,
    #[serde(default)]
    retry: bool,
}

/// One entry of the session listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionEntry {
    session_id: SessionId,
    stats: RendezvousStats,
}

// ============================================================================
// CancelOnDrop
// ============================================================================

/// Cancels a blocking rendezvous call when its request future is dropped.
struct CancelOnDrop {
    token: CancelToken,
    rendezvous: Arc<CommandRendezvous>,
    armed: bool,
}

impl CancelOnDrop {
    fn new(rendezvous: Arc<CommandRendezvous>) -> Self {
        Self {
            token: CancelToken::new(),
            rendezvous,
            armed: true,
        }
    }

    fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// The call finished; nothing to cancel.
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.armed {
            debug!("Client went away, cancelling blocked call");
            self.token.cancel();
            self.rendezvous.interrupt();
        }
    }
}

fn require_session_id(raw: Option<String>) -> Result<SessionId> {
    raw.and_then(SessionId::try_new)
        .ok_or_else(|| Error::invalid_argument("sessionId is required"))
}

// ============================================================================
// Handlers - Driver
// ============================================================================

/// Queues one command and answers with its result.
///
/// The command comes from `commandRequest`, or from the body when that
/// parameter is absent.
async fn driver_command(
    State(state): State<BridgeState>,
    Query(params): Query<DriverParams>,
    body: String,
) -> Result<String> {
    let session_id = require_session_id(params.session_id)?;

    let raw = params
        .command_request
        .or_else(|| (!body.is_empty()).then_some(body));
    let command = Command::parse(raw.as_deref())?;

    info!(session_id = %session_id, verb = command.verb(), "Driver command received");

    let rendezvous = state.registry.get_or_create(&session_id);
    let guard = CancelOnDrop::new(Arc::clone(&rendezvous));
    let deadline =
        Deadline::from_timeout(state.options.driver_timeout).with_cancel(guard.token());

    let outcome = task::spawn_blocking(move || rendezvous.submit_until(command, deadline)).await;
    guard.disarm();
    let result = outcome??;

    debug!(session_id = %session_id, len = result.len(), "Driver command answered");
    Ok(result)
}

// ============================================================================
// Handlers - Runner
// ============================================================================

/// Publishes the runner's result (POST) and answers with the next command.
///
/// If no command arrives within the runner timeout the answer is
/// `|retryLast|||` and the runner is expected to come back with `retry=true`.
async fn runner_poll(
    State(state): State<BridgeState>,
    Query(params): Query<RunnerParams>,
    method: Method,
    body: String,
) -> Result<String> {
    let session_id = require_session_id(params.session_id)?;

    let poll = match (method == Method::POST, params.selenium_start, params.retry) {
        (true, false, false) => RunnerPoll::Result(body),
        (false, true, false) => RunnerPoll::Start,
        (false, false, true) => RunnerPoll::Retry,
        (true, _, _) => {
            return Err(Error::invalid_argument(
                "a posted result cannot also set seleniumStart or retry",
            ));
        }
        (false, true, true) => {
            return Err(Error::invalid_argument(
                "seleniumStart and retry are mutually exclusive",
            ));
        }
        (false, false, false) => {
            return Err(Error::invalid_argument(
                "poll must set seleniumStart=true or retry=true, or POST a result",
            ));
        }
    };

    debug!(session_id = %session_id, kind = poll.kind(), "Runner poll");

    let rendezvous = state.registry.get_or_create(&session_id);
    let guard = CancelOnDrop::new(Arc::clone(&rendezvous));
    let deadline = Deadline::after(state.options.runner_timeout).with_cancel(guard.token());

    let outcome = task::spawn_blocking(move || rendezvous.poll_until(poll, deadline)).await;
    guard.disarm();

    match outcome? {
        Ok(command) => Ok(command.encode()),
        Err(e) if e.is_timeout() => {
            debug!(session_id = %session_id, "No command in time, sending retryLast");
            Ok(Command::retry_last().encode())
        }
        Err(e) => Err(e),
    }
}

// ============================================================================
// Handlers - Sessions
// ============================================================================

async fn create_session(State(state): State<BridgeState>) -> Json<serde_json::Value> {
    let session_id = state.registry.create();
    info!(session_id = %session_id, "Session created via API");
    Json(json!({ "sessionId": session_id }))
}

async fn list_sessions(State(state): State<BridgeState>) -> Json<serde_json::Value> {
    let sessions: Vec<SessionEntry> = state
        .registry
        .snapshot()
        .into_iter()
        .map(|(session_id, stats)| SessionEntry { session_id, stats })
        .collect();

    Json(json!({ "sessions": sessions }))
}

async fn delete_session(
    State(state): State<BridgeState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode> {
    let session_id = SessionId::new(session_id);

    if state.registry.remove(&session_id) {
        info!(session_id = %session_id, "Session deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::session_not_found(session_id))
    }
}

// ============================================================================
// Error Responses
// ============================================================================

impl Error {
    /// HTTP status used when this error ends a request.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedCommand { .. } | Self::InvalidArgument { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::SessionNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Protocol { .. } => StatusCode::CONFLICT,
            Self::ChannelClosed => StatusCode::GONE,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Cancelled { .. } => StatusCode::REQUEST_TIMEOUT,
            Self::Config { .. } | Self::Io(_) | Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedCommand { .. } => "malformed_command",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::SessionNotFound { .. } => "session_not_found",
            Self::Protocol { .. } => "protocol_error",
            Self::ChannelClosed => "channel_closed",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled { .. } => "cancelled",
            Self::Config { .. } | Self::Io(_) | Self::Task(_) => "internal",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            warn!(error = %self, code = self.code(), "Request failed");
        } else {
            debug!(error = %self, code = self.code(), "Request rejected");
        }

        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        });

        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Tests
// ============================================================================
