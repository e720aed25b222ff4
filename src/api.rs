//! Local control API (loopback only) using axum.
//!
//! Stands in for the app's "Recite Prayer Now" / "Stop" buttons and the
//! diagnostics view. Handlers forward a `Command` to the service loop and
//! wait for its reply, so the loop stays the only owner of recitation state.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::recitation::machine::RecitationStatus;
use crate::reminder::host::ScheduledTrigger;
use crate::reminder::InstallReport;
use crate::service::{Command, StatusSnapshot};

#[derive(Clone)]
pub struct ApiState {
    pub commands: mpsc::Sender<Command>,
}

#[derive(Debug, Serialize)]
struct StateResponse {
    state: RecitationStatus,
}

#[derive(Debug, Serialize)]
struct SimpleResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl SimpleResponse {
    fn ok(status: &str) -> Self {
        Self {
            status: status.into(),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            status: "error".into(),
            error: Some(message.into()),
        }
    }
}

/// The service loop is gone or dropped the reply.
struct ServiceUnavailable;

impl IntoResponse for ServiceUnavailable {
    fn into_response(self) -> Response {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(SimpleResponse::err("service unavailable")),
        )
            .into_response()
    }
}

async fn ask<T>(
    state: &ApiState,
    command: impl FnOnce(oneshot::Sender<T>) -> Command,
) -> Result<T, ServiceUnavailable> {
    let (tx, rx) = oneshot::channel();
    if state.commands.send(command(tx)).await.is_err() {
        warn!("Control command dropped: service loop not running");
        return Err(ServiceUnavailable);
    }
    rx.await.map_err(|_| ServiceUnavailable)
}

/// Build the axum router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(handle_status))
        .route("/recite", post(handle_recite))
        .route("/stop", post(handle_stop))
        .route(
            "/reminders",
            get(handle_list_reminders)
                .post(handle_install_reminders)
                .delete(handle_clear_reminders),
        )
        .with_state(state)
}

/// Start the control API as a background tokio task.
pub async fn start_api(state: ApiState, port: u16) {
    let app = router(state);
    let addr = format!("127.0.0.1:{port}");
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            warn!("Failed to bind control API on {addr}: {e}");
            return;
        }
    };
    info!("Control API listening on {addr}");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!("Control API server error: {e}");
        }
    });
}

// --- Handlers ---

async fn handle_status(State(state): State<ApiState>) -> Result<Json<StatusSnapshot>, ServiceUnavailable> {
    ask(&state, Command::Status).await.map(Json)
}

async fn handle_recite(State(state): State<ApiState>) -> Result<Json<StateResponse>, ServiceUnavailable> {
    let state = ask(&state, Command::Recite).await?;
    Ok(Json(StateResponse { state }))
}

async fn handle_stop(State(state): State<ApiState>) -> Result<Json<StateResponse>, ServiceUnavailable> {
    let state = ask(&state, Command::Stop).await?;
    Ok(Json(StateResponse { state }))
}

async fn handle_list_reminders(
    State(state): State<ApiState>,
) -> Result<Json<Vec<ScheduledTrigger>>, ServiceUnavailable> {
    ask(&state, Command::ListReminders).await.map(Json)
}

async fn handle_install_reminders(
    State(state): State<ApiState>,
) -> Result<Json<InstallReport>, ServiceUnavailable> {
    ask(&state, Command::InstallReminders).await.map(Json)
}

async fn handle_clear_reminders(
    State(state): State<ApiState>,
) -> Result<Json<SimpleResponse>, ServiceUnavailable> {
    ask(&state, Command::ClearReminders).await?;
    Ok(Json(SimpleResponse::ok("cleared")))
}
