use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use server_api::{ApiContext, ReadingLimits};
use shared::{
    domain::{Celsius, ObserverKind, SessionId},
    error::{ApiError, ErrorCode},
    protocol::{LogEntry, ReadingReport, ServerEvent, SessionSummary},
};
use tokio::sync::broadcast;
use tracing::info;

mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, validate_settings};

#[derive(Debug, Deserialize)]
struct RecordReadingRequest {
    value: f64,
}

#[derive(Debug, Deserialize)]
struct AttachObserverRequest {
    kind: ObserverKind,
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    session_id: Option<SessionId>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    validate_settings(&settings)?;

    let api = ApiContext::new(
        ReadingLimits {
            min: Celsius(settings.min_reading),
            max: Celsius(settings.max_reading),
        },
        Celsius(settings.alarm_threshold),
    );
    let (events, _) = broadcast::channel(256);

    let state = AppState { api, events };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/sessions", post(http_create_session))
        .route("/sessions", get(http_list_sessions))
        .route("/sessions/:session_id", get(http_session_summary))
        .route("/sessions/:session_id", delete(http_drop_session))
        .route("/sessions/:session_id/readings", post(http_record_reading))
        .route("/sessions/:session_id/history", get(http_session_history))
        .route("/sessions/:session_id/observers", post(http_attach_observer))
        .route(
            "/sessions/:session_id/observers/:kind",
            delete(http_detach_observer),
        )
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn http_create_session(State(state): State<Arc<AppState>>) -> Json<SessionSummary> {
    let summary = server_api::create_session(&state.api).await;
    let _ = state.events.send(ServerEvent::SessionCreated {
        session: summary.clone(),
    });
    Json(summary)
}

async fn http_list_sessions(State(state): State<Arc<AppState>>) -> Json<Vec<SessionSummary>> {
    Json(server_api::list_sessions(&state.api).await)
}

async fn http_session_summary(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<SessionSummary>, (StatusCode, Json<ApiError>)> {
    let summary = server_api::session_summary(&state.api, session_id)
        .await
        .map_err(reject)?;
    Ok(Json(summary))
}

async fn http_drop_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    server_api::drop_session(&state.api, session_id)
        .await
        .map_err(reject)?;
    let _ = state.events.send(ServerEvent::SessionClosed { session_id });
    Ok(StatusCode::NO_CONTENT)
}

async fn http_record_reading(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
    Json(req): Json<RecordReadingRequest>,
) -> Result<Json<ReadingReport>, (StatusCode, Json<ApiError>)> {
    let report = server_api::record_reading(&state.api, session_id, req.value)
        .await
        .map_err(reject)?;
    let _ = state.events.send(ServerEvent::ReadingRecorded {
        session_id,
        report: report.clone(),
    });
    Ok(Json(report))
}

async fn http_session_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<Vec<LogEntry>>, (StatusCode, Json<ApiError>)> {
    let history = server_api::session_history(&state.api, session_id)
        .await
        .map_err(reject)?;
    Ok(Json(history))
}

async fn http_attach_observer(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
    Json(req): Json<AttachObserverRequest>,
) -> Result<Json<SessionSummary>, (StatusCode, Json<ApiError>)> {
    let summary = server_api::attach_observer(&state.api, session_id, req.kind)
        .await
        .map_err(reject)?;
    let _ = state.events.send(ServerEvent::ObserverAttached {
        session_id,
        kind: req.kind,
    });
    Ok(Json(summary))
}

async fn http_detach_observer(
    State(state): State<Arc<AppState>>,
    Path((session_id, kind)): Path<(SessionId, String)>,
) -> Result<Json<SessionSummary>, (StatusCode, Json<ApiError>)> {
    let kind: ObserverKind = kind.parse().map_err(|error: shared::domain::UnknownObserverKind| {
        reject(ApiError::validation(error.to_string()))
    })?;
    let summary = server_api::detach_observer(&state.api, session_id, kind)
        .await
        .map_err(reject)?;
    let _ = state.events.send(ServerEvent::ObserverDetached { session_id, kind });
    Ok(Json(summary))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(q): Query<WsQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(state, socket, q.session_id))
}

async fn ws_connection(
    state: Arc<AppState>,
    socket: axum::extract::ws::WebSocket,
    filter: Option<SessionId>,
) {
    use axum::extract::ws::Message;
    use futures::{SinkExt, StreamExt};

    let (mut sender, mut receiver) = socket.split();
    let mut events_rx = state.events.subscribe();

    let send_task = tokio::spawn(async move {
        while let Ok(event) = events_rx.recv().await {
            if let (Some(wanted), Some(actual)) = (filter, event_session(&event)) {
                if wanted != actual {
                    continue;
                }
            }
            let text = match serde_json::to_string(&event) {
                Ok(v) => v,
                Err(_) => continue,
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(_msg)) = receiver.next().await {}

    send_task.abort();
}

fn event_session(event: &ServerEvent) -> Option<SessionId> {
    match event {
        ServerEvent::SessionCreated { session } => Some(session.session_id),
        ServerEvent::ReadingRecorded { session_id, .. }
        | ServerEvent::ObserverAttached { session_id, .. }
        | ServerEvent::ObserverDetached { session_id, .. }
        | ServerEvent::SessionClosed { session_id } => Some(*session_id),
        ServerEvent::Error(_) => None,
    }
}

fn reject(error: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match error.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(error))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
