//! HTTP request handlers.
//!
//! Paths and bodies follow the dashboard front end:
//! - `/api/ports` to read and replace the entry list
//! - `/api/execute-command`, `/api/stop-command`, `/api/force-restart-command`
//!   and `/api/check-port-status` for lifecycle operations
//! - `/api/detect-port` and `/api/import-ports` for command files and entry lists
//! - `/api/events` for a live stream of lifecycle events

use crate::api::ApiState;
use crate::api::types::{
    CommandResponse, ExecuteCommandRequest, FilePathRequest, ForceRestartRequest,
    PortStatusRequest, PortStatusResponse, RecentEventsQuery, SseMessage, StopCommandRequest,
    StopResponse,
};
use crate::detect::inspect_command_file;
use crate::error::{Error, Result};
use crate::store::{self, Entry, import_entries};

use actix_web::{
    HttpResponse,
    web::{Data, Json, Query},
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

/// Query of `GET /api/ports`
#[derive(Debug, Default, Deserialize)]
pub struct ListPortsQuery {
    /// Probe every port and persist the reconciled `isRunning` flags
    #[serde(default)]
    pub refresh: bool,
}

/// `GET /api/ports`
pub async fn list_ports(state: Data<ApiState>, query: Query<ListPortsQuery>) -> Result<HttpResponse> {
    let entries = if query.refresh {
        store::refresh_stored(&state.manager, state.store.as_ref()).await?
    } else {
        state.store.load().await?
    };
    Ok(HttpResponse::Ok().json(entries))
}

/// `POST /api/ports`
pub async fn save_ports(state: Data<ApiState>, body: Json<Vec<Entry>>) -> Result<HttpResponse> {
    state.store.save(&body).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

/// `POST /api/execute-command`
pub async fn execute_command(
    state: Data<ApiState>,
    body: Json<ExecuteCommandRequest>,
) -> Result<HttpResponse> {
    let (entry_id, command_path) = body.into_inner().validate()?;
    tracing::info!(entry_id = %entry_id, command = %command_path, "Execute command requested");

    let process = state.manager.start(&entry_id, &command_path).await?;

    Ok(HttpResponse::Ok().json(CommandResponse {
        success: true,
        message: "Command started in background".to_string(),
        port_id: entry_id,
        pid: process.pid,
    }))
}

/// `POST /api/stop-command`
pub async fn stop_command(
    state: Data<ApiState>,
    body: Json<StopCommandRequest>,
) -> Result<HttpResponse> {
    let StopCommandRequest { port_id, port } = body.into_inner();
    let entry_id = port_id.ok_or_else(|| Error::InvalidRequest("Missing portId".to_string()))?;
    tracing::info!(entry_id = %entry_id, ?port, "Stop command requested");

    let report = state.manager.stop(&entry_id, port).await?;

    let message = if report.killed.is_empty() && report.is_complete() {
        "Process already stopped".to_string()
    } else if report.is_complete() {
        format!("Stopped {} process(es)", report.killed.len())
    } else {
        format!(
            "Stopped {} process(es), {} could not be terminated",
            report.killed.len(),
            report.failed.len()
        )
    };

    Ok(HttpResponse::Ok().json(StopResponse {
        success: report.is_complete(),
        message,
        killed_pids: report.killed,
        failed: report.failed,
    }))
}

/// `POST /api/force-restart-command`
pub async fn force_restart_command(
    state: Data<ApiState>,
    body: Json<ForceRestartRequest>,
) -> Result<HttpResponse> {
    let (entry_id, port, command_path) = body.into_inner().validate()?;
    tracing::info!(entry_id = %entry_id, port, command = %command_path, "Force restart requested");

    let process = state
        .manager
        .force_restart(&entry_id, port, &command_path)
        .await?;

    Ok(HttpResponse::Ok().json(CommandResponse {
        success: true,
        message: "Force restart completed".to_string(),
        port_id: entry_id,
        pid: process.pid,
    }))
}

/// `POST /api/check-port-status`
pub async fn check_port_status(
    state: Data<ApiState>,
    body: Json<PortStatusRequest>,
) -> Result<HttpResponse> {
    let port = body
        .port
        .ok_or_else(|| Error::InvalidRequest("Missing port".to_string()))?;

    let is_running = state.manager.check_status(port).await?;

    Ok(HttpResponse::Ok().json(PortStatusResponse {
        success: true,
        is_running,
    }))
}

/// `POST /api/detect-port`
pub async fn detect_port(body: Json<FilePathRequest>) -> Result<HttpResponse> {
    let file_path = body.into_inner().validate()?;
    let detected = inspect_command_file(&file_path).await?;
    Ok(HttpResponse::Ok().json(detected))
}

/// `POST /api/import-ports`
pub async fn import_ports(body: Json<FilePathRequest>) -> Result<HttpResponse> {
    let file_path = body.into_inner().validate()?;
    let entries = import_entries(&file_path).await?;
    Ok(HttpResponse::Ok().json(entries))
}

/// `GET /api/events/recent`
pub async fn recent_events(state: Data<ApiState>, query: Query<RecentEventsQuery>) -> HttpResponse {
    let query = query.into_inner();
    let events = state
        .manager
        .events()
        .recent(query.entry_id.as_ref(), query.limit);
    HttpResponse::Ok().json(events)
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// `GET /api/events`
///
/// Streams every lifecycle event recorded after the client connects. The
/// SSE event name is the lifecycle event type and the data is the JSON
/// record.
pub async fn events(state: Data<ApiState>) -> HttpResponse {
    let mut receiver = state.manager.events().subscribe();
    tracing::debug!("Client connected to event stream");

    let stream = async_stream::stream! {
        loop {
            match receiver.recv().await {
                Ok(record) => {
                    let data = match serde_json::to_string(&record) {
                        Ok(data) => data,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to serialize lifecycle event");
                            continue;
                        }
                    };
                    let id = record.timestamp_ms.to_string();
                    let message = SseMessage::new(record.event.as_str(), &data, Some(&id));
                    yield Ok::<_, actix_web::Error>(message.to_bytes());
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event stream client fell behind");
                }
                Err(RecvError::Closed) => {
                    tracing::debug!("Event log closed, ending stream");
                    break;
                }
            }
        }
    };

    HttpResponse::Ok()
        .append_header(("Content-Type", "text/event-stream"))
        .append_header(("Cache-Control", "no-cache"))
        .append_header(("Connection", "keep-alive"))
        .streaming(stream)
}
