//! Request and response bodies for the HTTP API.
//!
//! Request fields are optional at the serde level so that a missing field is
//! reported as an [`Error::InvalidRequest`] with the usual `{ error, code }`
//! body instead of a bare deserialization failure.

use crate::error::{Error, Result};
use crate::process::{EntryId, ProcessId, TerminationFailure};
use actix_web::web::Bytes;
use serde::{Deserialize, Serialize};

fn required<T>(value: Option<T>, name: &str) -> Result<T> {
    value.ok_or_else(|| Error::InvalidRequest(format!("Missing {}", name)))
}

/// Body of `POST /api/execute-command`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCommandRequest {
    /// Entry to start
    pub port_id: Option<EntryId>,
    /// Command file to run
    pub command_path: Option<String>,
}

impl ExecuteCommandRequest {
    /// Required fields, or [`Error::InvalidRequest`]
    pub fn validate(self) -> Result<(EntryId, String)> {
        Ok((
            required(self.port_id, "portId")?,
            required(self.command_path, "commandPath")?,
        ))
    }
}

/// Body of `POST /api/stop-command`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopCommandRequest {
    /// Entry to stop
    pub port_id: Option<EntryId>,
    /// Port to clear as well
    pub port: Option<u16>,
}

/// Body of `POST /api/force-restart-command`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceRestartRequest {
    /// Entry to restart
    pub port_id: Option<EntryId>,
    /// Port to clear before relaunching
    pub port: Option<u16>,
    /// Command file to run
    pub command_path: Option<String>,
}

impl ForceRestartRequest {
    /// Required fields, or [`Error::InvalidRequest`]
    pub fn validate(self) -> Result<(EntryId, u16, String)> {
        Ok((
            required(self.port_id, "portId")?,
            required(self.port, "port")?,
            required(self.command_path, "commandPath")?,
        ))
    }
}

/// Body of `POST /api/check-port-status`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortStatusRequest {
    /// Port to probe
    pub port: Option<u16>,
}

/// Body of `POST /api/detect-port` and `POST /api/import-ports`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePathRequest {
    /// File to read
    pub file_path: Option<String>,
}

impl FilePathRequest {
    /// Required path, or [`Error::InvalidRequest`]
    pub fn validate(self) -> Result<String> {
        required(self.file_path, "filePath")
    }
}

/// Query of `GET /api/events/recent`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentEventsQuery {
    /// Only events for this entry
    pub entry_id: Option<EntryId>,
    /// Maximum number of events
    pub limit: Option<usize>,
}

/// Reply to a start or force restart
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    /// Always true; failures use the error body
    pub success: bool,
    /// Human readable outcome
    pub message: String,
    /// Entry acted on
    pub port_id: EntryId,
    /// Pid of the launched process
    pub pid: ProcessId,
}

/// Reply to a stop
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopResponse {
    /// False when some process could not be signalled
    pub success: bool,
    /// Human readable outcome
    pub message: String,
    /// Pids believed terminated
    pub killed_pids: Vec<ProcessId>,
    /// Pids that could not be terminated
    pub failed: Vec<TerminationFailure>,
}

/// Reply to a status check
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortStatusResponse {
    /// Always true; failures use the error body
    pub success: bool,
    /// Whether anything is bound to the port
    pub is_running: bool,
}

/// Server-sent event frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseMessage {
    /// Event type
    pub event: String,
    /// Payload, a single line of JSON
    pub data: String,
    /// Optional event ID
    pub id: Option<String>,
}

impl SseMessage {
    /// Creates a new SSE message
    pub fn new(event: &str, data: &str, id: Option<&str>) -> Self {
        Self {
            event: event.to_string(),
            data: data.to_string(),
            id: id.map(|s| s.to_string()),
        }
    }

    /// Wire format: optional `id:` line, `event:` line, `data:` line, blank line
    pub fn to_bytes(&self) -> Bytes {
        let mut result = String::new();

        if let Some(id) = &self.id {
            result.push_str(&format!("id: {}\n", id));
        }

        result.push_str(&format!("event: {}\n", self.event));
        result.push_str(&format!("data: {}\n\n", self.data));

        Bytes::from(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_are_invalid_requests() {
        let request: ExecuteCommandRequest = serde_json::from_str(r#"{"portId": "1"}"#).unwrap();
        let err = request.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(ref msg) if msg.contains("commandPath")));

        let request: ForceRestartRequest =
            serde_json::from_str(r#"{"portId": "1", "commandPath": "/a.command"}"#).unwrap();
        assert!(matches!(request.validate(), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_sse_frame_format() {
        let message = SseMessage::new("started", r#"{"pid":1}"#, Some("7"));
        assert_eq!(
            message.to_bytes(),
            Bytes::from("id: 7\nevent: started\ndata: {\"pid\":1}\n\n")
        );

        let message = SseMessage::new("ping", "{}", None);
        assert_eq!(message.to_bytes(), Bytes::from("event: ping\ndata: {}\n\n"));
    }

    #[test]
    fn test_stop_response_shape() {
        let response = StopResponse {
            success: true,
            message: "Stopped".to_string(),
            killed_pids: vec![10, 11],
            failed: vec![],
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["killedPids"], serde_json::json!([10, 11]));
    }
}
