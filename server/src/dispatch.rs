//! Tool dispatch: maps a tool name plus JSON arguments onto the engine.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use trendwatch_core::{Error as CoreError, SearchEngine, SearchResult, VideoRecord};

/// The closed set of operations callers may invoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    Search { query: String, limit: usize },
    Fetch { id: String },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Search(SearchResult),
    Fetch(VideoRecord),
}

/// Limits applied while parsing arguments.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub default_limit: usize,
    pub max_limit: usize,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    limit: Option<i64>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FetchArgs {
    id: String,
}

/// Boundary error: a stable code, a message and the HTTP status to send.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ToolError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ToolError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, code, message: message.into() }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_argument", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }
}

impl From<CoreError> for ToolError {
    fn from(e: CoreError) -> Self {
        let message = e.to_string();
        match e {
            CoreError::InvalidArgument(_) => Self::invalid(message),
            CoreError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, "not_found", message),
            CoreError::ToolNotFound(_) => Self::new(StatusCode::NOT_FOUND, "tool_not_found", message),
            CoreError::CorruptDataset { .. } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "corrupt_dataset", message)
            }
            CoreError::IndexMismatch { .. } => Self::new(StatusCode::CONFLICT, "index_mismatch", message),
            CoreError::SourceUnavailable(_) => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "source_unavailable", message)
            }
            CoreError::AlreadyRunning(_) => Self::new(StatusCode::CONFLICT, "already_running", message),
            CoreError::EmptyResult { .. } => Self::new(StatusCode::UNPROCESSABLE_ENTITY, "empty_result", message),
            CoreError::Cancelled => Self::new(StatusCode::SERVICE_UNAVAILABLE, "cancelled", message),
            CoreError::Io(_) => Self::new(StatusCode::INTERNAL_SERVER_ERROR, "io", message),
        }
    }
}

impl IntoResponse for ToolError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": { "code": self.code, "message": self.message } });
        (self.status, Json(body)).into_response()
    }
}

impl ToolCall {
    /// Resolve `name` and validate `arguments`. Unknown names are `ToolNotFound`.
    pub fn parse(name: &str, arguments: Value, limits: Limits) -> Result<Self, ToolError> {
        let arguments = if arguments.is_null() { Value::Object(Default::default()) } else { arguments };
        match name {
            "search" => {
                let args: SearchArgs = serde_json::from_value(arguments)
                    .map_err(|e| ToolError::invalid(format!("search arguments: {e}")))?;
                let limit = match args.limit {
                    None => limits.default_limit,
                    Some(n) if n <= 0 => return Err(ToolError::invalid("limit must be positive")),
                    Some(n) => usize::try_from(n).unwrap_or(usize::MAX).min(limits.max_limit),
                };
                Ok(Self::Search { query: args.query, limit })
            }
            "fetch" => {
                let args: FetchArgs = serde_json::from_value(arguments)
                    .map_err(|e| ToolError::invalid(format!("fetch arguments: {e}")))?;
                Ok(Self::Fetch { id: args.id })
            }
            other => Err(CoreError::ToolNotFound(other.to_string()).into()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Search { .. } => "search",
            Self::Fetch { .. } => "fetch",
        }
    }

    pub fn execute(self, engine: &SearchEngine) -> Result<ToolOutput, ToolError> {
        match self {
            Self::Search { query, limit } => Ok(ToolOutput::Search(engine.search(&query, limit)?)),
            Self::Fetch { id } => Ok(ToolOutput::Fetch(engine.fetch(&id)?)),
        }
    }
}

/// Run `call` on the blocking pool, abandoning it after `timeout`.
///
/// Calls only read an immutable pair, so giving up on one leaves nothing
/// half-done.
pub async fn run(engine: SearchEngine, call: ToolCall, timeout: Duration) -> Result<ToolOutput, ToolError> {
    let name = call.name();
    run_blocking(name, timeout, move || call.execute(&engine)).await
}

async fn run_blocking<T, F>(name: &'static str, timeout: Duration, work: F) -> Result<T, ToolError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ToolError> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(work);
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(out)) => out,
        Ok(Err(join)) => {
            tracing::error!(tool = name, error = %join, "tool task failed");
            Err(ToolError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", "tool execution failed"))
        }
        Err(_) => {
            tracing::warn!(tool = name, ?timeout, "tool call timed out");
            Err(ToolError::new(StatusCode::GATEWAY_TIMEOUT, "timeout", format!("{name} exceeded {timeout:?}")))
        }
    }
}

/// Tool descriptions served to callers.
pub fn catalog() -> Value {
    serde_json::json!({
        "tools": [
            {
                "name": "search",
                "description": "Keyword search over the current short-video dataset, ranked by matched words, then views, then recency.",
                "arguments": {
                    "query": { "type": "string", "required": true },
                    "limit": { "type": "integer", "required": false, "minimum": 1 }
                }
            },
            {
                "name": "fetch",
                "description": "Full metadata for one video by id.",
                "arguments": {
                    "id": { "type": "string", "required": true }
                }
            }
        ]
    })
}
