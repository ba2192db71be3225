use serde_json::Value;

/// Failure reported by, or while talking to, a backend channel.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The request never produced a response.
    Transport(String),
    /// The service explained itself through an `error` or `detail` field.
    Rejected { status: u16, message: String },
    /// Non-success status with nothing useful in the body.
    Status(u16),
    /// A success status whose body could not be understood.
    Payload(String),
}

impl BackendError {
    /// Human-readable message, substituting `fallback` when the service gave
    /// no explanation.
    pub fn message_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self {
            BackendError::Transport(msg) | BackendError::Payload(msg) => msg,
            BackendError::Rejected { message, .. } => message,
            BackendError::Status(_) => fallback,
        }
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Transport(msg) => write!(f, "{msg}"),
            BackendError::Rejected { message, .. } => write!(f, "{message}"),
            BackendError::Status(status) => write!(f, "request failed with status {status}"),
            BackendError::Payload(msg) => write!(f, "unexpected response: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}

pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Extracts `error` (service style) or `detail` (FastAPI style) from a body.
pub fn explanation(body: &Value) -> Option<String> {
    let obj = body.as_object()?;
    ["error", "detail"].iter().find_map(|key| match obj.get(*key)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    })
}

/// Parses a body, failing on any non-2xx status.
pub(crate) fn status_checked(status: u16, body: &str) -> Result<Value, BackendError> {
    let parsed: Result<Value, _> = serde_json::from_str(body);
    if !is_success(status) {
        return Err(match parsed.ok().as_ref().and_then(explanation) {
            Some(message) => BackendError::Rejected { status, message },
            None => BackendError::Status(status),
        });
    }
    parsed.map_err(|e| BackendError::Payload(e.to_string()))
}
