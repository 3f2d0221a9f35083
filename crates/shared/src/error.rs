use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable failure class carried in every HTTP error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request itself was malformed (bad query string and the like).
    Validation,
    /// The state document changed in memory but could not be written.
    PersistFailed,
}

impl ErrorCode {
    pub fn http_status(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::PersistFailed => 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Validation,
            message: message.into(),
        }
    }

    /// Renders the full cause chain of `error` into the message.
    pub fn persist_failed(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self {
            code: ErrorCode::PersistFailed,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("failed to write state.json")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn persist_failed_includes_the_cause_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only filesystem");
        let err = ApiError::persist_failed(&Outer(io));
        assert_eq!(err.code, ErrorCode::PersistFailed);
        assert_eq!(err.message, "failed to write state.json: read-only filesystem");
        assert_eq!(err.code.http_status(), 500);
    }

    #[test]
    fn codes_serialize_in_snake_case() {
        let body = serde_json::to_value(ApiError::validation("bad report flag")).expect("json");
        assert_eq!(
            body,
            serde_json::json!({ "code": "validation", "message": "bad report flag" })
        );
    }
}
