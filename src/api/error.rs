//! Backend error types with structured `detail` decoding.

use serde::{Deserialize, Serialize};

/// Fallback toast text when the backend gives no usable detail.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong.";

/// One entry of a structured validation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub loc: Vec<serde_json::Value>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// `detail` of an error body: a plain message or a list of field errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Validation(Vec<ValidationError>),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<ErrorDetail>,
}

/// Errors from backend operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("Backend is not reachable at {0}")]
    Connection(String),
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("HTTP client error: {0}")]
    HttpClient(String),
    #[error("Backend returned error (status {status})")]
    Status {
        status: u16,
        detail: Option<ErrorDetail>,
    },
    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

impl ApiError {
    /// Build a status error from a raw response body.
    /// Bodies that are not `{detail: ...}` JSON keep no detail.
    pub fn from_response(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.detail);
        Self::Status { status, detail }
    }

    pub fn with_message(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            detail: Some(ErrorDetail::Message(message.into())),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_message(400, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::with_message(401, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::with_message(403, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_message(404, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::with_message(409, message)
    }

    /// A 422 carrying a single field error, shaped like the backend's.
    pub fn unprocessable(field: &str, message: impl Into<String>) -> Self {
        Self::Status {
            status: 422,
            detail: Some(ErrorDetail::Validation(vec![ValidationError {
                loc: vec!["body".into(), field.into()],
                msg: message.into(),
                kind: "value_error".to_string(),
            }])),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn detail(&self) -> Option<&ErrorDetail> {
        match self {
            Self::Status { detail, .. } => detail.as_ref(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    /// Best-effort message for a toast: first validation `msg`,
    /// else the string detail, else the generic text.
    pub fn user_message(&self) -> String {
        match self.detail() {
            Some(ErrorDetail::Validation(errors)) => errors
                .first()
                .map(|e| e.msg.clone())
                .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string()),
            Some(ErrorDetail::Message(message)) if !message.is_empty() => message.clone(),
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_detail_is_the_message() {
        let err = ApiError::from_response(404, r#"{"detail":"Appointment not found"}"#);
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.user_message(), "Appointment not found");
    }

    #[test]
    fn first_validation_entry_wins() {
        let body = r#"{"detail":[
            {"loc":["body","email"],"msg":"value is not a valid email address","type":"value_error"},
            {"loc":["body","password"],"msg":"too short","type":"value_error"}
        ]}"#;
        let err = ApiError::from_response(422, body);
        assert_eq!(err.user_message(), "value is not a valid email address");
        match err.detail() {
            Some(ErrorDetail::Validation(entries)) => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].loc[1], "email");
            }
            other => panic!("unexpected detail: {other:?}"),
        }
    }

    #[test]
    fn empty_validation_list_falls_back() {
        let err = ApiError::from_response(422, r#"{"detail":[]}"#);
        assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn non_json_body_falls_back() {
        let err = ApiError::from_response(502, "<html>Bad Gateway</html>");
        assert!(err.detail().is_none());
        assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn transport_errors_use_generic_message() {
        let err = ApiError::Connection("http://localhost:8000".into());
        assert_eq!(err.status(), None);
        assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);
        assert!(err.to_string().contains("localhost:8000"));
    }

    #[test]
    fn unprocessable_matches_backend_shape() {
        let err = ApiError::unprocessable("complaints", "field required");
        assert_eq!(err.status(), Some(422));
        assert_eq!(err.user_message(), "field required");
    }
}
