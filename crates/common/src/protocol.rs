//! Request and response types exchanged with the attribute encryption service.
//!
//! All bodies are JSON.

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

// ---------------------------------------------------------------------------
// Encrypt / decrypt endpoints
// ---------------------------------------------------------------------------

/// Request body for `POST /encrypt` and `POST /decrypt`.
///
/// `payload` is the record; the attributes to transform come from the schema
/// named in the `X-Schema-Name` request header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordRequest {
    /// The record whose configured attributes are encrypted or decrypted.
    pub payload: serde_json::Value,
}

/// Successful response body for `POST /encrypt` and `POST /decrypt`.
///
/// `payload` mirrors the input record with the configured attributes replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordResponse {
    /// The transformed record.
    pub payload: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&ServiceError> for ErrorResponse {
    fn from(err: &ServiceError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"` or `"degraded"`.
    pub status: String,
    /// Whether an encryption configuration is currently loaded.
    pub keys_ready: bool,
    /// Key id used for new encryptions, when keys are loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_key_id: Option<String>,
    /// Number of record schemas currently cached.
    pub schemas_loaded: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_request_from_json() {
        let req: RecordRequest =
            serde_json::from_value(json!({"payload": {"id": "u1", "ssn": "123-45-6789"}})).unwrap();
        assert_eq!(req.payload["ssn"], "123-45-6789");
    }

    #[test]
    fn error_response_from_service_error() {
        let e = ErrorResponse::from(&ServiceError::BadRequest("missing X-Schema-Name header".into()));
        assert_eq!(e.code, "bad_request");
        assert!(e.message.contains("missing X-Schema-Name header"));
    }

    #[test]
    fn health_response_omits_absent_key_id() {
        let h = HealthResponse {
            status: "degraded".into(),
            keys_ready: false,
            current_key_id: None,
            schemas_loaded: 0,
        };
        let value = serde_json::to_value(&h).unwrap();
        assert!(value.get("current_key_id").is_none());

        let h = HealthResponse {
            current_key_id: Some("k2".into()),
            ..h
        };
        let decoded: HealthResponse =
            serde_json::from_str(&serde_json::to_string(&h).unwrap()).unwrap();
        assert_eq!(decoded.current_key_id.as_deref(), Some("k2"));
    }
}
