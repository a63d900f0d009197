//! Axum request handlers for all service endpoints.

use attrcrypt::{AttrError, EncryptedAttributes};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{ErrorResponse, HealthResponse, RecordRequest, RecordResponse};
use common::ServiceError;
use serde_json::Value;
use tracing::{debug, warn};

use super::state::AppState;

/// Which direction a record request runs in.
#[derive(Debug, Clone, Copy)]
enum Direction {
    Encrypt,
    Decrypt,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Encrypt => "encrypt",
            Direction::Decrypt => "decrypt",
        }
    }
}

/// `POST /encrypt`: replace every schema-marked attribute with an envelope.
///
/// The schema is named by the configured header (default `X-Schema-Name`).
/// Values that are null, absent, or already envelopes are left as they are.
pub async fn encrypt(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RecordRequest>, JsonRejection>,
) -> Response {
    respond(request_payload(body).and_then(|payload| {
        process(&state, &headers, payload, Direction::Encrypt)
    }))
}

/// `POST /decrypt`: restore every schema-marked attribute from its envelope.
///
/// Values that are not envelopes pass through unchanged.
pub async fn decrypt(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RecordRequest>, JsonRejection>,
) -> Response {
    respond(request_payload(body).and_then(|payload| {
        process(&state, &headers, payload, Direction::Decrypt)
    }))
}

/// `GET /health`: liveness and readiness check.
///
/// Returns `200 OK` when keys are loaded and at least one schema is cached,
/// `503 Service Unavailable` otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let keys_ready = state.key_store.is_ready();
    let current_key_id = state.key_store.current_key_id();
    let schemas_loaded = state.schema_cache.len();

    let (status_code, status_str) = if keys_ready && schemas_loaded > 0 {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status_str.into(),
        keys_ready,
        current_key_id,
        schemas_loaded,
    };
    (status_code, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

fn process(
    state: &AppState,
    headers: &HeaderMap,
    mut payload: Value,
    direction: Direction,
) -> Result<RecordResponse, ServiceError> {
    let schema_name = schema_name(state, headers)?;

    let cached = state
        .schema_cache
        .get(&schema_name)
        .map_err(|e| ServiceError::BadRequest(e.to_string()))?;

    let config = state
        .key_store
        .current()
        .map_err(|e| ServiceError::Unavailable(e.to_string()))?;

    let codec = EncryptedAttributes::new(cached.attributes.iter().cloned(), config);
    let result = match direction {
        Direction::Encrypt => codec.encrypt_all(&mut payload),
        Direction::Decrypt => codec.decrypt_all(&mut payload),
    };

    if let Err(e) = result {
        let err = service_error(e);
        warn!(
            schema = %schema_name,
            direction = direction.as_str(),
            code = err.code(),
            error = %err,
            "record rejected"
        );
        return Err(err);
    }

    debug!(
        schema = %schema_name,
        direction = direction.as_str(),
        attributes = codec.attributes().len(),
        "record processed"
    );
    Ok(RecordResponse { payload })
}

/// Unwrap the request body, turning every extractor rejection into a JSON 400.
fn request_payload(body: Result<Json<RecordRequest>, JsonRejection>) -> Result<Value, ServiceError> {
    match body {
        Ok(Json(req)) => Ok(req.payload),
        Err(rejection) => Err(ServiceError::BadRequest(rejection.body_text())),
    }
}

fn schema_name(state: &AppState, headers: &HeaderMap) -> Result<String, ServiceError> {
    let header = state.schema_header_name.as_str();
    let value = headers
        .get(header)
        .ok_or_else(|| ServiceError::BadRequest(format!("missing {header} header")))?;
    let name = value.to_str().map_err(|_| {
        ServiceError::BadRequest(format!("{header} header contains non-ASCII characters"))
    })?;
    if name.trim().is_empty() {
        return Err(ServiceError::BadRequest(format!("{header} header is empty")));
    }
    Ok(name.to_owned())
}

/// Map a library failure onto the service error taxonomy.
fn service_error(err: AttrError) -> ServiceError {
    match err {
        AttrError::TypeMismatch { .. } | AttrError::MissingIdentity { .. } => {
            ServiceError::BadRequest(err.to_string())
        }
        AttrError::IdentityMismatch | AttrError::UnknownKey(_) | AttrError::IntegrityFailure => {
            ServiceError::Rejected(err.to_string())
        }
        AttrError::Path(_) => ServiceError::Internal(err.to_string()),
    }
}

fn respond(result: Result<RecordResponse, ServiceError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => {
            let status =
                StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(ErrorResponse::from(&err))).into_response()
        }
    }
}
