//! HTTP-facing error taxonomy and response envelope.
//!
//! Every response body has the shape `{ "success": bool, ... }`. Successes
//! carry `data` (and `count` for lists) or a `message`; failures carry a
//! `message` and, for validation failures, a list of field `errors`.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use carenest_storage::StorageError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Client-facing text for unexpected failures outside development mode.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong!";

static EXPOSE_INTERNAL_ERRORS: AtomicBool = AtomicBool::new(false);

/// Include internal error detail in 500 responses. Set once at startup from
/// the configured environment.
pub fn set_expose_internal_errors(enabled: bool) {
    EXPOSE_INTERNAL_ERRORS.store(enabled, Ordering::Relaxed);
}

fn expose_internal_errors() -> bool {
    EXPOSE_INTERNAL_ERRORS.load(Ordering::Relaxed)
}

/// One failed input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// High-level API errors mapped to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>, errors: Vec<FieldError>) -> Self {
        Self::Validation {
            message: message.into(),
            errors,
        }
    }
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The body a client sees for this error.
    pub fn to_body(&self) -> ErrorBody {
        match self {
            ApiError::Validation { message, errors } => ErrorBody {
                success: false,
                message: message.clone(),
                errors: Some(errors.clone()),
                error: None,
            },
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg) => ErrorBody::message(msg),
            ApiError::Internal(detail) => ErrorBody {
                error: expose_internal_errors().then(|| detail.clone()),
                ..ErrorBody::message(GENERIC_FAILURE_MESSAGE)
            },
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        tracing::error!(category = %err.category(), error = %err, "storage failure");
        ApiError::internal(err.to_string())
    }
}

/// `{ "success": false, "message": ..., "errors": [...] }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    /// Internal failure detail, present only in development mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorBody {
    fn message(msg: &str) -> Self {
        Self {
            success: false,
            message: msg.to_string(),
            errors: None,
            error: None,
        }
    }
}

fn json_response(status: StatusCode, body: Vec<u8>) -> Response {
    axum::http::Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .body(axum::body::Body::from(body))
        .unwrap_or_else(|_| {
            let mut fallback = Response::new(axum::body::Body::from(r#"{"success":false}"#));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let ApiError::Internal(detail) = &self {
            tracing::error!(error = %detail, "request failed");
        }
        let body = serde_json::to_vec(&self.to_body()).unwrap_or_else(|_| {
            format!(r#"{{"success":false,"message":"{GENERIC_FAILURE_MESSAGE}"}}"#).into_bytes()
        });
        json_response(status, body)
    }
}

/// Accumulates field errors, then fails once with all of them.
///
/// ```ignore
/// let mut v = Validator::new();
/// v.check(!name.trim().is_empty(), "name", "Name is required");
/// v.finish()?;
/// ```
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `message` against `field` unless `ok` holds.
    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.fail(field, message);
        }
        self
    }

    pub fn fail(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
        self
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        let message = self
            .errors
            .first()
            .map(|e| e.message.clone())
            .unwrap_or_default();
        Err(ApiError::validation(message, self.errors))
    }
}

// -------------------------
// Success envelope
// -------------------------

/// `{ "success": true, "count"?: n, "message"?: ..., "data"?: ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub struct ApiResponse<T> {
    pub value: T,
    pub status: StatusCode,
    pub headers: Vec<(HeaderName, HeaderValue)>,
}

impl<T> ApiResponse<T> {
    pub fn new(value: T, status: StatusCode) -> Self {
        Self {
            value,
            status,
            headers: Vec::new(),
        }
    }

    pub fn ok(value: T) -> Self {
        Self::new(value, StatusCode::OK)
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((name, value));
        self
    }
}

impl<T> ApiResponse<Envelope<T>> {
    /// `200 { success, data }`
    pub fn data(data: T) -> Self {
        Self::ok(Envelope {
            success: true,
            count: None,
            message: None,
            data: Some(data),
        })
    }

    /// `201 { success, data }`
    pub fn created(data: T) -> Self {
        Self::data(data).with_status(StatusCode::CREATED)
    }
}

impl<T> ApiResponse<Envelope<Vec<T>>> {
    /// `200 { success, count, data: [...] }`
    pub fn list(items: Vec<T>) -> Self {
        Self::ok(Envelope {
            success: true,
            count: Some(items.len()),
            message: None,
            data: Some(items),
        })
    }
}

impl ApiResponse<Envelope<()>> {
    /// `200 { success, message }`
    pub fn message(message: impl Into<String>) -> Self {
        Self::ok(Envelope {
            success: true,
            count: None,
            message: Some(message.into()),
            data: None,
        })
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = match serde_json::to_vec(&self.value) {
            Ok(b) => b,
            Err(e) => return ApiError::internal(format!("response serialization: {e}")).into_response(),
        };
        let mut resp = json_response(self.status, body);
        for (name, value) in self.headers {
            resp.headers_mut().insert(name, value);
        }
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    async fn body_json(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn api_error_variants_map_to_status() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (ApiError::validation("x", vec![]), StatusCode::BAD_REQUEST),
            (ApiError::bad_request("x"), StatusCode::BAD_REQUEST),
            (ApiError::unauthorized("x"), StatusCode::UNAUTHORIZED),
            (ApiError::forbidden("x"), StatusCode::FORBIDDEN),
            (ApiError::not_found("x"), StatusCode::NOT_FOUND),
            (ApiError::internal("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status);
        }
    }

    #[tokio::test]
    async fn error_body_shape() {
        let resp = ApiError::forbidden("Not authorized to access this appointment").into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            &HeaderValue::from_static("application/json")
        );
        assert_eq!(
            body_json(resp).await,
            json!({ "success": false, "message": "Not authorized to access this appointment" })
        );
    }

    #[tokio::test]
    async fn validation_lists_field_errors() {
        let mut v = Validator::new();
        v.check(false, "email", "Please provide a valid email")
            .check(true, "name", "unused")
            .fail("password", "Password must be at least 6 characters");
        let err = v.finish().unwrap_err();
        let body = body_json(err.into_response()).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Please provide a valid email");
        assert_eq!(body["errors"].as_array().unwrap().len(), 2);
        assert_eq!(body["errors"][1]["field"], "password");
    }

    #[test]
    fn internal_detail_hidden_unless_exposed() {
        set_expose_internal_errors(false);
        let body = ApiError::internal("connection reset").to_body();
        assert_eq!(body.message, GENERIC_FAILURE_MESSAGE);
        assert!(body.error.is_none());
    }

    #[test]
    fn storage_errors_become_internal() {
        let err: ApiError = StorageError::connection_error("store is closed").into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn success_envelopes() {
        let body = body_json(ApiResponse::list(vec![1, 2, 3]).into_response()).await;
        assert_eq!(body, json!({ "success": true, "count": 3, "data": [1, 2, 3] }));

        let resp = ApiResponse::created(json!({ "id": "a1" })).into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(body_json(resp).await["data"]["id"], "a1");

        let body = body_json(ApiResponse::message("Appointment cancelled successfully").into_response()).await;
        assert_eq!(
            body,
            json!({ "success": true, "message": "Appointment cancelled successfully" })
        );
    }
}
