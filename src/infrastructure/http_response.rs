// HTTP response utilities for the JSON envelope
use crate::application::error::AppError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::any::Any;

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize)]
pub struct Meta {
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
}

impl Meta {
    fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            version: API_VERSION,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Envelope wrapping every response body.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorBody>,
    pub meta: Meta,
}

/// Successful response with its status code.
pub struct ApiSuccess<T> {
    status: StatusCode,
    body: ApiResponse<T>,
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn success<T>(status: StatusCode, data: T, message: &str) -> ApiSuccess<T> {
    ApiSuccess {
        status,
        body: ApiResponse {
            success: true,
            message: Some(message.to_string()),
            data: Some(data),
            error: None,
            meta: Meta::now(),
        },
    }
}

pub fn ok<T>(data: T, message: &str) -> ApiSuccess<T> {
    success(StatusCode::OK, data, message)
}

pub fn created<T>(data: T, message: &str) -> ApiSuccess<T> {
    success(StatusCode::CREATED, data, message)
}

/// Error response carrying a machine code and a human message.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Option<String>,
}

impl ApiFailure {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn invalid_id(raw: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_ID", "Invalid ID format")
            .with_details(format!("'{raw}' is not a numeric id"))
    }

    pub fn invalid_date(details: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "INVALID_DATE",
            "Invalid date format, expected YYYY-MM-DD",
        )
        .with_details(details)
    }

    pub fn validation(details: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", "Invalid request")
            .with_details(details)
    }

    pub fn route_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Route not found")
    }

    pub fn method_not_allowed() -> Self {
        Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            "METHOD_NOT_ALLOWED",
            "Method not allowed for this route",
        )
    }

    /// Map a service error. Store failures use `code` and `message` for the
    /// operation that failed and keep the cause in `details`.
    pub fn from_app(error: AppError, code: &'static str, message: &str) -> Self {
        match error {
            AppError::Validation(detail) => Self::validation(detail),
            AppError::NotFound(what) => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                capitalize(&format!("{what} not found")),
            ),
            AppError::Store(cause) => {
                tracing::error!(code, error = %cause, "{message}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, message).with_details(cause)
            }
        }
    }

    #[cfg(test)]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[cfg(test)]
    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            success: false,
            message: None,
            data: None,
            error: Some(ApiErrorBody {
                code: self.code,
                message: self.message,
                details: self.details,
            }),
            meta: Meta::now(),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Envelope for a handler that panicked, used by the catch-panic layer.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let details = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!(%details, "handler panicked");
    ApiFailure::new(StatusCode::INTERNAL_SERVER_ERROR, "PANIC", "Internal server error")
        .into_response()
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_app_maps_status_and_code() {
        let not_found = ApiFailure::from_app(AppError::not_found("station"), "FETCH_ERROR", "x");
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.code(), "NOT_FOUND");
        assert_eq!(not_found.message, "Station not found");

        let store = ApiFailure::from_app(
            AppError::Store("connection reset".into()),
            "CREATE_ERROR",
            "Failed to create station",
        );
        assert_eq!(store.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(store.code(), "CREATE_ERROR");
        assert_eq!(store.details.as_deref(), Some("connection reset"));

        let invalid = ApiFailure::from_app(AppError::validation("name is required"), "CREATE_ERROR", "x");
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_failure_envelope_omits_data() {
        let body = ApiResponse::<()> {
            success: false,
            message: None,
            data: None,
            error: Some(ApiErrorBody {
                code: "INVALID_ID",
                message: "Invalid ID format".into(),
                details: None,
            }),
            meta: Meta::now(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "INVALID_ID");
        assert!(json.get("data").is_none());
        assert_eq!(json["meta"]["version"], API_VERSION);
    }

    #[test]
    fn test_panic_response_status() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
