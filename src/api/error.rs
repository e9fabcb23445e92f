//! Error types and conversions used by the public API layer.
//!
//! Provides a lightweight Error enum that maps application errors into
//! HTTP responses with a consistent JSON body shape.

use crate::order::book;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use tracing::{enabled, error, Level};
use validify::ValidationErrors;

/// Machine-readable error code used in API responses.
pub type Code = String;
/// Human-readable error message used in API responses.
pub type Message = String;

/// API error which can be converted into an HTTP response.
#[derive(Debug)]
pub enum Error {
    /// Resource not found. Returns 404.
    NotFound(Code, Message),
    /// Client error. Returns 400.
    BadRequest(Code, Message),
    /// Validation error containing field-level errors. Returns 400 with structured payload.
    Validation(ValidationErrors),
    /// Unexpected internal error. Returns 500.
    Internal(Box<dyn std::error::Error>),
}

/// Convert domain-level order book errors into API errors.
///
/// Every admission rejection is a client-side condition; only a missing id
/// maps to 404.
impl From<book::Error> for Error {
    fn from(value: book::Error) -> Self {
        let message = value.to_string();
        match value {
            book::Error::OrderNotFound(_) => Error::NotFound("ORDER_NOT_FOUND".into(), message),
            book::Error::DuplicateOrder(_) => {
                Error::BadRequest("ORDER_ALREADY_EXISTS".into(), message)
            }
            book::Error::ZeroQuantity(_) => Error::BadRequest("INVALID_QUANTITY".into(), message),
            book::Error::EmptyOppositeSide(_) => {
                Error::BadRequest("NO_OPPOSITE_SIDE".into(), message)
            }
            book::Error::CannotCross(_) => Error::BadRequest("CANNOT_CROSS".into(), message),
            book::Error::InsufficientDepth(_) => {
                Error::BadRequest("INSUFFICIENT_DEPTH".into(), message)
            }
            book::Error::SideMismatch(_) => Error::BadRequest("SIDE_MISMATCH".into(), message),
        }
    }
}

impl IntoResponse for Error {
    /// Convert Error into an Axum Response with JSON body of shape:
    /// { "error": { "code": <code>, "message"?: <message>, "errors"?: <validation> } }
    fn into_response(self) -> Response {
        let (status, code, msg) = match self {
            Error::NotFound(code, msg) => (StatusCode::NOT_FOUND, code, msg),
            Error::BadRequest(code, msg) => (StatusCode::BAD_REQUEST, code, msg),
            Error::Validation(validation_errors) => {
                let body = Json(serde_json::json!({
                    "error": { "code": "VALIDATION_ERROR", "errors": validation_errors }
                }));

                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            Error::Internal(err) => {
                error!("internal error: {}", err);

                match enabled!(Level::DEBUG) {
                    true => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR".into(),
                        err.to_string(),
                    ),
                    false => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR".into(),
                        "an internal error happened during processing your request".into(),
                    ),
                }
            }
        };

        let body = Json(serde_json::json!({
            "error": { "code": code, "message": msg }
        }));

        (status, body).into_response()
    }
}
