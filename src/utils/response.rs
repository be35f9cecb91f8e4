//! JSON envelopes for the few machine-facing responses (health, and errors
//! that happen before a page can be rendered).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub message: String,
}

#[derive(Serialize)]
pub struct ErrorDetail<'a> {
    pub code: &'a str,
    pub message: String,
}

#[derive(Serialize)]
pub struct ErrorEnvelope<'a> {
    pub success: bool,
    pub error: ErrorDetail<'a>,
}

/// `success` mirrors the status class.
pub fn json<T: Serialize>(status: StatusCode, data: T, message: impl Into<String>) -> Response {
    let body = Envelope {
        success: status.is_success(),
        data,
        message: message.into(),
    };
    (status, Json(body)).into_response()
}

pub fn error(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    let body = ErrorEnvelope {
        success: false,
        error: ErrorDetail {
            code,
            message: message.into(),
        },
    };
    (status, Json(body)).into_response()
}
