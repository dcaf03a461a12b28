// src/api/error.rs

//! HTTP error responses.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::compiler::CompileError;
use crate::registry::ExpressionId;

#[derive(Debug)]
pub enum ApiError {
    /// Body could not be parsed or is semantically invalid.
    InvalidRequest(String),

    /// Expression failed to compile.
    Compile(CompileError),

    /// No expression with this id.
    ExpressionNotFound(ExpressionId),

    /// Nothing is ready to be dispatched.
    NoWorkAvailable,
}

impl From<CompileError> for ApiError {
    fn from(err: CompileError) -> Self {
        Self::Compile(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::InvalidRequest(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            Self::Compile(err) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
            Self::ExpressionNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("expression not found: {id}"))
            }
            Self::NoWorkAvailable => (StatusCode::NOT_FOUND, "no task available".to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
