//! Error handler for platform-age.

use axum::BoxError;
use axum::extract::rejection::QueryRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationError;

use crate::account::AccountError;

pub type Result<T> = std::result::Result<T, ServerError>;

pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred";

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Query(#[from] QueryRejection),

    #[error(transparent)]
    Account(#[from] AccountError),

    /// Raised by middleware, e.g. when the request deadline elapses.
    #[error("request aborted: {0}")]
    Middleware(BoxError),
}

/// Turn middleware failures into the usual JSON error.
pub async fn handle_middleware_error(err: BoxError) -> ServerError {
    ServerError::Middleware(err)
}

/// Error type exposed to clients for a given status code.
pub fn error_type(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "INVALID_REQUEST",
        StatusCode::NOT_FOUND => "USER_NOT_FOUND",
        _ => "INTERNAL_ERROR",
    }
}

/// JSON body of every error response.
#[derive(Debug, PartialEq, Serialize)]
pub struct ResponseError {
    error: &'static str,
    message: String,
    status: u16,
}

impl ResponseError {
    /// Update error status code, and error type with it.
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code.as_u16();
        self.error = error_type(code);
        self
    }

    /// Update `message` field.
    pub fn message(mut self, message: &str) -> Self {
        self.message = message.into();
        self
    }

    /// Transform [`ResponseError`] into axum [`Response`].
    pub fn into_response(self) -> std::result::Result<Response, axum::http::Error> {
        if let Ok(body) = serde_json::to_string(&self) {
            Response::builder()
                .status(self.status)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
        } else {
            Ok(internal_server_error())
        }
    }
}

impl Default for ResponseError {
    fn default() -> Self {
        Self {
            error: error_type(StatusCode::INTERNAL_SERVER_ERROR),
            message: UNEXPECTED_ERROR.to_owned(),
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let response = match &self {
            ServerError::Validation(err) => ResponseError::default()
                .status(StatusCode::BAD_REQUEST)
                .message(err.message.as_deref().unwrap_or(err.code.as_ref())),

            ServerError::Query(rejection) => ResponseError::default()
                .status(StatusCode::BAD_REQUEST)
                .message(&rejection.body_text()),

            ServerError::Account(err @ AccountError::UserNotFound { .. }) => {
                ResponseError::default()
                    .status(StatusCode::NOT_FOUND)
                    .message(&err.to_string())
            },

            ServerError::Account(AccountError::Application(message)) => {
                ResponseError::default()
                    .status(StatusCode::BAD_REQUEST)
                    .message(message)
            },

            ServerError::Account(AccountError::Directory(err)) => {
                tracing::error!(error = %err, "server returned 500 status");

                ResponseError::default()
            },

            ServerError::Middleware(err) => {
                if err.is::<tower::timeout::error::Elapsed>() {
                    tracing::error!("request deadline elapsed");
                } else {
                    tracing::error!(error = %err, "server returned 500 status");
                }

                ResponseError::default()
            },
        };

        response
            .into_response()
            .unwrap_or_else(|_| internal_server_error())
    }
}

fn internal_server_error() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(
            serde_json::json!({
                "error": error_type(StatusCode::INTERNAL_SERVER_ERROR),
                "message": UNEXPECTED_ERROR,
                "status": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            })
            .to_string()
            .into(),
        )
        .unwrap_or_else(|_| Response::new(UNEXPECTED_ERROR.into()))
}
