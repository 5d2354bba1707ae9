//! HTTP error responses
//!
//! Refusals in the voting flow are not errors here: they are rendered as
//! `{success: false, message}` with status 200 by the handlers. This type
//! covers the few cases that get a distinct status code.

use super::types::ApiResponse;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Malformed request body")]
    MalformedPayload(#[from] JsonRejection),

    #[error("Admins file not found")]
    AdminsFileMissing,

    #[error("Internal server error")]
    Internal(#[from] crate::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            ApiError::AdminsFileMissing => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(e) => {
                error!("Request failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ApiResponse::rejected(self.to_string()))).into_response()
    }
}
