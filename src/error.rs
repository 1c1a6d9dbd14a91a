use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::path::PathBuf;
use thiserror::Error;

use crate::response::ApiResponse;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0} parameter is required")]
    MissingParameter(&'static str),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to open Excel file: {0}")]
    Open(String),

    #[error("Failed to read sheet data: {0}")]
    ReadSheet(String),

    #[error("Failed to write Excel file: {0}")]
    Write(String),

    #[error("Failed to save Excel file: {0}")]
    Save(String),

    #[error("Failed to create chart: {0}")]
    Chart(String),

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::MissingParameter(_) => StatusCode::BAD_REQUEST,
            ServiceError::FileNotFound(_) => StatusCode::BAD_REQUEST,
            ServiceError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Open(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::ReadSheet(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Write(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Save(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Chart(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        ServiceError::InvalidRequest(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}", self);
        } else {
            log::debug!("rejected request: {}", self);
        }
        (status, Json(ApiResponse::<()>::failure(self.to_string()))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
