use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("root directory is not configured")]
    Unconfigured,
    #[error("invalid root: {0}")]
    InvalidRoot(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not a directory")]
    NotADirectory,
    #[error("not a file")]
    NotAFile,
    #[error("access denied")]
    AccessDenied,
    #[error("not found")]
    NotFound,
    #[error("request too large")]
    RequestTooLarge,
    #[error("read failure: {0}")]
    ReadFailure(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unconfigured => "Unconfigured",
            AppError::InvalidRoot(_) => "InvalidRoot",
            AppError::BadRequest(_) => "BadRequest",
            AppError::NotADirectory => "NotADirectory",
            AppError::NotAFile => "NotAFile",
            AppError::AccessDenied => "AccessDenied",
            AppError::NotFound => "NotFound",
            AppError::RequestTooLarge => "RequestTooLarge",
            AppError::ReadFailure(_) => "ReadFailure",
            AppError::Internal(_) => "Internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unconfigured
            | AppError::InvalidRoot(_)
            | AppError::BadRequest(_)
            | AppError::NotADirectory
            | AppError::NotAFile => StatusCode::BAD_REQUEST,
            AppError::AccessDenied => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::RequestTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::ReadFailure(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Maps a filesystem error onto the taxonomy; the io message is kept for diagnostics.
    pub fn from_io(e: &io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => AppError::NotFound,
            _ => AppError::ReadFailure(e.to_string()),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody { code: self.code(), message: self.to_string() };
        (self.status(), Json(body)).into_response()
    }
}
