use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::error::Error;

/// An error that converts into a plain-text HTTP response. Anything that
/// could reveal whether a file exists becomes a bare 404.
#[derive(Debug)]
pub struct HttpError {
    pub status: StatusCode,
    pub message: String,
}

impl HttpError {
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "not found".to_string(),
        }
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "internal error".to_string(),
        }
    }
}

impl From<Error> for HttpError {
    fn from(e: Error) -> Self {
        match e {
            Error::NotFound | Error::FileNotFound | Error::NotOwned => Self::not_found(),
            e if e.is_user_error() => Self::bad_request(e.to_string()),
            e => {
                error!(error = %e, "request failed");
                Self::internal()
            }
        }
    }
}

impl From<askama::Error> for HttpError {
    fn from(e: askama::Error) -> Self {
        error!(error = %e, "unable to render template");
        Self::internal()
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, format!("{}\n", self.message)).into_response()
    }
}

pub type HttpResult<T> = std::result::Result<T, HttpError>;

/// Extension trait for store lookups that must exist.
pub trait OptionExt<T> {
    fn or_not_found(self) -> HttpResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self) -> HttpResult<T> {
        self.ok_or_else(HttpError::not_found)
    }
}
