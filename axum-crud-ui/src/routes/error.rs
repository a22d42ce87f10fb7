//! Error responses

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::database::DatabaseError;
use crate::render::error_page;
use crate::Error;

/// Title and message of a failed request, attached to the response so the
/// router middleware can re-render the page under the mounted root
#[derive(Debug, Clone)]
pub struct ErrorDetails {
    pub title: &'static str,
    pub message: String,
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotFound(_) | Error::Database(DatabaseError::TableNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            Error::UnknownColumn(_) | Error::ReadOnly(_) => StatusCode::BAD_REQUEST,
            Error::Database(_) | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let title = match status {
            StatusCode::NOT_FOUND => "Not Found",
            StatusCode::BAD_REQUEST => "Bad Request",
            _ => "Error",
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }

        let details = ErrorDetails {
            title,
            message: self.to_string(),
        };
        let mut response = (status, Html(error_page("", title, &details.message))).into_response();
        response.extensions_mut().insert(details);
        response
    }
}
