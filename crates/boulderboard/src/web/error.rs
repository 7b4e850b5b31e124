//! HTTP error mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::error::Error;

/// Errors returned from request handlers.
#[derive(Error, Debug)]
pub enum AppError {
    /// The request body could not be understood.
    #[error("Invalid payload")]
    MalformedPayload,

    /// An error from the competition layer.
    #[error(transparent)]
    Competition(#[from] Error),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedPayload => StatusCode::BAD_REQUEST,
            Self::Competition(err) => match err {
                Error::InvalidInput { .. } | Error::UnknownClimb(_) => StatusCode::BAD_REQUEST,
                Error::CompetitorNotFound(_) | Error::SectionNotFound(_) => StatusCode::NOT_FOUND,
                Error::DuplicateCompetitor(_) | Error::DuplicateSectionClimb { .. } => {
                    StatusCode::CONFLICT
                }
                Error::Unauthorized => StatusCode::FORBIDDEN,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {self}");
            return (status, "Internal error").into_response();
        }

        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::MalformedPayload.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::from(Error::UnknownClimb(4)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(Error::CompetitorNotFound(4)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(Error::DuplicateCompetitor(4)).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(Error::Unauthorized).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::from(Error::internal("x")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_not_exposed() {
        let response = AppError::from(Error::internal("secret detail")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
