//! Unified error handling for the export API.
//!
//! Caller-visible failures are faults: a machine-readable code plus a human
//! message, serialized as a JSON body. There is no partial-success contract -
//! any error aborts the whole request.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use ordergate_core::InvalidFilters;

use crate::db::RepositoryError;

/// Application-level error type for the export API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The `filters` argument could not be interpreted as filter criteria.
    #[error("invalid filters: {0}")]
    InvalidFilters(#[from] InvalidFilters),

    /// A filter referenced a field name that cannot be routed onto a column.
    #[error("invalid filter field: {0}")]
    InvalidFilterField(String),

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] RepositoryError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Wire shape of a caller-visible fault.
#[derive(Debug, Serialize)]
struct FaultBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Machine-readable fault code for this error.
    #[must_use]
    pub const fn fault_code(&self) -> &'static str {
        match self {
            Self::InvalidFilters(_) | Self::InvalidFilterField(_) => "filters_invalid",
            Self::Database(_) => "database_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(RepositoryError::Database(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(self, Self::Database(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Export request error"
            );
        }

        let status = match &self {
            Self::InvalidFilters(_) | Self::InvalidFilterField(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        let body = FaultBody {
            code: self.fault_code(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_codes() {
        assert_eq!(
            ApiError::InvalidFilters(InvalidFilters::NotAnObject).fault_code(),
            "filters_invalid"
        );
        assert_eq!(
            ApiError::InvalidFilterField("drop table".to_string()).fault_code(),
            "filters_invalid"
        );
        assert_eq!(
            ApiError::Internal("boom".to_string()).fault_code(),
            "internal_error"
        );
    }

    #[test]
    fn test_status_codes() {
        fn get_status(err: ApiError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(ApiError::InvalidFilters(InvalidFilters::NotAnObject)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(ApiError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_invalid_filter_message_is_exposed() {
        let response = ApiError::InvalidFilters(InvalidFilters::NotAnObject).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
