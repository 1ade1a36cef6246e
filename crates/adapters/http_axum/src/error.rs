//! HTTP error response mapping.

use std::error::Error;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use carhub_domain::error::CarHubError;

use crate::response::JsonResponse;

/// Everything a handler can fail with, rendered as a failed
/// [`JsonResponse`].
#[derive(Debug)]
pub enum ApiError {
    /// Error from the core; the output is the whole error chain, so a
    /// serial failure reads `storage error: device teensy is not initialized`.
    Domain(CarHubError),
    /// Unusable request body.
    BadRequest(String),
    /// Lookup of a topic nobody wrote yet.
    Missing(&'static str),
}

impl From<CarHubError> for ApiError {
    fn from(err: CarHubError) -> Self {
        Self::Domain(err)
    }
}

fn describe(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, message) = match self {
            Self::Domain(err) => {
                let code = match &err {
                    CarHubError::Validation(_) => StatusCode::BAD_REQUEST,
                    CarHubError::Storage(cause) => {
                        tracing::error!(error = %cause, "request failed");
                        StatusCode::BAD_REQUEST
                    }
                };
                (code, describe(&err))
            }
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Missing(message) => (StatusCode::NOT_FOUND, message.to_string()),
        };
        JsonResponse::fail(code, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carhub_domain::error::ValidationError;

    #[test]
    fn should_join_error_chain() {
        let err = CarHubError::from(ValidationError::EmptyCommand);
        assert_eq!(describe(&err), "validation error: command must not be empty");
    }

    #[test]
    fn should_map_storage_to_400() {
        let err = CarHubError::Storage("port closed".into());
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn should_map_missing_to_404() {
        let response = ApiError::Missing("Does not exist").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
