//! The JSON envelope shared by every endpoint.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Status string of a successful response.
pub const SUCCESS: &str = "success";

/// Status string of a failed response.
pub const FAIL: &str = "fail";

/// `{"output": ..., "status": ..., "ok": ...}` body with its HTTP status.
#[derive(Debug, Serialize)]
pub struct JsonResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<T>,
    pub status: &'static str,
    pub ok: bool,
    #[serde(skip)]
    code: StatusCode,
}

impl<T: Serialize> JsonResponse<T> {
    /// `200 OK` carrying `output`.
    #[must_use]
    pub fn success(output: T) -> Self {
        Self {
            output: Some(output),
            status: SUCCESS,
            ok: true,
            code: StatusCode::OK,
        }
    }

    #[must_use]
    pub fn code(&self) -> StatusCode {
        self.code
    }
}

impl JsonResponse<String> {
    /// Failed response with `message` as output.
    #[must_use]
    pub fn fail(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            output: Some(message.into()),
            status: FAIL,
            ok: false,
            code,
        }
    }
}

impl<T: Serialize> IntoResponse for JsonResponse<T> {
    fn into_response(self) -> Response {
        tracing::debug!(status = self.status, ok = self.ok, code = %self.code, "responding");
        (self.code, Json(self)).into_response()
    }
}
