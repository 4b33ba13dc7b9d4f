//! Mapping of core errors to HTTP responses

use super::ApiResponse;
use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tandem_core::{Error, UserFriendlyError};
use tracing::{error, warn};

/// Handler error wrapping a core error
#[derive(Debug)]
pub struct ApiError(pub Error);

/// Handler result
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// HTTP status for the wrapped error
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::ContentRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::Upstream(_) => StatusCode::BAD_GATEWAY,
            Error::UnknownAgent(_) => StatusCode::BAD_REQUEST,
            Error::Store(_) | Error::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.0.code(), error = %self.0, "Request failed");
        } else {
            warn!(code = self.0.code(), error = %self.0, "Request rejected");
        }

        let body = ApiResponse::<()>::error(self.0.user_message(), self.0.code());
        let mut response = (status, Json(body)).into_response();

        if let Error::RateLimited { retry_after } = self.0 {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after));
        }
        response
    }
}
