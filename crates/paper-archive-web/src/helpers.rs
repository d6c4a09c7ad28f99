//! Helper types and traits for cleaner route handlers.
//!
//! Provides extension traits for converting `Option` and `Result` types
//! into HTTP-appropriate error responses, reducing boilerplate in routes.

use axum::http::StatusCode;
use paper_archive_core::Error;

/// Standard result type for route handlers.
pub type RouteResult<T> = Result<T, (StatusCode, String)>;

/// Map a core error to the status code it surfaces as.
///
/// Provider errors become 502 rather than 500: the gateway is fine, the
/// upstream is not. `RunInProgress` is a conflict the caller can resolve by
/// waiting, not a failure.
pub fn error_status(error: &Error) -> StatusCode {
    match error {
        Error::InvalidOwnerId(_) | Error::PdfSplit(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::RunInProgress(_) => StatusCode::CONFLICT,
        Error::TranslationRateLimited { .. } => StatusCode::SERVICE_UNAVAILABLE,
        Error::ExtractionFailed(_)
        | Error::TranslationRequest(_)
        | Error::TranslationInvalidResponse(_)
        | Error::TranslationTimeout
        | Error::TranslationMaxRetriesExceeded
        | Error::RemoteListFailed { .. }
        | Error::RemoteReadFailed { .. }
        | Error::RemoteWriteFailed { .. }
        | Error::RemoteDeleteFailed { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Extension trait for converting `Option<T>` to `RouteResult<T>`.
pub trait OptionExt<T> {
    /// Returns the contained value or a 404 Not Found error.
    fn or_not_found(self, msg: &str) -> RouteResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, msg: &str) -> RouteResult<T> {
        self.ok_or_else(|| (StatusCode::NOT_FOUND, msg.to_string()))
    }
}

/// Extension trait for converting `Result<T, E>` to `RouteResult<T>`.
pub trait ResultExt<T, E: std::fmt::Display> {
    /// Converts the error to 500 Internal Server Error.
    fn or_internal_error(self) -> RouteResult<T>;

    /// Converts the error to 400 Bad Request.
    fn or_bad_request(self) -> RouteResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T, E> for Result<T, E> {
    fn or_internal_error(self) -> RouteResult<T> {
        self.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    }

    fn or_bad_request(self) -> RouteResult<T> {
        self.map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
    }
}

/// Extension for core results: status code derived from the error variant.
pub trait CoreResultExt<T> {
    fn or_status(self) -> RouteResult<T>;
}

impl<T> CoreResultExt<T> for Result<T, Error> {
    fn or_status(self) -> RouteResult<T> {
        self.map_err(|e| (error_status(&e), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            error_status(&Error::NotFound("u1/p_1.pdf".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            error_status(&Error::RunInProgress("u1/p@1".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            error_status(&Error::TranslationRateLimited { retry_after: None }),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            error_status(&Error::ExtractionFailed("no pages".to_string())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            error_status(&Error::InvalidOwnerId(String::new())),
            StatusCode::BAD_REQUEST
        );
    }
}
