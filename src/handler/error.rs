//! Request error types
//!
//! Every failure inside a request ends up here and is turned into a
//! response; nothing escapes to the connection or the process.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Response, StatusCode};
use thiserror::Error;

use crate::http;
use crate::logger;

/// Errors that can occur while serving a single request.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Path could not be decoded (invalid UTF-8, NUL byte).
    #[error("Malformed request path: {0}")]
    BadRequest(String),

    /// Path normalizes to a location outside the document root.
    #[error("Path traversal rejected: {0}")]
    PathTraversal(String),

    /// Nothing servable at the resolved location.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Method other than GET, HEAD or OPTIONS.
    #[error("Method {0} not allowed")]
    MethodNotAllowed(Method),

    /// Unexpected I/O failure after the target was located.
    #[error("I/O error: {0}")]
    Internal(#[from] std::io::Error),
}

impl ServeError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PathTraversal(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Log the error and build the matching response
    ///
    /// Details stay in the error log; the body is the bare status line.
    pub fn into_response(self) -> Response<Full<Bytes>> {
        match &self {
            Self::NotFound(_) => {}
            Self::BadRequest(_) | Self::PathTraversal(_) | Self::MethodNotAllowed(_) => {
                logger::log_warning(&self.to_string());
            }
            Self::Internal(_) => logger::log_error(&self.to_string()),
        }

        match self {
            Self::MethodNotAllowed(_) => http::build_405_response(),
            other => http::build_error_response(other.status()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServeError::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServeError::PathTraversal("/..".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServeError::NotFound("/missing".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServeError::MethodNotAllowed(Method::POST).status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        let io = std::io::Error::other("/secret/path exploded");
        assert_eq!(
            ServeError::from(io).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_response_hides_detail() {
        let io = std::io::Error::other("/secret/path exploded");
        let response = ServeError::from(io).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["Content-Length"], "25");
    }

    #[test]
    fn test_method_not_allowed_response() {
        let response = ServeError::MethodNotAllowed(Method::DELETE).into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(response.headers().contains_key("Allow"));
    }
}
