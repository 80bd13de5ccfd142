use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types surfaced at the HTTP boundary.
///
/// Upstream failures never reach this type on data routes: they are turned
/// into fallback data by the aggregator. The only status a data route emits
/// besides 200 is the 405 for disallowed methods.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Non-GET request on a data route.
    MethodNotAllowed,
    /// Error building or talking to an external API client.
    ExternalApiError(String),
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::MethodNotAllowed => write!(f, "Method not allowed"),
            AppError::ExternalApiError(msg) => write!(f, "External API error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Maps each error variant to an appropriate HTTP status code and JSON body.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "Method not allowed".to_string(),
            ),
            AppError::ExternalApiError(msg) => {
                tracing::error!("External API error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "External service error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Failure of a single upstream call.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Upstream answered with a non-2xx status.
    Http { status: u16, message: String },
    /// The per-call deadline expired before the upstream answered.
    Timeout { after_ms: u64 },
    /// Body was not JSON or had no recognizable fields.
    Parse(String),
    /// Connection, DNS or transport failure.
    Network(String),
}

impl FetchError {
    /// Short machine-readable label used in logs and `api_status`.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Http { .. } => "http",
            FetchError::Timeout { .. } => "timeout",
            FetchError::Parse(_) => "parse",
            FetchError::Network(_) => "network",
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Http { status, message } => write!(f, "HTTP {}: {}", status, message),
            FetchError::Timeout { after_ms } => write!(f, "timed out after {}ms", after_ms),
            FetchError::Parse(msg) => write!(f, "invalid response: {}", msg),
            FetchError::Network(msg) => write!(f, "request failed: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<reqwest::Error> for FetchError {
    /// Converts a `reqwest::Error` into a `FetchError`.
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout { after_ms: 0 }
        } else if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_method_not_allowed_body() {
        let response = AppError::MethodNotAllowed.into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": "Method not allowed" }));
    }

    #[tokio::test]
    async fn test_external_api_error_is_bad_gateway() {
        let response = AppError::ExternalApiError("tls init".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            AppError::ExternalApiError("tls init".to_string()).to_string(),
            "External API error: tls init"
        );
    }

    #[test]
    fn test_fetch_error_kinds() {
        let http = FetchError::Http {
            status: 503,
            message: "Service Unavailable".to_string(),
        };
        assert_eq!(http.kind(), "http");
        assert_eq!(http.to_string(), "HTTP 503: Service Unavailable");
        assert_eq!(FetchError::Timeout { after_ms: 8000 }.kind(), "timeout");
        assert_eq!(FetchError::Parse("x".into()).kind(), "parse");
        assert_eq!(FetchError::Network("x".into()).kind(), "network");
    }

    #[test]
    fn test_serde_error_is_parse() {
        let err = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        assert_eq!(FetchError::from(err).kind(), "parse");
    }
}
