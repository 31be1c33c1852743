use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The server explained the failure itself
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error ({status}): {body}")]
    ServerError { status: u16, body: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Which form a request came from. Fallback wording differs per flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    SignIn,
    SignUp,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let cut = (0..=MAX_ERROR_BODY_LENGTH)
                .rev()
                .find(|&i| body.is_char_boundary(i))
                .unwrap_or(0);
            format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty());
        if let Some(message) = message {
            return ApiError::Rejected {
                status: status.as_u16(),
                message,
            };
        }

        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            code @ 500..=599 => ApiError::ServerError {
                status: code,
                body: truncated,
            },
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Message suitable for showing above the form that failed.
    pub fn user_message(&self, flow: FlowKind) -> String {
        if let ApiError::Rejected { message, .. } = self {
            return message.clone();
        }

        match flow {
            FlowKind::SignIn => "Incorrect email or password".to_string(),
            FlowKind::SignUp => match self {
                ApiError::ServerError { status: 500, .. } => "Backend server error. The database connection may be down. Please contact the administrator or try again later.".to_string(),
                ApiError::NetworkError(_) => {
                    "Cannot reach the server. Please check your internet connection.".to_string()
                }
                _ => "Can't perform this action right now. Please try again later.".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_prefers_server_message() {
        let err = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"message":"Email already registered"}"#,
        );
        assert!(matches!(err, ApiError::Rejected { status: 400, .. }));
        assert_eq!(err.user_message(FlowKind::SignUp), "Email already registered");
        assert_eq!(err.user_message(FlowKind::SignIn), "Email already registered");
    }

    #[test]
    fn test_from_status_without_message() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, ""),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, "nope"),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::RateLimited
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, r#"{"message":""}"#),
            ApiError::ServerError { status: 500, .. }
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_REQUEST, "plain text"),
            ApiError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_sign_in_fallback_message() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, "");
        assert_eq!(err.user_message(FlowKind::SignIn), "Incorrect email or password");
    }

    #[test]
    fn test_sign_up_fallback_messages() {
        let server = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert!(server
            .user_message(FlowKind::SignUp)
            .starts_with("Backend server error."));

        // Only a plain 500 points at the backend; other 5xx get the generic text
        let unavailable = ApiError::from_status(StatusCode::SERVICE_UNAVAILABLE, "");
        assert!(matches!(unavailable, ApiError::ServerError { status: 503, .. }));
        assert_eq!(
            unavailable.user_message(FlowKind::SignUp),
            "Can't perform this action right now. Please try again later."
        );

        let other = ApiError::from_status(StatusCode::FORBIDDEN, "");
        assert_eq!(
            other.user_message(FlowKind::SignUp),
            "Can't perform this action right now. Please try again later."
        );
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 10);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.contains("truncated"));
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));

        let multibyte = "é".repeat(MAX_ERROR_BODY_LENGTH);
        // Must not panic on a char boundary
        assert!(ApiError::truncate_body(&multibyte).contains("truncated"));
    }
}
