use reqwest::StatusCode;
use thiserror::Error;

use crate::exit_codes::ExitCode;

/// Broad classes of session failures, for callers that only need to decide
/// whether to abort, retry later or report a bad request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ErrorKind {
    /// The server refused the credentials or the login itself
    Authentication,
    /// The server could not be reached within the retry policy
    Connectivity,
    /// The server answered, but not the way the call expected
    Protocol,
}

/// Error types that can occur while talking to the EDBO API
#[derive(Debug, Error)]
pub enum SessionError {
    /// The token endpoint answered 400: wrong username, password or application key
    #[error("Invalid credentials: {message}")]
    InvalidCredentials { message: String },

    /// The token endpoint answered with a status other than 200 or 400
    #[error("Login failed, server responded with status {0}")]
    LoginRejected(StatusCode),

    /// Every attempt allowed by the retry policy failed at the transport level
    #[error("Server {url} is unreachable after {attempts} attempt(s): {source}")]
    Unreachable {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// A single attempt timed out after the request may have reached the
    /// server, so it is not sent again
    #[error("Request to {url} timed out: {source}")]
    TimedOut {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The call did not finish within the retry policy's time budget
    #[error("Request to {url} did not complete within {budget:?}")]
    RetryBudgetExhausted {
        url: String,
        budget: std::time::Duration,
    },

    /// A method call finished with a status the caller did not ask for
    #[error("Method '{method}' finished with status {status}")]
    UnexpectedStatus {
        method: String,
        status: StatusCode,
        body: String,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::InvalidCredentials { .. } | SessionError::LoginRejected(_) => {
                ErrorKind::Authentication
            }
            SessionError::Unreachable { .. }
            | SessionError::TimedOut { .. }
            | SessionError::RetryBudgetExhausted { .. }
            | SessionError::Http(_) => ErrorKind::Connectivity,
            SessionError::UnexpectedStatus { .. }
            | SessionError::MalformedResponse(_)
            | SessionError::Json(_)
            | SessionError::InvalidUrl(_)
            | SessionError::InvalidHeader(_) => ErrorKind::Protocol,
        }
    }

    /// Get the process exit code the binary reports for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            SessionError::InvalidCredentials { .. } | SessionError::LoginRejected(_) => {
                ExitCode::AuthError
            }
            SessionError::Unreachable { .. }
            | SessionError::TimedOut { .. }
            | SessionError::RetryBudgetExhausted { .. }
            | SessionError::Http(_) => ExitCode::NetworkError,
            SessionError::UnexpectedStatus { .. } => ExitCode::ApiError,
            SessionError::MalformedResponse(_) | SessionError::Json(_) => ExitCode::DataError,
            SessionError::InvalidUrl(_) | SessionError::InvalidHeader(_) => ExitCode::ConfigError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_errors_are_classified() {
        let error = SessionError::InvalidCredentials {
            message: "invalid_grant".to_string(),
        };
        assert_eq!(error.kind(), ErrorKind::Authentication);
        assert_eq!(error.exit_code(), ExitCode::AuthError);

        let error = SessionError::LoginRejected(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.kind(), ErrorKind::Authentication);
        assert!(error.to_string().contains("500"));
    }

    #[test]
    fn test_unexpected_status_is_a_protocol_error() {
        let error = SessionError::UnexpectedStatus {
            method: "students/list".to_string(),
            status: StatusCode::NOT_FOUND,
            body: String::new(),
        };
        assert_eq!(error.kind(), ErrorKind::Protocol);
        assert_eq!(error.exit_code(), ExitCode::ApiError);
        assert_eq!(
            error.to_string(),
            "Method 'students/list' finished with status 404 Not Found"
        );
    }

    #[test]
    fn test_budget_exhaustion_is_a_connectivity_error() {
        let error = SessionError::RetryBudgetExhausted {
            url: "http://localhost/api".to_string(),
            budget: std::time::Duration::from_secs(1),
        };
        assert_eq!(error.kind(), ErrorKind::Connectivity);
        assert_eq!(error.exit_code(), ExitCode::NetworkError);
        assert_eq!(ErrorKind::Connectivity.to_string(), "connectivity");
    }
}
