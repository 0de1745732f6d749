use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::http_utils::HttpClient;
use crate::model::Credentials;

pub const TOKEN_PATH: &str = "oauth/token";

const UNKNOWN_LOGIN_ERROR: &str = "unknown login error";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// The token endpoint's answer: the bearer token or the reason it was
/// refused, with the status and timing of the request either way
#[derive(Debug)]
pub struct Grant {
    pub access_token: Result<String, SessionError>,
    pub status: StatusCode,
    pub elapsed: Duration,
}

pub struct AuthClient {
    application_key: String,
}

impl AuthClient {
    pub fn new(application_key: impl Into<String>) -> Self {
        Self {
            application_key: application_key.into(),
        }
    }

    /// OAuth2 password grant against `<prefix>/oauth/token`. Fails outright
    /// only when no response was received.
    pub async fn request_token(
        &self,
        http: &HttpClient,
        credentials: &Credentials,
    ) -> Result<Grant, SessionError> {
        tracing::debug!(
            "Requesting access token for {} from {}",
            credentials.username(),
            http.url(TOKEN_PATH)
        );

        let params = [
            ("grant_type", "password"),
            ("username", credentials.username()),
            ("password", credentials.password()),
            ("app_key", self.application_key.as_str()),
        ];

        let exchange = http.post_form(TOKEN_PATH, &params, HeaderMap::new()).await?;
        let status = exchange.response.status();
        tracing::debug!("Authentication response status: {}", status);

        Ok(Grant {
            access_token: read_token(exchange.response, status).await,
            status,
            elapsed: exchange.elapsed,
        })
    }
}

async fn read_token(response: Response, status: StatusCode) -> Result<String, SessionError> {
    match status {
        StatusCode::OK => {
            let body = response.text().await?;
            let token: TokenResponse = serde_json::from_str(&body)
                .map_err(|e| SessionError::MalformedResponse(format!("token response: {}", e)))?;

            if token.access_token.is_empty() {
                return Err(SessionError::MalformedResponse(
                    "token response carries an empty access_token".to_string(),
                ));
            }

            Ok(token.access_token)
        }
        StatusCode::BAD_REQUEST => {
            let body = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("Failed to read login error response body: {}", e);
                    String::new()
                }
            };
            tracing::error!("Login rejected with status {}: {}", status, &body);

            Err(SessionError::InvalidCredentials {
                message: login_error_message(&body),
            })
        }
        _ => Err(SessionError::LoginRejected(status)),
    }
}

/// Extract `error` and `error_description` from an OAuth error body
fn login_error_message(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(error_json) => match error_json.get("error").and_then(|v| v.as_str()) {
            Some(error) => match error_json
                .get("error_description")
                .and_then(|v| v.as_str())
            {
                Some(description) if !description.is_empty() => {
                    format!("{} - {}", error, description)
                }
                _ => error.to_string(),
            },
            None => UNKNOWN_LOGIN_ERROR.to_string(),
        },
        Err(e) => {
            tracing::warn!("Failed to parse login error response as JSON: {}", e);
            UNKNOWN_LOGIN_ERROR.to_string()
        }
    }
}
