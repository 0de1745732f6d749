//! HTTP transport for the EDBO session.
//!
//! Wraps a `reqwest::Client` preconfigured with the headers the server
//! expects on every request, and runs each POST through the retry policy.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Client, Response};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::error::SessionError;
use crate::model::SessionSettings;
use crate::retry::RetryPolicy;

/// Configuration for HTTP requests with common settings
#[derive(Debug, Clone)]
pub struct HttpRequestConfig {
    /// Base URL every request path is appended to
    pub base_url: String,
    /// Default headers to include with all requests
    pub default_headers: HeaderMap,
    /// Timeout for a single attempt
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl HttpRequestConfig {
    pub fn from_settings(settings: &SessionSettings) -> Result<Self, SessionError> {
        let origin = HeaderValue::from_str(settings.origin())?;
        let user_agent = HeaderValue::from_str(settings.user_agent())?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(ORIGIN, origin.clone());
        default_headers.insert(REFERER, origin);
        default_headers.insert(USER_AGENT, user_agent);

        Ok(Self {
            base_url: settings.api_prefix(),
            default_headers,
            timeout: settings.request_timeout(),
            retry: settings.retry().clone(),
        })
    }
}

/// A response together with how it was obtained
#[derive(Debug)]
pub struct Exchange {
    pub response: Response,
    /// Duration of the final, successful attempt only
    pub elapsed: Duration,
    pub attempts: u32,
}

/// HTTP client wrapper with common request handling logic
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpRequestConfig,
}

impl HttpClient {
    pub fn new(config: HttpRequestConfig) -> Result<Self, SessionError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(config.default_headers.clone())
            .build()?;

        Ok(Self { client, config })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path.trim_start_matches('/'))
    }

    /// POST a form to `path`, retrying connection failures as the retry
    /// policy allows. A timed out attempt is not retried, the server may
    /// already be running the method. Any HTTP status counts as a response.
    pub async fn post_form<B>(
        &self,
        path: &str,
        form: &B,
        headers: HeaderMap,
    ) -> Result<Exchange, SessionError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path);

        match self.config.retry.budget() {
            Some(budget) => tokio::time::timeout(budget, self.send_with_retry(&url, form, headers))
                .await
                .map_err(|_| {
                    warn!("Request to {} exceeded its budget of {:?}", &url, budget);
                    SessionError::RetryBudgetExhausted {
                        url: url.clone(),
                        budget,
                    }
                })?,
            None => self.send_with_retry(&url, form, headers).await,
        }
    }

    async fn send_with_retry<B>(
        &self,
        url: &str,
        form: &B,
        headers: HeaderMap,
    ) -> Result<Exchange, SessionError>
    where
        B: Serialize + ?Sized,
    {
        let policy = &self.config.retry;
        let mut attempt = 0;

        loop {
            attempt += 1;
            trace!("POST {} (attempt {})", url, attempt);

            let started = Instant::now();
            let result = self
                .client
                .post(url)
                .headers(headers.clone())
                .form(form)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let elapsed = started.elapsed();
                    debug!(
                        "POST {} returned {} after {} attempt(s) [{:.3}s]",
                        url,
                        response.status(),
                        attempt,
                        elapsed.as_secs_f64()
                    );
                    return Ok(Exchange {
                        response,
                        elapsed,
                        attempts: attempt,
                    });
                }
                Err(e) if is_connection_failure(&e) => {
                    if attempt >= policy.max_attempts() {
                        return Err(SessionError::Unreachable {
                            url: url.to_string(),
                            attempts: attempt,
                            source: e,
                        });
                    }

                    let delay = policy.backoff_delay(attempt);
                    warn!(
                        "POST {} failed ({}), retrying in {:?} ({}/{})",
                        url,
                        e,
                        delay,
                        attempt,
                        policy.max_attempts()
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) if e.is_timeout() => {
                    warn!("POST {} timed out on attempt {}, not retrying", url, attempt);
                    return Err(SessionError::TimedOut {
                        url: url.to_string(),
                        source: e,
                    });
                }
                Err(e) => return Err(SessionError::Http(e)),
            }
        }
    }
}

/// Nothing was sent when the connection could not be established, so the
/// request is safe to repeat
fn is_connection_failure(error: &reqwest::Error) -> bool {
    error.is_connect()
}
