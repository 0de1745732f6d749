//! Authenticated session against the EDBO web API.
//!
//! A [`Session`] logs in on [`Session::connect`], attaches the bearer token to
//! every method call, transparently logs out and in again once the session is
//! older than the configured re-login interval, and logs out on
//! [`Session::close`]. [`Session::scoped`] wraps the whole lifecycle so the
//! logout happens on every exit path.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::auth::AuthClient;
use crate::error::SessionError;
use crate::http_utils::{Exchange, HttpClient, HttpRequestConfig};
use crate::model::{Credentials, MethodCall, SessionSettings};
use crate::notify::{Notifier, Severity, TracingNotifier};

pub const LOGOUT_METHOD: &str = "auth/logout";

pub struct Session {
    http: HttpClient,
    auth: AuthClient,
    settings: SessionSettings,
    credentials: Credentials,
    notifier: Arc<dyn Notifier>,
    token: Option<String>,
    started_at: Option<Instant>,
    status: Option<StatusCode>,
    execution_time: Duration,
}

impl Session {
    /// Log in with `credentials`, reporting progress through `tracing`
    pub async fn connect(
        settings: SessionSettings,
        credentials: Credentials,
    ) -> Result<Session, SessionError> {
        Self::connect_with(settings, credentials, Arc::new(TracingNotifier)).await
    }

    pub async fn connect_with(
        settings: SessionSettings,
        credentials: Credentials,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Session, SessionError> {
        let http = HttpClient::new(HttpRequestConfig::from_settings(&settings)?)?;
        let mut session = Session {
            http,
            auth: AuthClient::new(settings.application_key()),
            settings,
            credentials,
            notifier,
            token: None,
            started_at: None,
            status: None,
            execution_time: Duration::ZERO,
        };

        session.login().await?;
        Ok(session)
    }

    /// Connect, hand the session to `f`, and close it whatever `f` returns.
    ///
    /// ```no_run
    /// # use std::sync::Arc;
    /// # use edbo::{Credentials, MethodCall, Session, SessionSettings, TracingNotifier};
    /// # use futures::FutureExt;
    /// # async fn run(settings: SessionSettings, credentials: Credentials) -> Result<(), edbo::SessionError> {
    /// let seasons = Session::scoped(settings, credentials, Arc::new(TracingNotifier), |session| {
    ///     async move { session.execute(MethodCall::new("seasons/list")).await }.boxed()
    /// })
    /// .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn scoped<T, F>(
        settings: SessionSettings,
        credentials: Credentials,
        notifier: Arc<dyn Notifier>,
        f: F,
    ) -> Result<T, SessionError>
    where
        F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, Result<T, SessionError>>,
    {
        let mut session = Session::connect_with(settings, credentials, notifier).await?;
        let outcome = f(&mut session).await;
        let closed = session.close().await;

        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_error)) => {
                warn!("Failed to close session after error: {}", close_error);
                Err(e)
            }
        }
    }

    /// Log out and release the session. The token is discarded even when the
    /// server does not acknowledge the logout.
    pub async fn close(mut self) -> Result<(), SessionError> {
        let result = self.logout().await;
        self.token = None;
        self.started_at = None;
        result
    }

    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    /// Status of the most recently completed request
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Duration of the final attempt of the most recently completed request
    pub fn execution_time(&self) -> Duration {
        self.execution_time
    }

    pub fn execution_secs(&self) -> f64 {
        self.execution_time.as_secs_f64()
    }

    /// Time since the last successful login, `None` when logged out
    pub fn session_age(&self) -> Option<Duration> {
        self.started_at.map(|started| started.elapsed())
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Call a remote method and parse its 200 response as JSON
    pub async fn execute(&mut self, call: MethodCall) -> Result<Value, SessionError> {
        self.execute_as(call).await
    }

    /// Call a remote method and deserialize its 200 response into `T`
    pub async fn execute_as<T>(&mut self, call: MethodCall) -> Result<T, SessionError>
    where
        T: DeserializeOwned,
    {
        let method = call.method().to_string();
        let response = self.execute_raw(call).await?;
        let text = response.text().await?;
        trace!("Raw response of {}: {}", &method, &text);

        serde_json::from_str(&text).map_err(|e| {
            warn!("Failed to deserialize response of {}: {}", &method, e);
            SessionError::Json(e)
        })
    }

    /// Call a remote method and return the 200 response untouched
    pub async fn execute_raw(&mut self, call: MethodCall) -> Result<Response, SessionError> {
        self.ensure_fresh_session().await?;

        let delay = self.settings.execution_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let exchange = self.dispatch(&call).await?;
        let status = exchange.response.status();

        if status == StatusCode::OK {
            Ok(exchange.response)
        } else {
            let body = body_text(exchange.response, call.method()).await;
            Err(SessionError::UnexpectedStatus {
                method: call.method().to_string(),
                status,
                body,
            })
        }
    }

    /// Log out from the server. Does nothing when not logged in.
    pub async fn logout(&mut self) -> Result<(), SessionError> {
        if !self.is_logged_in() {
            debug!("Logout requested but session is not logged in");
            return Ok(());
        }

        self.notifier.notify(Severity::Warning, "Logging out...");
        let call = MethodCall::new(LOGOUT_METHOD);
        let exchange = self.dispatch(&call).await?;
        let status = exchange.response.status();

        if status == StatusCode::NO_CONTENT {
            self.token = None;
            self.started_at = None;
            Ok(())
        } else {
            let body = body_text(exchange.response, LOGOUT_METHOD).await;
            Err(SessionError::UnexpectedStatus {
                method: LOGOUT_METHOD.to_string(),
                status,
                body,
            })
        }
    }

    fn is_expired(&self) -> bool {
        self.session_age()
            .is_some_and(|age| age > self.settings.relogin_after())
    }

    async fn ensure_fresh_session(&mut self) -> Result<(), SessionError> {
        if !self.is_logged_in() {
            debug!("Session is logged out, logging in again");
            return self.login().await;
        }

        if self.is_expired() {
            self.notifier
                .notify(Severity::Info, "Session is about to expire, renewing...");

            if let Err(e) = self.logout().await {
                self.notifier
                    .notify(Severity::Warning, &format!("Logout before renewal failed: {}", e));
                self.token = None;
                self.started_at = None;
            }

            self.login().await?;
        }

        Ok(())
    }

    async fn login(&mut self) -> Result<(), SessionError> {
        self.notifier.notify(Severity::Info, "Logging in...");

        let granted = match self.auth.request_token(&self.http, &self.credentials).await {
            Ok(grant) => {
                self.record(grant.status, grant.elapsed);
                grant.access_token
            }
            Err(e) => Err(e),
        };

        match granted {
            Ok(token) => {
                self.token = Some(token);
                self.started_at = Some(Instant::now());
                self.notifier.notify(
                    Severity::Success,
                    &format!("Logged in successfully, welcome {}!", self.credentials.username()),
                );
                Ok(())
            }
            Err(e) => {
                self.notifier.notify(Severity::Error, &e.to_string());
                Err(e)
            }
        }
    }

    /// Send one method call with the bearer token, recording its status and
    /// timing. No expiry check, so an expired session can still log out.
    async fn dispatch(&mut self, call: &MethodCall) -> Result<Exchange, SessionError> {
        let mut headers = call.headers().clone();
        if let Some(token) = &self.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        self.notifier.notify(
            Severity::Info,
            &format!("Executing method {}...", call.method()),
        );

        let exchange = match self.http.post_form(&call.path(), &call.form(), headers).await {
            Ok(exchange) => exchange,
            Err(e) => {
                self.notifier.notify(
                    Severity::Error,
                    &format!("Method {} failed: {}", call.method(), e),
                );
                return Err(e);
            }
        };

        self.record(exchange.response.status(), exchange.elapsed);
        let retried = match exchange.attempts {
            1 => String::new(),
            n => format!(" after {} attempts", n),
        };
        self.notifier.notify(
            Severity::Success,
            &format!(
                "Method {} finished with status {}{} [{:.3}s]",
                call.method(),
                exchange.response.status().as_u16(),
                retried,
                self.execution_secs()
            ),
        );

        Ok(exchange)
    }

    fn record(&mut self, status: StatusCode, elapsed: Duration) {
        self.status = Some(status);
        self.execution_time = elapsed;
    }
}

/// Body of a rejected call, empty when it cannot be read
async fn body_text(response: Response, method: &str) -> String {
    match response.text().await {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to read response body of {}: {}", method, e);
            String::new()
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.token.is_some() {
            warn!(
                "Session for {} dropped while logged in; call close() to log out",
                self.credentials.username()
            );
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("server", &self.settings.origin())
            .field("credentials", &self.credentials)
            .field("logged_in", &self.is_logged_in())
            .field("status", &self.status)
            .field("execution_time", &self.execution_time)
            .finish()
    }
}
