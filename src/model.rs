//! Data types shared by the session, its transport and the configuration.

use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::retry::RetryPolicy;

pub const DEFAULT_RELOGIN_AFTER: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_EXECUTION_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_USER_AGENT: &str = concat!("edbo/", env!("CARGO_PKG_VERSION"));

/// Path under the server root where the web API lives
pub const API_ROOT: &str = "data/EDEBOWebApi";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

// Keep the password out of logs and panic messages
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Everything a session needs to know about the server and its own pacing
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    server: Url,
    application_key: String,
    user_agent: String,
    relogin_after: Duration,
    execution_delay: Duration,
    request_timeout: Duration,
    retry: RetryPolicy,
}

impl SessionSettings {
    pub fn new(server: Url, application_key: impl Into<String>) -> Self {
        Self {
            server,
            application_key: application_key.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            relogin_after: DEFAULT_RELOGIN_AFTER,
            execution_delay: DEFAULT_EXECUTION_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Maximum session age before the next call logs out and in again
    pub fn with_relogin_after(mut self, relogin_after: Duration) -> Self {
        self.relogin_after = relogin_after;
        self
    }

    /// Pause taken before every method call
    pub fn with_execution_delay(mut self, delay: Duration) -> Self {
        self.execution_delay = delay;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn server(&self) -> &Url {
        &self.server
    }

    /// Server root without a trailing slash, as sent in `Origin` and `Referer`
    pub fn origin(&self) -> &str {
        self.server.as_str().trim_end_matches('/')
    }

    /// `<server>/data/EDEBOWebApi`
    pub fn api_prefix(&self) -> String {
        format!("{}/{}", self.origin(), API_ROOT)
    }

    pub fn application_key(&self) -> &str {
        &self.application_key
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn relogin_after(&self) -> Duration {
        self.relogin_after
    }

    pub fn execution_delay(&self) -> Duration {
        self.execution_delay
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }
}

/// A single remote method invocation: `POST <prefix>/api/<method>`
#[derive(Debug, Clone, Default)]
pub struct MethodCall {
    method: String,
    form: Vec<(String, String)>,
    headers: HeaderMap,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Default::default()
        }
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((key.into(), value.into()));
        self
    }

    pub fn fields<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.form
            .extend(fields.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Method path relative to the API prefix, e.g. `api/students/list`
    pub fn path(&self) -> String {
        format!("api/{}", self.method.trim_start_matches('/'))
    }

    /// Form body; the server expects one even when the method takes no
    /// arguments, so an empty call sends a single empty field.
    pub fn form(&self) -> Vec<(String, String)> {
        if self.form.is_empty() {
            vec![(String::new(), String::new())]
        } else {
            self.form.clone()
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}
