//! Session-managing client for the EDBO RESTful web API.
//!
//! The crate owns one authenticated HTTP session per [`Session`] value: it
//! logs in with an OAuth2 password grant, attaches the bearer token to every
//! call, renews the session once it gets old, retries transport failures with
//! bounded backoff, and exposes a single generic `execute` entry point for
//! arbitrary API methods.
//!
//! # Modules
//!
//! - `auth`: OAuth2 password-grant login
//! - `configuration`: YAML configuration file and conversion to session settings
//! - `error`: Session error taxonomy
//! - `exit_codes`: Process exit codes used by the `edbo` binary
//! - `http_utils`: HTTP transport with default headers and retries
//! - `model`: Credentials, session settings and method calls
//! - `notify`: Progress and status messages
//! - `retry`: Retry policy with exponential backoff and a time budget
//! - `session`: The session client itself

pub mod auth;
pub mod configuration;
pub mod error;
pub mod exit_codes;
pub mod http_utils;
pub mod model;
pub mod notify;
pub mod retry;
pub mod session;

pub use error::{ErrorKind, SessionError};
pub use model::{Credentials, MethodCall, SessionSettings};
pub use notify::{ConsoleNotifier, Notifier, Severity, TracingNotifier};
pub use retry::RetryPolicy;
pub use session::Session;
