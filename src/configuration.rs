use crate::model::{Credentials, SessionSettings};
use crate::retry::RetryPolicy;
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;
use url::Url;

pub const DEFAULT_APPLICATION_ID: &str = "edbo";
pub const DEFAULT_CONFIGURATION_FILE_NAME: &str = "config.yml";
pub const CONFIGURATION_DIRECTORY_VARIABLE: &str = "EDBO_CONFIG_DIR";

const REDACTED: &str = "********";

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("failed to resolve the configuration directory")]
    FailedToFindConfigurationDirectory,
    #[error("failed to load configuration data, because of: {cause}")]
    FailedToLoadData {
        cause: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("failed to write configuration data to file, because of: {cause}")]
    FailedToWriteData {
        cause: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("missing value for property {name:?}")]
    MissingRequiredPropertyValue { name: String },
    #[error("invalid value for property {name:?}: {message}")]
    InvalidPropertyValue { name: String, message: String },
}

/// Contents of `config.yml`
///
/// ```yaml
/// server: https://edbo.example.org
/// username: operator
/// password: secret
/// application_key: 0123456789
/// relogin_after_secs: 900
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(skip_serializing_if = "Option::is_none")]
    server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    application_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_agent: Option<String>,
    /// Retries after a failed connection, on top of the first attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    connection_retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    relogin_after_secs: Option<u64>,
    /// Pause before every method call
    #[serde(skip_serializing_if = "Option::is_none")]
    execution_delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_base_backoff_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_max_backoff_ms: Option<u64>,
    /// Total time limit per request including retries; 0 disables the limit
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_budget_secs: Option<u64>,
}

impl Configuration {
    pub fn get_default_configuration_file_path() -> Result<PathBuf, ConfigurationError> {
        // Check for EDBO_CONFIG_DIR environment variable first
        if let Ok(config_dir_str) = std::env::var(CONFIGURATION_DIRECTORY_VARIABLE) {
            let mut config_path = PathBuf::from(config_dir_str);
            config_path.push(DEFAULT_CONFIGURATION_FILE_NAME);
            return Ok(config_path);
        }

        match config_dir() {
            Some(mut default_config_file_path) => {
                default_config_file_path.push(DEFAULT_APPLICATION_ID);
                default_config_file_path.push(DEFAULT_CONFIGURATION_FILE_NAME);

                Ok(default_config_file_path)
            }
            None => Err(ConfigurationError::FailedToFindConfigurationDirectory),
        }
    }

    pub fn load_default() -> Result<Configuration, ConfigurationError> {
        let default_file_path = Configuration::get_default_configuration_file_path()?;
        debug!(
            "Loading configuration from {}...",
            default_file_path.display()
        );
        Configuration::load_from_file(&default_file_path)
    }

    pub fn load_from_file(path: &Path) -> Result<Configuration, ConfigurationError> {
        let configuration = fs::read_to_string(path).map_err(|cause| {
            ConfigurationError::FailedToLoadData {
                cause: Box::new(cause),
            }
        })?;

        serde_yaml::from_str(&configuration).map_err(|cause| ConfigurationError::FailedToLoadData {
            cause: Box::new(cause),
        })
    }

    pub fn write(&self, writer: Box<dyn Write>) -> Result<(), ConfigurationError> {
        serde_yaml::to_writer(writer, self)
            .map_err(|e| ConfigurationError::FailedToWriteData { cause: Box::new(e) })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigurationError> {
        // first check if the parent directory exists and try to create it if not
        match path.parent() {
            Some(directory) => {
                fs::create_dir_all(directory)
                    .map_err(|_| ConfigurationError::FailedToFindConfigurationDirectory)?;
            }
            None => return Err(ConfigurationError::FailedToFindConfigurationDirectory),
        }

        let file = File::create(path)
            .map_err(|e| ConfigurationError::FailedToWriteData { cause: Box::new(e) })?;
        self.write(Box::new(file))
    }

    /// Copy safe to print: the password, when present, is masked
    pub fn redacted(&self) -> Configuration {
        let mut configuration = self.clone();
        if configuration.password.is_some() {
            configuration.password = Some(REDACTED.to_string());
        }
        configuration
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_application_key(mut self, application_key: impl Into<String>) -> Self {
        self.application_key = Some(application_key.into());
        self
    }

    pub fn server(&self) -> Result<Url, ConfigurationError> {
        let server = required("server", &self.server)?;
        Url::parse(server).map_err(|e| ConfigurationError::InvalidPropertyValue {
            name: "server".to_string(),
            message: e.to_string(),
        })
    }

    /// Default credentials for sessions that are not given any explicitly
    pub fn credentials(&self) -> Result<Credentials, ConfigurationError> {
        Ok(Credentials::new(
            required("username", &self.username)?,
            required("password", &self.password)?,
        ))
    }

    pub fn session_settings(&self) -> Result<SessionSettings, ConfigurationError> {
        let mut retry = RetryPolicy::default();
        if let Some(retries) = self.connection_retries {
            retry = retry.with_max_attempts(retries.saturating_add(1));
        }
        if let Some(ms) = self.retry_base_backoff_ms {
            retry = retry.with_base_backoff(Duration::from_millis(ms));
        }
        if let Some(ms) = self.retry_max_backoff_ms {
            retry = retry.with_max_backoff(Duration::from_millis(ms));
        }
        if let Some(secs) = self.retry_budget_secs {
            retry = retry.with_budget((secs > 0).then(|| Duration::from_secs(secs)));
        }

        let mut settings = SessionSettings::new(
            self.server()?,
            required("application_key", &self.application_key)?,
        )
        .with_retry(retry);

        if let Some(user_agent) = &self.user_agent {
            settings = settings.with_user_agent(user_agent);
        }
        if let Some(secs) = self.relogin_after_secs {
            settings = settings.with_relogin_after(Duration::from_secs(secs));
        }
        if let Some(ms) = self.execution_delay_ms {
            settings = settings.with_execution_delay(Duration::from_millis(ms));
        }
        if let Some(secs) = self.request_timeout_secs {
            settings = settings.with_request_timeout(Duration::from_secs(secs));
        }

        Ok(settings)
    }
}

fn required<'a>(name: &str, value: &'a Option<String>) -> Result<&'a str, ConfigurationError> {
    match value.as_deref() {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigurationError::MissingRequiredPropertyValue {
            name: name.to_string(),
        }),
    }
}
