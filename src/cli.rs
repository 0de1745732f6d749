use crate::commands::{
    COMMAND_CONFIG, COMMAND_EXECUTE, COMMAND_LOGIN, COMMAND_PATH, COMMAND_SHOW, PARAMETER_DATA,
    PARAMETER_HEADER, PARAMETER_METHOD, PARAMETER_PASSWORD, PARAMETER_PRETTY, PARAMETER_QUIET,
    PARAMETER_RAW, PARAMETER_USERNAME,
};
use clap::ArgMatches;
use edbo::configuration::{Configuration, ConfigurationError};
use edbo::exit_codes::ExitCode;
use edbo::{ConsoleNotifier, MethodCall, Session, SessionError};
use futures::FutureExt;
use reqwest::header::{HeaderName, HeaderValue};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Undefined or unsupported subcommand")]
    UnsupportedSubcommand(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(#[from] ConfigurationError),
    #[error("{0}")]
    SessionError(#[from] SessionError),
    #[error("Invalid form data '{0}'")]
    InvalidData(String),
    #[error("Invalid header '{0}', expected 'Name: value'")]
    InvalidHeader(String),
    #[error("Failed to print result: {0}")]
    OutputError(#[from] serde_json::Error),
}

impl CliError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CliError::UnsupportedSubcommand(_)
            | CliError::InvalidData(_)
            | CliError::InvalidHeader(_) => ExitCode::UsageError,
            CliError::ConfigurationError(_) => ExitCode::ConfigError,
            CliError::SessionError(e) => e.exit_code(),
            CliError::OutputError(_) => ExitCode::SoftwareError,
        }
    }
}

fn extract_subcommand_name(sub_matches: &ArgMatches) -> String {
    let message = match sub_matches.subcommand() {
        Some(m) => m.0,
        None => "unknown",
    };

    message.to_string()
}

pub async fn execute_command(matches: ArgMatches) -> Result<(), CliError> {
    let notifier = Arc::new(ConsoleNotifier::new(matches.get_flag(PARAMETER_QUIET)));

    match matches.subcommand() {
        Some((COMMAND_LOGIN, sub_matches)) => {
            let configuration = with_cli_credentials(Configuration::load_default()?, sub_matches);
            let session = Session::connect_with(
                configuration.session_settings()?,
                configuration.credentials()?,
                notifier,
            )
            .await?;
            session.close().await?;

            Ok(())
        }
        Some((COMMAND_EXECUTE, sub_matches)) => {
            let configuration = with_cli_credentials(Configuration::load_default()?, sub_matches);
            let call = method_call(sub_matches)?;
            let raw = sub_matches.get_flag(PARAMETER_RAW);
            let pretty = sub_matches.get_flag(PARAMETER_PRETTY);

            let output = Session::scoped(
                configuration.session_settings()?,
                configuration.credentials()?,
                notifier,
                move |session| render_call(session, call, raw, pretty).boxed(),
            )
            .await?;

            println!("{}", output);
            Ok(())
        }
        Some((COMMAND_CONFIG, sub_matches)) => match sub_matches.subcommand() {
            Some((COMMAND_SHOW, _)) => {
                let configuration = Configuration::load_default()?;
                configuration.redacted().write(Box::new(std::io::stdout()))?;
                Ok(())
            }
            Some((COMMAND_PATH, _)) => {
                let path = Configuration::get_default_configuration_file_path()?;
                println!("{}", path.display());
                Ok(())
            }
            _ => Err(CliError::UnsupportedSubcommand(extract_subcommand_name(
                sub_matches,
            ))),
        },
        _ => Err(CliError::UnsupportedSubcommand(extract_subcommand_name(
            &matches,
        ))),
    }
}

async fn render_call(
    session: &mut Session,
    call: MethodCall,
    raw: bool,
    pretty: bool,
) -> Result<String, SessionError> {
    if raw {
        let response = session.execute_raw(call).await?;
        return Ok(response.text().await?);
    }

    let value = session.execute(call).await?;
    if pretty {
        Ok(serde_json::to_string_pretty(&value)?)
    } else {
        Ok(serde_json::to_string(&value)?)
    }
}

fn with_cli_credentials(mut configuration: Configuration, sub_matches: &ArgMatches) -> Configuration {
    if let Some(username) = sub_matches.get_one::<String>(PARAMETER_USERNAME) {
        configuration = configuration.with_username(username);
    }
    if let Some(password) = sub_matches.get_one::<String>(PARAMETER_PASSWORD) {
        configuration = configuration.with_password(password);
    }
    configuration
}

fn method_call(sub_matches: &ArgMatches) -> Result<MethodCall, CliError> {
    // unwrap is safe, the argument is mandatory and clap rejects its absence
    let method = sub_matches.get_one::<String>(PARAMETER_METHOD).unwrap();
    let mut call = MethodCall::new(method);

    for data in sub_matches
        .get_many::<String>(PARAMETER_DATA)
        .into_iter()
        .flatten()
    {
        call = call.fields(parse_form_data(data)?);
    }

    for header in sub_matches
        .get_many::<String>(PARAMETER_HEADER)
        .into_iter()
        .flatten()
    {
        let (name, value) = parse_header(header)?;
        call = call.header(name, value);
    }

    Ok(call)
}

fn parse_form_data(data: &str) -> Result<Vec<(String, String)>, CliError> {
    serde_urlencoded::from_str(data).map_err(|_| CliError::InvalidData(data.to_string()))
}

fn parse_header(header: &str) -> Result<(HeaderName, HeaderValue), CliError> {
    let invalid = || CliError::InvalidHeader(header.to_string());
    let (name, value) = header.split_once(':').ok_or_else(invalid)?;
    let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|_| invalid())?;
    let value = HeaderValue::from_str(value.trim()).map_err(|_| invalid())?;
    Ok((name, value))
}
