use clap::{Arg, ArgAction, ArgMatches, Command};

pub const COMMAND_LOGIN: &str = "login";
pub const COMMAND_EXECUTE: &str = "execute";
pub const COMMAND_CONFIG: &str = "config";
pub const COMMAND_SHOW: &str = "show";
pub const COMMAND_PATH: &str = "path";

pub const PARAMETER_METHOD: &str = "method";
pub const PARAMETER_DATA: &str = "data";
pub const PARAMETER_HEADER: &str = "header";
pub const PARAMETER_RAW: &str = "raw";
pub const PARAMETER_PRETTY: &str = "pretty";
pub const PARAMETER_USERNAME: &str = "username";
pub const PARAMETER_PASSWORD: &str = "password";
pub const PARAMETER_QUIET: &str = "quiet";

fn username_parameter() -> Arg {
    Arg::new(PARAMETER_USERNAME)
        .short('u')
        .long(PARAMETER_USERNAME)
        .num_args(1)
        .required(false)
        .help("Username (defaults to the configured one)")
}

fn password_parameter() -> Arg {
    Arg::new(PARAMETER_PASSWORD)
        .short('p')
        .long(PARAMETER_PASSWORD)
        .num_args(1)
        .required(false)
        .help("Password (defaults to the configured one)")
}

pub fn cli_command() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .propagate_version(true)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new(PARAMETER_QUIET)
                .short('q')
                .long(PARAMETER_QUIET)
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Only report warnings and errors"),
        )
        .subcommand(
            Command::new(COMMAND_LOGIN)
                .about("Checks that the server accepts the credentials, then logs out")
                .arg(username_parameter())
                .arg(password_parameter()),
        )
        .subcommand(
            Command::new(COMMAND_EXECUTE)
                .about("Executes a remote API method and prints its result")
                .arg(
                    Arg::new(PARAMETER_METHOD)
                        .required(true)
                        .help("Method path, e.g. students/list"),
                )
                .arg(
                    Arg::new(PARAMETER_DATA)
                        .short('d')
                        .long(PARAMETER_DATA)
                        .num_args(1)
                        .action(ArgAction::Append)
                        .help("Form data as URL-encoded pairs, e.g. 'seasonId=7&page=1'"),
                )
                .arg(
                    Arg::new(PARAMETER_HEADER)
                        .short('H')
                        .long(PARAMETER_HEADER)
                        .num_args(1)
                        .action(ArgAction::Append)
                        .help("Extra request header, e.g. 'Accept-Language: uk'"),
                )
                .arg(
                    Arg::new(PARAMETER_RAW)
                        .long(PARAMETER_RAW)
                        .action(ArgAction::SetTrue)
                        .conflicts_with(PARAMETER_PRETTY)
                        .help("Print the response body as received instead of parsing JSON"),
                )
                .arg(
                    Arg::new(PARAMETER_PRETTY)
                        .long(PARAMETER_PRETTY)
                        .action(ArgAction::SetTrue)
                        .help("Pretty-print the JSON result"),
                )
                .arg(username_parameter())
                .arg(password_parameter()),
        )
        .subcommand(
            Command::new(COMMAND_CONFIG)
                .about("Working with configuration")
                .subcommand_required(true)
                .subcommand(
                    Command::new(COMMAND_SHOW)
                        .about("Displays the configuration with the password masked"),
                )
                .subcommand(Command::new(COMMAND_PATH).about("Shows the configuration file path")),
        )
}

pub fn create_cli_commands() -> ArgMatches {
    cli_command().get_matches()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_definition_is_consistent() {
        cli_command().debug_assert();
    }

    #[test]
    fn test_execute_collects_repeated_arguments() {
        let matches = cli_command()
            .try_get_matches_from([
                "edbo",
                "execute",
                "students/list",
                "-d",
                "seasonId=7",
                "-d",
                "page=1",
                "-H",
                "Accept-Language: uk",
            ])
            .unwrap();

        let (name, sub_matches) = matches.subcommand().unwrap();
        assert_eq!(name, COMMAND_EXECUTE);
        let data: Vec<&String> = sub_matches.get_many(PARAMETER_DATA).unwrap().collect();
        assert_eq!(data, vec!["seasonId=7", "page=1"]);
        assert!(!sub_matches.get_flag(PARAMETER_RAW));
    }

    #[test]
    fn test_raw_conflicts_with_pretty() {
        let result =
            cli_command().try_get_matches_from(["edbo", "execute", "x", "--raw", "--pretty"]);
        assert!(result.is_err());
    }
}
