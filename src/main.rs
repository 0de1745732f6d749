use color_print::ceprintln;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::execute_command;
use commands::create_cli_commands;

/// Main entry point for the program
#[tokio::main]
async fn main() {
    // Initialize the logging subsystem; stdout is reserved for method results
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let matches = create_cli_commands();

    if let Err(e) = execute_command(matches).await {
        let exit_code = e.exit_code();
        ceprintln!("<red>ERROR: {}</red> ({})", e, exit_code.message());
        ::std::process::exit(exit_code.code());
    }
}
