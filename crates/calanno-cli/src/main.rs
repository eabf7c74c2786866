//! calanno CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use calanno_core::{TracingConfig, init_tracing};

use calanno_cli::cli::{Cli, Command};
use calanno_cli::error::{CliError, CliResult};
use calanno_cli::{commands, config};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: could not initialize logging: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            if let CliError::Datasource(err) = &e
                && err.needs_sign_in()
            {
                eprintln!("Run 'calanno auth' to sign in.");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let settings_path = cli.settings.as_deref();

    match cli.command {
        Command::Auth { force } => {
            let settings = config::load(settings_path)?;
            commands::auth::run(&settings, force).await
        }
        Command::Test => {
            let settings = config::load(settings_path)?;
            commands::test::run(&settings).await
        }
        Command::Query(args) => {
            let settings = config::load(settings_path)?;
            commands::query::run(&settings, &args).await
        }
        Command::Settings { action } => commands::settings::run(settings_path, action),
    }
}
