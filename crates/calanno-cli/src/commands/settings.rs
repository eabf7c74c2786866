//! Settings inspection commands.

use std::path::Path;

use crate::cli::SettingsAction;
use crate::config;
use crate::error::CliResult;

/// Dispatches a settings subcommand.
pub fn run(cli_path: Option<&Path>, action: SettingsAction) -> CliResult<()> {
    match action {
        SettingsAction::Show => show(cli_path),
        SettingsAction::Validate => validate(cli_path),
        SettingsAction::Path => {
            println!("{}", config::resolve_path(cli_path).display());
            Ok(())
        }
    }
}

/// Prints the resolved settings. The secure block never serializes, so
/// secrets stay out of the output by construction.
fn show(cli_path: Option<&Path>) -> CliResult<()> {
    let settings = config::load(cli_path)?;
    println!("{}", serde_json::to_string_pretty(&settings)?);
    if settings.client_secret().is_some() {
        println!();
        println!("A client secret is configured (not shown).");
    }
    Ok(())
}

fn validate(cli_path: Option<&Path>) -> CliResult<()> {
    let path = config::resolve_path(cli_path);
    let settings = config::load(cli_path)?;
    settings.validate()?;
    println!("{} is valid", path.display());
    Ok(())
}
