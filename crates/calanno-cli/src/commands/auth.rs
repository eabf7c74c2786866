//! Interactive sign-in command.

use std::sync::Arc;

use tracing::info;

use calanno_datasource::google::GoogleApi;
use calanno_datasource::{CalendarApi, CalendarDatasource, InstanceSettings};

use crate::error::CliResult;

/// Runs the sign-in pipeline for the configured instance.
///
/// With `--force`, stored tokens are discarded first so the browser flow
/// always runs. Without it, an existing usable session short-circuits.
pub async fn run(settings: &InstanceSettings, force: bool) -> CliResult<()> {
    let api = Arc::new(GoogleApi::from_settings(settings));

    if force {
        api.tokens().clear()?;
        println!("Cleared stored tokens.");
    } else if api.auth_status().await?.is_signed_in() {
        println!("Already signed in for instance {:?}.", settings.name);
        println!("Use --force to sign in again.");
        return Ok(());
    }

    println!("Starting Google Calendar sign-in...");
    println!();
    println!("A browser window will open for you to authorize access.");
    println!("If it does not, copy the URL printed below into a browser.");
    println!();

    let datasource = CalendarDatasource::new(settings, api.clone());
    datasource.initialize().await?;

    info!("sign-in finished for {}", settings.name);
    println!("Signed in.");
    println!("Tokens stored at {}", api.tokens().path().display());
    Ok(())
}
