use std::path::Path;

use crate::error::Result;
use crate::report;
use crate::settings::{RunMode, Settings};
use crate::slack::SlackGateway;
use crate::{load_admin_cookie, load_admin_token, load_bot_token};

/// Load the settings, apply the command line mode override and build
/// the gateway the runs talk through.
fn prepare(settings_path: &str, mode: Option<RunMode>) -> Result<(Settings, SlackGateway)> {
    let mut settings = Settings::load(Path::new(settings_path))?;
    if let Some(mode) = mode {
        settings.run_mode = mode;
    }

    let gateway = SlackGateway::new(
        load_bot_token()?,
        load_admin_token()?,
        load_admin_cookie(),
        settings.api.admin_base_url.clone(),
    )?;
    Ok((settings, gateway))
}

pub async fn run_weekly_report(
    settings_path: &str,
    mode: Option<RunMode>,
    last_emoji: Option<String>,
) -> Result<()> {
    let (mut settings, gateway) = prepare(settings_path, mode)?;
    if let Some(marker) = last_emoji {
        settings.markers.last_emoji_override = marker;
    }

    println!(
        "Running the weekly report in {:?} mode...",
        settings.run_mode
    );

    report::run_weekly(&gateway, &settings).await?;

    println!("Weekly report done.");
    Ok(())
}

pub async fn run_wrapped_report(settings_path: &str, mode: Option<RunMode>) -> Result<()> {
    let (settings, gateway) = prepare(settings_path, mode)?;

    println!(
        "Running the year in review in {:?} mode...",
        settings.run_mode
    );

    report::run_wrapped(&gateway, &settings).await?;

    println!("Year in review done.");
    Ok(())
}
