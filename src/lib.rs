#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};

pub mod cli;
pub mod commands;
pub mod dispatch;
pub mod emoji;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod history;
pub mod images;
pub mod memes;
pub mod ranking;
pub mod report;
pub mod settings;
pub mod slack;
pub mod snapshot;
pub mod users;

pub use cli::{Cli, Commands};
pub use error::{AppError, Result};

pub fn load_bot_token() -> Result<String> {
    std::env::var("SLACK_BOT_TOKEN").map_err(|_| AppError::MissingToken("SLACK_BOT_TOKEN"))
}

pub fn load_admin_token() -> Result<String> {
    std::env::var("SLACK_ADMIN_TOKEN").map_err(|_| AppError::MissingToken("SLACK_ADMIN_TOKEN"))
}

/// Session cookie sent with admin requests, required on workspaces that
/// gate the emoji admin endpoint behind a browser session.
pub fn load_admin_cookie() -> Option<String> {
    std::env::var("SLACK_ADMIN_COOKIE").ok()
}

/// Parse a Slack message timestamp like "1726000000.000100" into a UTC time.
pub fn ts_to_datetime(ts: &str) -> Result<DateTime<Utc>> {
    let seconds: f64 = ts
        .parse()
        .map_err(|_| AppError::InvalidTimestamp(ts.to_string()))?;
    DateTime::from_timestamp_micros((seconds * 1_000_000.0) as i64)
        .ok_or_else(|| AppError::InvalidTimestamp(ts.to_string()))
}
