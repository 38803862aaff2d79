use clap::{Parser, Subcommand};

use crate::settings::{RunMode, SETTINGS_FILE};

#[derive(Parser)]
#[command(name = "emoji-bot")]
#[command(about = "Weekly reports about a Slack workspace's custom emojis")]
pub struct Cli {
    /// Settings file path
    #[arg(short, long, default_value = SETTINGS_FILE)]
    pub settings: String,

    /// Override the run mode from the settings file
    #[arg(short, long, value_enum)]
    pub mode: Option<RunMode>,

    /// Skip the channel history walk and treat everything newer than
    /// this emoji as new
    #[arg(long, value_name = "NAME")]
    pub last_emoji: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Post the weekly emoji report (the default)
    Weekly,

    /// Rank a whole year of emoji votes
    Wrapped,
}
