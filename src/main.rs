use clap::Parser;
use emoji_bot::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        None | Some(Commands::Weekly) => {
            emoji_bot::commands::run_weekly_report(&cli.settings, cli.mode, cli.last_emoji).await
        }
        Some(Commands::Wrapped) => {
            emoji_bot::commands::run_wrapped_report(&cli.settings, cli.mode).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
