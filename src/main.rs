//! Duett CLI entry point.

use anyhow::Result;
use clap::Parser;
use duett::cli::{commands, Cli, Commands};
use duett::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = commands::resolve_config_path(cli.config.as_deref());
    let settings = Settings::load_from(Some(&config_path))?;

    // Initialize logging: -v flags win over the configured level
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("duett={}", log_level)),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match &cli.command {
        Commands::Init => {
            commands::run_init(&settings, &config_path)?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings, &config_path)?;
        }

        Commands::Generate {
            document,
            output,
            script_out,
            top_k,
            word_limit,
            model,
        } => {
            commands::run_generate(
                document,
                output.clone(),
                script_out.clone(),
                *top_k,
                *word_limit,
                model.clone(),
                settings,
            )
            .await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, &config_path)?;
        }
    }

    Ok(())
}
