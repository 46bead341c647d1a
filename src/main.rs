use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use classroom_harvest::app::AppContext;
use classroom_harvest::cli::{commands, Cli, Commands};
use classroom_harvest::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("classroom_harvest=debug"))
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config_path = match cli.config {
        Some(ref path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let mut config = Config::load_from(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    cli.command.apply_overrides(&mut config);

    let ctx = AppContext::new(config, config_path).context("initializing")?;

    match cli.command {
        Commands::Harvest {
            url,
            email,
            password,
            ..
        } => {
            commands::harvest(&ctx, &url, email, password).await?;
        }
        Commands::Duplicates { dir, promote } => {
            commands::duplicates(&ctx, dir, promote)?;
        }
        Commands::Blacklist => {
            commands::list_blacklist(&ctx)?;
        }
        Commands::Config => {
            commands::show_config(&ctx)?;
        }
    }

    Ok(())
}
