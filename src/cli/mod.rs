pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::{BrowserSettings, Config};

#[derive(Parser)]
#[command(name = "classroom-harvest")]
#[command(about = "Save classroom lessons and their videos as Markdown", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/classroom-harvest/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging when RUST_LOG is not set
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Harvest a classroom, or one lesson when the URL has `md=<id>`
    Harvest {
        /// Classroom or lesson URL
        url: String,

        /// Output root (overrides [output] root)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, env = "HARVEST_EMAIL")]
        email: Option<String>,

        #[arg(long, env = "HARVEST_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Show the browser window
        #[arg(long)]
        headed: bool,

        /// Re-extract lessons that already have a Markdown file
        #[arg(long)]
        no_skip_existing: bool,

        /// Page timeout and render wait tuned for fast or slow connections
        #[arg(long, value_enum)]
        preset: Option<Preset>,
    },
    /// Find videos attributed to more than one saved lesson
    Duplicates {
        /// Directory to scan (default: output root)
        dir: Option<PathBuf>,

        /// Add the duplicates to the persisted blacklist
        #[arg(long)]
        promote: bool,
    },
    /// List the effective video blacklist
    Blacklist,
    /// Show config path and effective settings
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    Fast,
    Thorough,
}

impl Commands {
    /// Fold command-line flags into the loaded config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Commands::Harvest {
            output,
            headed,
            no_skip_existing,
            preset,
            ..
        } = self
        {
            if let Some(preset) = preset {
                let tuned = match preset {
                    Preset::Fast => BrowserSettings::fast(),
                    Preset::Thorough => BrowserSettings::thorough(),
                };
                config.browser.timeout_secs = tuned.timeout_secs;
                config.browser.wait_after_load_ms = tuned.wait_after_load_ms;
            }
            if let Some(dir) = output {
                config.output.root = dir.clone();
            }
            if *headed {
                config.browser.headless = false;
            }
            if *no_skip_existing {
                config.run.skip_existing = false;
            }
        }
    }
}
