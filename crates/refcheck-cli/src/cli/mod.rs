//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use refcheck_core::advisory::AdvisoryMode;
use refcheck_core::config::Config;
use refcheck_core::{interrupt, logging};

mod commands;

#[derive(Parser)]
#[command(name = "refcheck")]
#[command(version)]
#[command(about = "Reference checks without legal risk: narrated training deck and advisory assistant")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Play the training deck (controls on stdin: p pause, r restart, m mute, n next, q quit)
    Play(PlayArgs),

    /// Ask the hiring-law advisory assistant
    Ask {
        /// How to frame the question
        #[arg(short, long, default_value = "analyze", value_name = "analyze|generate|chat")]
        mode: AdvisoryMode,

        /// Scenario, job role or free-form question
        #[arg(required = true, value_name = "TEXT")]
        text: Vec<String>,
    },

    /// List the slides in the deck
    Slides {
        /// Load a TOML deck instead of the built-in one
        #[arg(long, value_name = "PATH")]
        deck: Option<PathBuf>,
    },

    /// Export one slide's narration as a WAV file
    Narrate {
        /// Slide number, starting at 1
        #[arg(long, value_name = "N")]
        slide: usize,

        /// Output file
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,

        /// Load a TOML deck instead of the built-in one
        #[arg(long, value_name = "PATH")]
        deck: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Args, Debug, Clone, Default)]
struct PlayArgs {
    /// Synthesize narration even if disabled in config
    #[arg(long, conflicts_with = "no_narration")]
    narration: bool,

    /// Play every slide silently
    #[arg(long = "no-narration")]
    no_narration: bool,

    /// Start muted
    #[arg(long)]
    muted: bool,

    /// Milliseconds a silent slide stays up (0 = advance manually)
    #[arg(long, value_name = "MS")]
    dwell_ms: Option<u64>,

    /// Load a TOML deck instead of the built-in one
    #[arg(long, value_name = "PATH")]
    deck: Option<PathBuf>,
}

impl From<&PlayArgs> for commands::play::PlayOptions {
    fn from(args: &PlayArgs) -> Self {
        let narration = match (args.narration, args.no_narration) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        Self {
            narration,
            muted: args.muted,
            dwell_ms: args.dwell_ms,
            deck: args.deck.clone(),
        }
    }
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Config commands must work even when the existing file is broken.
    if let Commands::Config { command } = &cli.command {
        return match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        };
    }

    let config = Config::load().context("load config")?;
    let _log_guard = logging::init(&config.logging)?;
    interrupt::init()?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli.command, &config).await })
}

async fn dispatch(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Play(args) => commands::play::run(&(&args).into(), config).await,
        Commands::Ask { mode, text } => commands::ask::run(mode, &text.join(" "), config).await,
        Commands::Slides { deck } => commands::slides::list(deck.as_deref()),
        Commands::Narrate { slide, out, deck } => {
            commands::narrate::run(slide, &out, deck.as_deref(), config).await
        }
        // Handled in `run` before the config is loaded.
        Commands::Config { .. } => Ok(()),
    }
}
