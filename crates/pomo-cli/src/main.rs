use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pomo_core::Settings;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "pomo-cli", version, about = "Pomodoro interval timer")]
struct Cli {
    /// Settings file (defaults to ~/.config/pomo/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run, pause and inspect intervals
    #[command(flatten)]
    Timer(commands::timer::TimerAction),
    /// Interval statistics
    Summary(commands::stats::SummaryArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_env("POMO_LOG")
        .or_else(|_| EnvFilter::try_new(&settings.log.filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    })
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let settings = load_settings(cli.config.as_ref())?;
    init_tracing(&settings);

    match cli.command {
        Commands::Timer(action) => commands::timer::run(action, &settings),
        Commands::Summary(args) => commands::stats::run(args, &settings),
        Commands::Config { action } => {
            commands::config::run(action, settings, cli.config.as_deref())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
