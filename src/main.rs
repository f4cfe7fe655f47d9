use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod channels;
mod cli;
mod core;
mod daemon;
mod providers;

use crate::core::settings::Settings;

#[derive(Parser)]
#[command(name = "stock-tracker")]
#[command(author, version, about = "Watch vehicle inventory and notify on new or re-listed VINs")]
struct Cli {
    /// Config file (default: ~/.config/stock-tracker/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the inventory and send notifications until interrupted
    Run,

    /// Poll once and print the parsed inventory without notifying
    Check {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show tracked VINs from the saved state file
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(log_file: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .unwrap_or_else(|| OsStr::new("stock-tracker.log"));
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Run => {
            let settings = Settings::load(config)?;
            let _guard = init_logging(settings.log_file.as_deref());
            daemon::run(settings).await
        }
        Commands::Check { json } => {
            init_logging(None);
            cli::check::run(config, json).await
        }
        Commands::Status { json } => {
            init_logging(None);
            cli::status::run(config, json)
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}
