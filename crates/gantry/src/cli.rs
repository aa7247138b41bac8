mod app;
mod commands;
mod config;
mod source;
mod utils;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::error;

#[derive(Parser)]
#[command(name = "gantry")]
#[command(version)]
#[command(about = "Gantry - named processes over HTTP, files and sandboxed scripts")]
#[command(
    long_about = "Gantry registers named processes and runs them by name. Built-in families cover \
HTTP requests (http.*) and confined filesystem access (fs.<backend>.*); further processes are \
JavaScript functions loaded from a local directory or a GitHub repository and executed in an \
embedded V8 engine, with filesystem access only through the backends the configuration names."
)]
#[command(after_help = "EXAMPLES:\n  \
    # Show what the configuration provides\n  \
    gantry check-config\n  \
    gantry list\n\n  \
    # Run a process; arguments are JSON, or plain strings\n  \
    gantry run http.Get https://example.com/items '{\"page\": 2}'\n  \
    gantry run fs.data.ReadDir / true\n\
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file [default: ~/.gantry/config.toml]
    #[arg(long, short = 'c', global = true, env = "GANTRY_CONFIG")]
    config: Option<PathBuf>,

    /// No logging except for errors
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Verbose logging (-v) or trace logging (-vv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a process and print its result as JSON
    Run {
        /// Process name, e.g. http.Get or fs.data.ReadFile
        process: String,

        /// Positional arguments, each parsed as JSON when possible
        args: Vec<String>,
    },

    /// List every registered process
    List,

    /// Load the configuration and bring up everything it names
    #[command(
        long_about = "Parses the configuration, registers its backends, loads every configured \
script from its source and starts the script pool, then reports what is available."
    )]
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    utils::init_logger(cli.quiet, cli.verbose);

    let config = cli.config.as_deref();
    let result = match &cli.command {
        Commands::Run { process, args } => commands::run::handle(config, process, args).await,
        Commands::List => commands::list::handle(config).await,
        Commands::CheckConfig => commands::check_config::handle(config).await,
    };

    if let Err(e) = result {
        error!("{e:#}");
        std::process::exit(1);
    }
}
