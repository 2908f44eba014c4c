//! prosopon — reconcile author records across catalogs into one
//! canonical registry.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use prosopon_cli::exit_codes::EXIT_SUCCESS;
use prosopon_cli::run::{cmd_run, cmd_validate};
use prosopon_cli::CliError;

#[derive(Parser)]
#[command(name = "prosopon")]
#[command(about = "Cross-catalog author identity reconciliation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run reconciliation from a TOML config file
    #[command(after_help = "\
Examples:
  prosopon run authors.toml
  prosopon run authors.toml --out results/ --json
  prosopon run authors.toml --overrides curation.toml
  prosopon run authors.toml --snapshot lookups.json")]
    Run {
        /// Path to the pipeline config file
        config: PathBuf,

        /// Directory for registry and quarantine artifacts
        /// (default: out/ beside the config file)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Print the full run result as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Curation override batch file (TOML)
        #[arg(long)]
        overrides: Option<PathBuf>,

        /// Offline lookup snapshot (JSON) instead of the live endpoint
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Validate a config file without running
    #[command(after_help = "\
Examples:
  prosopon validate authors.toml")]
    Validate {
        /// Path to the pipeline config file
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config, out, json, overrides, snapshot } => {
            cmd_run(config, out, json, overrides, snapshot)
        }
        Commands::Validate { config } => cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {message}");
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {hint}");
            }
            ExitCode::from(code)
        }
    }
}
