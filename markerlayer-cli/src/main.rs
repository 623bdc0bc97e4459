//! MarkerLayer CLI - command-line interface
//!
//! Runs the marker coordination pipeline against a simulated data source
//! and inspects deployment configuration.

mod commands;
mod error;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "markerlayer",
    version,
    about = "Realtime map marker coordination and reconciliation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the marker pipeline against a simulated data source
    Run(commands::run::RunArgs),
    /// List the available display modes
    Modes(commands::modes::ModesArgs),
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Modes(args) => commands::modes::run(args),
    };
    if let Err(error) = result {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
