//! Modes command - list the display modes a deployment offers.

use std::path::PathBuf;

use markerlayer::config::DisplayModeCatalog;

use crate::error::CliError;

/// Arguments for the modes command.
#[derive(clap::Args)]
pub struct ModesArgs {
    /// Path to a display mode catalog (JSON); the built-in catalog is used
    /// when omitted
    #[arg(long)]
    pub catalog: Option<PathBuf>,
}

/// Run the modes command.
pub fn run(args: ModesArgs) -> Result<(), CliError> {
    let catalog = match args.catalog {
        Some(path) => DisplayModeCatalog::from_json(&std::fs::read_to_string(path)?)?,
        None => DisplayModeCatalog::default(),
    };

    println!("Available display modes:");
    for mode in catalog.iter() {
        let regime = match mode.max {
            Some(max) => {
                let units = mode.units.as_deref().unwrap_or("");
                if mode.reverse {
                    format!("continuous 0..{max}{units}, reversed")
                } else {
                    format!("continuous 0..{max}{units}")
                }
            }
            None => "discrete states".to_string(),
        };
        println!("  {:<12} {:<20} {}", mode.value, mode.name, regime);
    }
    Ok(())
}
