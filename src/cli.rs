use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ngconf")]
#[command(author, version, about = "Nginx-style configuration engine and hosting service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a YAML service configuration and host one instance per NGConfig entry
    Serve {
        /// Path to the service configuration file
        #[arg(short = 'f', long, value_name = "FILE")]
        config: PathBuf,
    },
    /// Render a single configuration tree to stdout, following its includes
    View {
        /// Path to the main configuration file
        file: PathBuf,
    },
    /// Print directive-kind counts for a single configuration tree
    Stats {
        /// Path to the main configuration file
        file: PathBuf,
    },
}
