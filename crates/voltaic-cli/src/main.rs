//! Command-line runner for Voltaic circuit layouts.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "voltaic",
    about = "Voltaic: a tick-based block circuit simulator",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a layout and simulate it
    Run {
        /// Layout file (.ron, .toml or .json)
        layout: PathBuf,

        #[command(flatten)]
        run: commands::run::RunArgs,
    },

    /// Continue a simulation from a saved snapshot
    Resume {
        /// Snapshot written by `run --save`
        snapshot: PathBuf,

        #[command(flatten)]
        run: commands::run::RunArgs,
    },

    /// Validate a layout without running it
    Check {
        /// Layout file (.ron, .toml or .json)
        layout: PathBuf,
    },
}

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_env("RUST_LOG")
        .init();

    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();

    let result = match cli.command {
        Commands::Run { layout, run } => commands::run::run(&layout, &run, &mut stdout),
        Commands::Resume { snapshot, run } => commands::run::resume(&snapshot, &run, &mut stdout),
        Commands::Check { layout } => commands::check::run(&layout, &mut stdout),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
