//! Jetty CLI - build descriptions written in C

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("jetty=debug")
    } else {
        EnvFilter::new("jetty=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let config = commands::load_config(&cli)?;

    // Execute command
    match cli.command {
        Commands::Build(args) => commands::build::execute(args, config),
        Commands::BuildFile(args) => commands::build_file::execute(args, config),
        Commands::Cc(args) => commands::cc::execute(args, config),
        Commands::Init => commands::init::execute(),
        Commands::InitFreestanding => commands::init_freestanding::execute(config),
        Commands::Library => commands::library::execute(),
        Commands::Embed(args) => commands::embed::execute(args),
        Commands::Toolchain(args) => commands::toolchain::execute(args, config),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
